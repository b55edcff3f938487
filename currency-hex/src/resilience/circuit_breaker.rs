//! Circuit breaker guarding the upstream rate provider.
//!
//! ```text
//!   Closed ──(failure_threshold consecutive failures)──▶ Open
//!     ▲                                                   │
//!     │ probe succeeds                    open_duration elapses
//!     │                                                   ▼
//!     └──────────────────────────────────────────────  HalfOpen
//!                        probe fails: back to Open, timer restarted
//! ```
//!
//! Only one probe runs at a time. While it is in flight every other caller
//! is rejected as if the breaker were still open.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::time::{Duration, Instant};
use tracing::{info, warn};

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker settings.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed calls that trip the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a probe.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 2,
            open_duration: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { until: Instant },
    /// A probe call is in flight.
    HalfOpen,
}

/// Shared, internally synchronized circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::Closed {
                consecutive_failures: 0,
            }),
        }
    }

    /// Current state. An open breaker whose timer has elapsed reports `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            Inner::Closed { .. } => CircuitState::Closed,
            Inner::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
            Inner::Open { .. } => CircuitState::Open,
            Inner::HalfOpen => CircuitState::HalfOpen,
        }
    }

    /// Asks permission to make a call.
    ///
    /// Returns `None` while the breaker is open or a probe is in flight.
    /// The first caller after the open timer elapses receives the probe permit.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { .. } => Some(CallPermit::new(self, false)),
            Inner::Open { until } if Instant::now() >= until => {
                *inner = Inner::HalfOpen;
                info!("circuit half-open, allowing probe call");
                Some(CallPermit::new(self, true))
            }
            Inner::Open { .. } | Inner::HalfOpen => None,
        }
    }

    fn on_success(&self, probe: bool) {
        let mut inner = self.lock();
        match *inner {
            Inner::Closed { .. } => {
                *inner = Inner::Closed {
                    consecutive_failures: 0,
                }
            }
            Inner::HalfOpen if probe => {
                *inner = Inner::Closed {
                    consecutive_failures: 0,
                };
                info!("probe succeeded, circuit closed");
            }
            // Calls admitted before the breaker tripped do not decide its fate.
            _ => {}
        }
    }

    fn on_failure(&self, probe: bool) {
        let mut inner = self.lock();
        let until = Instant::now() + self.config.open_duration;
        match *inner {
            Inner::HalfOpen if probe => {
                *inner = Inner::Open { until };
                warn!(
                    open_secs = self.config.open_duration.as_secs(),
                    "probe failed, circuit re-opened"
                );
            }
            Inner::Closed {
                consecutive_failures,
            } => {
                let failures = consecutive_failures + 1;
                if failures >= self.config.failure_threshold {
                    *inner = Inner::Open { until };
                    warn!(
                        failures,
                        open_secs = self.config.open_duration.as_secs(),
                        "circuit opened"
                    );
                } else {
                    *inner = Inner::Closed {
                        consecutive_failures: failures,
                    };
                }
            }
            _ => {}
        }
    }

    fn on_abandoned_probe(&self) {
        let mut inner = self.lock();
        if let Inner::HalfOpen = *inner {
            // Let the next caller probe straight away.
            *inner = Inner::Open {
                until: Instant::now(),
            };
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

/// Permission to make one call. Report the outcome with
/// [`success`](Self::success) or [`failure`](Self::failure).
///
/// Dropping an unsettled probe permit (e.g. the caller was cancelled)
/// hands the probe to the next caller.
#[derive(Debug)]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl<'a> CallPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, probe: bool) -> Self {
        Self {
            breaker,
            probe,
            settled: false,
        }
    }

    /// True if this is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }

    pub fn success(mut self) {
        self.settled = true;
        self.breaker.on_success(self.probe);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.on_failure(self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.on_abandoned_probe();
        }
    }
}
