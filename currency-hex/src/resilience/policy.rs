//! Retry wrapped in a circuit breaker.

use std::future::Future;

use currency_types::{RateError, UpstreamError};
use tracing::{error, warn};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use super::retry::{RetryConfig, retry};

/// Resilience policy shared by every call to one upstream provider.
///
/// Retry wraps the raw call; the breaker wraps the retrying call and only
/// sees the final outcome. A breaker failure therefore means "all retries
/// exhausted", not "one attempt failed".
#[derive(Debug, Default)]
pub struct ResiliencePolicy {
    retry: RetryConfig,
    breaker: CircuitBreaker,
}

impl ResiliencePolicy {
    pub fn new(retry: RetryConfig, breaker: CircuitBreakerConfig) -> Self {
        Self {
            retry,
            breaker: CircuitBreaker::new(breaker),
        }
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Runs `op` under the policy.
    ///
    /// Returns [`RateError::CircuitOpen`] without calling `op` while the
    /// breaker is open, otherwise the result of the retry sequence.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, RateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let Some(permit) = self.breaker.try_acquire() else {
            warn!("circuit open, rejecting upstream call");
            return Err(RateError::CircuitOpen);
        };

        match retry(&self.retry, op).await {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(err) => {
                error!(
                    status = err.status_code,
                    error = %err.message,
                    probe = permit.is_probe(),
                    "upstream call failed after retries"
                );
                permit.failure();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::{Duration, Instant};

    async fn failing_upstream(calls: &AtomicU32) -> Result<(), UpstreamError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(UpstreamError::new(500, "boom"))
    }

    async fn trip(policy: &ResiliencePolicy, calls: &AtomicU32) {
        for _ in 0..2 {
            let _ = policy.execute(|| failing_upstream(calls)).await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_reports_last_upstream_status() {
        let policy = ResiliencePolicy::default();
        let calls = &AtomicU32::new(0);

        let result: Result<(), _> = policy
            .execute(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::new(429, "too many requests"))
            })
            .await;

        assert_eq!(result.unwrap_err().status_code(), 429);
        assert_eq!(calls.load(Ordering::SeqCst), 4, "one call plus three retries");
        assert_eq!(policy.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_counts_exhausted_sequences_not_attempts() {
        let policy = ResiliencePolicy::default();
        let calls = AtomicU32::new(0);

        policy.execute(|| failing_upstream(&calls)).await.unwrap_err();
        assert_eq!(policy.circuit_state(), CircuitState::Closed);

        policy.execute(|| failing_upstream(&calls)).await.unwrap_err();
        assert_eq!(policy.circuit_state(), CircuitState::Open);
        assert_eq!(calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_short_circuits_without_calling() {
        let policy = ResiliencePolicy::default();
        let calls = AtomicU32::new(0);
        trip(&policy, &calls).await;
        let before = calls.load(Ordering::SeqCst);
        let start = Instant::now();

        let result = policy.execute(|| failing_upstream(&calls)).await;

        assert_eq!(result, Err(RateError::CircuitOpen));
        assert_eq!(calls.load(Ordering::SeqCst), before);
        assert_eq!(start.elapsed(), Duration::ZERO, "no retry delay when open");
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_success_closes_circuit() {
        let policy = ResiliencePolicy::default();
        let calls = AtomicU32::new(0);
        trip(&policy, &calls).await;
        tokio::time::advance(Duration::from_secs(60)).await;

        let result = policy.execute(|| async { Ok::<_, UpstreamError>(1) }).await;

        assert_eq!(result, Ok(1));
        assert_eq!(policy.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_retries_keeps_circuit_closed() {
        let policy = ResiliencePolicy::default();
        let calls = &AtomicU32::new(0);

        let result = policy
            .execute(move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 4 {
                    Err(UpstreamError::new(503, "unavailable"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result, Ok(4));
        assert_eq!(policy.circuit_state(), CircuitState::Closed);
    }
}
