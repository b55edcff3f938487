//! Rate limiting middleware using Governor.
//!
//! Implements per-client rate limiting with a keyed token bucket. The
//! client is identified by its `Authorization` header value. Clients whose
//! bucket has fully refilled are pruned periodically, so the number of
//! tracked keys stays bounded by recent traffic.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
};
use serde_json::json;
use std::{
    num::NonZeroU32,
    sync::{Arc, Weak},
    time::Duration,
};

const ANONYMOUS: &str = "anonymous";

type KeyedLimiter<C> =
    RateLimiter<String, DefaultKeyedStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Rate limiter state shared across requests.
pub struct RateLimiterState<C: Clock = DefaultClock> {
    limiter: KeyedLimiter<C>,
    period: Duration,
}

impl RateLimiterState {
    /// Creates a limiter allowing `requests` per `period` for each client.
    pub fn new(requests: u32, period: Duration) -> Self {
        Self::with_clock(requests, period, DefaultClock::default())
    }
}

impl<C: Clock> RateLimiterState<C> {
    /// Creates a limiter driven by `clock`.
    ///
    /// The full allowance is available as a burst and refills evenly over
    /// the period. A zero `requests` is treated as one.
    pub fn with_clock(requests: u32, period: Duration, clock: C) -> Self {
        let burst = NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::with_period(period / burst.get())
            .unwrap_or_else(|| Quota::per_minute(burst))
            .allow_burst(burst);

        Self {
            limiter: RateLimiter::new(quota, DefaultKeyedStateStore::default(), clock),
            period,
        }
    }

    /// Checks if a request should be rate limited.
    /// Returns true if the request is allowed, false if rate limited.
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Drops clients whose bucket is full again.
    pub fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(
            before,
            after = self.limiter.len(),
            "pruned idle rate limit clients"
        );
    }

    /// Number of distinct clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl<C: Clock + Send + Sync + 'static> RateLimiterState<C> {
    /// Prunes idle clients every `every` until the state is dropped.
    pub fn spawn_pruner(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let state: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else { break };
                state.prune();
            }
        })
    }
}

/// Rate limiting middleware. `/health` is never limited.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let key = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim_start_matches("Bearer ").to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| ANONYMOUS.to_string());

    if !limiter.check(&key) {
        tracing::warn!(client = %key, "rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Rate limit exceeded. Please try again later.",
                "retry_after_seconds": limiter.period.as_secs()
            })),
        )
            .into_response();
    }

    next.run(request).await
}
