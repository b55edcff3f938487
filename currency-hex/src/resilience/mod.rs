//! Fault tolerance for upstream calls.
//!
//! - `retry` - exponential backoff between attempts
//! - `circuit_breaker` - fail fast after repeated exhausted retry sequences
//! - `policy` - the two composed, shared across every upstream operation

pub mod circuit_breaker;
pub mod policy;
pub mod retry;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use policy::ResiliencePolicy;
pub use retry::{RetryConfig, retry};
