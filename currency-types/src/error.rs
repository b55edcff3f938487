//! Error types for the currency exchange service.

use crate::domain::CurrencyCode;

/// Status used when the provider could not be reached or sent an unreadable body.
pub const BAD_GATEWAY: u16 = 502;

/// A failed call to the upstream rate provider.
///
/// Non-2xx responses carry the provider's status; transport failures and
/// malformed bodies use 502.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Upstream error ({status_code}): {message}")]
pub struct UpstreamError {
    pub status_code: u16,
    pub message: String,
}

impl UpstreamError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// A failure with no HTTP status (connection refused, timeout, bad JSON).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(BAD_GATEWAY, message)
    }
}

/// Service-level errors.
///
/// Every variant maps to the status code returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("{0}")]
    Validation(String),

    #[error("Conversion involving restricted currencies is not allowed.")]
    RestrictedCurrency,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Upstream rate provider is unavailable, try again later.")]
    CircuitOpen,

    #[error("Rate not available for {from} -> {to}")]
    RateNotFound { from: CurrencyCode, to: CurrencyCode },
}

impl RateError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            RateError::Validation(_) | RateError::RestrictedCurrency => 400,
            RateError::Upstream(e) => e.status_code,
            RateError::CircuitOpen => 503,
            RateError::RateNotFound { .. } => BAD_GATEWAY,
        }
    }
}
