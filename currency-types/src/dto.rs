//! Response envelope handed to the request-handling layer.

use serde::{Deserialize, Serialize};

use crate::error::RateError;

/// Typed success-or-failure result of a rate service call.
///
/// Successful calls carry `data` and status 200; failed calls carry the
/// mapped status code and a human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub is_success: bool,
    pub status_code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    /// A 200 response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            is_success: true,
            status_code: 200,
            message: None,
            data: Some(data),
        }
    }

    /// A failed response with an explicit status and message.
    pub fn failure(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            status_code,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T> From<RateError> for ServiceResponse<T> {
    fn from(err: RateError) -> Self {
        Self::failure(err.status_code(), err.to_string())
    }
}
