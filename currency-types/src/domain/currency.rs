//! Validated ISO 4217 currency code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RateError;

/// Currencies for which conversion is denied regardless of upstream availability.
pub const RESTRICTED_CURRENCIES: [&str; 4] = ["TRY", "PLN", "THB", "MXN"];

/// A three-letter alphabetic currency code, always stored uppercase.
///
/// Parsing is case-insensitive, so `"eur"` and `"EUR"` produce the same
/// value and therefore the same cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parses and normalizes a currency code.
    pub fn parse(raw: &str) -> Result<Self, RateError> {
        let trimmed = raw.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RateError::Validation(format!(
                "Invalid currency code '{}': expected 3 letters",
                raw
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the uppercase code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if conversions involving this currency are policy-denied.
    pub fn is_restricted(&self) -> bool {
        RESTRICTED_CURRENCIES.contains(&self.0.as_str())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}
