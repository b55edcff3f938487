//! Exchange rate provider port.
//!
//! This trait defines the interface for the upstream rate source.
//! Implementations can be HTTP clients, mock providers, etc.
//!
//! Each call is a single unprotected request: no retry or caching lives
//! behind this trait. Failure handling belongs to the caller.

use chrono::NaiveDate;

use crate::domain::{CurrencyCode, HistoricalSeries, RateSnapshot};
use crate::error::UpstreamError;

/// Port trait for exchange rate providers.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Fetches the latest rates quoted against `base`.
    async fn fetch_latest(&self, base: &CurrencyCode) -> Result<RateSnapshot, UpstreamError>;

    /// Fetches daily rates against `base` between `start` and `end`, inclusive.
    async fn fetch_range(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, UpstreamError>;
}
