//! Domain models for the currency exchange service.

pub mod currency;
pub mod rates;

pub use currency::{CurrencyCode, RESTRICTED_CURRENCIES};
pub use rates::{ConversionResult, HistoricalPage, HistoricalSeries, RatePoint, RateSnapshot};
