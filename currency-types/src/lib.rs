//! # Currency Types
//!
//! Domain types and port traits for the currency exchange service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (CurrencyCode, RateSnapshot, HistoricalSeries)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Response envelope for the request-handling layer
//! - `error/` - Upstream and service error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ConversionResult, CurrencyCode, HistoricalPage, HistoricalSeries, RESTRICTED_CURRENCIES,
    RatePoint, RateSnapshot,
};
pub use dto::ServiceResponse;
pub use error::{RateError, UpstreamError};
pub use ports::RateProvider;
