//! # Currency Hex
//!
//! Application service layer and HTTP adapter for the currency conversion service.
//!
//! ## Architecture
//!
//! - `service` - Application service (cache, resilience, response shaping)
//! - `cache` - TTL cache for snapshots and derived pair rates
//! - `resilience` - Retry and circuit breaker around upstream calls
//! - `inbound/` - HTTP adapter (Axum server)
//!
//! The service is generic over `P: RateProvider`, allowing different
//! upstream implementations to be injected.

pub mod cache;
pub mod inbound;
pub mod resilience;
pub mod service;


pub use service::RateService;
