//! Port traits (interfaces for adapters).
//!
//! The rate service depends on these traits, not on a concrete HTTP client.

mod provider;

pub use provider::RateProvider;
