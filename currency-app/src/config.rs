//! Configuration loading from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use currency_hex::cache::RateCacheConfig;
use exchange_rates::DEFAULT_BASE_URL;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub frankfurter_base_url: String,
    /// Timeout for each individual upstream attempt.
    pub upstream_timeout: Duration,
    pub rate_limit_per_minute: u32,
    pub cache: RateCacheConfig,
    pub json_logs: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let cache_defaults = RateCacheConfig::default();

        Ok(Self {
            port: parse_or(&lookup, "PORT", 3000)?,
            frankfurter_base_url: lookup("FRANKFURTER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            upstream_timeout: Duration::from_secs(parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 10)?),
            rate_limit_per_minute: parse_or(&lookup, "RATE_LIMIT_PER_MINUTE", 100)?,
            cache: RateCacheConfig {
                ttl: Duration::from_secs(parse_or(
                    &lookup,
                    "CACHE_TTL_SECS",
                    cache_defaults.ttl.as_secs(),
                )?),
                max_entries: parse_or(&lookup, "CACHE_MAX_ENTRIES", cache_defaults.max_entries)?,
            },
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has invalid value '{raw}'")),
        None => Ok(default),
    }
}
