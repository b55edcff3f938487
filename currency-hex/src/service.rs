//! Rate Application Service
//!
//! Orchestrates cache lookup, policy-protected upstream fetches, cache
//! population and response shaping. Contains NO transport logic.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use currency_types::{
    ConversionResult, CurrencyCode, HistoricalPage, RateError, RateProvider, RateSnapshot,
    ServiceResponse,
};

use crate::cache::{CachedValue, RateCache, latest_key, pair_key};
use crate::resilience::{CircuitState, ResiliencePolicy};

const LATEST_FAILURE: &str = "Error fetching latest exchange rates.";
const CONVERT_FAILURE: &str = "Error fetching exchange rate.";
const HISTORICAL_FAILURE: &str = "Error fetching historical exchange rates.";

/// Application service for exchange-rate operations.
///
/// Generic over `P: RateProvider` - the upstream adapter is injected at
/// compile time. The policy and cache are shared handles so several
/// services (or tests) can observe the same breaker and cache.
pub struct RateService<P: RateProvider> {
    provider: P,
    policy: Arc<ResiliencePolicy>,
    cache: Arc<RateCache>,
}

impl<P: RateProvider> RateService<P> {
    /// Creates a service from its collaborators.
    pub fn new(provider: P, policy: Arc<ResiliencePolicy>, cache: Arc<RateCache>) -> Self {
        Self {
            provider,
            policy,
            cache,
        }
    }

    /// Creates a service with default retry, breaker and cache settings.
    pub fn with_defaults(provider: P) -> Self {
        Self::new(
            provider,
            Arc::new(ResiliencePolicy::default()),
            Arc::new(RateCache::new()),
        )
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &RateCache {
        &self.cache
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.policy.circuit_state()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Public Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Latest rates for `base_currency`, served from cache for up to the cache TTL.
    #[tracing::instrument(skip(self))]
    pub async fn get_latest_rates(&self, base_currency: &str) -> ServiceResponse<RateSnapshot> {
        let result: Result<RateSnapshot, RateError> = async {
            let base = CurrencyCode::parse(base_currency)?;
            let snapshot = self.latest_snapshot(&base).await?;
            Ok(RateSnapshot::clone(&snapshot))
        }
        .await;

        respond(result, LATEST_FAILURE)
    }

    /// Converts `amount` from one currency to another.
    ///
    /// Restricted currencies are rejected before any cache or network access.
    #[tracing::instrument(skip(self))]
    pub async fn convert_currency(
        &self,
        from: &str,
        to: &str,
        amount: Decimal,
    ) -> ServiceResponse<ConversionResult> {
        let result: Result<ConversionResult, RateError> = async {
            let from = CurrencyCode::parse(from)?;
            let to = CurrencyCode::parse(to)?;

            if from.is_restricted() || to.is_restricted() {
                info!(%from, %to, "conversion denied for restricted currency");
                return Err(RateError::RestrictedCurrency);
            }
            if amount < Decimal::ZERO {
                return Err(RateError::Validation("Amount must be non-negative".into()));
            }

            let rate = if from == to {
                Decimal::ONE
            } else {
                self.pair_rate(&from, &to).await?
            };

            ConversionResult::compute(from, to, amount, rate)
        }
        .await;

        respond(result, CONVERT_FAILURE)
    }

    /// One page of daily rates between two dates (`YYYY-MM-DD`, inclusive).
    ///
    /// Ranges are never cached; every call fetches the full range and slices it.
    #[tracing::instrument(skip(self))]
    pub async fn get_historical_rates(
        &self,
        base_currency: &str,
        start_date: &str,
        end_date: &str,
        page: u32,
        page_size: u32,
    ) -> ServiceResponse<HistoricalPage> {
        let result: Result<HistoricalPage, RateError> = async {
            let base = CurrencyCode::parse(base_currency)?;
            let start = parse_date("startDate", start_date)?;
            let end = parse_date("endDate", end_date)?;
            if start > end {
                return Err(RateError::Validation(
                    "startDate must be on or before endDate".into(),
                ));
            }
            if page < 1 || page_size < 1 {
                return Err(RateError::Validation(
                    "page and pageSize must be at least 1".into(),
                ));
            }

            info!(%base, %start, %end, "fetching historical rates from provider");
            let series = self
                .policy
                .execute(|| self.provider.fetch_range(&base, start, end))
                .await?;

            Ok(series.paginate(page, page_size))
        }
        .await;

        respond(result, HISTORICAL_FAILURE)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Cache-then-fetch helpers
    // ─────────────────────────────────────────────────────────────────────────────

    async fn latest_snapshot(&self, base: &CurrencyCode) -> Result<Arc<RateSnapshot>, RateError> {
        let key = latest_key(base);
        if let Some(snapshot) = self.cache.get_snapshot(&key) {
            return Ok(snapshot);
        }

        info!(%base, "fetching latest rates from provider");
        let snapshot = Arc::new(
            self.policy
                .execute(|| self.provider.fetch_latest(base))
                .await?,
        );
        self.cache.put(key, CachedValue::Snapshot(snapshot.clone()));
        Ok(snapshot)
    }

    async fn pair_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, RateError> {
        let key = pair_key(from, to);
        if let Some(rate) = self.cache.get_rate(&key) {
            return Ok(rate);
        }

        let snapshot = self.latest_snapshot(from).await?;
        let rate = snapshot.rate_for(to).ok_or_else(|| RateError::RateNotFound {
            from: from.clone(),
            to: to.clone(),
        })?;

        debug!(%from, %to, %rate, "caching derived pair rate");
        self.cache.put(key, CachedValue::Rate(rate));
        Ok(rate)
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, RateError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        RateError::Validation(format!("Invalid {field} '{raw}': expected YYYY-MM-DD"))
    })
}

/// Shapes an operation result for the caller. Upstream failures keep their
/// status but get an operation-specific message.
fn respond<T>(result: Result<T, RateError>, upstream_message: &str) -> ServiceResponse<T> {
    match result {
        Ok(data) => ServiceResponse::ok(data),
        Err(RateError::Upstream(err)) => {
            error!(
                status = err.status_code,
                error = %err.message,
                "{}", upstream_message
            );
            ServiceResponse::failure(err.status_code, upstream_message)
        }
        Err(err) => err.into(),
    }
}
