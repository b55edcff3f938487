//! Frankfurter Exchange Rate Provider
//!
//! HTTP adapter implementing the [`RateProvider`] port against the
//! Frankfurter API (<https://www.frankfurter.app>).
//!
//! Each method issues exactly one GET request and maps the outcome:
//! - 2xx with a well-formed body becomes the domain type
//! - non-2xx becomes [`UpstreamError`] with the provider's status
//! - transport failures and malformed bodies become [`UpstreamError`] with 502
//!
//! No retry or caching happens here; callers wrap these calls
//! in their own resilience policy.
//!
//! # Example
//! ```no_run
//! use currency_types::{CurrencyCode, RateProvider};
//! use exchange_rates::FrankfurterClient;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FrankfurterClient::new(exchange_rates::DEFAULT_BASE_URL);
//! let snapshot = client.fetch_latest(&CurrencyCode::parse("eur")?).await?;
//! println!("{} rates as of {}", snapshot.rates.len(), snapshot.as_of);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;

use currency_types::{
    CurrencyCode, HistoricalSeries, RatePoint, RateProvider, RateSnapshot, UpstreamError,
};

/// Public Frankfurter endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.app";

/// Frankfurter API client.
#[derive(Debug, Clone)]
pub struct FrankfurterClient {
    base_url: String,
    http: Client,
}

impl FrankfurterClient {
    /// Creates a client with a default `reqwest::Client`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(base_url, Client::new())
    }

    /// Creates a client around a preconfigured `reqwest::Client`
    /// (timeouts, proxies, user agent).
    pub fn with_http_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        base: &CurrencyCode,
    ) -> Result<T, UpstreamError> {
        let resp = self
            .http
            .get(url)
            .query(&[("base", base.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::transport(format!("Request to rate provider failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
                .unwrap_or(body);
            tracing::debug!(url, status = status.as_u16(), %message, "rate provider returned error");
            return Err(UpstreamError::new(status.as_u16(), message));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| UpstreamError::transport(format!("Failed to read provider response: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| UpstreamError::transport(format!("Malformed provider response: {e}")))
    }
}

#[async_trait]
impl RateProvider for FrankfurterClient {
    async fn fetch_latest(&self, base: &CurrencyCode) -> Result<RateSnapshot, UpstreamError> {
        let url = format!("{}/latest", self.base_url);
        let body: api::LatestResponse = self.get_json(&url, base).await?;

        Ok(RateSnapshot {
            base_currency: api::parse_base(&body.base)?,
            as_of: body.date,
            rates: body.rates,
        })
    }

    async fn fetch_range(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HistoricalSeries, UpstreamError> {
        let url = format!("{}/{}..{}", self.base_url, start, end);
        let body: api::RangeResponse = self.get_json(&url, base).await?;

        // BTreeMap iteration keeps the points in date order.
        let points = body
            .rates
            .into_iter()
            .map(|(date, rates)| RatePoint { date, rates })
            .collect();

        Ok(HistoricalSeries {
            base_currency: api::parse_base(&body.base)?,
            start_date: body.start_date,
            end_date: body.end_date,
            points,
        })
    }
}

/// Wire format of the Frankfurter API.
mod api {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde::Deserialize;

    use currency_types::{CurrencyCode, UpstreamError};

    #[derive(Deserialize, Debug)]
    pub struct LatestResponse {
        pub base: String,
        pub date: NaiveDate,
        pub rates: BTreeMap<String, Decimal>,
    }

    #[derive(Deserialize, Debug)]
    pub struct RangeResponse {
        pub base: String,
        pub start_date: NaiveDate,
        pub end_date: NaiveDate,
        pub rates: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
    }

    pub fn parse_base(raw: &str) -> Result<CurrencyCode, UpstreamError> {
        CurrencyCode::parse(raw)
            .map_err(|_| UpstreamError::transport(format!("Provider returned invalid base '{raw}'")))
    }
}
