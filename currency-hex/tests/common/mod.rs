//! Shared fixtures for the HTTP integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::{body::Body, http::Request};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use rust_decimal_macros::dec;

use currency_hex::{
    RateService,
    cache::RateCache,
    inbound::HttpServer,
    resilience::{CircuitBreakerConfig, ResiliencePolicy, RetryConfig},
};
use currency_types::{
    CurrencyCode, HistoricalSeries, RatePoint, RateProvider, RateSnapshot, UpstreamError,
};

/// Provider that serves a fixed USD snapshot and a 30-day EUR series,
/// or fails every call when `failing` is set.
pub struct StubProvider {
    pub failing: bool,
    pub calls: Arc<AtomicU32>,
}

impl StubProvider {
    pub fn healthy() -> Self {
        Self {
            failing: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    fn record(&self) -> Result<(), UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            Err(UpstreamError::new(500, "provider down"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RateProvider for StubProvider {
    async fn fetch_latest(&self, base: &CurrencyCode) -> Result<RateSnapshot, UpstreamError> {
        self.record()?;
        Ok(RateSnapshot {
            base_currency: base.clone(),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            rates: BTreeMap::from([
                ("EUR".to_string(), dec!(0.92)),
                ("GBP".to_string(), dec!(0.79)),
            ]),
        })
    }

    async fn fetch_range(
        &self,
        base: &CurrencyCode,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<HistoricalSeries, UpstreamError> {
        self.record()?;
        let points: Vec<RatePoint> = (0..30u64)
            .map(|i| RatePoint {
                date: start + chrono::Days::new(i),
                rates: BTreeMap::from([("USD".to_string(), dec!(1.08))]),
            })
            .collect();
        Ok(HistoricalSeries {
            base_currency: base.clone(),
            start_date: start,
            end_date: start + chrono::Days::new(29),
            points,
        })
    }
}

/// Server over `provider` with no retry delay, so upstream failures
/// surface after a single attempt.
pub fn server_with(provider: StubProvider, requests_per_minute: u32) -> HttpServer<StubProvider> {
    let policy = ResiliencePolicy::new(
        RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        },
        CircuitBreakerConfig::default(),
    );
    let service = RateService::new(provider, Arc::new(policy), Arc::new(RateCache::new()));
    HttpServer::with_rate_limit(service, requests_per_minute)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn get_as(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}
