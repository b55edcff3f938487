//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use currency_types::{RateProvider, ServiceResponse};

use crate::RateService;

/// `Cache-Control` value for the latest-rates endpoint.
const LATEST_CACHE_CONTROL: &str = "public, max-age=3600";

/// Application state shared across handlers.
pub struct AppState<P: RateProvider> {
    pub service: RateService<P>,
}

/// Wrapper to implement IntoResponse for ServiceResponse (orphan rule workaround).
pub struct ApiResponse<T>(pub ServiceResponse<T>);

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let resp = self.0;
        match (resp.is_success, resp.data) {
            (true, Some(data)) => (StatusCode::OK, Json(data)).into_response(),
            _ => {
                let status =
                    StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::BAD_GATEWAY);
                error_body(status, resp.message.unwrap_or_default())
            }
        }
    }
}

fn error_body(status: StatusCode, message: String) -> Response {
    let body = serde_json::json!({
        "error": message,
        "code": status.as_u16()
    });

    (status, Json(body)).into_response()
}

fn bad_query(rejection: QueryRejection) -> Response {
    error_body(StatusCode::BAD_REQUEST, rejection.body_text())
}

fn log_request(endpoint: &str, status: u16, started: Instant) {
    tracing::info!(
        method = "GET",
        endpoint,
        status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
}

fn default_base_currency() -> String {
    "EUR".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    10
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestQuery {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalQuery {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Health check endpoint. Reports the upstream circuit state.
pub async fn health<P: RateProvider>(State(state): State<Arc<AppState<P>>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "circuit": state.service.circuit_state()
    }))
}

/// Latest rates for a base currency.
#[tracing::instrument(skip(state))]
pub async fn latest_rates<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
    query: Result<Query<LatestQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_query(rejection),
    };

    let started = Instant::now();
    let result = state.service.get_latest_rates(&query.base_currency).await;
    log_request("api/currency/latest", result.status_code, started);

    let cacheable = result.is_success;
    let mut response = ApiResponse(result).into_response();
    if cacheable {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(LATEST_CACHE_CONTROL),
        );
    }
    response
}

/// Convert an amount between two currencies.
#[tracing::instrument(skip(state))]
pub async fn convert<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_query(rejection),
    };

    let started = Instant::now();
    let result = state
        .service
        .convert_currency(&query.from, &query.to, query.amount)
        .await;
    log_request("api/currency/convert", result.status_code, started);

    ApiResponse(result).into_response()
}

/// One page of historical rates.
#[tracing::instrument(skip(state))]
pub async fn historical_rates<P: RateProvider>(
    State(state): State<Arc<AppState<P>>>,
    query: Result<Query<HistoricalQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_query(rejection),
    };

    let started = Instant::now();
    let result = state
        .service
        .get_historical_rates(
            &query.base_currency,
            &query.start_date,
            &query.end_date,
            query.page,
            query.page_size,
        )
        .await;
    log_request("api/currency/historical", result.status_code, started);

    ApiResponse(result).into_response()
}
