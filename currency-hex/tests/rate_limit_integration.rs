//! Integration tests for rate limiting middleware.
//!
//! These tests verify the HTTP-level behavior of rate limiting,
//! including 429 responses and proper integration with the middleware stack.

mod common;

use axum::http::StatusCode;
use tower::ServiceExt;

use common::{StubProvider, get, get_as, json_body, server_with};

const LATEST: &str = "/api/currency/latest?baseCurrency=USD";

#[tokio::test]
async fn test_rate_limiting_returns_429_when_exceeded() {
    let app = server_with(StubProvider::healthy(), 3).router();

    for i in 1..=3 {
        let response = app.clone().oneshot(get_as(LATEST, "client-a")).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Request {} should not be rate limited (quota not yet exceeded)",
            i
        );
    }

    let response = app.clone().oneshot(get_as(LATEST, "client-a")).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::TOO_MANY_REQUESTS,
        "Request should be rate limited after exceeding quota"
    );

    let json = json_body(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .contains("Rate limit exceeded")
    );
    assert_eq!(json["retry_after_seconds"], 60);
}

#[tokio::test]
async fn test_rate_limiting_health_endpoint_bypassed() {
    let app = server_with(StubProvider::healthy(), 1).router();

    for _ in 0..10 {
        let response = app.clone().oneshot(get("/health")).await.unwrap();

        assert_eq!(
            response.status(),
            StatusCode::OK,
            "Health endpoint should not be rate limited"
        );
    }
}

#[tokio::test]
async fn test_rate_limiting_per_client_isolation() {
    let app = server_with(StubProvider::healthy(), 1).router();

    let response = app.clone().oneshot(get_as(LATEST, "client-a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.clone().oneshot(get_as(LATEST, "client-a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let response = app.clone().oneshot(get_as(LATEST, "client-b")).await.unwrap();
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "client-b should have its own quota"
    );
}

#[tokio::test]
async fn test_anonymous_requests_share_one_quota() {
    let app = server_with(StubProvider::healthy(), 2).router();

    for _ in 0..2 {
        let response = app.clone().oneshot(get(LATEST)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get(LATEST)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_rate_limiting_response_format() {
    let app = server_with(StubProvider::healthy(), 1).router();

    let _ = app.clone().oneshot(get_as(LATEST, "client-a")).await;
    let response = app.clone().oneshot(get_as(LATEST, "client-a")).await.unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("application/json"));

    let json = json_body(response).await;
    assert!(
        json.get("error").is_some(),
        "Response should have 'error' field"
    );
    assert!(
        json.get("retry_after_seconds").is_some(),
        "Response should have 'retry_after_seconds' field"
    );
}
