//! Health, usage and routing integration tests.

mod common;

use axum::http::StatusCode;
use chrono::Duration;
use common::TestHarness;
use serde_json::{json, Value};

#[tokio::test]
async fn health_check() {
    let harness = TestHarness::new();

    let response = harness.server.get("/health").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["usage_day"], "2024-03-01");
}

#[tokio::test]
async fn usage_today_starts_at_zero() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .get("/v1/usage/today")
        .add_header(name, value)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["quiz_count"], 0);
    assert_eq!(body["bulk_count"], 0);
    assert_eq!(body["date"], "2024-03-01");
}

#[tokio::test]
async fn usage_counts_bulk_calls_and_resets_next_day() {
    let harness = TestHarness::new();

    for _ in 0..2 {
        let (name, value) = harness.user_header();
        harness
            .server
            .post("/v1/words/bulk_tokenize")
            .add_header(name, value)
            .json(&json!({ "text": "apple" }))
            .await
            .assert_status_ok();
    }

    let (name, value) = harness.user_header();
    let body: Value = harness
        .server
        .get("/v1/usage/today")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(body["bulk_count"], 2);

    harness.clock.advance(Duration::days(1));

    let (name, value) = harness.user_header();
    let body: Value = harness
        .server
        .get("/v1/usage/today")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(body["bulk_count"], 0);
    assert_eq!(body["date"], "2024-03-02");
}

#[tokio::test]
async fn usage_requires_identity() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/usage/today").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn malformed_identity_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/usage/today")
        .add_header(
            axum::http::HeaderName::from_static("x-user-id"),
            axum::http::HeaderValue::from_static("not-a-uuid"),
        )
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let harness = TestHarness::new();

    let response = harness.server.get("/v1/nothing/here").await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "not_found");
}
