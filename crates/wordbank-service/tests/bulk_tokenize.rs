//! Bulk tokenize integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

use wordbank_service::ServiceConfig;

#[tokio::test]
async fn tokenize_classifies_words() {
    let harness = TestHarness::new();
    harness.seed_words(&["test"]);
    harness.seed_registration("hello", true);
    harness.seed_registration("world", false);
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "Hello world test" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["candidates"], json!(["world", "test"]));
    assert_eq!(body["registered"], json!(["hello"]));
    assert_eq!(body["not_exists"], json!([]));
}

#[tokio::test]
async fn tokenize_keeps_contractions_and_drops_noise() {
    let harness = TestHarness::new();
    harness.seed_words(&["don't", "stop"]);
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "'Don't' STOP... 42 stop! 'quux'" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["candidates"], json!(["don't", "stop"]));
    assert_eq!(body["not_exists"], json!(["quux"]));
}

#[tokio::test]
async fn tokenize_empty_text_returns_empty_lists() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body,
        json!({ "candidates": [], "registered": [], "not_exists": [] })
    );
}

#[tokio::test]
async fn tokenize_too_many_tokens_is_bad_request() {
    let harness = TestHarness::with_config(ServiceConfig {
        bulk_max_tokens: 2,
        ..TestHarness::config()
    });
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "a b c d e f g h i j k" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tokenize_and_register_share_the_bulk_quota() {
    let harness = TestHarness::with_config(ServiceConfig {
        daily_bulk_cap: 1,
        ..TestHarness::config()
    });
    harness.seed_words(&["apple"]);

    let (name, value) = harness.user_header();
    harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "apple" }))
        .await
        .assert_status_ok();

    let (name, value) = harness.user_header();
    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple"] }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);

    let (name, value) = harness.user_header();
    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "apple" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn rate_limit_applies_per_client_and_route() {
    let harness = TestHarness::with_config(ServiceConfig {
        rate_limit_per_minute: 2,
        ..TestHarness::config()
    });

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
    let response = harness
        .server
        .post("/v1/words/bulk_tokenize")
        .add_header(name, value)
        .json(&json!({ "text": "apple" }))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "rate_limited");

    // A different route has its own bucket.
    let (name, value) = harness.user_header();
    harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple"] }))
        .await
        .assert_status_ok();
}
