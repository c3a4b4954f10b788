//! Bulk register integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

use wordbank_core::UserId;
use wordbank_service::ServiceConfig;

fn reasons(body: &Value, reason: &str) -> Vec<String> {
    body["failed"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["reason"] == reason)
        .map(|f| f["word"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn register_new_words() {
    let harness = TestHarness::new();
    harness.seed_words(&["apple", "banana", "cherry"]);
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple", "banana", "cherry"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(["apple", "banana", "cherry"]));
    assert_eq!(body["failed"], json!([]));
}

#[tokio::test]
async fn register_reports_each_failure_reason() {
    let harness = TestHarness::with_config(ServiceConfig {
        max_active_words_per_user: 4,
        ..TestHarness::config()
    });
    harness.seed_words(&["apple", "cherry", "limitexceeded"]);
    harness.seed_registration("kiwi", true);
    harness.seed_registration("plum", true);
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["Apple", "kiwi", "notexists", "cherry", "limitexceeded", "APPLE"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(["apple", "cherry"]));
    assert_eq!(reasons(&body, "already_registered"), vec!["kiwi"]);
    assert_eq!(reasons(&body, "not_exists"), vec!["notexists"]);
    assert_eq!(reasons(&body, "limit_reached"), vec!["limitexceeded"]);
}

#[tokio::test]
async fn register_at_capacity_returns_ok_with_limit_reached() {
    let harness = TestHarness::with_config(ServiceConfig {
        max_active_words_per_user: 1,
        ..TestHarness::config()
    });
    harness.seed_words(&["apple"]);
    harness.seed_registration("kiwi", true);
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!([]));
    assert_eq!(reasons(&body, "limit_reached"), vec!["apple"]);
}

#[tokio::test]
async fn register_empty_list_is_bad_request() {
    let harness = TestHarness::new();
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": [] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn register_too_many_words_is_bad_request() {
    let harness = TestHarness::with_config(ServiceConfig {
        bulk_max_words_per_request: 2,
        ..TestHarness::config()
    });
    let (name, value) = harness.user_header();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["a", "b", "c"] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_over_daily_cap_is_too_many_requests() {
    let harness = TestHarness::with_config(ServiceConfig {
        daily_bulk_cap: 1,
        ..TestHarness::config()
    });
    harness.seed_words(&["apple", "banana"]);

    let (name, value) = harness.user_header();
    harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple"] }))
        .await
        .assert_status_ok();

    let (name, value) = harness.user_header();
    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["banana"] }))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "quota_exceeded");
    assert_eq!(body["error"]["details"]["kind"], "bulk");
    assert_eq!(body["error"]["details"]["cap"], 1);
}

#[tokio::test]
async fn register_without_identity_is_unauthorized() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .json(&json!({ "words": ["apple"] }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_do_not_share_registrations() {
    let harness = TestHarness::new();
    harness.seed_registration("apple", true);
    let (name, value) = TestHarness::header_for(UserId::generate());

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": ["apple"] }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], json!(["apple"]));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let harness = TestHarness::with_config(ServiceConfig {
        max_body_bytes: 64,
        ..TestHarness::config()
    });
    let (name, value) = harness.user_header();
    let words: Vec<String> = (0..50).map(|i| format!("word{i}")).collect();

    let response = harness
        .server
        .post("/v1/words/bulk_register")
        .add_header(name, value)
        .json(&json!({ "words": words }))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}
