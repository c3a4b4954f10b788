//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::http::Uri;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::handlers::{health, usage, words};
use crate::limiter::rate_limit;
use crate::state::AppState;

/// Maximum concurrent requests for the bulk word endpoints.
/// Each bulk register holds a database transaction for its whole run.
const WORDS_MAX_CONCURRENT_REQUESTS: usize = 32;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 64;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Words (`x-user-id`, rate-limited)
/// - `POST /v1/words/bulk_tokenize` - Classify the words in a pasted text
/// - `POST /v1/words/bulk_register` - Register a batch of words
///
/// ## Usage (`x-user-id`)
/// - `GET /v1/usage/today` - Today's quiz and bulk counts
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let word_routes = Router::new()
        .route("/bulk_tokenize", post(words::bulk_tokenize))
        .route("/bulk_register", post(words::bulk_register))
        .route_layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(ConcurrencyLimitLayer::new(WORDS_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        .route("/usage/today", get(usage::today))
        .nest("/words", word_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .fallback(not_found)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
