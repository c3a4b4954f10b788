//! Wordbank HTTP API Service.
//!
//! This crate exposes the bulk word registration pipeline over HTTP:
//!
//! - Bulk tokenize: classify the words of a pasted text
//! - Bulk register: add a batch of words to the caller's list
//! - Daily usage: today's quiz and bulk counts
//!
//! # Identity
//!
//! Callers are identified by the `x-user-id` header, set by the gateway in front of the
//! service after it authenticated the request.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Health handler is async for routing

pub mod auth;
pub mod bulk;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod quota;
pub mod routes;
pub mod state;

pub use bulk::{Classifier, RegisterLimits, Registrar};
pub use config::ServiceConfig;
pub use error::ApiError;
pub use limiter::RequestLimiter;
pub use quota::{QuotaGate, UsageToday};
pub use routes::create_router;
pub use state::AppState;
