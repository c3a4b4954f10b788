//! HTTP request handlers.

pub mod health;
pub mod usage;
pub mod words;
