//! Core types and utilities for wordbank.
//!
//! This crate provides the foundational types used throughout the wordbank workspace:
//!
//! - **Identifiers**: `UserId`, `WordId`
//! - **Words**: `Word`, `RegisteredWord`
//! - **Daily usage**: `DailyUsage`, `UsageKind`, `DayBoundary`, `IncrementOutcome`
//! - **Bulk results**: `BulkRegisterReport`, `FailureReason`, `ClassifiedTokens`
//! - **Tokenizer**: `extract_tokens`, `normalize`
//! - **Time**: the injectable `Clock`
//!
//! # Daily Usage vs Capacity
//!
//! Two different ceilings gate bulk registration:
//!
//! - The **daily quota** limits how often per day a feature (`quiz`, `bulk`) may be
//!   invoked. It resets at midnight of a fixed UTC offset.
//! - The **capacity** limits how many words a user may hold active at once. Running out
//!   of capacity is not an error; it shows up as `limit_reached` entries in the report.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod bulk;
pub mod clock;
pub mod error;
pub mod ids;
pub mod tokenize;
pub mod usage;
pub mod word;

pub use bulk::{BulkRegisterReport, ClassifiedTokens, FailedWord, FailureReason};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, WordbankError};
pub use ids::{IdError, UserId, WordId};
pub use tokenize::{extract_tokens, normalize, RAW_TOKEN_CEILING_FACTOR};
pub use usage::{DailyUsage, DayBoundary, IncrementOutcome, UsageKind};
pub use word::{RegisteredWord, Word};
