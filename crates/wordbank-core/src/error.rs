//! Error types for wordbank.

use crate::ids::IdError;
use crate::usage::UsageKind;

/// Result type for wordbank operations.
pub type Result<T> = std::result::Result<T, WordbankError>;

/// Errors that can occur in wordbank operations.
///
/// Per-word outcomes of a bulk registration are never reported through this type; they
/// are collected in [`crate::BulkRegisterReport`] instead.
#[derive(Debug, thiserror::Error)]
pub enum WordbankError {
    /// The request carried no words.
    #[error("no words given")]
    EmptyRequest,

    /// The request carried more words than one call accepts.
    #[error("too many words: count={count}, limit={limit}")]
    TooManyWords {
        /// Number of words in the request.
        count: usize,
        /// Maximum accepted per request.
        limit: usize,
    },

    /// The text produced more raw tokens than the tokenizer accepts.
    #[error("too many tokens: more than {limit} in input")]
    TooManyTokens {
        /// Raw token ceiling that was crossed.
        limit: usize,
    },

    /// The daily usage cap for a feature has been reached.
    #[error("daily {kind} quota exceeded: cap={cap}")]
    QuotaExceeded {
        /// The feature whose quota is exhausted.
        kind: UsageKind,
        /// The daily cap in effect.
        cap: u32,
    },

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WordbankError {
    /// Whether the error was caused by the request itself rather than by the system.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyRequest
                | Self::TooManyWords { .. }
                | Self::TooManyTokens { .. }
                | Self::InvalidId(_)
        )
    }
}
