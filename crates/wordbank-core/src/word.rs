//! Catalog words and per-user registrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{UserId, WordId};

/// A canonical vocabulary entry.
///
/// Words belong to the catalog; this workspace only resolves names to ids.
/// Names are matched exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Catalog key.
    pub id: WordId,
    /// The word itself.
    pub name: String,
}

/// A word on a user's personal vocabulary list.
///
/// At most one registration exists per `(user_id, word_id)`. Rows are never deleted by
/// the bulk pipeline; deactivation only flips `is_active`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredWord {
    /// The owning user.
    pub user_id: UserId,

    /// The registered word.
    pub word_id: WordId,

    /// Whether the word counts toward the user's list and capacity.
    pub is_active: bool,

    /// Free-form note attached by the user.
    pub memo: Option<String>,

    /// Quiz attempts on this word.
    pub attempt_count: i32,

    /// Correct quiz answers on this word.
    pub correct_count: i32,

    /// When the registration was first created.
    pub created_at: DateTime<Utc>,

    /// When the registration was last changed.
    pub updated_at: DateTime<Utc>,
}

impl RegisteredWord {
    /// A fresh active registration.
    #[must_use]
    pub fn active(user_id: UserId, word_id: WordId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            word_id,
            is_active: true,
            memo: None,
            attempt_count: 0,
            correct_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same registration with a different activation state.
    #[must_use]
    pub fn with_active(mut self, is_active: bool, now: DateTime<Utc>) -> Self {
        self.is_active = is_active;
        self.updated_at = now;
        self
    }
}
