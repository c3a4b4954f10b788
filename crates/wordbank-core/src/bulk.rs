//! Bulk tokenize and bulk register results.

use serde::{Deserialize, Serialize};

/// Why a word in a bulk registration was not registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The word is not in the catalog.
    NotExists,
    /// The word is already actively registered.
    AlreadyRegistered,
    /// The user has no capacity left.
    LimitReached,
    /// Writing the registration failed.
    DbError,
}

impl FailureReason {
    /// Get the reason as its wire string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotExists => "not_exists",
            Self::AlreadyRegistered => "already_registered",
            Self::LimitReached => "limit_reached",
            Self::DbError => "db_error",
        }
    }
}

/// A word that was rejected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedWord {
    /// The normalized word.
    pub word: String,
    /// Why it was rejected.
    pub reason: FailureReason,
}

/// Outcome of one bulk registration call.
///
/// Every normalized input word appears exactly once, either in `success` or in `failed`,
/// in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRegisterReport {
    /// Words that are now actively registered because of this call.
    pub success: Vec<String>,
    /// Words that were not registered.
    pub failed: Vec<FailedWord>,
}

impl BulkRegisterReport {
    /// An empty report sized for `words` entries.
    #[must_use]
    pub fn with_capacity(words: usize) -> Self {
        Self {
            success: Vec::with_capacity(words),
            failed: Vec::new(),
        }
    }

    /// Record a registered word.
    pub fn succeed(&mut self, word: String) {
        self.success.push(word);
    }

    /// Record a rejected word.
    pub fn fail(&mut self, word: String, reason: FailureReason) {
        self.failed.push(FailedWord { word, reason });
    }

    /// Number of words accounted for.
    #[must_use]
    pub fn len(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    /// Whether no word was accounted for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Words rejected for `reason`.
    pub fn failed_with(&self, reason: FailureReason) -> impl Iterator<Item = &str> {
        self.failed
            .iter()
            .filter(move |f| f.reason == reason)
            .map(|f| f.word.as_str())
    }
}

/// Normalized tokens of a text split by registration state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedTokens {
    /// In the catalog but not actively registered.
    pub candidates: Vec<String>,
    /// Already actively registered.
    pub registered: Vec<String>,
    /// Not in the catalog.
    pub not_exists: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reason_wire_names() {
        for reason in [
            FailureReason::NotExists,
            FailureReason::AlreadyRegistered,
            FailureReason::LimitReached,
            FailureReason::DbError,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }

    #[test]
    fn report_accounts_for_every_word() {
        let mut report = BulkRegisterReport::with_capacity(3);
        report.succeed("apple".into());
        report.fail("zzz".into(), FailureReason::NotExists);
        report.fail("pear".into(), FailureReason::LimitReached);

        assert_eq!(report.len(), 3);
        assert_eq!(
            report.failed_with(FailureReason::LimitReached).collect::<Vec<_>>(),
            vec!["pear"]
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failed"][0]["reason"], "not_exists");
    }
}
