//! Bulk register: add a batch of words to a user's list under the per-user lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use wordbank_core::{
    normalize, BulkRegisterReport, FailureReason, Result, UserId, WordId, WordbankError,
};
use wordbank_store::{
    RegistrationTx, RegistrationWriter, TransactionManager, TxRegistrationReader, UserLock,
    WordResolver,
};

use crate::quota::QuotaGate;

/// Size limits applied to one bulk registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterLimits {
    /// Words accepted per request.
    pub max_words_per_request: usize,
    /// Active registrations a user may hold.
    pub max_active_words_per_user: i64,
    /// Bulk calls allowed per day.
    pub daily_bulk_cap: u32,
}

/// Registers words on a user's list.
#[derive(Clone)]
pub struct Registrar {
    words: Arc<dyn WordResolver>,
    transactions: Arc<dyn TransactionManager>,
    quota: QuotaGate,
    limits: RegisterLimits,
}

impl Registrar {
    /// Create a registrar.
    #[must_use]
    pub fn new(
        words: Arc<dyn WordResolver>,
        transactions: Arc<dyn TransactionManager>,
        quota: QuotaGate,
        limits: RegisterLimits,
    ) -> Self {
        Self {
            words,
            transactions,
            quota,
            limits,
        }
    }

    /// Register `words` for `user_id`.
    ///
    /// Words are normalized first; each normalized word ends up in exactly one of the
    /// report's lists. Running out of capacity, unknown words, already active words and
    /// failed writes are reported per word. The whole batch runs in one transaction under
    /// the user's registration lock, so concurrent calls for one user never overshoot the
    /// capacity.
    ///
    /// # Errors
    ///
    /// Returns `EmptyRequest` or `TooManyWords` for invalid input, `QuotaExceeded` when the
    /// daily bulk cap is reached, or a storage error from any step outside the per-word
    /// writes.
    pub async fn register(
        &self,
        user_id: UserId,
        words: &[String],
        now: DateTime<Utc>,
    ) -> Result<BulkRegisterReport> {
        let limit = self.limits.max_words_per_request;
        if words.is_empty() {
            return Err(WordbankError::EmptyRequest);
        }
        if words.len() > limit {
            return Err(WordbankError::TooManyWords {
                count: words.len(),
                limit,
            });
        }

        let normalized = normalize(words, limit);
        if normalized.is_empty() {
            return Err(WordbankError::EmptyRequest);
        }

        tracing::debug!(
            user_id = %user_id,
            requested = words.len(),
            normalized = normalized.len(),
            "Bulk registration started"
        );

        self.quota
            .inc_bulk_or_429(user_id, now, self.limits.daily_bulk_cap)
            .await?;

        let ids = self.words.find_ids_by_names(&normalized).await?;
        let mut report = BulkRegisterReport::with_capacity(normalized.len());

        let mut tx = self.transactions.begin().await?;
        tx.lock_user(user_id).await?;

        let active = tx.count_active_by_user(user_id).await?;
        let mut remaining = self.limits.max_active_words_per_user - active;
        if remaining <= 0 {
            for word in normalized {
                report.fail(word, FailureReason::LimitReached);
            }
            tx.commit().await?;
            tracing::info!(user_id = %user_id, active, "User at capacity, nothing registered");
            return Ok(report);
        }

        let resolved: Vec<WordId> = normalized
            .iter()
            .filter_map(|word| ids.get(word).copied())
            .collect();
        let mut state: HashMap<WordId, bool> = tx
            .find_active_map_by_user_and_word_ids(user_id, &resolved)
            .await?;

        for word in normalized {
            let Some(&word_id) = ids.get(&word) else {
                report.fail(word, FailureReason::NotExists);
                continue;
            };
            if remaining <= 0 {
                report.fail(word, FailureReason::LimitReached);
                continue;
            }

            let written = match state.get(&word_id) {
                Some(true) => {
                    report.fail(word, FailureReason::AlreadyRegistered);
                    continue;
                }
                Some(false) => tx.activate(user_id, word_id).await,
                None => tx.create_active(user_id, word_id).await,
            };

            match written {
                Ok(()) => {
                    remaining -= 1;
                    state.insert(word_id, true);
                    report.succeed(word);
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = %user_id,
                        word = %word,
                        word_id = %word_id,
                        error = %err,
                        "Failed to register word"
                    );
                    report.fail(word, FailureReason::DbError);
                }
            }
        }

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            succeeded = report.success.len(),
            failed = report.failed.len(),
            "Bulk registration completed"
        );

        Ok(report)
    }
}
