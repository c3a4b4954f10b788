//! Bulk tokenize: classify the words of a pasted text against the catalog and the user's list.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use wordbank_core::{extract_tokens, normalize, ClassifiedTokens, Result, UserId, WordId};
use wordbank_store::{RegistrationReader, WordResolver};

use crate::quota::QuotaGate;

/// Splits pasted text into registration candidates.
#[derive(Clone)]
pub struct Classifier {
    words: Arc<dyn WordResolver>,
    registrations: Arc<dyn RegistrationReader>,
    quota: QuotaGate,
    max_tokens: usize,
    daily_bulk_cap: u32,
}

impl Classifier {
    /// Create a classifier keeping at most `max_tokens` unique tokens per text.
    #[must_use]
    pub fn new(
        words: Arc<dyn WordResolver>,
        registrations: Arc<dyn RegistrationReader>,
        quota: QuotaGate,
        max_tokens: usize,
        daily_bulk_cap: u32,
    ) -> Self {
        Self {
            words,
            registrations,
            quota,
            max_tokens,
            daily_bulk_cap,
        }
    }

    /// Tokenize `text` and sort each unique word into candidates, already registered
    /// words and words missing from the catalog, in first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `QuotaExceeded` when the daily bulk cap is reached, `TooManyTokens` for
    /// oversized input, or a storage error.
    pub async fn classify(
        &self,
        user_id: UserId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<ClassifiedTokens> {
        self.quota
            .inc_bulk_or_429(user_id, now, self.daily_bulk_cap)
            .await?;

        let tokens = normalize(extract_tokens(text, self.max_tokens)?, self.max_tokens);
        if tokens.is_empty() {
            return Ok(ClassifiedTokens::default());
        }

        let ids = self.words.find_ids_by_names(&tokens).await?;
        let known: Vec<WordId> = ids.values().copied().collect();
        let active = self
            .registrations
            .active_word_id_set_by_user(user_id, &known)
            .await?;

        let mut classified = ClassifiedTokens::default();
        for token in tokens {
            match ids.get(&token) {
                None => classified.not_exists.push(token),
                Some(id) if active.contains(id) => classified.registered.push(token),
                Some(_) => classified.candidates.push(token),
            }
        }

        tracing::debug!(
            user_id = %user_id,
            candidates = classified.candidates.len(),
            registered = classified.registered.len(),
            not_exists = classified.not_exists.len(),
            "Classified bulk text"
        );

        Ok(classified)
    }
}
