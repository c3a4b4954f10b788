//! Application state.

use std::sync::Arc;

use wordbank_core::{Clock, DailyUsage, SystemClock, UserId};
use wordbank_store::{Store, TransactionManager};

use crate::bulk::{Classifier, RegisterLimits, Registrar};
use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::limiter::RequestLimiter;
use crate::quota::QuotaGate;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Daily usage gate.
    pub quota: QuotaGate,

    /// Bulk tokenize pipeline.
    pub classifier: Classifier,

    /// Bulk register pipeline.
    pub registrar: Registrar,

    /// Per-client rate limiter (absent when disabled).
    pub limiter: Option<Arc<RequestLimiter>>,

    /// Time source for usage days.
    pub clock: Arc<dyn Clock>,

    /// Name of the storage backend.
    pub storage: &'static str,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state over `store`, using wall-clock time.
    #[must_use]
    pub fn new<S>(store: Arc<S>, config: ServiceConfig) -> Self
    where
        S: Store + 'static,
    {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Create a new application state with an explicit clock.
    #[must_use]
    pub fn with_clock<S>(store: Arc<S>, config: ServiceConfig, clock: Arc<dyn Clock>) -> Self
    where
        S: Store + 'static,
    {
        let storage = store.backend();
        let quota = QuotaGate::new(store.clone(), config.day_boundary);

        let classifier = Classifier::new(
            store.clone(),
            store.clone(),
            quota.clone(),
            config.bulk_max_tokens,
            config.daily_bulk_cap,
        );

        let registrar = Registrar::new(
            store.clone(),
            store,
            quota.clone(),
            RegisterLimits {
                max_words_per_request: config.bulk_max_words_per_request,
                max_active_words_per_user: config.max_active_words_per_user,
                daily_bulk_cap: config.daily_bulk_cap,
            },
        );

        let limiter = RequestLimiter::per_minute(config.rate_limit_per_minute)
            .map(|limiter| Arc::new(limiter.trust_forwarded_for(config.trust_forwarded_for)));
        if limiter.is_none() {
            tracing::warn!("Request rate limiting disabled");
        }

        Self {
            quota,
            classifier,
            registrar,
            limiter,
            clock,
            storage,
            config,
        }
    }

    /// Count one quiz call for `user_id` against `daily_quiz_cap`.
    ///
    /// Quiz endpoints call this before generating questions.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::QuotaExceeded` once the cap is reached, or `ApiError::Internal`
    /// on a storage failure.
    pub async fn count_quiz(&self, user_id: UserId) -> Result<DailyUsage, ApiError> {
        let usage = self
            .quota
            .inc_quiz_or_429(user_id, self.clock.now(), self.config.daily_quiz_cap)
            .await?;
        Ok(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use wordbank_core::FixedClock;
    use wordbank_store::MemoryStore;

    fn state(daily_quiz_cap: u32) -> AppState {
        let config = ServiceConfig {
            daily_quiz_cap,
            rate_limit_per_minute: 0,
            ..ServiceConfig::default()
        };
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 3, 0, 0).unwrap(),
        ));
        AppState::with_clock(Arc::new(MemoryStore::new()), config, clock)
    }

    #[test]
    fn reports_storage_backend() {
        assert_eq!(state(50).storage, "memory");
    }

    #[tokio::test]
    async fn quiz_calls_stop_at_configured_cap() {
        let state = state(2);
        let user_id = UserId::generate();

        state.count_quiz(user_id).await.unwrap();
        let usage = state.count_quiz(user_id).await.unwrap();
        assert_eq!((usage.quiz_count, usage.bulk_count), (2, 0));

        let err = state.count_quiz(user_id).await.unwrap_err();
        assert!(matches!(err, ApiError::QuotaExceeded { cap: 2, .. }));
    }
}
