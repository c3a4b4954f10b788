//! Daily usage quota gate.
//!
//! Every counted call goes through [`QuotaGate::increment_or_reject`], which resolves the
//! current usage day and performs the atomic increment in storage. The gate never reads
//! and then writes; the cap check happens in the same storage step as the increment.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use wordbank_core::{
    DailyUsage, DayBoundary, IncrementOutcome, Result, UsageKind, UserId, WordbankError,
};
use wordbank_store::DailyUsageStore;

/// Usage counts for the current day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageToday {
    /// The usage day the counts belong to.
    pub date: NaiveDate,
    /// Quiz calls counted today.
    pub quiz_count: i32,
    /// Bulk calls counted today.
    pub bulk_count: i32,
}

/// Gate for per-day feature caps.
#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn DailyUsageStore>,
    boundary: DayBoundary,
}

impl QuotaGate {
    /// Create a gate over `store`, with days ending at `boundary`.
    #[must_use]
    pub fn new(store: Arc<dyn DailyUsageStore>, boundary: DayBoundary) -> Self {
        Self { store, boundary }
    }

    /// Count one use of `kind`, or fail if the user already reached `cap` today.
    ///
    /// A cap of `0` disables the feature; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `WordbankError::QuotaExceeded` at the cap, or a storage error.
    pub async fn increment_or_reject(
        &self,
        user_id: UserId,
        kind: UsageKind,
        now: DateTime<Utc>,
        cap: u32,
    ) -> Result<DailyUsage> {
        if cap == 0 {
            tracing::warn!(user_id = %user_id, kind = %kind, "Feature disabled by zero daily cap");
            return Err(WordbankError::QuotaExceeded { kind, cap });
        }

        let today = self.boundary.today(now);
        let stored_cap = i32::try_from(cap).unwrap_or(i32::MAX);

        match self
            .store
            .increment_or_reject(user_id, kind, today, stored_cap, now)
            .await?
        {
            IncrementOutcome::Applied(usage) => {
                tracing::debug!(
                    user_id = %user_id,
                    kind = %kind,
                    count = usage.count(kind),
                    cap,
                    "Daily usage counted"
                );
                Ok(usage)
            }
            IncrementOutcome::CapReached => {
                tracing::warn!(user_id = %user_id, kind = %kind, cap, %today, "Daily quota exceeded");
                Err(WordbankError::QuotaExceeded { kind, cap })
            }
        }
    }

    /// Count one quiz call.
    ///
    /// # Errors
    ///
    /// See [`QuotaGate::increment_or_reject`].
    pub async fn inc_quiz_or_429(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        cap: u32,
    ) -> Result<DailyUsage> {
        self.increment_or_reject(user_id, UsageKind::Quiz, now, cap)
            .await
    }

    /// Count one bulk tokenize or bulk register call.
    ///
    /// # Errors
    ///
    /// See [`QuotaGate::increment_or_reject`].
    pub async fn inc_bulk_or_429(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        cap: u32,
    ) -> Result<DailyUsage> {
        self.increment_or_reject(user_id, UsageKind::Bulk, now, cap)
            .await
    }

    /// Today's counts without incrementing. A row left over from an earlier day reads as zero.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the read fails.
    pub async fn today(&self, user_id: UserId, now: DateTime<Utc>) -> Result<UsageToday> {
        let date = self.boundary.today(now);
        let usage = self.store.get_daily_usage(user_id).await?;

        Ok(UsageToday {
            date,
            quiz_count: usage
                .as_ref()
                .map_or(0, |u| u.count_on(UsageKind::Quiz, date)),
            bulk_count: usage
                .as_ref()
                .map_or(0, |u| u.count_on(UsageKind::Bulk, date)),
        })
    }
}
