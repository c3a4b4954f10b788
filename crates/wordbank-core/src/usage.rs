//! Daily usage counters.
//!
//! Each user owns a single [`DailyUsage`] row that tracks how often the `quiz` and `bulk`
//! features were used on the current day. "Day" is defined by a [`DayBoundary`]: midnight
//! at a fixed UTC offset, not midnight UTC.
//!
//! Both kinds share one row and reset together on day rollover, but increment
//! independently. The transition rules live in [`DailyUsage::next`] so that every
//! storage backend applies exactly the same semantics.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WordbankError};
use crate::UserId;

/// Default day boundary offset in seconds east of UTC (+09:00).
pub const DEFAULT_DAY_BOUNDARY_OFFSET_SECS: i32 = 9 * 3600;

/// A feature whose invocations are counted per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    /// Quiz generation.
    Quiz,
    /// Bulk tokenize / bulk register.
    Bulk,
}

impl UsageKind {
    /// Get the kind name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Bulk => "bulk",
        }
    }
}

impl fmt::Display for UsageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user daily usage record.
///
/// The counts are only meaningful relative to `last_reset_date`. A row whose
/// `last_reset_date` is older than today logically holds zero for both kinds until the
/// next increment rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    /// The owning user.
    pub user_id: UserId,

    /// The day the counts belong to.
    pub last_reset_date: NaiveDate,

    /// Quiz invocations on `last_reset_date`.
    pub quiz_count: i32,

    /// Bulk invocations on `last_reset_date`.
    pub bulk_count: i32,

    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Result of an atomic increment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// The counter was incremented; carries the row as written.
    Applied(DailyUsage),
    /// The kind was already at its cap for today; nothing was written.
    CapReached,
}

impl DailyUsage {
    /// The row created by a user's first usage-affecting call.
    #[must_use]
    pub fn first(user_id: UserId, kind: UsageKind, today: NaiveDate, now: DateTime<Utc>) -> Self {
        let (quiz_count, bulk_count) = match kind {
            UsageKind::Quiz => (1, 0),
            UsageKind::Bulk => (0, 1),
        };
        Self {
            user_id,
            last_reset_date: today,
            quiz_count,
            bulk_count,
            updated_at: now,
        }
    }

    /// The stored count for `kind`, regardless of date.
    #[must_use]
    pub const fn count(&self, kind: UsageKind) -> i32 {
        match kind {
            UsageKind::Quiz => self.quiz_count,
            UsageKind::Bulk => self.bulk_count,
        }
    }

    /// The logical count for `kind` as seen on `today`.
    #[must_use]
    pub fn count_on(&self, kind: UsageKind, today: NaiveDate) -> i32 {
        if self.last_reset_date < today {
            0
        } else {
            self.count(kind)
        }
    }

    /// Apply one increment of `kind` on `today` under `cap`.
    ///
    /// - no row: insert with `kind = 1`, the other kind `0`
    /// - row from an earlier day: reset, `kind = 1`, the other kind `0`
    /// - same day, below cap: `kind + 1`, everything else unchanged
    /// - same day, at cap: [`IncrementOutcome::CapReached`]
    #[must_use]
    pub fn next(
        current: Option<&Self>,
        user_id: UserId,
        kind: UsageKind,
        today: NaiveDate,
        cap: i32,
        now: DateTime<Utc>,
    ) -> IncrementOutcome {
        let Some(current) = current else {
            return IncrementOutcome::Applied(Self::first(user_id, kind, today, now));
        };

        if current.last_reset_date < today {
            return IncrementOutcome::Applied(Self::first(user_id, kind, today, now));
        }

        if current.count(kind) >= cap {
            return IncrementOutcome::CapReached;
        }

        let mut next = current.clone();
        match kind {
            UsageKind::Quiz => next.quiz_count += 1,
            UsageKind::Bulk => next.bulk_count += 1,
        }
        next.updated_at = now;
        IncrementOutcome::Applied(next)
    }
}

/// Midnight at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBoundary {
    offset: FixedOffset,
}

impl DayBoundary {
    /// Create a boundary at the given offset.
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Parse an offset such as `+09:00`, `-05:30`, `+02` or `UTC`.
    ///
    /// # Errors
    ///
    /// Returns `WordbankError::Configuration` if the input is not a valid offset.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || WordbankError::Configuration(format!("invalid day boundary offset: {input}"));
        let s = input.trim();

        if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
            return Ok(Self::new(Utc.fix()));
        }

        let (sign, rest) = match s.as_bytes().first() {
            Some(b'+') => (1, &s[1..]),
            Some(b'-') => (-1, &s[1..]),
            _ => return Err(invalid()),
        };
        let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(invalid());
        }

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(Self::new)
            .ok_or_else(invalid)
    }

    /// The offset this boundary sits at.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The calendar day `now` falls on at this boundary.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }
}

impl Default for DayBoundary {
    fn default() -> Self {
        let offset =
            FixedOffset::east_opt(DEFAULT_DAY_BOUNDARY_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
        Self::new(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn applied(outcome: IncrementOutcome) -> DailyUsage {
        match outcome {
            IncrementOutcome::Applied(usage) => usage,
            IncrementOutcome::CapReached => panic!("expected increment"),
        }
    }

    #[test]
    fn first_increment_creates_row() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let usage = applied(DailyUsage::next(None, user_id, UsageKind::Bulk, day(1), 3, now));
        assert_eq!(usage.bulk_count, 1);
        assert_eq!(usage.quiz_count, 0);
        assert_eq!(usage.last_reset_date, day(1));
    }

    #[test]
    fn same_day_increments_until_cap() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let mut usage = applied(DailyUsage::next(None, user_id, UsageKind::Quiz, day(1), 2, now));
        usage = applied(DailyUsage::next(Some(&usage), user_id, UsageKind::Quiz, day(1), 2, now));
        assert_eq!(usage.quiz_count, 2);

        let outcome = DailyUsage::next(Some(&usage), user_id, UsageKind::Quiz, day(1), 2, now);
        assert_eq!(outcome, IncrementOutcome::CapReached);
    }

    #[test]
    fn kinds_increment_independently() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let usage = applied(DailyUsage::next(None, user_id, UsageKind::Quiz, day(1), 5, now));
        let usage = applied(DailyUsage::next(Some(&usage), user_id, UsageKind::Bulk, day(1), 5, now));
        assert_eq!((usage.quiz_count, usage.bulk_count), (1, 1));
    }

    #[test]
    fn new_day_resets_both_kinds() {
        let user_id = UserId::generate();
        let now = Utc::now();
        let stale = DailyUsage {
            user_id,
            last_reset_date: day(1),
            quiz_count: 7,
            bulk_count: 20,
            updated_at: now,
        };

        let usage = applied(DailyUsage::next(Some(&stale), user_id, UsageKind::Bulk, day(2), 20, now));
        assert_eq!(usage.bulk_count, 1);
        assert_eq!(usage.quiz_count, 0);
        assert_eq!(usage.last_reset_date, day(2));
    }

    #[test]
    fn stale_row_reads_as_zero() {
        let usage = DailyUsage {
            user_id: UserId::generate(),
            last_reset_date: day(1),
            quiz_count: 4,
            bulk_count: 9,
            updated_at: Utc::now(),
        };
        assert_eq!(usage.count_on(UsageKind::Bulk, day(1)), 9);
        assert_eq!(usage.count_on(UsageKind::Bulk, day(2)), 0);
        assert_eq!(usage.count_on(UsageKind::Quiz, day(2)), 0);
    }

    #[test]
    fn day_boundary_uses_fixed_offset() {
        let boundary = DayBoundary::parse("+09:00").unwrap();
        // 14:59 UTC is 23:59 at +09:00, 15:00 UTC is already the next day.
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 14, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap();
        assert_eq!(boundary.today(before), day(1));
        assert_eq!(boundary.today(after), day(2));
    }

    #[test]
    fn day_boundary_parsing() {
        assert_eq!(DayBoundary::parse("UTC").unwrap().offset().local_minus_utc(), 0);
        assert_eq!(DayBoundary::parse("-05:30").unwrap().offset().local_minus_utc(), -19800);
        assert_eq!(DayBoundary::parse("+02").unwrap().offset().local_minus_utc(), 7200);
        assert!(DayBoundary::parse("09:00").is_err());
        assert!(DayBoundary::parse("+25:00").is_err());
        assert!(DayBoundary::parse("+09:xx").is_err());
        assert_eq!(DayBoundary::default(), DayBoundary::parse("+09:00").unwrap());
    }
}
