//! Storage layer for wordbank.
//!
//! This crate provides the repositories the bulk registration pipeline consumes, split
//! into small capability traits so each can be mocked on its own:
//!
//! - [`WordResolver`]: catalog name → id lookup
//! - [`RegistrationReader`]: registration state outside any transaction
//! - [`DailyUsageStore`]: the atomic per-day usage counter
//! - [`TransactionManager`]: opens a [`RegistrationTx`]
//!
//! An open [`RegistrationTx`] combines [`TxRegistrationReader`], [`RegistrationWriter`]
//! and [`UserLock`]. It commits only through [`RegistrationTx::commit`]; dropping it
//! uncommitted (early return, error, panic, or a cancelled future) rolls it back and
//! releases the user lock.
//!
//! # Backends
//!
//! - [`PgStore`]: PostgreSQL via `sqlx`, with an atomic upsert for daily usage, an
//!   advisory transaction lock per user and one savepoint per registration write.
//! - [`MemoryStore`]: in-process maps with the same semantics, used by tests and by the
//!   service when no database is configured.
//!
//! # Example
//!
//! ```no_run
//! # async fn demo() -> wordbank_store::Result<()> {
//! use wordbank_core::UserId;
//! use wordbank_store::{
//!     MemoryStore, RegistrationTx, RegistrationWriter, TransactionManager, UserLock,
//! };
//!
//! let store = MemoryStore::new();
//! let apple = store.insert_word("apple")?;
//! let user_id = UserId::generate();
//!
//! let mut tx = store.begin().await?;
//! tx.lock_user(user_id).await?;
//! tx.create_active(user_id, apple).await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod postgres;
pub mod schema;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

pub use error::{Result, StoreError};
pub use memory::{MemoryStore, MemoryTx};
pub use postgres::{PgStore, PgTx};

use wordbank_core::{DailyUsage, IncrementOutcome, UsageKind, UserId, WordId};

/// Resolves catalog words by name.
#[async_trait]
pub trait WordResolver: Send + Sync {
    /// Map each known name to its id. Unknown names are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_ids_by_names(&self, names: &[String]) -> Result<HashMap<String, WordId>>;
}

/// Reads registration state outside any transaction.
#[async_trait]
pub trait RegistrationReader: Send + Sync {
    /// The subset of `word_ids` the user has actively registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn active_word_id_set_by_user(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashSet<WordId>>;

    /// Activation state of every existing registration among `word_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_active_map_by_user_and_word_ids(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>>;

    /// Number of active registrations the user holds.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_active_by_user(&self, user_id: UserId) -> Result<i64>;
}

/// Per-user daily usage counters.
#[async_trait]
pub trait DailyUsageStore: Send + Sync {
    /// Atomically increment `kind` for `today` unless it already reached `cap`.
    ///
    /// Implementations must apply [`DailyUsage::next`] as one indivisible step: two
    /// concurrent calls can never both observe a count below the cap and both succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn increment_or_reject(
        &self,
        user_id: UserId,
        kind: UsageKind,
        today: NaiveDate,
        cap: i32,
        now: DateTime<Utc>,
    ) -> Result<IncrementOutcome>;

    /// The stored usage row, if the user ever used a counted feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn get_daily_usage(&self, user_id: UserId) -> Result<Option<DailyUsage>>;
}

/// Opens registration transactions.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn begin(&self) -> Result<Box<dyn RegistrationTx>>;

    /// Short name of the backend, reported by the health check.
    fn backend(&self) -> &'static str;
}

/// Reads registration state inside an open transaction.
#[async_trait]
pub trait TxRegistrationReader: Send {
    /// Number of active registrations the user holds, including this transaction's writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn count_active_by_user(&mut self, user_id: UserId) -> Result<i64>;

    /// Activation state of every existing registration among `word_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn find_active_map_by_user_and_word_ids(
        &mut self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>>;
}

/// Writes registrations inside an open transaction.
///
/// A failed write leaves the transaction usable for the next write.
#[async_trait]
pub trait RegistrationWriter: Send {
    /// Mark an existing registration active.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no registration exists.
    async fn activate(&mut self, user_id: UserId, word_id: WordId) -> Result<()>;

    /// Create a new active registration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if the registration already exists.
    async fn create_active(&mut self, user_id: UserId, word_id: WordId) -> Result<()>;
}

/// Serializes registration transactions per user.
#[async_trait]
pub trait UserLock: Send {
    /// Wait for and take the user's registration lock for the rest of this transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    async fn lock_user(&mut self, user_id: UserId) -> Result<()>;
}

/// An open registration transaction.
#[async_trait]
pub trait RegistrationTx: TxRegistrationReader + RegistrationWriter + UserLock {
    /// Make every write durable and release the user lock.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TransactionClosed` if already committed, or an error if the
    /// database operation fails.
    async fn commit(&mut self) -> Result<()>;
}

/// Every pool-level capability, for wiring a single backend into the service.
pub trait Store: WordResolver + RegistrationReader + DailyUsageStore + TransactionManager {}

impl<T> Store for T where T: WordResolver + RegistrationReader + DailyUsageStore + TransactionManager
{}
