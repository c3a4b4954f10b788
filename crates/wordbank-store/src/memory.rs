//! In-memory storage implementation.
//!
//! This module provides `MemoryStore`, which keeps the catalog, registrations and daily
//! usage rows in process-local maps. Transactions stage their writes privately and
//! publish them under a single write lock on commit; the per-user lock is a keyed
//! registry of async mutexes whose owned guards live inside the transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::OwnedMutexGuard;

use wordbank_core::{DailyUsage, IncrementOutcome, RegisteredWord, UsageKind, UserId, WordId};

use crate::error::{Result, StoreError};
use crate::{
    DailyUsageStore, RegistrationReader, RegistrationTx, RegistrationWriter, TransactionManager,
    TxRegistrationReader, UserLock, WordResolver,
};

type RegistrationKey = (UserId, WordId);

#[derive(Default)]
struct Inner {
    words: RwLock<HashMap<String, WordId>>,
    next_word_id: AtomicI64,
    registrations: RwLock<HashMap<RegistrationKey, RegisteredWord>>,
    usages: Mutex<HashMap<UserId, DailyUsage>>,
    user_locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

impl Inner {
    fn user_lock(&self, user_id: UserId) -> Result<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self.user_locks.lock().map_err(|_| StoreError::poisoned())?;
        // An entry referenced only by the registry is neither held nor awaited.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(Arc::clone(locks.entry(user_id).or_default()))
    }

    fn registration(&self, key: &RegistrationKey) -> Result<Option<RegisteredWord>> {
        let registrations = self.registrations.read().map_err(|_| StoreError::poisoned())?;
        Ok(registrations.get(key).cloned())
    }
}

/// In-memory storage backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog word, returning its id. Adding an existing name returns the existing id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn insert_word(&self, name: &str) -> Result<WordId> {
        let mut words = self.inner.words.write().map_err(|_| StoreError::poisoned())?;
        let id = words
            .entry(name.to_string())
            .or_insert_with(|| WordId::new(self.inner.next_word_id.fetch_add(1, Ordering::Relaxed) + 1));
        Ok(*id)
    }

    /// Insert or replace a registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn put_registration(&self, registration: RegisteredWord) -> Result<()> {
        let mut registrations = self
            .inner
            .registrations
            .write()
            .map_err(|_| StoreError::poisoned())?;
        registrations.insert((registration.user_id, registration.word_id), registration);
        Ok(())
    }

    /// Get a committed registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn get_registration(
        &self,
        user_id: UserId,
        word_id: WordId,
    ) -> Result<Option<RegisteredWord>> {
        self.inner.registration(&(user_id, word_id))
    }

    /// Insert or replace a daily usage row.
    ///
    /// # Errors
    ///
    /// Returns an error if the store's lock is poisoned.
    pub fn put_daily_usage(&self, usage: DailyUsage) -> Result<()> {
        let mut usages = self.inner.usages.lock().map_err(|_| StoreError::poisoned())?;
        usages.insert(usage.user_id, usage);
        Ok(())
    }
}

#[async_trait]
impl WordResolver for MemoryStore {
    async fn find_ids_by_names(&self, names: &[String]) -> Result<HashMap<String, WordId>> {
        let words = self.inner.words.read().map_err(|_| StoreError::poisoned())?;
        Ok(names
            .iter()
            .filter_map(|name| words.get(name).map(|id| (name.clone(), *id)))
            .collect())
    }
}

#[async_trait]
impl RegistrationReader for MemoryStore {
    async fn active_word_id_set_by_user(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashSet<WordId>> {
        let registrations = self
            .inner
            .registrations
            .read()
            .map_err(|_| StoreError::poisoned())?;
        Ok(word_ids
            .iter()
            .filter(|id| {
                registrations
                    .get(&(user_id, **id))
                    .is_some_and(|row| row.is_active)
            })
            .copied()
            .collect())
    }

    async fn find_active_map_by_user_and_word_ids(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>> {
        let registrations = self
            .inner
            .registrations
            .read()
            .map_err(|_| StoreError::poisoned())?;
        Ok(word_ids
            .iter()
            .filter_map(|id| {
                registrations
                    .get(&(user_id, *id))
                    .map(|row| (*id, row.is_active))
            })
            .collect())
    }

    async fn count_active_by_user(&self, user_id: UserId) -> Result<i64> {
        let registrations = self
            .inner
            .registrations
            .read()
            .map_err(|_| StoreError::poisoned())?;
        let count = registrations
            .values()
            .filter(|row| row.user_id == user_id && row.is_active)
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl DailyUsageStore for MemoryStore {
    async fn increment_or_reject(
        &self,
        user_id: UserId,
        kind: UsageKind,
        today: NaiveDate,
        cap: i32,
        now: DateTime<Utc>,
    ) -> Result<IncrementOutcome> {
        let mut usages = self.inner.usages.lock().map_err(|_| StoreError::poisoned())?;
        let outcome = DailyUsage::next(usages.get(&user_id), user_id, kind, today, cap, now);
        if let IncrementOutcome::Applied(usage) = &outcome {
            usages.insert(user_id, usage.clone());
        }
        Ok(outcome)
    }

    async fn get_daily_usage(&self, user_id: UserId) -> Result<Option<DailyUsage>> {
        let usages = self.inner.usages.lock().map_err(|_| StoreError::poisoned())?;
        Ok(usages.get(&user_id).cloned())
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn RegistrationTx>> {
        Ok(Box::new(MemoryTx {
            inner: Arc::clone(&self.inner),
            locks: HashMap::new(),
            staged: HashMap::new(),
            finished: false,
        }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// An open in-memory registration transaction.
///
/// Writes are invisible to other readers until [`RegistrationTx::commit`]. Dropping the
/// transaction discards them and releases any user lock it holds.
pub struct MemoryTx {
    inner: Arc<Inner>,
    locks: HashMap<UserId, OwnedMutexGuard<()>>,
    staged: HashMap<RegistrationKey, RegisteredWord>,
    finished: bool,
}

impl MemoryTx {
    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(StoreError::TransactionClosed);
        }
        Ok(())
    }

    fn lookup(&self, key: &RegistrationKey) -> Result<Option<RegisteredWord>> {
        match self.staged.get(key) {
            Some(row) => Ok(Some(row.clone())),
            None => self.inner.registration(key),
        }
    }
}

#[async_trait]
impl TxRegistrationReader for MemoryTx {
    async fn count_active_by_user(&mut self, user_id: UserId) -> Result<i64> {
        self.ensure_open()?;
        let registrations = self
            .inner
            .registrations
            .read()
            .map_err(|_| StoreError::poisoned())?;

        let committed = registrations
            .iter()
            .filter(|(key, row)| key.0 == user_id && row.is_active && !self.staged.contains_key(*key))
            .count();
        let staged = self
            .staged
            .iter()
            .filter(|(key, row)| key.0 == user_id && row.is_active)
            .count();

        Ok(i64::try_from(committed + staged).unwrap_or(i64::MAX))
    }

    async fn find_active_map_by_user_and_word_ids(
        &mut self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>> {
        self.ensure_open()?;
        let mut map = HashMap::with_capacity(word_ids.len());
        for word_id in word_ids {
            if let Some(row) = self.lookup(&(user_id, *word_id))? {
                map.insert(*word_id, row.is_active);
            }
        }
        Ok(map)
    }
}

#[async_trait]
impl RegistrationWriter for MemoryTx {
    async fn activate(&mut self, user_id: UserId, word_id: WordId) -> Result<()> {
        self.ensure_open()?;
        let key = (user_id, word_id);
        let row = self.lookup(&key)?.ok_or_else(|| StoreError::NotFound {
            entity: "registration",
            id: format!("{user_id}/{word_id}"),
        })?;
        self.staged.insert(key, row.with_active(true, Utc::now()));
        Ok(())
    }

    async fn create_active(&mut self, user_id: UserId, word_id: WordId) -> Result<()> {
        self.ensure_open()?;
        let key = (user_id, word_id);
        if self.lookup(&key)?.is_some() {
            return Err(StoreError::Conflict {
                entity: "registration",
                id: format!("{user_id}/{word_id}"),
            });
        }
        self.staged
            .insert(key, RegisteredWord::active(user_id, word_id, Utc::now()));
        Ok(())
    }
}

#[async_trait]
impl UserLock for MemoryTx {
    async fn lock_user(&mut self, user_id: UserId) -> Result<()> {
        self.ensure_open()?;
        if self.locks.contains_key(&user_id) {
            return Ok(());
        }
        let lock = self.inner.user_lock(user_id)?;
        let guard = lock.lock_owned().await;
        self.locks.insert(user_id, guard);
        Ok(())
    }
}

#[async_trait]
impl RegistrationTx for MemoryTx {
    async fn commit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let writes = self.staged.len();
        {
            let mut registrations = self
                .inner
                .registrations
                .write()
                .map_err(|_| StoreError::poisoned())?;
            registrations.extend(self.staged.drain());
        }
        self.finished = true;
        self.locks.clear();

        tracing::debug!(writes, "Committed in-memory registration transaction");
        Ok(())
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if !self.finished && !self.staged.is_empty() {
            tracing::debug!(
                discarded = self.staged.len(),
                "Rolled back in-memory registration transaction"
            );
        }
    }
}
