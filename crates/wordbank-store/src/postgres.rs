//! PostgreSQL storage implementation.
//!
//! Daily usage uses one conditional upsert, so the cap check and the increment are a
//! single statement. Registration transactions take `pg_advisory_xact_lock` on a key
//! derived from the user id, and wrap every write in a savepoint so one failed word does
//! not poison the rest of the batch.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use sqlx::{Connection, PgExecutor, Postgres, Transaction};
use uuid::Uuid;

use wordbank_core::{DailyUsage, IncrementOutcome, UsageKind, UserId, WordId};

use crate::error::{Result, StoreError};
use crate::keys::user_lock_key;
use crate::schema::{all_tables, table};
use crate::{
    DailyUsageStore, RegistrationReader, RegistrationTx, RegistrationWriter, TransactionManager,
    TxRegistrationReader, UserLock, WordResolver,
};

#[derive(sqlx::FromRow)]
struct DailyUsageRow {
    user_id: Uuid,
    last_reset_date: NaiveDate,
    quiz_count: i32,
    bulk_count: i32,
    updated_at: DateTime<Utc>,
}

impl From<DailyUsageRow> for DailyUsage {
    fn from(row: DailyUsageRow) -> Self {
        Self {
            user_id: UserId::from_uuid(row.user_id),
            last_reset_date: row.last_reset_date,
            quiz_count: row.quiz_count,
            bulk_count: row.bulk_count,
            updated_at: row.updated_at,
        }
    }
}

const fn count_column(kind: UsageKind) -> &'static str {
    match kind {
        UsageKind::Quiz => "quiz_count",
        UsageKind::Bulk => "bulk_count",
    }
}

fn raw_ids(word_ids: &[WordId]) -> Vec<i64> {
    word_ids.iter().map(|id| id.get()).collect()
}

async fn select_active_map<'e, E>(
    executor: E,
    user_id: UserId,
    word_ids: &[WordId],
) -> Result<HashMap<WordId, bool>>
where
    E: PgExecutor<'e>,
{
    if word_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i64, bool)> = sqlx::query_as(
        "SELECT word_id, is_active FROM registered_words WHERE user_id = $1 AND word_id = ANY($2)",
    )
    .bind(*user_id.as_uuid())
    .bind(raw_ids(word_ids))
    .fetch_all(executor)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, active)| (WordId::new(id), active))
        .collect())
}

async fn select_active_count<'e, E>(executor: E, user_id: UserId) -> Result<i64>
where
    E: PgExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM registered_words WHERE user_id = $1 AND is_active",
    )
    .bind(*user_id.as_uuid())
    .fetch_one(executor)
    .await?;
    Ok(count)
}

/// PostgreSQL storage backend.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a pool to `database_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    /// Check that every table the store uses exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` naming the first missing table.
    pub async fn verify_schema(&self) -> Result<()> {
        for name in all_tables() {
            let exists: bool = sqlx::query_scalar("SELECT to_regclass($1::text) IS NOT NULL")
                .bind(name)
                .fetch_one(&self.pool)
                .await?;
            if !exists {
                return Err(StoreError::NotFound {
                    entity: "table",
                    id: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl WordResolver for PgStore {
    async fn find_ids_by_names(&self, names: &[String]) -> Result<HashMap<String, WordId>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT name, id FROM words WHERE name = ANY($1)")
                .bind(names)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(name, id)| (name, WordId::new(id)))
            .collect())
    }
}

#[async_trait]
impl RegistrationReader for PgStore {
    async fn active_word_id_set_by_user(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashSet<WordId>> {
        if word_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT word_id FROM registered_words \
             WHERE user_id = $1 AND word_id = ANY($2) AND is_active",
        )
        .bind(*user_id.as_uuid())
        .bind(raw_ids(word_ids))
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(WordId::new).collect())
    }

    async fn find_active_map_by_user_and_word_ids(
        &self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>> {
        select_active_map(&self.pool, user_id, word_ids).await
    }

    async fn count_active_by_user(&self, user_id: UserId) -> Result<i64> {
        select_active_count(&self.pool, user_id).await
    }
}

#[async_trait]
impl DailyUsageStore for PgStore {
    async fn increment_or_reject(
        &self,
        user_id: UserId,
        kind: UsageKind,
        today: NaiveDate,
        cap: i32,
        now: DateTime<Utc>,
    ) -> Result<IncrementOutcome> {
        let first = DailyUsage::first(user_id, kind, today, now);
        let column = count_column(kind);

        // A stale row is reset to the fresh counts; a same-day row adds them, which is +1
        // for `kind` and +0 for the other. The WHERE clause rejects a same-day row at cap.
        let sql = format!(
            "INSERT INTO {table} (user_id, last_reset_date, quiz_count, bulk_count, updated_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id) DO UPDATE SET \
                 quiz_count = CASE WHEN {table}.last_reset_date < EXCLUDED.last_reset_date \
                     THEN EXCLUDED.quiz_count ELSE {table}.quiz_count + EXCLUDED.quiz_count END, \
                 bulk_count = CASE WHEN {table}.last_reset_date < EXCLUDED.last_reset_date \
                     THEN EXCLUDED.bulk_count ELSE {table}.bulk_count + EXCLUDED.bulk_count END, \
                 last_reset_date = GREATEST({table}.last_reset_date, EXCLUDED.last_reset_date), \
                 updated_at = EXCLUDED.updated_at \
             WHERE {table}.last_reset_date < EXCLUDED.last_reset_date OR {table}.{column} < $6 \
             RETURNING user_id, last_reset_date, quiz_count, bulk_count, updated_at",
            table = table::DAILY_USAGES,
        );

        let row: Option<DailyUsageRow> = sqlx::query_as(&sql)
            .bind(*user_id.as_uuid())
            .bind(first.last_reset_date)
            .bind(first.quiz_count)
            .bind(first.bulk_count)
            .bind(first.updated_at)
            .bind(cap)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map_or(IncrementOutcome::CapReached, |row| {
            IncrementOutcome::Applied(row.into())
        }))
    }

    async fn get_daily_usage(&self, user_id: UserId) -> Result<Option<DailyUsage>> {
        let row: Option<DailyUsageRow> = sqlx::query_as(
            "SELECT user_id, last_reset_date, quiz_count, bulk_count, updated_at \
             FROM daily_usages WHERE user_id = $1",
        )
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl TransactionManager for PgStore {
    async fn begin(&self) -> Result<Box<dyn RegistrationTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx: Some(tx) }))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

/// An open PostgreSQL registration transaction.
///
/// Dropping it uncommitted rolls the transaction back, which also releases the advisory
/// lock.
pub struct PgTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.tx.as_deref_mut().ok_or(StoreError::TransactionClosed)
    }
}

#[async_trait]
impl TxRegistrationReader for PgTx {
    async fn count_active_by_user(&mut self, user_id: UserId) -> Result<i64> {
        select_active_count(self.conn()?, user_id).await
    }

    async fn find_active_map_by_user_and_word_ids(
        &mut self,
        user_id: UserId,
        word_ids: &[WordId],
    ) -> Result<HashMap<WordId, bool>> {
        select_active_map(self.conn()?, user_id, word_ids).await
    }
}

#[async_trait]
impl RegistrationWriter for PgTx {
    async fn activate(&mut self, user_id: UserId, word_id: WordId) -> Result<()> {
        let mut savepoint = self.conn()?.begin().await?;

        let result = sqlx::query(
            "UPDATE registered_words SET is_active = TRUE, updated_at = now() \
             WHERE user_id = $1 AND word_id = $2",
        )
        .bind(*user_id.as_uuid())
        .bind(word_id.get())
        .execute(&mut *savepoint)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                savepoint.commit().await?;
                Ok(())
            }
            Ok(_) => {
                savepoint.rollback().await?;
                Err(StoreError::NotFound {
                    entity: "registration",
                    id: format!("{user_id}/{word_id}"),
                })
            }
            Err(err) => {
                savepoint.rollback().await?;
                Err(err.into())
            }
        }
    }

    async fn create_active(&mut self, user_id: UserId, word_id: WordId) -> Result<()> {
        let mut savepoint = self.conn()?.begin().await?;

        let result = sqlx::query(
            "INSERT INTO registered_words \
                 (user_id, word_id, is_active, attempt_count, correct_count, created_at, updated_at) \
             VALUES ($1, $2, TRUE, 0, 0, now(), now())",
        )
        .bind(*user_id.as_uuid())
        .bind(word_id.get())
        .execute(&mut *savepoint)
        .await;

        match result {
            Ok(_) => {
                savepoint.commit().await?;
                Ok(())
            }
            Err(err) => {
                savepoint.rollback().await?;
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl UserLock for PgTx {
    async fn lock_user(&mut self, user_id: UserId) -> Result<()> {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_lock_key(&user_id))
            .execute(self.conn()?)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RegistrationTx for PgTx {
    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StoreError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }
}
