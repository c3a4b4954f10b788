//! Error types for wordbank storage.

use wordbank_core::WordbankError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Key that was looked up.
        id: String,
    },

    /// A record with the same unique key already exists.
    #[error("{entity} already exists: {id}")]
    Conflict {
        /// Kind of record.
        entity: &'static str,
        /// Key that collided.
        id: String,
    },

    /// The transaction was already committed.
    #[error("transaction already finished")]
    TransactionClosed,
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        Self::Database("in-memory lock poisoned".into())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Conflict {
                    entity: "registration",
                    id: db.constraint().unwrap_or("unique").to_string(),
                };
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Database(format!("migration failed: {err}"))
    }
}

impl From<StoreError> for WordbankError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
