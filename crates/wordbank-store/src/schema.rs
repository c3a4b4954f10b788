//! Database schema definitions.
//!
//! Table names used by the PostgreSQL backend. The DDL lives in `migrations/`.

/// Table names for the relational database.
pub mod table {
    /// Word catalog, keyed by `id`, unique on `name`. Read-only for this workspace.
    pub const WORDS: &str = "words";

    /// Per-user registrations, unique on `(user_id, word_id)`.
    pub const REGISTERED_WORDS: &str = "registered_words";

    /// Per-user daily usage counters, keyed by `user_id`.
    pub const DAILY_USAGES: &str = "daily_usages";
}

/// Returns all table names in creation order.
#[must_use]
pub fn all_tables() -> Vec<&'static str> {
    vec![table::WORDS, table::REGISTERED_WORDS, table::DAILY_USAGES]
}
