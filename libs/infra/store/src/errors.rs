// [libs/infra/store/src/errors.rs]
//! Failure catalog for the store adapter, bracket-tagged by failure
//! domain, with the transient/fatal split the Store Gate's retry policy
//! depends on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("[L3_DB_NET_FAULT]: database uplink severed -> {0}")]
    ConnectionError(String),

    #[error("[L3_DB_CONFIG_FAULT]: store configuration void -> {0}")]
    ConfigurationError(String),

    #[error("[L3_DB_QUERY_FAULT]: sql query rejected -> {0}")]
    QueryError(#[from] libsql::Error),

    #[error("[L3_DB_MAPPING_FAULT]: row-to-domain mapping violation -> {0}")]
    MappingError(String),

    /// Transient contention (SQLITE_BUSY / SQLITE_LOCKED equivalents).
    /// Retried by the Store Gate up to its attempt budget.
    #[error("[L3_DB_BUSY]: store contended -> {0}")]
    Busy(String),

    /// Exhausted the retry budget, or a non-transient failure. The caller
    /// drops the current batch/evaluation and logs; it never surfaces
    /// further up.
    #[error("[L3_DB_FATAL]: store write failed permanently -> {0}")]
    Fatal(String),

    #[error("[L3_STORE_FAULT]: requested row not found")]
    NotFound,
}

impl StoreError {
    /// Classifies a raw libsql error as transient-retryable or fatal,
    /// based on the SQLite error text libsql surfaces (no structured
    /// error code is exposed across libsql's local/remote backends).
    pub fn from_libsql(error: libsql::Error) -> Self {
        let message = error.to_string();
        let lower = message.to_lowercase();
        if lower.contains("database is locked") || lower.contains("busy") {
            StoreError::Busy(message)
        } else {
            StoreError::QueryError(error)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_))
    }
}
