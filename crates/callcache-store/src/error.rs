//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store cannot be reached or its handle is unusable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Operation against a key holding the wrong kind of value.
    #[error("wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// `incr` on a value that is not a base-10 integer.
    #[error("value at {0} is not an integer")]
    NotAnInteger(String),

    /// Counter would overflow.
    #[error("increment would overflow counter {0}")]
    Overflow(String),

    /// Database error from SQLite.
    ///
    /// Failures to open or lock the database surface as `Unavailable`
    /// instead.
    #[error("database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub(crate) fn poisoned(what: &str, e: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(format!("{} lock poisoned: {}", what, e))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::DatabaseBusy
                | rusqlite::ErrorCode::DatabaseLocked,
            ) => StoreError::Unavailable(format!("sqlite: {}", e)),
            _ => StoreError::Database(e),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
