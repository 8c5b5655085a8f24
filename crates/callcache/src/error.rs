//! Error types for the cache.

use callcache_store::StoreError;
use thiserror::Error;

/// Failure to render a call's arguments or result into the history log.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// NaN and the infinities have no literal form in the log.
    #[error("cannot render non-finite float {0} into the history log")]
    NonFiniteFloat(f64),

    /// Raised by caller-defined renderings.
    #[error("{0}")]
    Custom(String),
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Storage error, including an unreachable store.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// History rendering failed after the operation itself completed.
    #[error("serialization error: {0}")]
    Serialization(#[from] SerializationError),

    /// A stored value could not be decoded as the requested type.
    #[error("cannot decode value at {key} as {target}: {reason}")]
    Decode {
        key: String,
        target: &'static str,
        reason: String,
    },
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
