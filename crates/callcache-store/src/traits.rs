//! KeyValueStore trait: the interface the cache needs from its backing store.
//!
//! The primitives mirror a Redis-style server (SET, GET, INCR, RPUSH,
//! LRANGE, FLUSHDB). Implementations include SQLite and in-memory.

use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::value::StoredValue;

/// Synchronous key-value store.
///
/// Every method is a single atomic step from the caller's point of view.
/// Callers never combine several calls into a transaction; if they need
/// ordering across calls they get whatever the store serializes to.
///
/// # Design Notes
///
/// - Scalars and lists share one keyspace. Using a list primitive on a
///   scalar key (or the reverse) fails with `WrongType`.
/// - Counters are plain scalars holding decimal text, so `get` on a
///   counter key returns its current value.
pub trait KeyValueStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Scalar Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Write `value` under `key`, replacing whatever was there.
    fn set(&self, key: &str, value: &StoredValue) -> Result<()>;

    /// Read the raw bytes under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Increment the integer counter under `key` by one.
    ///
    /// An absent counter starts at zero. Returns the new value.
    fn incr(&self, key: &str) -> Result<i64>;

    // ─────────────────────────────────────────────────────────────────────────
    // List Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Append `value` to the end of the list under `key`.
    ///
    /// Creates the list if absent. Returns the new length.
    fn append(&self, key: &str, value: &[u8]) -> Result<usize>;

    /// Read the inclusive range `start..=end` of the list under `key`.
    ///
    /// Negative indices count from the end (`-1` is the last element).
    /// Out-of-range bounds are clamped; an absent list is empty.
    fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Remove every key, counter and list.
    fn clear(&self) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn set(&self, key: &str, value: &StoredValue) -> Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        (**self).get(key)
    }

    fn incr(&self, key: &str) -> Result<i64> {
        (**self).incr(key)
    }

    fn append(&self, key: &str, value: &[u8]) -> Result<usize> {
        (**self).append(key, value)
    }

    fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        (**self).range(key, start, end)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Resolve LRANGE-style inclusive bounds against a list of `len` items.
///
/// Returns the half-open index range to read, or `None` if it is empty.
pub fn resolve_range(len: usize, start: i64, end: i64) -> Option<Range<usize>> {
    let len = i64::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if start >= len || end < start {
        return None;
    }

    Some(start as usize..end as usize + 1)
}
