//! In-memory implementation of the KeyValueStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{resolve_range, KeyValueStore};
use crate::value::StoredValue;

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock;
/// every primitive holds the lock for its whole duration, so `incr` and
/// `append` are atomic.
pub struct MemoryStore {
    inner: RwLock<HashMap<String, Entry>>,
}

/// What a key holds.
#[derive(Debug, Clone)]
enum Entry {
    Scalar(Bytes),
    List(Vec<Bytes>),
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently held.
    pub fn len(&self) -> Result<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::poisoned("memory store", e))?;
        Ok(inner.len())
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn wrong_type(key: &str, expected: &'static str) -> StoreError {
    StoreError::WrongType {
        key: key.to_owned(),
        expected,
    }
}

impl KeyValueStore for MemoryStore {
    fn set(&self, key: &str, value: &StoredValue) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::poisoned("memory store", e))?;
        inner.insert(key.to_owned(), Entry::Scalar(value.to_bytes()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::poisoned("memory store", e))?;

        match inner.get(key) {
            None => Ok(None),
            Some(Entry::Scalar(bytes)) => Ok(Some(bytes.clone())),
            Some(Entry::List(_)) => Err(wrong_type(key, "scalar")),
        }
    }

    fn incr(&self, key: &str) -> Result<i64> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::poisoned("memory store", e))?;

        let current = match inner.get(key) {
            None => 0,
            Some(Entry::Scalar(bytes)) => parse_counter(key, bytes)?,
            Some(Entry::List(_)) => return Err(wrong_type(key, "scalar")),
        };

        let next = current
            .checked_add(1)
            .ok_or_else(|| StoreError::Overflow(key.to_owned()))?;
        inner.insert(key.to_owned(), Entry::Scalar(Bytes::from(next.to_string())));

        Ok(next)
    }

    fn append(&self, key: &str, value: &[u8]) -> Result<usize> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::poisoned("memory store", e))?;

        let entry = inner
            .entry(key.to_owned())
            .or_insert_with(|| Entry::List(Vec::new()));

        match entry {
            Entry::List(items) => {
                items.push(Bytes::copy_from_slice(value));
                Ok(items.len())
            }
            Entry::Scalar(_) => Err(wrong_type(key, "list")),
        }
    }

    fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StoreError::poisoned("memory store", e))?;

        match inner.get(key) {
            None => Ok(Vec::new()),
            Some(Entry::List(items)) => Ok(resolve_range(items.len(), start, end)
                .map(|r| items[r].to_vec())
                .unwrap_or_default()),
            Some(Entry::Scalar(_)) => Err(wrong_type(key, "list")),
        }
    }

    fn clear(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::poisoned("memory store", e))?;
        inner.clear();
        Ok(())
    }
}

/// Parse a stored counter value.
pub(crate) fn parse_counter(key: &str, bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| StoreError::NotAnInteger(key.to_owned()))
}
