//! SQLite implementation of the KeyValueStore trait.
//!
//! Durable backend for the cache. Uses rusqlite with bundled SQLite; the
//! connection sits behind a mutex, so each primitive runs alone.

use std::path::Path;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, StoreError};
use crate::memory::parse_counter;
use crate::migration;
use crate::traits::{resolve_range, KeyValueStore};
use crate::value::StoredValue;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::poisoned("sqlite connection", e))?;
        f(&conn)
    }

    /// Execute an operation inside a transaction.
    fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::poisoned("sqlite connection", e))?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }
}

fn scalar(conn: &Connection, key: &str) -> Result<Option<Vec<u8>>> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
    .map_err(StoreError::from)
}

fn list_len(conn: &Connection, key: &str) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM list_items WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )?;
    usize::try_from(count).map_err(|_| StoreError::InvalidData(format!("list length {}", count)))
}

fn ensure_not_list(conn: &Connection, key: &str) -> Result<()> {
    if list_len(conn, key)? > 0 {
        return Err(StoreError::WrongType {
            key: key.to_owned(),
            expected: "scalar",
        });
    }
    Ok(())
}

fn ensure_not_scalar(conn: &Connection, key: &str) -> Result<()> {
    if scalar(conn, key)?.is_some() {
        return Err(StoreError::WrongType {
            key: key.to_owned(),
            expected: "list",
        });
    }
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn set(&self, key: &str, value: &StoredValue) -> Result<()> {
        let bytes = value.to_bytes();
        self.with_tx(|conn| {
            conn.execute("DELETE FROM list_items WHERE key = ?1", params![key])?;
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, bytes.as_ref()],
            )?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.with_conn(|conn| match scalar(conn, key)? {
            Some(value) => Ok(Some(Bytes::from(value))),
            None => {
                ensure_not_list(conn, key)?;
                Ok(None)
            }
        })
    }

    fn incr(&self, key: &str) -> Result<i64> {
        self.with_tx(|conn| {
            ensure_not_list(conn, key)?;

            let current = match scalar(conn, key)? {
                Some(bytes) => parse_counter(key, &bytes)?,
                None => 0,
            };
            let next = current
                .checked_add(1)
                .ok_or_else(|| StoreError::Overflow(key.to_owned()))?;

            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, next.to_string().as_bytes()],
            )?;

            Ok(next)
        })
    }

    fn append(&self, key: &str, value: &[u8]) -> Result<usize> {
        self.with_tx(|conn| {
            ensure_not_scalar(conn, key)?;

            let position = list_len(conn, key)?;
            conn.execute(
                "INSERT INTO list_items (key, position, value) VALUES (?1, ?2, ?3)",
                params![key, position as i64, value],
            )?;

            Ok(position + 1)
        })
    }

    fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        self.with_conn(|conn| {
            ensure_not_scalar(conn, key)?;

            let Some(window) = resolve_range(list_len(conn, key)?, start, end) else {
                return Ok(Vec::new());
            };

            let mut stmt = conn.prepare(
                "SELECT value FROM list_items
                 WHERE key = ?1 AND position >= ?2 AND position < ?3
                 ORDER BY position",
            )?;

            let items = stmt
                .query_map(
                    params![key, window.start as i64, window.end as i64],
                    |row| row.get::<_, Vec<u8>>(0),
                )?
                .map(|r| r.map(Bytes::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(items)
        })
    }

    fn clear(&self) -> Result<()> {
        self.with_tx(|conn| {
            conn.execute("DELETE FROM kv", [])?;
            conn.execute("DELETE FROM list_items", [])?;
            Ok(())
        })
    }
}
