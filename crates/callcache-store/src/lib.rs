//! # callcache store
//!
//! Key-value store abstraction for callcache. Provides a trait-based
//! interface over Redis-style primitives with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The cache never talks to a concrete backend. It holds a handle to
//! something implementing [`KeyValueStore`], passed in at construction.
//! [`SqliteStore`] persists to disk, [`MemoryStore`] is for tests and
//! short-lived processes.
//!
//! ## Key Types
//!
//! - [`KeyValueStore`] - The trait for all storage primitives
//! - [`StoredValue`] - A string, byte, integer or float value
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage
//!
//! ## Usage
//!
//! ```rust
//! use callcache_store::{KeyValueStore, MemoryStore, StoredValue};
//!
//! let store = MemoryStore::new();
//! store.set("greeting", &StoredValue::from("hello")).unwrap();
//! assert_eq!(store.get("greeting").unwrap().as_deref(), Some(&b"hello"[..]));
//!
//! store.append("log", b"first").unwrap();
//! store.append("log", b"second").unwrap();
//! assert_eq!(store.range("log", 0, -1).unwrap().len(), 2);
//! ```
//!
//! ## Design Notes
//!
//! - **Wire form**: values are persisted as bytes; numbers as decimal text
//! - **Shared keyspace**: scalars and lists live side by side; mixing
//!   primitives on one key is a `WrongType` error
//! - **Atomic primitives**: each call is atomic, nothing spans calls

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;
pub mod value;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{resolve_range, KeyValueStore};
pub use value::{float_text, StoredValue};
