//! # callcache
//!
//! An instrumented cache over a key-value store: values go in under opaque
//! keys, and every write is counted and recorded so its history can be
//! replayed later.
//!
//! ## Overview
//!
//! - **Cache**: `store` a string, bytes, integer or float and get back a
//!   fresh [`CacheKey`]; `retrieve` it later as raw bytes, text or integer
//! - **Instrumentation**: [`CountCalls`] and [`RecordHistory`] wrap any
//!   [`Operation`] whose receiver is [`Instrumentable`]
//! - **Replay**: [`Replay`] renders an operation's recorded calls
//!
//! ## Store layout
//!
//! For an operation named `Cache.store` the store holds:
//!
//! - `Cache.store`: the call counter
//! - `Cache.store:inputs`: argument tuples, one per call, e.g. `('foo',)`
//! - `Cache.store:outputs`: results, one per call
//!
//! ## Usage
//!
//! ```rust
//! use callcache::{Cache, STORE_OPERATION};
//! use callcache::store::MemoryStore;
//!
//! let cache = Cache::new(MemoryStore::new()).unwrap();
//!
//! let key = cache.store("hello").unwrap();
//! assert_eq!(cache.retrieve_string(&key).unwrap().as_deref(), Some("hello"));
//!
//! let key = cache.store(42).unwrap();
//! assert_eq!(cache.retrieve_int(&key).unwrap(), Some(42));
//!
//! let replay = cache.replay(&STORE_OPERATION).unwrap();
//! for line in replay.lines() {
//!     println!("{}", line);
//! }
//! ```
//!
//! ## Caveats
//!
//! - Opening a [`Cache`] clears the entire store, including state written
//!   by other caches sharing it (see [`CacheConfig::flush_on_open`]).
//! - A call is counted before it runs and stays counted if it fails.

pub mod cache;
pub mod error;
pub mod instrument;
pub mod key;
pub mod replay;
pub mod repr;

// Re-export the store crate
pub use callcache_store as store;

pub use cache::{Cache, CacheConfig, STORE_OPERATION};
pub use error::{CacheError, Result, SerializationError};
pub use instrument::{
    instrument, CountCalls, FnOperation, Instrumentable, Instrumented, Operation, OperationName,
    RecordHistory,
};
pub use key::CacheKey;
pub use replay::{Replay, ReplayEntry};
pub use repr::{CallArgs, LogOutput, LogRepr};
