//! # callcache testkit
//!
//! Testing utilities for callcache.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a cache on a shared memory store, with helpers to read
//!   counters and history logs directly
//! - **Faulty store**: a store whose primitives fail on demand
//! - **Generators**: Proptest strategies for property-based testing
//!
//! ## Test Fixtures
//!
//! ```rust
//! use callcache::STORE_OPERATION;
//! use callcache_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.cache.store("hello").unwrap();
//! assert_eq!(fixture.counter(&STORE_OPERATION), 1);
//! ```
//!
//! ## Fault Injection
//!
//! ```rust
//! use callcache::{Cache, STORE_OPERATION};
//! use callcache_testkit::{Fault, FaultyStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(FaultyStore::new());
//! let cache = Cache::new(Arc::clone(&store)).unwrap();
//!
//! store.inject(Fault::Set);
//! assert!(cache.store("lost").is_err());
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use callcache_testkit::generators::stored_value;
//!
//! proptest! {
//!     #[test]
//!     fn stored_values_come_back(value in stored_value()) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{counter, list_text, Fault, FaultyStore, TestFixture};
pub use generators::{operation_name, stored_value};
