//! The Cache: instrumented storage of opaque values.
//!
//! `store` is counted and recorded; reads are not. Histories can be
//! replayed later through [`Cache::replay`].

use std::sync::Arc;

use bytes::Bytes;
use callcache_store::{KeyValueStore, StoredValue};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};
use crate::instrument::{instrument, Instrumentable, Instrumented, Operation, OperationName};
use crate::key::CacheKey;
use crate::replay::Replay;

/// Qualified name under which `Cache::store` is counted and recorded.
pub const STORE_OPERATION: OperationName = OperationName::from_static("Cache.store");

/// Configuration for the Cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Wipe the whole store when the cache is opened.
    ///
    /// This clears every key, counter and history in the store, including
    /// those written by other caches sharing it.
    pub flush_on_open: bool,
    /// Count and record calls to `store`.
    pub instrument: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            flush_on_open: true,
            instrument: true,
        }
    }
}

/// Writes a value under a freshly generated key.
#[derive(Debug, Clone)]
struct PersistValue {
    name: OperationName,
}

impl<S: KeyValueStore> Operation<Cache<S>> for PersistValue {
    type Args = (StoredValue,);
    type Output = CacheKey;

    fn name(&self) -> &OperationName {
        &self.name
    }

    fn call(&self, cache: &Cache<S>, (value,): &(StoredValue,)) -> Result<CacheKey> {
        let key = CacheKey::generate();
        cache.store.set(key.as_str(), value)?;
        Ok(key)
    }
}

/// The main Cache struct.
///
/// Provides:
/// - `store`: persist a value under a new key (counted and recorded)
/// - `retrieve` and its typed variants: read a value back (not recorded)
/// - `replay`: read back the recorded history of an operation
pub struct Cache<S: KeyValueStore> {
    /// The storage backend.
    store: Arc<S>,
    /// Configuration.
    config: CacheConfig,
    /// `store`, wrapped with counting and history.
    persist: Instrumented<PersistValue>,
}

impl<S: KeyValueStore> Cache<S> {
    /// Open a cache on `store` with the default configuration.
    ///
    /// The whole store is cleared first. Do not open a cache on a store
    /// that another live cache is using.
    pub fn new(store: S) -> Result<Self> {
        Self::with_config(store, CacheConfig::default())
    }

    /// Open a cache on `store` with an explicit configuration.
    pub fn with_config(store: S, config: CacheConfig) -> Result<Self> {
        if config.flush_on_open {
            store.clear()?;
            tracing::debug!("flushed store on cache open");
        }

        Ok(Self {
            store: Arc::new(store),
            config,
            persist: instrument(PersistValue {
                name: STORE_OPERATION,
            }),
        })
    }

    /// Get the store reference.
    pub fn store_handle(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Qualified name of the `store` operation.
    pub fn store_operation(&self) -> &OperationName {
        Operation::<Self>::name(&self.persist)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist `data` under a new key and return the key.
    ///
    /// The call is counted before the value is written, and recorded in
    /// the history after. A history failure is reported as an error even
    /// though the value was written.
    pub fn store(&self, data: impl Into<StoredValue>) -> Result<CacheKey> {
        let value: StoredValue = data.into();
        self.persist.call(self, &(value,))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Raw bytes under `key`, or `None` if absent.
    pub fn retrieve(&self, key: impl AsRef<str>) -> Result<Option<Bytes>> {
        Ok(self.store.get(key.as_ref())?)
    }

    /// Read `key` and pass the raw value to `decode`.
    ///
    /// `decode` also sees absent values and must handle `None` itself.
    pub fn retrieve_with<V, F>(&self, key: impl AsRef<str>, decode: F) -> Result<V>
    where
        F: FnOnce(Option<Bytes>) -> V,
    {
        let raw = self.retrieve(key)?;
        Ok(decode(raw))
    }

    /// Read `key` as UTF-8 text.
    pub fn retrieve_string(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        let key = key.as_ref();
        let Some(raw) = self.retrieve(key)? else {
            return Ok(None);
        };

        String::from_utf8(raw.to_vec())
            .map(Some)
            .map_err(|e| CacheError::Decode {
                key: key.to_owned(),
                target: "string",
                reason: e.to_string(),
            })
    }

    /// Read `key` as a base-10 integer.
    pub fn retrieve_int(&self, key: impl AsRef<str>) -> Result<Option<i64>> {
        let key = key.as_ref();
        let Some(raw) = self.retrieve(key)? else {
            return Ok(None);
        };

        let decode_err = |reason: String| CacheError::Decode {
            key: key.to_owned(),
            target: "integer",
            reason,
        };
        let text = std::str::from_utf8(&raw).map_err(|e| decode_err(e.to_string()))?;
        text.trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| decode_err(e.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the recorded history of `name` from this cache's store.
    pub fn replay(&self, name: &OperationName) -> Result<Replay> {
        Replay::load(&*self.store, name)
    }
}

impl<S: KeyValueStore> Instrumentable for Cache<S> {
    fn instrumentation_store(&self) -> Option<&dyn KeyValueStore> {
        if self.config.instrument {
            Some(self.store.as_ref() as &dyn KeyValueStore)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callcache_store::{MemoryStore, SqliteStore};

    fn counter(cache: &Cache<impl KeyValueStore>) -> Option<i64> {
        cache.retrieve_int(STORE_OPERATION.counter_key()).unwrap()
    }

    fn history(cache: &Cache<impl KeyValueStore>, key: &str) -> Vec<String> {
        cache
            .store_handle()
            .range(key, 0, -1)
            .unwrap()
            .into_iter()
            .map(|b| String::from_utf8(b.to_vec()).unwrap())
            .collect()
    }

    #[test]
    fn test_store_and_retrieve_each_kind() {
        let cache = Cache::new(MemoryStore::new()).unwrap();

        let k = cache.store("hello").unwrap();
        assert_eq!(cache.retrieve_string(&k).unwrap().as_deref(), Some("hello"));

        let k = cache.store(b"\x00\xffraw").unwrap();
        assert_eq!(
            cache.retrieve(&k).unwrap(),
            Some(Bytes::from_static(b"\x00\xffraw"))
        );

        let k = cache.store(42).unwrap();
        assert_eq!(cache.retrieve_int(&k).unwrap(), Some(42));

        let k = cache.store(-3.25).unwrap();
        let f = cache
            .retrieve_with(&k, |raw| {
                raw.and_then(|b| std::str::from_utf8(&b).ok()?.parse::<f64>().ok())
            })
            .unwrap();
        assert_eq!(f, Some(-3.25));
    }

    #[test]
    fn test_same_content_gets_new_key() {
        let cache = Cache::new(MemoryStore::new()).unwrap();
        let a = cache.store("dup").unwrap();
        let b = cache.store("dup").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_missing_key() {
        let cache = Cache::new(MemoryStore::new()).unwrap();
        let never = CacheKey::generate();

        assert_eq!(cache.retrieve(&never).unwrap(), None);
        assert_eq!(cache.retrieve_string(&never).unwrap(), None);
        assert_eq!(cache.retrieve_int(&never).unwrap(), None);

        // The decode function sees the absent value as-is.
        let seen = cache.retrieve_with(&never, |raw| raw.is_none()).unwrap();
        assert!(seen);
    }

    #[test]
    fn test_retrieve_does_not_count() {
        let cache = Cache::new(MemoryStore::new()).unwrap();
        let k = cache.store("x").unwrap();

        cache.retrieve(&k).unwrap();
        cache.retrieve_string(&k).unwrap();

        assert_eq!(counter(&cache), Some(1));
        assert_eq!(history(&cache, "Cache.store:inputs").len(), 1);
    }

    #[test]
    fn test_decode_errors() {
        let cache = Cache::new(MemoryStore::new()).unwrap();

        let k = cache.store("not a number").unwrap();
        assert!(matches!(
            cache.retrieve_int(&k).unwrap_err(),
            CacheError::Decode { target: "integer", .. }
        ));

        let k = cache.store(vec![0xffu8, 0xfe]).unwrap();
        assert!(matches!(
            cache.retrieve_string(&k).unwrap_err(),
            CacheError::Decode { target: "string", .. }
        ));
    }

    #[test]
    fn test_store_records_history() {
        let cache = Cache::new(MemoryStore::new()).unwrap();
        let k1 = cache.store("foo").unwrap();
        let k2 = cache.store(7).unwrap();

        assert_eq!(counter(&cache), Some(2));
        assert_eq!(history(&cache, "Cache.store:inputs"), vec!["('foo',)", "(7,)"]);
        assert_eq!(
            history(&cache, "Cache.store:outputs"),
            vec![k1.to_string(), k2.to_string()]
        );
    }

    #[test]
    fn test_non_finite_float_is_stored_but_not_recorded() {
        let cache = Cache::new(MemoryStore::new()).unwrap();

        let err = cache.store(f64::NAN).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));

        assert_eq!(counter(&cache), Some(1));
        assert!(history(&cache, "Cache.store:inputs").is_empty());
        assert!(history(&cache, "Cache.store:outputs").is_empty());
    }

    #[test]
    fn test_open_flushes_store() {
        let store = Arc::new(MemoryStore::new());
        let first = Cache::new(Arc::clone(&store)).unwrap();
        let k = first.store("gone").unwrap();

        let second = Cache::new(Arc::clone(&store)).unwrap();
        assert_eq!(second.retrieve(&k).unwrap(), None);
        // The first cache shares the store and sees the wipe too.
        assert_eq!(first.retrieve(&k).unwrap(), None);
        assert_eq!(counter(&first), None);
    }

    #[test]
    fn test_config_keeps_existing_data() {
        let store = Arc::new(MemoryStore::new());
        let first = Cache::new(Arc::clone(&store)).unwrap();
        let k = first.store("kept").unwrap();

        let config = CacheConfig {
            flush_on_open: false,
            ..CacheConfig::default()
        };
        let second = Cache::with_config(Arc::clone(&store), config).unwrap();
        assert_eq!(second.retrieve_string(&k).unwrap().as_deref(), Some("kept"));

        second.store("more").unwrap();
        assert_eq!(counter(&second), Some(2));
    }

    #[test]
    fn test_config_disables_instrumentation() {
        let config = CacheConfig {
            instrument: false,
            ..CacheConfig::default()
        };
        let cache = Cache::with_config(MemoryStore::new(), config).unwrap();

        let k = cache.store("quiet").unwrap();
        assert_eq!(cache.retrieve_string(&k).unwrap().as_deref(), Some("quiet"));
        assert_eq!(counter(&cache), None);
        assert!(history(&cache, "Cache.store:inputs").is_empty());
    }

    #[test]
    fn test_config_from_json() {
        let config: CacheConfig = serde_json::from_str(r#"{"flush_on_open": false}"#).unwrap();
        assert!(!config.flush_on_open);
        assert!(config.instrument);
    }

    #[test]
    fn test_sqlite_backend() {
        let cache = Cache::new(SqliteStore::open_memory().unwrap()).unwrap();

        let k = cache.store("on disk").unwrap();
        assert_eq!(cache.retrieve_string(&k).unwrap().as_deref(), Some("on disk"));
        assert_eq!(counter(&cache), Some(1));
        assert_eq!(history(&cache, "Cache.store:inputs"), vec!["('on disk',)"]);
    }
}
