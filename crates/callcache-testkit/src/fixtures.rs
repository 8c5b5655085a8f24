//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use callcache::{Cache, CacheConfig, OperationName};
use callcache_store::{KeyValueStore, MemoryStore, Result, StoreError, StoredValue};

/// A cache on a shared memory store, with direct access to the store.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub cache: Cache<Arc<MemoryStore>>,
}

impl TestFixture {
    /// Create a fixture with the default cache configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a fixture with an explicit cache configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Cache::with_config(Arc::clone(&store), config)
            .expect("memory store cannot fail to open");
        Self { store, cache }
    }

    /// Open another cache on the same store.
    pub fn open_another(&self, config: CacheConfig) -> Cache<Arc<MemoryStore>> {
        Cache::with_config(Arc::clone(&self.store), config)
            .expect("memory store cannot fail to open")
    }

    /// Current counter value for `name`, 0 if absent.
    pub fn counter(&self, name: &OperationName) -> i64 {
        counter(&*self.store, name)
    }

    /// Inputs log for `name` as text.
    pub fn inputs(&self, name: &OperationName) -> Vec<String> {
        list_text(&*self.store, &name.inputs_key())
    }

    /// Outputs log for `name` as text.
    pub fn outputs(&self, name: &OperationName) -> Vec<String> {
        list_text(&*self.store, &name.outputs_key())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a counter straight from a store, 0 if absent.
pub fn counter(store: &dyn KeyValueStore, name: &OperationName) -> i64 {
    store
        .get(name.counter_key())
        .expect("counter read failed")
        .map(|raw| {
            std::str::from_utf8(&raw)
                .expect("counter is not UTF-8")
                .parse()
                .expect("counter is not an integer")
        })
        .unwrap_or(0)
}

/// Read a whole list straight from a store as text.
pub fn list_text(store: &dyn KeyValueStore, key: &str) -> Vec<String> {
    store
        .range(key, 0, -1)
        .expect("list read failed")
        .into_iter()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .collect()
}

/// A failure mode that [`FaultyStore`] can be told to exhibit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fault {
    /// Every primitive fails.
    Offline,
    /// `set` fails.
    Set,
    /// `incr` fails.
    Incr,
    /// `append` fails for keys ending in the given suffix.
    AppendTo(&'static str),
}

/// Memory store that fails on demand with `StoreError::Unavailable`.
///
/// Faults can be injected and healed while the store is in use, which lets
/// a test break one primitive in the middle of an instrumented call.
pub struct FaultyStore {
    inner: MemoryStore,
    faults: RwLock<HashSet<Fault>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            faults: RwLock::new(HashSet::new()),
        }
    }

    /// Start exhibiting `fault`.
    pub fn inject(&self, fault: Fault) {
        self.faults.write().expect("fault set poisoned").insert(fault);
    }

    /// Stop exhibiting `fault`.
    pub fn heal(&self, fault: &Fault) {
        self.faults.write().expect("fault set poisoned").remove(fault);
    }

    /// Stop exhibiting every fault.
    pub fn heal_all(&self) {
        self.faults.write().expect("fault set poisoned").clear();
    }

    /// The healthy store underneath, for inspecting state.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, primitive: &str, fault: Option<Fault>) -> Result<()> {
        let faults = self.faults.read().expect("fault set poisoned");
        if faults.contains(&Fault::Offline) {
            return Err(StoreError::Unavailable("injected fault: store offline".into()));
        }
        if let Some(fault) = fault {
            if faults.contains(&fault) {
                return Err(StoreError::Unavailable(format!(
                    "injected fault: {} failed",
                    primitive
                )));
            }
        }
        Ok(())
    }

    fn append_fault(&self, key: &str) -> Option<Fault> {
        let faults = self.faults.read().expect("fault set poisoned");
        faults.iter().find_map(|f| match f {
            Fault::AppendTo(suffix) if key.ends_with(suffix) => Some(f.clone()),
            _ => None,
        })
    }
}

impl Default for FaultyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for FaultyStore {
    fn set(&self, key: &str, value: &StoredValue) -> Result<()> {
        self.check("set", Some(Fault::Set))?;
        self.inner.set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        self.check("get", None)?;
        self.inner.get(key)
    }

    fn incr(&self, key: &str) -> Result<i64> {
        self.check("incr", Some(Fault::Incr))?;
        self.inner.incr(key)
    }

    fn append(&self, key: &str, value: &[u8]) -> Result<usize> {
        self.check("append", self.append_fault(key))?;
        self.inner.append(key, value)
    }

    fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Bytes>> {
        self.check("range", None)?;
        self.inner.range(key, start, end)
    }

    fn clear(&self) -> Result<()> {
        self.check("clear", None)?;
        self.inner.clear()
    }
}
