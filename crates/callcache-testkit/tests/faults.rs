//! Partial-failure behaviour of an instrumented cache.

use std::sync::Arc;

use callcache::store::StoreError;
use callcache::{Cache, CacheError, STORE_OPERATION};
use callcache_testkit::generators::stored_value;
use callcache_testkit::{counter, list_text, Fault, FaultyStore};
use proptest::prelude::*;

fn faulty_cache() -> (Arc<FaultyStore>, Cache<Arc<FaultyStore>>) {
    let store = Arc::new(FaultyStore::new());
    let cache = Cache::new(Arc::clone(&store)).unwrap();
    (store, cache)
}

#[test]
fn offline_store_fails_to_open() {
    let store = FaultyStore::new();
    store.inject(Fault::Offline);

    let err = Cache::new(store).err().unwrap();
    assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
}

#[test]
fn failed_write_is_still_counted() {
    let (store, cache) = faulty_cache();
    cache.store("ok").unwrap();

    store.inject(Fault::Set);
    let err = cache.store("lost").unwrap_err();
    assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
    store.heal_all();

    assert_eq!(counter(store.inner(), &STORE_OPERATION), 2);
    assert_eq!(list_text(store.inner(), "Cache.store:inputs"), vec!["('ok',)"]);

    let replay = cache.replay(&STORE_OPERATION).unwrap();
    assert_eq!(replay.calls(), 2);
    assert_eq!(replay.header(), "Cache.store was called 1 times:");
}

#[test]
fn failed_count_skips_the_write() {
    let (store, cache) = faulty_cache();

    store.inject(Fault::Incr);
    assert!(cache.store("never").is_err());
    store.heal_all();

    assert_eq!(counter(store.inner(), &STORE_OPERATION), 0);
    assert!(list_text(store.inner(), "Cache.store:inputs").is_empty());
    // Only the counter write was attempted: nothing else landed.
    assert!(store.inner().is_empty().unwrap());
}

#[test]
fn failed_output_append_leaves_orphaned_input() {
    let (store, cache) = faulty_cache();

    store.inject(Fault::AppendTo(":outputs"));
    let err = cache.store("half").unwrap_err();
    assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
    store.heal_all();

    assert_eq!(counter(store.inner(), &STORE_OPERATION), 1);
    assert_eq!(list_text(store.inner(), "Cache.store:inputs"), vec!["('half',)"]);
    assert!(list_text(store.inner(), "Cache.store:outputs").is_empty());

    let key = cache.store("whole").unwrap();
    let replay = cache.replay(&STORE_OPERATION).unwrap();
    assert_eq!(replay.recorded(), 2);
    // Pairs are matched by position, so the orphaned input shifts the pairing.
    assert_eq!(replay.entries().len(), 1);
    assert_eq!(replay.entries()[0].output, key.to_string());
}

#[test]
fn failed_input_append_records_neither_side() {
    let (store, cache) = faulty_cache();

    store.inject(Fault::AppendTo(":inputs"));
    assert!(cache.store("x").is_err());
    store.heal_all();

    assert!(list_text(store.inner(), "Cache.store:inputs").is_empty());
    assert!(list_text(store.inner(), "Cache.store:outputs").is_empty());
    assert_eq!(counter(store.inner(), &STORE_OPERATION), 1);
}

#[test]
fn retrieve_propagates_unavailable() {
    let (store, cache) = faulty_cache();
    let key = cache.store(5).unwrap();

    store.inject(Fault::Offline);
    assert!(matches!(
        cache.retrieve_int(&key).unwrap_err(),
        CacheError::Store(StoreError::Unavailable(_))
    ));

    store.heal_all();
    assert_eq!(cache.retrieve_int(&key).unwrap(), Some(5));
}

proptest! {
    #[test]
    fn counter_matches_attempts_under_write_faults(
        plan in prop::collection::vec((stored_value(), any::<bool>()), 0..20)
    ) {
        let (store, cache) = faulty_cache();

        let mut succeeded = 0usize;
        for (value, fail) in &plan {
            if *fail {
                store.inject(Fault::Set);
            }
            if cache.store(value.clone()).is_ok() {
                succeeded += 1;
            }
            store.heal_all();
        }

        let replay = cache.replay(&STORE_OPERATION).unwrap();
        prop_assert_eq!(replay.calls(), plan.len() as i64);
        prop_assert_eq!(replay.recorded(), succeeded);
        prop_assert_eq!(replay.entries().len(), succeeded);
    }
}
