//! Proptest generators for property-based testing.

use proptest::prelude::*;

use callcache::OperationName;
use callcache_store::StoredValue;

/// Generate text of up to `max_len` characters.
pub fn text_value(max_len: usize) -> impl Strategy<Value = StoredValue> {
    prop::collection::vec(any::<char>(), 0..=max_len)
        .prop_map(|chars| StoredValue::from(chars.into_iter().collect::<String>()))
}

/// Generate a byte sequence of up to `max_len` bytes.
pub fn bytes_value(max_len: usize) -> impl Strategy<Value = StoredValue> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(StoredValue::from)
}

/// Generate an integer value.
pub fn int_value() -> impl Strategy<Value = StoredValue> {
    any::<i64>().prop_map(StoredValue::from)
}

/// Generate a finite float value.
pub fn float_value() -> impl Strategy<Value = StoredValue> {
    any::<f64>()
        .prop_filter("history logs only take finite floats", |f| f.is_finite())
        .prop_map(StoredValue::from)
}

/// Generate any storable value that can also be recorded.
pub fn stored_value() -> impl Strategy<Value = StoredValue> {
    prop_oneof![
        text_value(32),
        bytes_value(64),
        int_value(),
        float_value(),
    ]
}

/// Generate a qualified operation name such as `Widget.spin`.
pub fn operation_name() -> impl Strategy<Value = OperationName> {
    "[A-Z][a-zA-Z]{0,15}\\.[a-z_]{1,16}".prop_map(OperationName::new)
}
