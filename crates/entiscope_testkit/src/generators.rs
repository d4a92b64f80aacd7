//! Property-based test generators using proptest.
//!
//! Key strategies draw from small id spaces so generated batches contain
//! duplicates.

use entiscope_model::{Entity, Key, Value};
use proptest::prelude::*;

/// Kinds used by the generators.
pub const KINDS: [&str; 3] = ["Person", "Company", "Order"];

/// Strategy for generating kind names.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(&KINDS[..]).prop_map(str::to_string)
}

/// Strategy for generating complete keys, numeric or named.
pub fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        (kind_strategy(), 1i64..16).prop_map(|(kind, id)| Key::with_id(kind, id)),
        (kind_strategy(), "[a-c]{1,2}").prop_map(|(kind, name)| Key::with_name(kind, name)),
    ]
}

/// Strategy for generating key batches that usually contain duplicates.
pub fn keys_with_duplicates() -> impl Strategy<Value = Vec<Key>> {
    prop::collection::vec(key_strategy(), 0..24)
}

/// Strategy for generating property values.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e6f64..1.0e6).prop_map(Value::Double),
        "[a-zA-Z ]{0,16}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ]
}

/// Strategy for generating entities with complete keys.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    (
        key_strategy(),
        prop::collection::btree_map("[a-e]", value_strategy(), 0..4),
    )
        .prop_map(|(key, properties)| Entity::from_parts(key, properties))
}

/// Strategy for generating entity batches; keys often repeat and some
/// entities have incomplete keys.
pub fn entities_with_duplicates() -> impl Strategy<Value = Vec<Entity>> {
    prop::collection::vec(
        prop_oneof![
            4 => entity_strategy(),
            1 => kind_strategy().prop_map(|kind| Entity::new(Key::incomplete(kind))),
        ],
        0..24,
    )
}

/// An operation against the datastore.
#[derive(Debug, Clone)]
pub enum EntityOperation {
    /// Put an entity
    Put(Entity),
    /// Delete an entity
    Delete(Key),
    /// Get an entity
    Get(Key),
}

/// Strategy for generating sequences of operations.
pub fn operation_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<EntityOperation>> {
    prop::collection::vec(
        prop_oneof![
            3 => entity_strategy().prop_map(EntityOperation::Put),
            1 => key_strategy().prop_map(EntityOperation::Delete),
            2 => key_strategy().prop_map(EntityOperation::Get),
        ],
        0..max_len,
    )
}
