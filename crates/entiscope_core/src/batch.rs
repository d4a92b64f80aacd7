//! Batch deduplication and re-expansion.
//!
//! Batches are reduced to their unique elements before hooks and backend
//! calls run, and results are expanded back to the caller's input shape:
//! every input position gets an output entry, and duplicate positions share
//! the single resolved value.

use entiscope_model::{Entity, Key};
use std::collections::HashMap;
use std::sync::Arc;

/// Deduplicated view over a key sequence.
#[derive(Debug, Clone, Default)]
pub struct KeyBatch {
    unique: Vec<Key>,
    positions: Vec<usize>,
}

impl KeyBatch {
    /// Builds the batch, keeping first-occurrence order.
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        let mut index: HashMap<Key, usize> = HashMap::new();
        let mut batch = Self::default();
        for key in keys {
            let slot = match index.get(&key) {
                Some(&slot) => slot,
                None => {
                    let slot = batch.unique.len();
                    index.insert(key.clone(), slot);
                    batch.unique.push(key);
                    slot
                }
            };
            batch.positions.push(slot);
        }
        batch
    }

    /// Returns the unique keys in first-occurrence order.
    #[must_use]
    pub fn unique(&self) -> &[Key] {
        &self.unique
    }

    /// Returns the length of the original input.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.positions.len()
    }

    /// Expands the entities resolved per unique key back to input order.
    /// Keys without an entity are left out.
    #[must_use]
    pub fn expand(&self, resolved: &HashMap<Key, Arc<Entity>>) -> EntityMap {
        let mut map = EntityMap::default();
        for &slot in &self.positions {
            let key = &self.unique[slot];
            if let Some(entity) = resolved.get(key) {
                map.push(key.clone(), Arc::clone(entity));
            }
        }
        map
    }
}

/// Deduplicated view over an entity sequence.
///
/// Entities with the same complete key share one slot: the slot sits at the
/// first occurrence and holds the content of the last one. Entities with
/// incomplete keys are always distinct.
#[derive(Debug, Clone, Default)]
pub struct EntityBatch {
    unique: Vec<Entity>,
    positions: Vec<usize>,
}

impl EntityBatch {
    /// Builds the batch.
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        let mut index: HashMap<Key, usize> = HashMap::new();
        let mut batch = Self::default();
        for entity in entities {
            let existing = entity
                .key()
                .is_complete()
                .then(|| index.get(entity.key()).copied())
                .flatten();
            let slot = match existing {
                Some(slot) => {
                    batch.unique[slot] = entity;
                    slot
                }
                None => {
                    let slot = batch.unique.len();
                    if entity.key().is_complete() {
                        index.insert(entity.key().clone(), slot);
                    }
                    batch.unique.push(entity);
                    slot
                }
            };
            batch.positions.push(slot);
        }
        batch
    }

    /// Returns the unique entities.
    #[must_use]
    pub fn unique(&self) -> &[Entity] {
        &self.unique
    }

    /// Returns the length of the original input.
    #[must_use]
    pub fn input_len(&self) -> usize {
        self.positions.len()
    }

    pub(crate) fn take_unique(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.unique)
    }

    pub(crate) fn set_unique(&mut self, unique: Vec<Entity>) {
        self.unique = unique;
    }

    /// Expands one value per unique entity back to input order.
    #[must_use]
    pub fn expand<T: Clone>(&self, resolved: &[T]) -> Vec<T> {
        self.positions
            .iter()
            .filter_map(|&slot| resolved.get(slot).cloned())
            .collect()
    }
}

/// Result of a batch get: entities in the caller's input order.
///
/// A key requested twice appears twice, both entries sharing the same
/// `Arc<Entity>`. Keys that resolved to nothing are absent.
#[derive(Debug, Clone, Default)]
pub struct EntityMap {
    entries: Vec<(Key, Arc<Entity>)>,
    index: HashMap<Key, usize>,
}

impl EntityMap {
    fn push(&mut self, key: Key, entity: Arc<Entity>) {
        let position = self.entries.len();
        self.index.entry(key.clone()).or_insert(position);
        self.entries.push((key, entity));
    }

    /// Returns the number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the entity for a key.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Arc<Entity>> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Returns true if the key resolved.
    #[must_use]
    pub fn contains_key(&self, key: &Key) -> bool {
        self.index.contains_key(key)
    }

    /// Iterates over entries in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Arc<Entity>)> {
        self.entries.iter().map(|(k, e)| (k, e))
    }

    /// Iterates over keys in input order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Iterates over entities in input order.
    pub fn values(&self) -> impl Iterator<Item = &Arc<Entity>> {
        self.entries.iter().map(|(_, e)| e)
    }

    /// Returns the number of distinct keys.
    #[must_use]
    pub fn unique_len(&self) -> usize {
        self.index.len()
    }
}

impl IntoIterator for EntityMap {
    type Item = (Key, Arc<Entity>);
    type IntoIter = std::vec::IntoIter<(Key, Arc<Entity>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(id: i64) -> Key {
        Key::with_id("K", id)
    }

    #[test]
    fn keys_dedupe_in_first_occurrence_order() {
        let batch = KeyBatch::new([key(2), key(1), key(2), key(3), key(1)]);
        assert_eq!(batch.unique(), &[key(2), key(1), key(3)]);
        assert_eq!(batch.input_len(), 5);
    }

    #[test]
    fn expansion_shares_resolved_values() {
        let batch = KeyBatch::new([key(1), key(2), key(1)]);
        let mut resolved = HashMap::new();
        resolved.insert(key(1), Arc::new(Entity::new(key(1))));

        let map = batch.expand(&resolved);
        assert_eq!(map.len(), 2);
        assert_eq!(map.unique_len(), 1);
        let values: Vec<_> = map.values().collect();
        assert!(Arc::ptr_eq(values[0], values[1]));
        assert!(!map.contains_key(&key(2)));
    }

    #[test]
    fn entities_keep_first_slot_last_content() {
        let batch = EntityBatch::new([
            Entity::new(key(1)).with_property("v", 1i64),
            Entity::new(key(2)),
            Entity::new(key(1)).with_property("v", 2i64),
        ]);
        assert_eq!(batch.unique().len(), 2);
        assert_eq!(batch.unique()[0].key(), &key(1));
        assert_eq!(
            batch.unique()[0].property("v").and_then(|v| v.as_integer()),
            Some(2)
        );
        assert_eq!(batch.expand(&["a", "b"][..]), vec!["a", "b", "a"]);
    }

    #[test]
    fn incomplete_entities_never_dedupe() {
        let batch = EntityBatch::new([
            Entity::new(Key::incomplete("K")),
            Entity::new(Key::incomplete("K")),
        ]);
        assert_eq!(batch.unique().len(), 2);
    }

    proptest! {
        #[test]
        fn expansion_matches_input(ids in prop::collection::vec(0i64..8, 0..40)) {
            let keys: Vec<Key> = ids.iter().map(|&id| key(id)).collect();
            let batch = KeyBatch::new(keys.clone());
            let resolved: HashMap<Key, Arc<Entity>> = batch
                .unique()
                .iter()
                .map(|k| (k.clone(), Arc::new(Entity::new(k.clone()))))
                .collect();

            let map = batch.expand(&resolved);
            prop_assert_eq!(map.len(), keys.len());
            let expanded: Vec<Key> = map.keys().cloned().collect();
            prop_assert_eq!(expanded, keys);
            for (k, e) in map.iter() {
                prop_assert!(Arc::ptr_eq(e, &resolved[k]));
            }
        }
    }
}
