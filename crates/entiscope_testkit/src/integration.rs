//! Cross-crate integration test helpers.
//!
//! Provides a harness that mirrors committed writes so tests can verify
//! the datastore against an independent model.

use crate::fixtures::TestDatastore;
use entiscope_core::{CoreError, Datastore, TxContext};
use entiscope_model::{Entity, Key};
use std::collections::HashMap;

/// A test harness for integration testing.
pub struct IntegrationHarness {
    test: TestDatastore,
    /// Entity tracking for verification.
    entities: HashMap<Key, Entity>,
}

impl IntegrationHarness {
    /// Creates a harness over a fresh in-memory datastore.
    pub fn new() -> Self {
        Self {
            test: TestDatastore::new(),
            entities: HashMap::new(),
        }
    }

    /// Returns the datastore.
    pub fn datastore(&self) -> &Datastore {
        &self.test.datastore
    }

    /// Returns the harness context.
    pub fn ctx(&self) -> &TxContext {
        &self.test.ctx
    }

    /// Puts an entity in its own transaction and tracks it.
    pub fn put(&mut self, entity: Entity) -> Key {
        let tx = self
            .test
            .begin_transaction(&self.test.ctx)
            .expect("Failed to begin transaction");
        let key = self
            .test
            .put(&self.test.ctx, Some(&tx), entity.clone())
            .expect("Failed to put entity");
        tx.commit().expect("Failed to commit");

        let mut stored = entity;
        stored.set_key(key.clone());
        self.entities.insert(key.clone(), stored);
        key
    }

    /// Gets an entity and verifies it matches the tracked value.
    pub fn get_and_verify(&self, key: &Key) -> Option<Entity> {
        let actual = match self.test.get(&self.test.ctx, None, key) {
            Ok(entity) => Some(entity),
            Err(CoreError::EntityNotFound { .. }) => None,
            Err(e) => panic!("Failed to get entity: {e}"),
        };
        assert_eq!(
            actual.as_ref(),
            self.entities.get(key),
            "Entity mismatch for {key:?}"
        );
        actual
    }

    /// Deletes an entity in its own transaction and updates tracking.
    pub fn delete(&mut self, key: &Key) {
        let tx = self
            .test
            .begin_transaction(&self.test.ctx)
            .expect("Failed to begin transaction");
        self.test
            .delete(&self.test.ctx, Some(&tx), key)
            .expect("Failed to delete entity");
        tx.commit().expect("Failed to commit");
        self.entities.remove(key);
    }

    /// Verifies all tracked entities are in the datastore and nothing else
    /// was committed.
    pub fn verify_all(&self) {
        let keys: Vec<Key> = self.entities.keys().cloned().collect();
        let found = self
            .test
            .get_many(&self.test.ctx, None, keys)
            .expect("Failed to get entities");
        for (key, expected) in &self.entities {
            assert_eq!(
                found.get(key).map(|e| e.as_ref()),
                Some(expected),
                "Entity mismatch for {key:?}"
            );
        }
        assert_eq!(self.test.backend.committed_count(), self.entities.len());
    }

    /// Returns the count of tracked entities.
    pub fn tracked_count(&self) -> usize {
        self.entities.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}
