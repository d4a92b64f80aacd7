//! Test fixtures and datastore helpers.
//!
//! Provides convenience functions for setting up datastores over an
//! in-memory backend and common test scenarios.

use entiscope_backend::InMemoryBackend;
use entiscope_core::{AsyncDatastore, Datastore, DatastoreConfig, HookRegistry, TxContext};
use entiscope_model::{Entity, Key};
use std::sync::Arc;

/// A datastore over a fresh in-memory backend, with a context for the
/// calling thread.
pub struct TestDatastore {
    /// The blocking facade.
    pub datastore: Datastore,
    /// The backend, for inspecting committed state and statistics.
    pub backend: Arc<InMemoryBackend>,
    /// Execution context of the test thread.
    pub ctx: TxContext,
}

impl TestDatastore {
    /// Creates a datastore with no hooks.
    pub fn new() -> Self {
        Self::with_config(DatastoreConfig::default())
    }

    /// Creates a datastore with hooks.
    pub fn with_hooks(hooks: HookRegistry) -> Self {
        Self::with_config(DatastoreConfig::new().hooks(hooks))
    }

    /// Creates a datastore with a configuration.
    pub fn with_config(config: DatastoreConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        Self {
            datastore: Datastore::with_config(backend.clone(), config),
            backend,
            ctx: TxContext::new(),
        }
    }

    /// Creates an async facade over the same backend.
    pub fn async_facade(&self, config: DatastoreConfig) -> AsyncDatastore {
        AsyncDatastore::with_config(self.backend.clone(), config)
            .expect("Failed to start worker pool")
    }
}

impl Default for TestDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDatastore {
    type Target = Datastore;

    fn deref(&self) -> &Self::Target {
        &self.datastore
    }
}

/// Runs a test with a fresh datastore and context.
///
/// # Example
///
/// ```rust
/// use entiscope_testkit::with_datastore;
///
/// with_datastore(|datastore, ctx| {
///     assert!(datastore.current_transaction(ctx).is_none());
/// });
/// ```
pub fn with_datastore<F, R>(f: F) -> R
where
    F: FnOnce(&Datastore, &TxContext) -> R,
{
    let test = TestDatastore::new();
    f(&test.datastore, &test.ctx)
}

/// Runs a test with a fresh datastore configured with hooks.
pub fn with_hooked_datastore<F, R>(hooks: HookRegistry, f: F) -> R
where
    F: FnOnce(&Datastore, &TxContext) -> R,
{
    let test = TestDatastore::with_hooks(hooks);
    f(&test.datastore, &test.ctx)
}

/// Builds a `Person` entity.
pub fn person(id: i64, name: &str, age: i64) -> Entity {
    Entity::new(Key::with_id("Person", id))
        .with_property("name", name)
        .with_property("age", age)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a datastore with `count` committed `Person` entities with
    /// ids `1..=count`.
    pub fn populated_datastore(count: i64) -> TestDatastore {
        let test = TestDatastore::new();
        let people: Vec<Entity> = (1..=count)
            .map(|i| person(i, &format!("person-{i}"), 20 + i))
            .collect();
        test.datastore
            .put_many(&test.ctx, None, people)
            .expect("Failed to put entities");
        test
    }
}
