//! Hook recorder.
//!
//! Registers a hook for every stage that logs what it saw, so tests can
//! assert on invocation order, batch contents and the transaction in scope.

use entiscope_backend::TransactionId;
use entiscope_core::{CallbackContext, Hook, HookRegistry, HookStage, Transaction};
use entiscope_model::{Entity, Key};
use parking_lot::Mutex;
use std::sync::Arc;

/// One recorded hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEvent {
    /// Stage that ran.
    pub stage: HookStage,
    /// Kind whose hooks ran; empty for kindless queries.
    pub kind: String,
    /// Keys of the elements of that kind, in batch order.
    pub keys: Vec<Key>,
    /// Transaction the hook saw.
    pub transaction: Option<TransactionId>,
}

/// Records hook invocations.
#[derive(Debug, Clone, Default)]
pub struct HookRecorder {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl HookRecorder {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry with recording hooks for every stage of `kinds`.
    pub fn registry(&self, kinds: &[&str]) -> HookRegistry {
        let mut registry = HookRegistry::new();
        for kind in kinds {
            self.register(&mut registry, kind);
        }
        registry
    }

    /// Adds recording hooks for every stage of `kind`.
    pub fn register(&self, registry: &mut HookRegistry, kind: &str) {
        let record = |stage: HookStage| {
            let events = Arc::clone(&self.events);
            move |kind: &str, keys: Vec<Key>, tx: Option<&Transaction>| {
                events.lock().push(HookEvent {
                    stage,
                    kind: kind.to_string(),
                    keys,
                    transaction: tx.map(Transaction::id),
                });
            }
        };

        let log = record(HookStage::PreGet);
        registry.register(
            kind,
            Hook::pre_get(move |ctx| {
                let keys = key_elements(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PostLoad);
        registry.register(
            kind,
            Hook::post_load(move |ctx| {
                let keys = entity_keys(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PrePut);
        registry.register(
            kind,
            Hook::pre_put(move |ctx| {
                let keys = entity_keys(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PostPut);
        registry.register(
            kind,
            Hook::post_put(move |ctx| {
                let keys = entity_keys(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PreDelete);
        registry.register(
            kind,
            Hook::pre_delete(move |ctx| {
                let keys = key_elements(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PostDelete);
        registry.register(
            kind,
            Hook::post_delete(move |ctx| {
                let keys = key_elements(ctx);
                log(ctx.kind(), keys, ctx.transaction());
                Ok(())
            }),
        );
        let log = record(HookStage::PreQuery);
        registry.register(
            kind,
            Hook::pre_query(move |ctx| {
                log(ctx.kind().unwrap_or_default(), Vec::new(), ctx.transaction());
                Ok(())
            }),
        );
    }

    /// Returns every recorded event in order.
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded stages in order.
    pub fn stages(&self) -> Vec<HookStage> {
        self.events.lock().iter().map(|e| e.stage).collect()
    }

    /// Returns the events of one stage.
    pub fn events_for(&self, stage: HookStage) -> Vec<HookEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.stage == stage)
            .cloned()
            .collect()
    }

    /// Returns how many times a stage ran.
    pub fn count(&self, stage: HookStage) -> usize {
        self.events.lock().iter().filter(|e| e.stage == stage).count()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

fn entity_keys(ctx: &CallbackContext<Entity>) -> Vec<Key> {
    ctx.current_elements().map(|e| e.key().clone()).collect()
}

fn key_elements(ctx: &CallbackContext<Key>) -> Vec<Key> {
    ctx.current_elements().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{person, TestDatastore};
    use entiscope_model::QueryDescriptor;

    #[test]
    fn records_every_stage_with_the_batch_of_its_kind() {
        let recorder = HookRecorder::new();
        let test = TestDatastore::with_hooks(recorder.registry(&["Person"]));
        let ctx = &test.ctx;

        let company = Entity::new(Key::with_id("Company", 1));
        test.put_many(ctx, None, [person(1, "Ann", 30), company, person(2, "Bob", 40)])
            .unwrap();
        test.get(ctx, None, &Key::with_id("Person", 1)).unwrap();
        test.delete(ctx, None, &Key::with_id("Person", 2)).unwrap();
        test.prepare(ctx, None, QueryDescriptor::new("Person")).unwrap();

        assert_eq!(
            recorder.stages(),
            vec![
                HookStage::PrePut,
                HookStage::PostPut,
                HookStage::PreGet,
                HookStage::PostLoad,
                HookStage::PreDelete,
                HookStage::PostDelete,
                HookStage::PreQuery,
            ]
        );
        let pre_put = &recorder.events_for(HookStage::PrePut)[0];
        assert_eq!(pre_put.kind, "Person");
        assert_eq!(
            pre_put.keys,
            vec![Key::with_id("Person", 1), Key::with_id("Person", 2)]
        );
        assert_eq!(pre_put.transaction, None);

        recorder.clear();
        assert_eq!(recorder.count(HookStage::PrePut), 0);
    }
}
