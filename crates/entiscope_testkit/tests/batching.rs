//! Batch deduplication and re-expansion through the facade.

use entiscope_core::{CoreError, Hook, HookError, HookRegistry, HookStage};
use entiscope_model::{Entity, Key};
use entiscope_testkit::prelude::*;
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

fn unique_in_order(keys: &[Key]) -> Vec<Key> {
    let mut seen = HashSet::new();
    keys.iter().filter(|k| seen.insert((*k).clone())).cloned().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn get_many_runs_hooks_once_per_unique_key(keys in keys_with_duplicates()) {
        let recorder = HookRecorder::new();
        let test = TestDatastore::with_hooks(recorder.registry(&KINDS));
        let stored: Vec<Entity> = unique_in_order(&keys)
            .into_iter()
            .map(|k| Entity::new(k).with_property("n", 1i64))
            .collect();
        test.put_many(&test.ctx, None, stored).unwrap();
        recorder.clear();

        let found = test.get_many(&test.ctx, None, keys.clone()).unwrap();

        prop_assert_eq!(found.len(), keys.len());
        let seen: Vec<Key> = recorder
            .events_for(HookStage::PreGet)
            .into_iter()
            .flat_map(|e| e.keys)
            .collect();
        let unique = unique_in_order(&keys);
        prop_assert_eq!(seen.len(), unique.len());
        prop_assert_eq!(seen.iter().collect::<HashSet<_>>(), unique.iter().collect::<HashSet<_>>());
        prop_assert_eq!(test.backend.stats().snapshot().gets as usize, unique.len());

        let entries: Vec<_> = found.iter().collect();
        for (i, (key, entity)) in entries.iter().enumerate() {
            prop_assert_eq!(*key, &keys[i]);
            for (other_key, other) in &entries[..i] {
                if other_key == key {
                    prop_assert!(Arc::ptr_eq(entity, other));
                }
            }
        }
    }

    #[test]
    fn put_many_returns_one_key_per_input(entities in entities_with_duplicates()) {
        let test = TestDatastore::new();
        let keys = test.put_many(&test.ctx, None, entities.clone()).unwrap();

        prop_assert_eq!(keys.len(), entities.len());
        for (key, entity) in keys.iter().zip(&entities) {
            prop_assert!(key.is_complete());
            prop_assert_eq!(key.kind(), entity.kind());
            if entity.key().is_complete() {
                prop_assert_eq!(key, entity.key());
            }
        }
        let distinct: HashSet<&Key> = keys.iter().collect();
        prop_assert_eq!(test.backend.committed_count(), distinct.len());
    }
}

#[test]
fn duplicate_puts_keep_the_last_content() {
    let test = TestDatastore::new();
    let keys = test
        .put_many(
            &test.ctx,
            None,
            [person(1, "first", 1), person(2, "Bob", 2), person(1, "last", 3)],
        )
        .unwrap();

    assert_eq!(
        keys,
        vec![
            Key::with_id("Person", 1),
            Key::with_id("Person", 2),
            Key::with_id("Person", 1),
        ]
    );
    let stored = test.get(&test.ctx, None, &Key::with_id("Person", 1)).unwrap();
    assert_eq!(stored.property("name").and_then(|v| v.as_text()), Some("last"));
    assert_eq!(test.backend.stats().snapshot().puts, 2);
}

#[test]
fn hook_failure_aborts_the_batch_before_the_backend() {
    let calls = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&calls);
    let hooks = HookRegistry::new()
        .with(
            "Person",
            Hook::pre_put(move |ctx| {
                *counter.lock() += 1;
                for e in ctx.current_elements_mut() {
                    e.set_property("touched", true);
                }
                Ok(())
            }),
        )
        .with(
            "Person",
            Hook::pre_put(|_| Err(entiscope_core::HookError::new("rejected"))),
        );
    let test = TestDatastore::with_hooks(hooks);

    let result = test.put_many(&test.ctx, None, [person(1, "Ann", 30), person(2, "Bob", 40)]);

    assert!(matches!(result, Err(entiscope_core::CoreError::Callback(_))));
    assert_eq!(*calls.lock(), 1);
    assert_eq!(test.backend.committed_count(), 0);
    assert_eq!(test.backend.stats().snapshot().puts, 0);
}

#[test]
fn pre_get_results_skip_the_fetch() {
    let hooks = HookRegistry::new().with(
        "Person",
        Hook::pre_get(|ctx| {
            let virtual_key = Key::with_id("Person", 99);
            if ctx.elements().contains(&virtual_key) {
                ctx.set_result(virtual_key.clone(), person(99, "computed", 0));
            }
            Ok(())
        }),
    );
    let test = TestDatastore::with_hooks(hooks);
    test.put(&test.ctx, None, person(1, "Ann", 30)).unwrap();
    test.backend.stats().reset();

    let found = test
        .get_many(&test.ctx, None, [Key::with_id("Person", 99), Key::with_id("Person", 1)])
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(test.backend.stats().snapshot().gets, 1);
    let computed = found.get(&Key::with_id("Person", 99)).unwrap();
    assert_eq!(computed.property("name").and_then(|v| v.as_text()), Some("computed"));
}

#[test]
fn failing_pre_get_hook_aborts_before_any_fetch() {
    let hooks = HookRegistry::new().with("Person", Hook::pre_get(|_| Err(HookError::new("sealed"))));
    let test = TestDatastore::with_hooks(hooks);
    test.put(&test.ctx, None, person(1, "Ann", 30)).unwrap();
    test.backend.stats().reset();

    let result = test.get_many(
        &test.ctx,
        None,
        [Key::with_id("Person", 1), Key::with_id("Person", 2)],
    );
    assert!(matches!(result, Err(CoreError::Callback(e)) if e.message() == "sealed"));
    assert_eq!(test.backend.stats().snapshot().gets, 0);
}
