//! Callback pipeline.

use crate::callback::context::{CallbackContext, Kinded, PreGetContext, PreQueryContext};
use crate::callback::hook::{Hook, HookResult, HookStage};
use crate::callback::registry::HookRegistry;
use crate::error::CoreResult;
use entiscope_model::{Entity, Key};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

type ResolvedHooks = Arc<[Arc<Hook>]>;

/// Runs registered hooks around operations.
///
/// Hooks for a `(kind, stage)` pair are resolved from the registry the first
/// time they are needed and cached for the lifetime of the pipeline.
pub struct CallbackPipeline {
    registry: HookRegistry,
    resolved: RwLock<HashMap<(Option<String>, HookStage), ResolvedHooks>>,
}

impl CallbackPipeline {
    /// Creates a pipeline over a registry.
    #[must_use]
    pub fn new(registry: HookRegistry) -> Self {
        Self {
            registry,
            resolved: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the hooks for a kind and stage, resolving them on first use.
    pub fn resolve(&self, kind: Option<&str>, stage: HookStage) -> ResolvedHooks {
        let cache_key = (kind.map(str::to_string), stage);
        if let Some(hooks) = self.resolved.read().get(&cache_key) {
            return Arc::clone(hooks);
        }
        let mut resolved = self.resolved.write();
        let hooks = resolved
            .entry(cache_key)
            .or_insert_with(|| self.registry.hooks_for(kind, stage).into());
        Arc::clone(hooks)
    }

    /// Returns how many `(kind, stage)` pairs have been resolved so far.
    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.resolved.read().len()
    }

    /// Runs pre-get hooks.
    pub fn pre_get(&self, ctx: &mut PreGetContext) -> CoreResult<()> {
        let kinds = ctx.kinds();
        for kind in &kinds {
            ctx.set_kind(kind);
            for hook in self.resolve(Some(kind), HookStage::PreGet).iter() {
                if let Hook::PreGet(f) = hook.as_ref() {
                    trace!(kind = %kind, "pre-get hook");
                    f(ctx)?;
                }
            }
        }
        Ok(())
    }

    /// Runs post-load hooks.
    pub fn post_load(&self, ctx: &mut CallbackContext<Entity>) -> CoreResult<()> {
        self.run_entities(HookStage::PostLoad, ctx)
    }

    /// Runs pre-put hooks.
    pub fn pre_put(&self, ctx: &mut CallbackContext<Entity>) -> CoreResult<()> {
        self.run_entities(HookStage::PrePut, ctx)
    }

    /// Runs post-put hooks.
    pub fn post_put(&self, ctx: &mut CallbackContext<Entity>) -> CoreResult<()> {
        self.run_entities(HookStage::PostPut, ctx)
    }

    /// Runs pre-delete hooks.
    pub fn pre_delete(&self, ctx: &mut CallbackContext<Key>) -> CoreResult<()> {
        self.run_keys(HookStage::PreDelete, ctx)
    }

    /// Runs post-delete hooks.
    pub fn post_delete(&self, ctx: &mut CallbackContext<Key>) -> CoreResult<()> {
        self.run_keys(HookStage::PostDelete, ctx)
    }

    /// Runs pre-query hooks for the query's kind.
    pub fn pre_query(&self, ctx: &mut PreQueryContext) -> CoreResult<()> {
        let kind = ctx.kind().map(str::to_string);
        for hook in self.resolve(kind.as_deref(), HookStage::PreQuery).iter() {
            if let Hook::PreQuery(f) = hook.as_ref() {
                trace!(kind = ?kind, "pre-query hook");
                f(ctx)?;
            }
        }
        Ok(())
    }

    fn run_entities(&self, stage: HookStage, ctx: &mut CallbackContext<Entity>) -> CoreResult<()> {
        self.run_batch(stage, ctx, |hook, ctx| match hook {
            Hook::PostLoad(f) | Hook::PrePut(f) | Hook::PostPut(f) => f(ctx),
            _ => Ok(()),
        })
    }

    fn run_keys(&self, stage: HookStage, ctx: &mut CallbackContext<Key>) -> CoreResult<()> {
        self.run_batch(stage, ctx, |hook, ctx| match hook {
            Hook::PreDelete(f) | Hook::PostDelete(f) => f(ctx),
            _ => Ok(()),
        })
    }

    /// Runs the hooks of every kind present in the batch, kinds in
    /// first-occurrence order and hooks in registration order.
    fn run_batch<T, F>(&self, stage: HookStage, ctx: &mut CallbackContext<T>, call: F) -> CoreResult<()>
    where
        T: Kinded,
        F: Fn(&Hook, &mut CallbackContext<T>) -> HookResult,
    {
        for kind in ctx.kinds() {
            let hooks = self.resolve(Some(&kind), stage);
            if hooks.is_empty() {
                continue;
            }
            ctx.set_kind(&kind);
            for hook in hooks.iter() {
                trace!(kind = %kind, stage = ?stage, "hook");
                call(hook, ctx)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for CallbackPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackPipeline")
            .field("registry", &self.registry)
            .field("resolved", &self.resolved_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::context::Attachments;
    use crate::callback::HookError;
    use crate::error::CoreError;
    use parking_lot::Mutex;

    fn entity(kind: &str, id: i64) -> Entity {
        Entity::new(Key::with_id(kind, id))
    }

    #[test]
    fn hooks_run_once_per_kind_over_whole_batch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let registry = HookRegistry::new().with_global(Hook::pre_put(move |ctx| {
            log.lock()
                .push((ctx.kind().to_string(), ctx.elements().len()));
            Ok(())
        }));
        let pipeline = CallbackPipeline::new(registry);

        let mut ctx = CallbackContext::new(
            None,
            vec![entity("B", 1), entity("A", 1), entity("B", 2)],
            Attachments::new(),
        );
        pipeline.pre_put(&mut ctx).unwrap();

        assert_eq!(
            *seen.lock(),
            vec![("B".to_string(), 3), ("A".to_string(), 3)]
        );
    }

    #[test]
    fn failure_stops_later_hooks() {
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let registry = HookRegistry::new()
            .with("A", Hook::pre_delete(|_| Err(HookError::new("refused"))))
            .with(
                "A",
                Hook::pre_delete(move |_| {
                    *flag.lock() = true;
                    Ok(())
                }),
            );
        let pipeline = CallbackPipeline::new(registry);
        let mut ctx = CallbackContext::new(None, vec![Key::with_id("A", 1)], Attachments::new());

        let err = pipeline.pre_delete(&mut ctx).unwrap_err();
        assert!(matches!(err, CoreError::Callback(_)));
        assert_eq!(err.to_string(), "refused");
        assert!(!*ran.lock());
    }

    #[test]
    fn resolution_is_cached() {
        let pipeline = CallbackPipeline::new(HookRegistry::new());
        let first = pipeline.resolve(Some("A"), HookStage::PreGet);
        let second = pipeline.resolve(Some("A"), HookStage::PreGet);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pipeline.resolved_count(), 1);
    }

    #[test]
    fn pre_query_rewrites_descriptor() {
        let registry = HookRegistry::new().with(
            "Person",
            Hook::pre_query(|ctx| {
                ctx.query_mut().set_fetch(entiscope_model::FetchMode::KeysOnly);
                Ok(())
            }),
        );
        let pipeline = CallbackPipeline::new(registry);
        let mut ctx = PreQueryContext::new(None, entiscope_model::QueryDescriptor::new("Person"));
        pipeline.pre_query(&mut ctx).unwrap();

        assert_eq!(
            ctx.into_query().fetch(),
            &entiscope_model::FetchMode::KeysOnly
        );
    }
}
