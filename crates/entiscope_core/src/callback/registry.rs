//! Hook registry.

use crate::callback::hook::{Hook, HookStage};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Registration {
    /// `None` registers the hook for every kind.
    kind: Option<String>,
    hook: Arc<Hook>,
}

/// Hooks registered per kind or for all kinds, in registration order.
///
/// The registry is plain configuration; a
/// [`CallbackPipeline`](crate::CallbackPipeline) resolves it lazily.
#[derive(Clone, Default)]
pub struct HookRegistry {
    registrations: Vec<Registration>,
}

impl HookRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook for one kind.
    pub fn register(&mut self, kind: impl Into<String>, hook: Hook) -> &mut Self {
        self.registrations.push(Registration {
            kind: Some(kind.into()),
            hook: Arc::new(hook),
        });
        self
    }

    /// Registers a hook for every kind, including kindless queries.
    pub fn register_global(&mut self, hook: Hook) -> &mut Self {
        self.registrations.push(Registration {
            kind: None,
            hook: Arc::new(hook),
        });
        self
    }

    /// Registers a hook for one kind, builder style.
    #[must_use]
    pub fn with(mut self, kind: impl Into<String>, hook: Hook) -> Self {
        self.register(kind, hook);
        self
    }

    /// Registers a hook for every kind, builder style.
    #[must_use]
    pub fn with_global(mut self, hook: Hook) -> Self {
        self.register_global(hook);
        self
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if no hook is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Returns the hooks for a stage that apply to `kind`, in registration
    /// order. With `kind == None` only global hooks apply.
    #[must_use]
    pub fn hooks_for(&self, kind: Option<&str>, stage: HookStage) -> Vec<Arc<Hook>> {
        self.registrations
            .iter()
            .filter(|r| r.hook.stage() == stage)
            .filter(|r| match (&r.kind, kind) {
                (None, _) => true,
                (Some(registered), Some(kind)) => registered == kind,
                (Some(_), None) => false,
            })
            .map(|r| Arc::clone(&r.hook))
            .collect()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::HookError;

    #[test]
    fn per_kind_and_global_in_registration_order() {
        let registry = HookRegistry::new()
            .with("Person", Hook::pre_put(|_| Ok(())))
            .with_global(Hook::pre_put(|_| Err(HookError::new("global"))))
            .with("Order", Hook::pre_put(|_| Ok(())))
            .with("Person", Hook::post_put(|_| Ok(())));

        let hooks = registry.hooks_for(Some("Person"), HookStage::PrePut);
        assert_eq!(hooks.len(), 2);
        assert!(matches!(hooks[1].as_ref(), Hook::PrePut(_)));

        assert_eq!(registry.hooks_for(None, HookStage::PrePut).len(), 1);
        assert_eq!(registry.hooks_for(Some("Person"), HookStage::PostPut).len(), 1);
        assert!(registry.hooks_for(Some("Order"), HookStage::PostPut).is_empty());
    }

    #[test]
    fn clones_share_hooks() {
        let mut registry = HookRegistry::new();
        registry.register("A", Hook::pre_delete(|_| Ok(())));
        let copy = registry.clone();
        let a = registry.hooks_for(Some("A"), HookStage::PreDelete);
        let b = copy.hooks_for(Some("A"), HookStage::PreDelete);
        assert!(Arc::ptr_eq(&a[0], &b[0]));
    }
}
