//! Hook definitions.

use crate::callback::context::{CallbackContext, PreGetContext, PreQueryContext};
use entiscope_model::{Entity, Key};
use std::fmt;
use thiserror::Error;

/// Failure reported by a hook.
///
/// The message is surfaced to the caller as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Creates a hook error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result returned by hooks.
pub type HookResult = Result<(), HookError>;

/// The point in an operation at which a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookStage {
    /// Before a get; may pre-populate results.
    PreGet,
    /// After entities were fetched from the backend.
    PostLoad,
    /// Before a put; may mutate entities.
    PrePut,
    /// After a put; entities carry their completed keys.
    PostPut,
    /// Before a delete.
    PreDelete,
    /// After a delete.
    PostDelete,
    /// Before a query; may rewrite the descriptor.
    PreQuery,
}

/// Hook run before a get.
pub type PreGetFn = Box<dyn Fn(&mut PreGetContext) -> HookResult + Send + Sync>;
/// Hook run over entities.
pub type EntityHookFn = Box<dyn Fn(&mut CallbackContext<Entity>) -> HookResult + Send + Sync>;
/// Hook run over keys.
pub type KeyHookFn = Box<dyn Fn(&mut CallbackContext<Key>) -> HookResult + Send + Sync>;
/// Hook run before a query.
pub type PreQueryFn = Box<dyn Fn(&mut PreQueryContext) -> HookResult + Send + Sync>;

/// A registered hook, one variant per stage.
pub enum Hook {
    /// See [`HookStage::PreGet`].
    PreGet(PreGetFn),
    /// See [`HookStage::PostLoad`].
    PostLoad(EntityHookFn),
    /// See [`HookStage::PrePut`].
    PrePut(EntityHookFn),
    /// See [`HookStage::PostPut`].
    PostPut(EntityHookFn),
    /// See [`HookStage::PreDelete`].
    PreDelete(KeyHookFn),
    /// See [`HookStage::PostDelete`].
    PostDelete(KeyHookFn),
    /// See [`HookStage::PreQuery`].
    PreQuery(PreQueryFn),
}

impl Hook {
    /// Creates a pre-get hook.
    pub fn pre_get<F>(f: F) -> Self
    where
        F: Fn(&mut PreGetContext) -> HookResult + Send + Sync + 'static,
    {
        Hook::PreGet(Box::new(f))
    }

    /// Creates a post-load hook.
    pub fn post_load<F>(f: F) -> Self
    where
        F: Fn(&mut CallbackContext<Entity>) -> HookResult + Send + Sync + 'static,
    {
        Hook::PostLoad(Box::new(f))
    }

    /// Creates a pre-put hook.
    pub fn pre_put<F>(f: F) -> Self
    where
        F: Fn(&mut CallbackContext<Entity>) -> HookResult + Send + Sync + 'static,
    {
        Hook::PrePut(Box::new(f))
    }

    /// Creates a post-put hook.
    pub fn post_put<F>(f: F) -> Self
    where
        F: Fn(&mut CallbackContext<Entity>) -> HookResult + Send + Sync + 'static,
    {
        Hook::PostPut(Box::new(f))
    }

    /// Creates a pre-delete hook.
    pub fn pre_delete<F>(f: F) -> Self
    where
        F: Fn(&mut CallbackContext<Key>) -> HookResult + Send + Sync + 'static,
    {
        Hook::PreDelete(Box::new(f))
    }

    /// Creates a post-delete hook.
    pub fn post_delete<F>(f: F) -> Self
    where
        F: Fn(&mut CallbackContext<Key>) -> HookResult + Send + Sync + 'static,
    {
        Hook::PostDelete(Box::new(f))
    }

    /// Creates a pre-query hook.
    pub fn pre_query<F>(f: F) -> Self
    where
        F: Fn(&mut PreQueryContext) -> HookResult + Send + Sync + 'static,
    {
        Hook::PreQuery(Box::new(f))
    }

    /// Returns the stage this hook runs at.
    #[must_use]
    pub fn stage(&self) -> HookStage {
        match self {
            Hook::PreGet(_) => HookStage::PreGet,
            Hook::PostLoad(_) => HookStage::PostLoad,
            Hook::PrePut(_) => HookStage::PrePut,
            Hook::PostPut(_) => HookStage::PostPut,
            Hook::PreDelete(_) => HookStage::PreDelete,
            Hook::PostDelete(_) => HookStage::PostDelete,
            Hook::PreQuery(_) => HookStage::PreQuery,
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.stage()).finish()
    }
}
