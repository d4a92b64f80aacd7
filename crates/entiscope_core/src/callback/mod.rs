//! Callback hooks around get, put, delete and query.
//!
//! Hooks are registered per kind (or for all kinds) in a [`HookRegistry`]
//! and executed by a [`CallbackPipeline`]. For a batch, the hooks of each
//! kind present run once, in registration order, over the whole
//! [`CallbackContext`]. A failing hook aborts the operation before the
//! backend is touched; mutations made by earlier hooks stay applied.

mod context;
mod hook;
mod pipeline;
mod registry;

pub use context::{Attachments, CallbackContext, Kinded, PreGetContext, PreQueryContext};
pub use hook::{
    EntityHookFn, Hook, HookError, HookResult, HookStage, KeyHookFn, PreGetFn, PreQueryFn,
};
pub use pipeline::CallbackPipeline;
pub use registry::HookRegistry;
