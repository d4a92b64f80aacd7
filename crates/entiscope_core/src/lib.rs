//! # Entiscope Core
//!
//! Transactional entity-access layer over an Entiscope backend.
//!
//! This crate provides:
//! - Ambient transactions tracked on an explicit execution context, with
//!   paired suspend and resume for crossing thread boundaries
//! - Per-kind callback hooks around get, put, delete and query
//! - Batch deduplication with results re-expanded to the caller's input
//! - A blocking facade and a future-returning facade on a bounded worker pool
//! - Lazy query preparation with keys-only and projection fetches pushed
//!   down to the backend
//!
//! Isolation and durability belong to the backend; this layer only decides
//! which transaction an operation runs in and what runs around it.
//!
//! ## Example
//!
//! ```rust
//! use entiscope_backend::InMemoryBackend;
//! use entiscope_core::{Datastore, DatastoreConfig, Hook, HookRegistry, TxContext};
//! use entiscope_model::{Entity, Key, QueryDescriptor};
//! use std::sync::Arc;
//!
//! let hooks = HookRegistry::new().with(
//!     "Person",
//!     Hook::pre_put(|ctx| {
//!         for person in ctx.current_elements_mut() {
//!             person.set_property("checked", true);
//!         }
//!         Ok(())
//!     }),
//! );
//! let datastore = Datastore::with_config(
//!     Arc::new(InMemoryBackend::new()),
//!     DatastoreConfig::new().hooks(hooks),
//! );
//!
//! let ctx = TxContext::new();
//! let tx = datastore.begin_transaction(&ctx).unwrap();
//! datastore
//!     .put(&ctx, None, Entity::new(Key::with_id("Person", 1)).with_property("name", "Ann"))
//!     .unwrap();
//! tx.commit().unwrap();
//!
//! let names = datastore
//!     .prepare(&ctx, None, QueryDescriptor::new("Person").project(["name"]))
//!     .unwrap()
//!     .as_list(None)
//!     .unwrap();
//! assert_eq!(names.len(), 1);
//! assert!(!names[0].has_property("checked"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ambient;
mod async_datastore;
mod batch;
mod callback;
mod config;
mod datastore;
mod error;
mod query;
mod transaction;
mod worker;

pub use ambient::{ResumeGuard, SuspendGuard, SuspendedTransactions, TxContext};
pub use async_datastore::AsyncDatastore;
pub use batch::{EntityBatch, EntityMap, KeyBatch};
pub use callback::{
    Attachments, CallbackContext, CallbackPipeline, EntityHookFn, Hook, HookError,
    HookRegistry, HookResult, HookStage, KeyHookFn, Kinded, PreGetContext, PreGetFn,
    PreQueryContext, PreQueryFn,
};
pub use config::{DatastoreConfig, WorkerPoolConfig};
pub use datastore::Datastore;
pub use error::{CoreError, CoreResult};
pub use query::{PreparedQuery, QueryCursor};
pub use transaction::{Transaction, TransactionManager, TransactionState};
pub use worker::{OperationFuture, WorkerPool};
