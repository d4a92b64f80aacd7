//! # Entiscope Backend
//!
//! Backing key-value store contract for Entiscope.
//!
//! The access layer in `entiscope_core` never owns isolation or durability;
//! it delegates every read, write, query and transaction boundary to a
//! [`Backend`]. This crate defines that contract and ships
//! [`InMemoryBackend`], the reference store used by tests and demos.
//!
//! ## Design Principles
//!
//! - Backends own visibility rules; callers only pass transaction ids
//! - Every operation takes an optional transaction id
//! - Query cursors are lazy and honor the fetch mode while materializing
//! - Must be `Send + Sync` for concurrent access
//!
//! ## Example
//!
//! ```rust
//! use entiscope_backend::{Backend, InMemoryBackend, TransactionOptions};
//! use entiscope_model::{Entity, Key};
//!
//! let backend = InMemoryBackend::new();
//! let tx = backend.begin_transaction(&TransactionOptions::default()).unwrap();
//! let key = backend
//!     .put(Some(tx), &Entity::new(Key::with_id("Person", 1)))
//!     .unwrap();
//! assert!(backend.get(None, &key).unwrap().is_none());
//! backend.commit(tx).unwrap();
//! assert!(backend.get(None, &key).unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;
mod stats;
mod types;

pub use backend::{Backend, EntityCursor};
pub use error::{BackendError, BackendResult};
pub use memory::InMemoryBackend;
pub use stats::{BackendStats, StatsSnapshot};
pub use types::{TransactionId, TransactionOptions};
