//! # Entiscope Testkit
//!
//! Test utilities for Entiscope.
//!
//! This crate provides:
//! - Test fixtures and datastore helpers
//! - Property-based test generators using proptest
//! - A hook recorder that logs every callback invocation
//! - Cross-crate integration test helpers
//!
//! ## Usage
//!
//! ```rust
//! use entiscope_testkit::prelude::*;
//! use entiscope_model::{Entity, Key};
//!
//! with_datastore(|datastore, ctx| {
//!     let key = datastore.put(ctx, None, Entity::new(Key::with_id("Person", 1))).unwrap();
//!     assert!(datastore.get(ctx, None, &key).is_ok());
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod recorder;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::recorder::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use recorder::*;
