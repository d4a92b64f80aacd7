//! # Entiscope Model
//!
//! Data model shared by every Entiscope crate.
//!
//! This crate provides:
//! - [`Key`]: immutable composite identifier (kind, id or name, ancestor path)
//! - [`Entity`]: a key plus an ordered property map of typed [`Value`]s
//! - [`QueryDescriptor`]: kind, ancestor, predicate tree, sort and fetch mode
//! - Canonical CBOR encoding of entities ([`encode_entity`], [`decode_entity`])
//!
//! ## Usage
//!
//! ```
//! use entiscope_model::{decode_entity, encode_entity, Entity, Key};
//!
//! let entity = Entity::new(Key::with_id("Person", 1))
//!     .with_property("name", "John")
//!     .with_property("age", 42i64);
//!
//! let bytes = encode_entity(&entity).unwrap();
//! let decoded = decode_entity(&bytes).unwrap();
//! assert_eq!(entity, decoded);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod entity;
mod error;
mod key;
mod query;
mod value;

pub use codec::{decode_entity, encode_entity};
pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use key::{Key, KeyId, KeyRange};
pub use query::{FetchMode, Filter, FilterOperator, QueryDescriptor, SortDirection, SortOrder};
pub use value::Value;
