//! Canonical CBOR encoding of entities.
//!
//! Property maps are `BTreeMap`s, so the same entity always produces the same
//! bytes.

use crate::entity::Entity;
use crate::error::{ModelError, ModelResult};

/// Encodes an entity to CBOR bytes.
pub fn encode_entity(entity: &Entity) -> ModelResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(entity, &mut buf)
        .map_err(|e| ModelError::encoding_failed(e.to_string()))?;
    Ok(buf)
}

/// Decodes an entity from CBOR bytes.
pub fn decode_entity(bytes: &[u8]) -> ModelResult<Entity> {
    ciborium::from_reader(bytes).map_err(|e| ModelError::decoding_failed(e.to_string()))
}
