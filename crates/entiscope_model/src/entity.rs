//! Entities.

use crate::key::Key;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity: a key plus an ordered map of named properties.
///
/// Entities handed out by reads are snapshots; changing one never affects
/// what is stored until it is put again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    key: Key,
    properties: BTreeMap<String, Value>,
}

impl Entity {
    /// Creates an entity with no properties.
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self {
            key,
            properties: BTreeMap::new(),
        }
    }

    /// Creates an entity from a key and a property map.
    #[must_use]
    pub fn from_parts(key: Key, properties: BTreeMap<String, Value>) -> Self {
        Self { key, properties }
    }

    /// Adds a property, builder style.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Replaces the key, returning the previous one.
    pub fn set_key(&mut self, key: Key) -> Key {
        std::mem::replace(&mut self.key, key)
    }

    /// Returns the kind of the entity's key.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.key.kind()
    }

    /// Sets a property, returning the previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.into(), value.into())
    }

    /// Returns a property value.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Removes a property.
    pub fn remove_property(&mut self, name: &str) -> Option<Value> {
        self.properties.remove(name)
    }

    /// Returns true if the property is present.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Iterates over property names in order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Returns the property map.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Returns the number of properties.
    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Splits the entity into key and properties.
    #[must_use]
    pub fn into_parts(self) -> (Key, BTreeMap<String, Value>) {
        (self.key, self.properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_are_ordered() {
        let entity = Entity::new(Key::with_id("P", 1))
            .with_property("zeta", 1i64)
            .with_property("alpha", 2i64);
        let names: Vec<&str> = entity.property_names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn set_and_remove() {
        let mut entity = Entity::new(Key::with_id("P", 1));
        assert!(entity.set_property("a", "x").is_none());
        assert_eq!(entity.set_property("a", "y"), Some(Value::from("x")));
        assert_eq!(entity.remove_property("a"), Some(Value::from("y")));
        assert!(!entity.has_property("a"));
    }

    #[test]
    fn set_key_returns_previous() {
        let mut entity = Entity::new(Key::incomplete("P"));
        let old = entity.set_key(Key::with_id("P", 3));
        assert!(!old.is_complete());
        assert_eq!(entity.kind(), "P");
    }
}
