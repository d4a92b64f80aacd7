//! Entity keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The identifying part of a key: a numeric id or a name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyId {
    /// Numeric identifier, usually allocated by the backing store.
    Id(i64),
    /// Application-chosen name.
    Name(String),
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// Composite identifier of an entity.
///
/// A key is made of:
/// - a kind (the logical category, analogous to a table name)
/// - an optional numeric id or name
/// - an optional parent key forming the ancestor path
///
/// Keys are immutable once constructed. Equality, hashing and ordering are
/// structural, so keys can be used directly as map keys. A key without an id
/// is *incomplete*; the backing store assigns an id when an entity with an
/// incomplete key is put.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: Option<KeyId>,
    parent: Option<Box<Key>>,
}

impl Key {
    /// Creates an incomplete key for `kind`.
    #[must_use]
    pub fn incomplete(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            parent: None,
        }
    }

    /// Creates a key with a numeric id.
    #[must_use]
    pub fn with_id(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id: Some(KeyId::Id(id)),
            parent: None,
        }
    }

    /// Creates a key with a name.
    #[must_use]
    pub fn with_name(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: Some(KeyId::Name(name.into())),
            parent: None,
        }
    }

    /// Returns a copy of this key placed under `parent`.
    #[must_use]
    pub fn child_of(mut self, parent: Key) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Returns the completed copy of this key with the given numeric id.
    ///
    /// The receiver is left untouched; keys never change in place.
    #[must_use]
    pub fn complete_with(&self, id: i64) -> Self {
        Self {
            kind: self.kind.clone(),
            id: Some(KeyId::Id(id)),
            parent: self.parent.clone(),
        }
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the id or name, if the key is complete.
    #[must_use]
    pub fn id(&self) -> Option<&KeyId> {
        self.id.as_ref()
    }

    /// Returns the parent key.
    #[must_use]
    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// Returns true if the key carries an id or name.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.id.is_some()
    }

    /// Iterates over the ancestors of this key, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = &Key> {
        std::iter::successors(self.parent(), |key| key.parent())
    }

    /// Returns true if `ancestor` is this key or one of its ancestors.
    #[must_use]
    pub fn has_ancestor(&self, ancestor: &Key) -> bool {
        self == ancestor || self.ancestors().any(|key| key == ancestor)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = &self.parent {
            write!(f, "{parent}/")?;
        }
        match &self.id {
            Some(id) => write!(f, "{}({id:?})", self.kind),
            None => write!(f, "{}(?)", self.kind),
        }
    }
}

/// A contiguous range of ids allocated for one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRange {
    kind: String,
    parent: Option<Key>,
    start: i64,
    end: i64,
}

impl KeyRange {
    /// Creates a range covering ids `start..=end`.
    #[must_use]
    pub fn new(kind: impl Into<String>, parent: Option<Key>, start: i64, end: i64) -> Self {
        Self {
            kind: kind.into(),
            parent,
            start,
            end,
        }
    }

    /// Returns the kind the ids were allocated for.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the first id of the range.
    #[must_use]
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Returns the last id of the range (inclusive).
    #[must_use]
    pub fn end(&self) -> i64 {
        self.end
    }

    /// Returns the number of ids in the range.
    #[must_use]
    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            (self.end - self.start) as u64 + 1
        }
    }

    /// Returns true if the range holds no ids.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the keys of the range.
    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        (self.start..=self.end).map(move |id| {
            let key = Key::with_id(self.kind.clone(), id);
            match &self.parent {
                Some(parent) => key.child_of(parent.clone()),
                None => key,
            }
        })
    }
}
