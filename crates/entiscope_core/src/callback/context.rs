//! Contexts handed to hooks.

use crate::transaction::Transaction;
use entiscope_model::{Entity, Key, QueryDescriptor, Value};
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;

/// Named values shared between the pre and post hooks of one operation.
pub type Attachments = BTreeMap<String, Value>;

/// Something that belongs to an entity kind.
pub trait Kinded {
    /// Returns the kind.
    fn kind(&self) -> &str;
}

impl Kinded for Entity {
    fn kind(&self) -> &str {
        Entity::kind(self)
    }
}

impl Kinded for Key {
    fn kind(&self) -> &str {
        Key::kind(self)
    }
}

/// Per-call bundle handed to hooks.
///
/// Hooks run once per kind present in the batch and see the whole batch:
/// [`elements`](Self::elements) holds every element in first-occurrence
/// order and [`current_elements`](Self::current_elements) narrows it to the
/// kind whose hooks are running.
#[derive(Debug)]
pub struct CallbackContext<T> {
    kind: String,
    transaction: Option<Transaction>,
    elements: Vec<T>,
    attachments: Attachments,
}

impl<T: Kinded> CallbackContext<T> {
    pub(crate) fn new(
        transaction: Option<Transaction>,
        elements: Vec<T>,
        attachments: Attachments,
    ) -> Self {
        Self {
            kind: String::new(),
            transaction,
            elements,
            attachments,
        }
    }

    /// Returns the kind whose hooks are running.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the transaction the operation runs in.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Returns every element of the batch.
    #[must_use]
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Returns every element of the batch, mutably.
    pub fn elements_mut(&mut self) -> &mut [T] {
        &mut self.elements
    }

    /// Iterates over the elements of the current kind.
    pub fn current_elements(&self) -> impl Iterator<Item = &T> {
        let kind = self.kind.as_str();
        self.elements.iter().filter(move |e| e.kind() == kind)
    }

    /// Iterates mutably over the elements of the current kind.
    pub fn current_elements_mut(&mut self) -> impl Iterator<Item = &mut T> {
        let kind = self.kind.as_str();
        self.elements.iter_mut().filter(move |e| e.kind() == kind)
    }

    /// Returns the attachments.
    #[must_use]
    pub fn attachments(&self) -> &Attachments {
        &self.attachments
    }

    /// Returns one attachment.
    #[must_use]
    pub fn attachment(&self, name: &str) -> Option<&Value> {
        self.attachments.get(name)
    }

    /// Sets an attachment, returning the previous value.
    pub fn attach(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attachments.insert(name.into(), value.into())
    }

    pub(crate) fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = Vec::new();
        for element in &self.elements {
            if !kinds.iter().any(|k| k == element.kind()) {
                kinds.push(element.kind().to_string());
            }
        }
        kinds
    }

    pub(crate) fn set_kind(&mut self, kind: &str) {
        kind.clone_into(&mut self.kind);
    }

    pub(crate) fn into_parts(self) -> (Vec<T>, Attachments) {
        (self.elements, self.attachments)
    }
}

/// Context of pre-get hooks.
///
/// Entities placed in the result map are returned without a backend fetch.
/// The requested keys are read-only: a hook answers a key through
/// [`set_result`](Self::set_result) rather than rewriting it.
///
/// ```compile_fail
/// use entiscope_core::{Hook, HookRegistry};
/// use entiscope_model::Key;
///
/// HookRegistry::new().with(
///     "Person",
///     Hook::pre_get(|ctx| {
///         ctx.elements_mut()[0] = Key::with_id("Person", 2);
///         Ok(())
///     }),
/// );
/// ```
#[derive(Debug)]
pub struct PreGetContext {
    base: CallbackContext<Key>,
    results: HashMap<Key, Entity>,
}

impl PreGetContext {
    pub(crate) fn new(base: CallbackContext<Key>) -> Self {
        Self {
            base,
            results: HashMap::new(),
        }
    }

    /// Provides the entity for a key, skipping its backend fetch.
    ///
    /// The entity is stored under `key` whatever its own key says.
    pub fn set_result(&mut self, key: Key, entity: Entity) -> Option<Entity> {
        self.results.insert(key, entity)
    }

    /// Returns the entity already provided for a key.
    #[must_use]
    pub fn result(&self, key: &Key) -> Option<&Entity> {
        self.results.get(key)
    }

    /// Returns every provided entity.
    #[must_use]
    pub fn results(&self) -> &HashMap<Key, Entity> {
        &self.results
    }

    /// Sets an attachment, returning the previous value.
    pub fn attach(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.base.attach(name, value)
    }

    pub(crate) fn set_kind(&mut self, kind: &str) {
        self.base.set_kind(kind);
    }

    pub(crate) fn into_parts(self) -> (CallbackContext<Key>, HashMap<Key, Entity>) {
        (self.base, self.results)
    }
}

impl Deref for PreGetContext {
    type Target = CallbackContext<Key>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

/// Context of pre-query hooks.
#[derive(Debug)]
pub struct PreQueryContext {
    transaction: Option<Transaction>,
    query: QueryDescriptor,
    attachments: Attachments,
}

impl PreQueryContext {
    pub(crate) fn new(transaction: Option<Transaction>, query: QueryDescriptor) -> Self {
        Self {
            transaction,
            query,
            attachments: Attachments::new(),
        }
    }

    /// Returns the kind queried, `None` for kindless queries.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.query.kind()
    }

    /// Returns the transaction the query runs in.
    #[must_use]
    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    /// Returns the query.
    #[must_use]
    pub fn query(&self) -> &QueryDescriptor {
        &self.query
    }

    /// Returns the query for rewriting.
    pub fn query_mut(&mut self) -> &mut QueryDescriptor {
        &mut self.query
    }

    /// Returns the attachments.
    pub fn attachments_mut(&mut self) -> &mut Attachments {
        &mut self.attachments
    }

    pub(crate) fn into_query(self) -> QueryDescriptor {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_in_first_occurrence_order() {
        let ctx = CallbackContext::new(
            None,
            vec![
                Key::with_id("B", 1),
                Key::with_id("A", 1),
                Key::with_id("B", 2),
            ],
            Attachments::new(),
        );
        assert_eq!(ctx.kinds(), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn current_elements_follow_kind() {
        let mut ctx = CallbackContext::new(
            None,
            vec![
                Entity::new(Key::with_id("B", 1)),
                Entity::new(Key::with_id("A", 1)),
            ],
            Attachments::new(),
        );
        ctx.set_kind("A");
        for entity in ctx.current_elements_mut() {
            entity.set_property("seen", true);
        }
        assert!(ctx.elements()[1].has_property("seen"));
        assert!(!ctx.elements()[0].has_property("seen"));
        assert_eq!(ctx.current_elements().count(), 1);
    }

    #[test]
    fn pre_get_results_and_attachments() {
        let base = CallbackContext::new(None, vec![Key::with_id("A", 1)], Attachments::new());
        let mut ctx = PreGetContext::new(base);
        ctx.attach("cached", true);
        ctx.set_result(Key::with_id("A", 1), Entity::new(Key::with_id("A", 1)));

        assert!(ctx.result(&Key::with_id("A", 1)).is_some());
        assert_eq!(ctx.attachment("cached"), Some(&Value::Bool(true)));
    }
}
