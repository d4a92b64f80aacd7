//! Backing store trait definition.

use crate::error::BackendResult;
use crate::types::{TransactionId, TransactionOptions};
use entiscope_model::{Entity, Key, KeyRange, QueryDescriptor};

/// Forward-only cursor over query results.
///
/// Cursors are lazy: implementations should defer evaluation until the
/// first call to `next`.
pub type EntityCursor = Box<dyn Iterator<Item = BackendResult<Entity>> + Send>;

/// A transactional key-value store holding entities.
///
/// Backends own isolation and concurrency control. The access layer only
/// threads transaction ids through and never inspects stored bytes.
///
/// # Invariants
///
/// - A read inside a transaction observes that transaction's own writes
/// - `commit` applies all pending writes atomically; `rollback` discards them
/// - Operations on a finished or unknown transaction fail
/// - `put` with an incomplete key assigns an id and returns the completed key
/// - `delete` of an absent key succeeds
/// - `prepare` honors the query's fetch mode while materializing results
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - Reference store for tests
pub trait Backend: Send + Sync {
    /// Begins a new transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot start a transaction.
    fn begin_transaction(&self, options: &TransactionOptions) -> BackendResult<TransactionId>;

    /// Commits a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown or the commit fails.
    fn commit(&self, tx: TransactionId) -> BackendResult<()>;

    /// Rolls a transaction back.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown.
    fn rollback(&self, tx: TransactionId) -> BackendResult<()>;

    /// Reads an entity.
    ///
    /// Returns `None` if no entity is visible under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete, the transaction is unknown,
    /// or the stored entity cannot be decoded.
    fn get(&self, tx: Option<TransactionId>, key: &Key) -> BackendResult<Option<Entity>>;

    /// Writes an entity, returning its (possibly newly completed) key.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown or read-only.
    fn put(&self, tx: Option<TransactionId>, entity: &Entity) -> BackendResult<Key>;

    /// Deletes an entity. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is incomplete or the transaction is
    /// unknown or read-only.
    fn delete(&self, tx: Option<TransactionId>, key: &Key) -> BackendResult<()>;

    /// Prepares a lazy cursor over the query's results.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is unknown. Evaluation errors are
    /// reported through the cursor.
    fn prepare(
        &self,
        tx: Option<TransactionId>,
        query: &QueryDescriptor,
    ) -> BackendResult<EntityCursor>;

    /// Reserves `count` ids for `kind` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero.
    fn allocate_ids(&self, kind: &str, parent: Option<&Key>, count: u64)
        -> BackendResult<KeyRange>;
}
