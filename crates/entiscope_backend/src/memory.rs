//! In-memory backing store.

use crate::backend::{Backend, EntityCursor};
use crate::error::{BackendError, BackendResult};
use crate::stats::BackendStats;
use crate::types::{TransactionId, TransactionOptions};
use entiscope_model::{
    decode_entity, encode_entity, Entity, FetchMode, Key, KeyId, KeyRange, QueryDescriptor,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A write recorded inside a transaction.
#[derive(Debug, Clone)]
enum PendingWrite {
    /// Insert or update an entity (canonical CBOR bytes).
    Put { payload: Vec<u8> },
    /// Delete an entity.
    Delete,
}

#[derive(Debug)]
struct PendingTransaction {
    options: TransactionOptions,
    writes: BTreeMap<Key, PendingWrite>,
}

#[derive(Debug, Default)]
struct StoreState {
    /// Committed entities as encoded snapshots.
    committed: BTreeMap<Key, Vec<u8>>,
    /// Active transactions and their pending writes.
    transactions: HashMap<TransactionId, PendingTransaction>,
    /// Last id handed out per kind.
    id_counters: HashMap<String, i64>,
}

impl StoreState {
    fn pending(&self, tx: TransactionId) -> BackendResult<&PendingTransaction> {
        self.transactions
            .get(&tx)
            .ok_or(BackendError::UnknownTransaction { id: tx })
    }

    fn writable(&mut self, tx: TransactionId) -> BackendResult<&mut PendingTransaction> {
        let pending = self
            .transactions
            .get_mut(&tx)
            .ok_or(BackendError::UnknownTransaction { id: tx })?;
        if pending.options.read_only {
            return Err(BackendError::ReadOnlyTransaction { id: tx });
        }
        Ok(pending)
    }

    /// Reserves `count` consecutive ids for `kind`, returning the first and last.
    fn next_ids(&mut self, kind: &str, count: u64) -> BackendResult<(i64, i64)> {
        let counter = self.id_counters.entry(kind.to_string()).or_insert(0);
        let end = i64::try_from(count)
            .ok()
            .and_then(|count| counter.checked_add(count))
            .ok_or_else(|| {
                BackendError::invalid_argument(format!(
                    "cannot allocate {count} ids for kind {kind}: id space exhausted"
                ))
            })?;
        let start = *counter + 1;
        *counter = end;
        Ok((start, end))
    }

    /// Moves the id counter for `kind` past an explicitly chosen id.
    fn observe_id(&mut self, key: &Key) {
        if let Some(KeyId::Id(id)) = key.id() {
            let counter = self.id_counters.entry(key.kind().to_string()).or_insert(0);
            *counter = (*counter).max(*id);
        }
    }

    /// Returns the bytes visible under `key`: the transaction's own pending
    /// write first, then committed data.
    fn visible(&self, tx: Option<TransactionId>, key: &Key) -> BackendResult<Option<&[u8]>> {
        if let Some(id) = tx {
            match self.pending(id)?.writes.get(key) {
                Some(PendingWrite::Put { payload }) => return Ok(Some(payload)),
                Some(PendingWrite::Delete) => return Ok(None),
                None => {}
            }
        }
        Ok(self.committed.get(key).map(Vec::as_slice))
    }

    /// Collects every visible entity whose key passes the kind and ancestor
    /// restrictions, in key order.
    fn scan(&self, tx: Option<TransactionId>, query: &QueryDescriptor) -> BackendResult<Vec<(Key, Vec<u8>)>> {
        let key_matches = |key: &Key| {
            query.kind().map_or(true, |kind| key.kind() == kind)
                && query.ancestor().map_or(true, |a| key.has_ancestor(a))
        };

        let mut merged: BTreeMap<&Key, Option<&Vec<u8>>> = self
            .committed
            .iter()
            .filter(|(key, _)| key_matches(key))
            .map(|(key, payload)| (key, Some(payload)))
            .collect();

        if let Some(id) = tx {
            for (key, write) in &self.pending(id)?.writes {
                if !key_matches(key) {
                    continue;
                }
                match write {
                    PendingWrite::Put { payload } => merged.insert(key, Some(payload)),
                    PendingWrite::Delete => merged.insert(key, None),
                };
            }
        }

        Ok(merged
            .into_iter()
            .filter_map(|(key, payload)| payload.map(|p| (key.clone(), p.clone())))
            .collect())
    }
}

/// An in-memory backing store.
///
/// Entities are kept as encoded CBOR snapshots, so every read decodes a
/// fresh copy. Transactions buffer their writes until commit; reads and
/// queries inside a transaction see its own pending writes merged over the
/// committed data. There is no conflict detection: the last commit wins.
///
/// # Thread Safety
///
/// This backend is thread-safe and can be shared across threads.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<StoreState>>,
    next_txid: AtomicU64,
    stats: Arc<BackendStats>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the statistics counters.
    #[must_use]
    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    /// Returns the number of committed entities.
    #[must_use]
    pub fn committed_count(&self) -> usize {
        self.state.read().committed.len()
    }

    /// Returns the number of transactions that are neither committed nor
    /// rolled back.
    #[must_use]
    pub fn active_transaction_count(&self) -> usize {
        self.state.read().transactions.len()
    }

    /// Drops all committed data and pending transactions.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.committed.clear();
        state.transactions.clear();
        state.id_counters.clear();
    }
}

impl Backend for InMemoryBackend {
    fn begin_transaction(&self, options: &TransactionOptions) -> BackendResult<TransactionId> {
        let id = TransactionId::new(self.next_txid.fetch_add(1, Ordering::SeqCst) + 1);
        self.state.write().transactions.insert(
            id,
            PendingTransaction {
                options: *options,
                writes: BTreeMap::new(),
            },
        );
        self.stats.record_transaction_start();
        Ok(id)
    }

    fn commit(&self, tx: TransactionId) -> BackendResult<()> {
        let mut state = self.state.write();
        let pending = state
            .transactions
            .remove(&tx)
            .ok_or(BackendError::UnknownTransaction { id: tx })?;

        let write_count = pending.writes.len();
        for (key, write) in pending.writes {
            match write {
                PendingWrite::Put { payload } => {
                    state.committed.insert(key, payload);
                }
                PendingWrite::Delete => {
                    state.committed.remove(&key);
                }
            }
        }
        drop(state);

        self.stats.record_transaction_commit();
        debug!(%tx, writes = write_count, "committed transaction");
        Ok(())
    }

    fn rollback(&self, tx: TransactionId) -> BackendResult<()> {
        let pending = self
            .state
            .write()
            .transactions
            .remove(&tx)
            .ok_or(BackendError::UnknownTransaction { id: tx })?;
        self.stats.record_transaction_rollback();
        debug!(%tx, discarded = pending.writes.len(), "rolled back transaction");
        Ok(())
    }

    fn get(&self, tx: Option<TransactionId>, key: &Key) -> BackendResult<Option<Entity>> {
        if !key.is_complete() {
            return Err(BackendError::IncompleteKey {
                kind: key.kind().to_string(),
            });
        }
        self.stats.record_get();
        let state = self.state.read();
        match state.visible(tx, key)? {
            Some(payload) => Ok(Some(decode_entity(payload)?)),
            None => Ok(None),
        }
    }

    fn put(&self, tx: Option<TransactionId>, entity: &Entity) -> BackendResult<Key> {
        let mut state = self.state.write();
        if let Some(id) = tx {
            state.writable(id)?;
        }

        let key = if entity.key().is_complete() {
            state.observe_id(entity.key());
            entity.key().clone()
        } else {
            let (id, _) = state.next_ids(entity.kind(), 1)?;
            entity.key().complete_with(id)
        };

        let mut stored = entity.clone();
        stored.set_key(key.clone());
        let payload = encode_entity(&stored)?;

        match tx {
            Some(id) => {
                state
                    .writable(id)?
                    .writes
                    .insert(key.clone(), PendingWrite::Put { payload });
            }
            None => {
                state.committed.insert(key.clone(), payload);
            }
        }
        self.stats.record_put();
        Ok(key)
    }

    fn delete(&self, tx: Option<TransactionId>, key: &Key) -> BackendResult<()> {
        if !key.is_complete() {
            return Err(BackendError::IncompleteKey {
                kind: key.kind().to_string(),
            });
        }
        let mut state = self.state.write();
        match tx {
            Some(id) => {
                state
                    .writable(id)?
                    .writes
                    .insert(key.clone(), PendingWrite::Delete);
            }
            None => {
                state.committed.remove(key);
            }
        }
        self.stats.record_delete();
        Ok(())
    }

    fn prepare(
        &self,
        tx: Option<TransactionId>,
        query: &QueryDescriptor,
    ) -> BackendResult<EntityCursor> {
        if let Some(id) = tx {
            self.state.read().pending(id)?;
        }
        Ok(Box::new(MemoryCursor {
            state: Arc::clone(&self.state),
            stats: Arc::clone(&self.stats),
            tx,
            query: query.clone(),
            results: None,
        }))
    }

    fn allocate_ids(
        &self,
        kind: &str,
        parent: Option<&Key>,
        count: u64,
    ) -> BackendResult<KeyRange> {
        if count == 0 {
            return Err(BackendError::invalid_argument("cannot allocate zero ids"));
        }
        let (start, end) = self.state.write().next_ids(kind, count)?;
        self.stats.record_ids_allocated(count);
        Ok(KeyRange::new(kind, parent.cloned(), start, end))
    }
}

/// A query result before the fetch mode is applied.
enum Candidate {
    /// Not decoded yet; keys-only results never need the payload.
    Raw(Key, Vec<u8>),
    /// Decoded because filtering or sorting needed the properties.
    Decoded(Entity),
}

impl Candidate {
    fn key(&self) -> &Key {
        match self {
            Candidate::Raw(key, _) => key,
            Candidate::Decoded(entity) => entity.key(),
        }
    }

    fn into_entity(self) -> BackendResult<Entity> {
        match self {
            Candidate::Raw(_, payload) => Ok(decode_entity(&payload)?),
            Candidate::Decoded(entity) => Ok(entity),
        }
    }
}

/// Lazy cursor over the in-memory store.
///
/// Evaluation happens on the first `next`, against the data visible at that
/// moment. The fetch mode is applied per result while materializing.
struct MemoryCursor {
    state: Arc<RwLock<StoreState>>,
    stats: Arc<BackendStats>,
    tx: Option<TransactionId>,
    query: QueryDescriptor,
    results: Option<std::vec::IntoIter<Candidate>>,
}

impl MemoryCursor {
    fn evaluate(&self) -> BackendResult<Vec<Candidate>> {
        let raw = self.state.read().scan(self.tx, &self.query)?;
        self.stats.record_query();

        if self.query.filter().is_none() && self.query.sort().is_empty() {
            return Ok(raw
                .into_iter()
                .map(|(key, payload)| Candidate::Raw(key, payload))
                .collect());
        }

        let mut entities = raw
            .iter()
            .map(|(_, payload)| decode_entity(payload))
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(filter) = self.query.filter() {
            entities.retain(|entity| filter.matches(entity));
        }
        entities.sort_by(|a, b| self.query.compare(a, b));
        Ok(entities.into_iter().map(Candidate::Decoded).collect())
    }

    fn materialize(&self, candidate: Candidate) -> BackendResult<Option<Entity>> {
        match self.query.fetch() {
            FetchMode::KeysOnly => Ok(Some(Entity::new(candidate.key().clone()))),
            FetchMode::Full => {
                let entity = candidate.into_entity()?;
                self.stats.record_materialized(entity.property_count() as u64);
                Ok(Some(entity))
            }
            FetchMode::Projection(names) => {
                let (key, mut properties) = candidate.into_entity()?.into_parts();
                let projected: BTreeMap<_, _> = names
                    .iter()
                    .filter_map(|name| properties.remove_entry(name))
                    .collect();
                if projected.is_empty() {
                    return Ok(None);
                }
                self.stats.record_materialized(projected.len() as u64);
                Ok(Some(Entity::from_parts(key, projected)))
            }
        }
    }
}

impl Iterator for MemoryCursor {
    type Item = BackendResult<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.results.is_none() {
            match self.evaluate() {
                Ok(candidates) => self.results = Some(candidates.into_iter()),
                Err(e) => {
                    self.results = Some(Vec::new().into_iter());
                    return Some(Err(e));
                }
            }
        }

        loop {
            let candidate = self.results.as_mut()?.next()?;
            match self.materialize(candidate) {
                Ok(Some(entity)) => return Some(Ok(entity)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
