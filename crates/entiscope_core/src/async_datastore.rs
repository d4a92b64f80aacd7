//! Asynchronous datastore facade.

use crate::ambient::TxContext;
use crate::batch::{EntityBatch, EntityMap, KeyBatch};
use crate::callback::CallbackPipeline;
use crate::config::DatastoreConfig;
use crate::datastore::DatastoreCore;
use crate::error::{CoreError, CoreResult};
use crate::query::PreparedQuery;
use crate::transaction::Transaction;
use crate::worker::{OperationFuture, WorkerPool};
use entiscope_backend::{Backend, TransactionOptions};
use entiscope_model::{Entity, Key, KeyRange, QueryDescriptor};
use std::sync::Arc;
use tracing::trace;

/// Future-returning datastore facade.
///
/// Pre-hooks run on the calling thread, so their failures come back as an
/// already-failed future and nothing is scheduled. The backend call and the
/// post-hooks run on the worker pool.
///
/// Workers carry no ambient transaction of their own. Around every scheduled
/// operation the caller's context is suspended, the handle is carried into
/// the task and resumed on a fresh worker context for the duration of the
/// backend call, then detached again. The caller's context is resumed as
/// soon as the task is queued. An operation prepared under an ambient
/// transaction fails with `AmbientMisuse` if the executing context does not
/// carry that same transaction.
pub struct AsyncDatastore {
    core: Arc<DatastoreCore>,
    pool: Arc<WorkerPool>,
}

impl AsyncDatastore {
    /// Creates a facade with the default configuration.
    pub fn new(backend: Arc<dyn Backend>) -> CoreResult<Self> {
        Self::with_config(backend, DatastoreConfig::default())
    }

    /// Creates a facade with a configuration, starting its worker pool.
    pub fn with_config(backend: Arc<dyn Backend>, config: DatastoreConfig) -> CoreResult<Self> {
        let pool = WorkerPool::new(&config.worker_pool)?;
        Ok(Self {
            core: Arc::new(DatastoreCore::new(backend, config)),
            pool: Arc::new(pool),
        })
    }

    /// Returns the backing store.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        self.core.backend()
    }

    /// Returns the callback pipeline, building it if needed.
    #[must_use]
    pub fn pipeline(&self) -> &CallbackPipeline {
        self.core.pipeline()
    }

    /// Returns the worker pool.
    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Begins a transaction and makes it ambient on `ctx`.
    ///
    /// Completes immediately: the transaction must land on the caller's
    /// context.
    pub fn begin_transaction(&self, ctx: &TxContext) -> OperationFuture<Transaction> {
        OperationFuture::ready(self.core.transactions().begin(ctx, None))
    }

    /// Begins a transaction with explicit options.
    pub fn begin_transaction_with(
        &self,
        ctx: &TxContext,
        options: &TransactionOptions,
    ) -> OperationFuture<Transaction> {
        OperationFuture::ready(self.core.transactions().begin(ctx, Some(options)))
    }

    /// Returns the ambient transaction.
    #[must_use]
    pub fn current_transaction(&self, ctx: &TxContext) -> Option<Transaction> {
        ctx.current()
    }

    /// Gets one entity; fails with `EntityNotFound` when absent.
    pub fn get(&self, ctx: &TxContext, tx: Option<&Transaction>, key: Key) -> OperationFuture<Entity> {
        let plan = match self.core.prepare_get(ctx, tx, KeyBatch::new([key.clone()])) {
            Ok(plan) => plan,
            Err(e) => return OperationFuture::failed(e),
        };
        self.schedule(ctx, move |core, worker| {
            core.execute_get(worker, plan)?
                .into_iter()
                .next()
                .map(|(_, entity)| Arc::unwrap_or_clone(entity))
                .ok_or_else(|| CoreError::entity_not_found(key))
        })
    }

    /// Gets several entities. Missing keys are omitted from the result.
    pub fn get_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        keys: impl IntoIterator<Item = Key>,
    ) -> OperationFuture<EntityMap> {
        let plan = match self.core.prepare_get(ctx, tx, KeyBatch::new(keys)) {
            Ok(plan) => plan,
            Err(e) => return OperationFuture::failed(e),
        };
        self.schedule(ctx, move |core, worker| core.execute_get(worker, plan))
    }

    /// Puts one entity.
    pub fn put(&self, ctx: &TxContext, tx: Option<&Transaction>, entity: Entity) -> OperationFuture<Key> {
        let plan = match self.core.prepare_put(ctx, tx, EntityBatch::new([entity])) {
            Ok(plan) => plan,
            Err(e) => return OperationFuture::failed(e),
        };
        self.schedule(ctx, move |core, worker| {
            core.execute_put(worker, plan)?
                .into_iter()
                .next()
                .ok_or_else(|| CoreError::invalid_operation("put produced no key"))
        })
    }

    /// Puts several entities, returning their keys in input order.
    pub fn put_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        entities: impl IntoIterator<Item = Entity>,
    ) -> OperationFuture<Vec<Key>> {
        let plan = match self.core.prepare_put(ctx, tx, EntityBatch::new(entities)) {
            Ok(plan) => plan,
            Err(e) => return OperationFuture::failed(e),
        };
        self.schedule(ctx, move |core, worker| core.execute_put(worker, plan))
    }

    /// Deletes one entity.
    pub fn delete(&self, ctx: &TxContext, tx: Option<&Transaction>, key: Key) -> OperationFuture<()> {
        self.delete_many(ctx, tx, [key])
    }

    /// Deletes several entities.
    pub fn delete_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        keys: impl IntoIterator<Item = Key>,
    ) -> OperationFuture<()> {
        let plan = match self.core.prepare_delete(ctx, tx, KeyBatch::new(keys)) {
            Ok(plan) => plan,
            Err(e) => return OperationFuture::failed(e),
        };
        self.schedule(ctx, move |core, worker| core.execute_delete(worker, plan))
    }

    /// Runs the pre-query hooks; the returned query executes lazily when
    /// its cursor is advanced.
    pub fn prepare(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        query: QueryDescriptor,
    ) -> CoreResult<PreparedQuery> {
        let tx = self.core.resolve(ctx, tx)?;
        self.core.prepare_query(tx, query)
    }

    /// Reserves `count` ids for `kind` under an optional parent.
    pub fn allocate_ids(
        &self,
        ctx: &TxContext,
        kind: &str,
        parent: Option<&Key>,
        count: u64,
    ) -> OperationFuture<KeyRange> {
        let kind = kind.to_string();
        let parent = parent.cloned();
        self.schedule(ctx, move |core, _| core.allocate_ids(&kind, parent.as_ref(), count))
    }

    /// Hands `work` to the pool with the caller's ambient transactions.
    ///
    /// `work` receives the worker's context with the caller's stack resumed
    /// on it; the backend call and post-hooks resolve the ambient transaction
    /// there.
    fn schedule<T, F>(&self, ctx: &TxContext, work: F) -> OperationFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&DatastoreCore, &TxContext) -> CoreResult<T> + Send + 'static,
    {
        let suspended = match ctx.suspend_scope() {
            Ok(guard) => guard,
            Err(e) => return OperationFuture::failed(e),
        };
        let handle = suspended.handle().clone();
        let core = Arc::clone(&self.core);

        let future = self.pool.submit(move || {
            let worker = TxContext::detached();
            let _attached = worker.resume_scope(&handle)?;
            trace!(ambient = ?worker.current().map(|tx| tx.id()), "running on worker");
            work(&core, &worker)
        });

        drop(suspended);
        future
    }
}

impl std::fmt::Debug for AsyncDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDatastore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}
