//! Synchronous datastore facade.

use crate::ambient::TxContext;
use crate::batch::{EntityBatch, EntityMap, KeyBatch};
use crate::callback::{Attachments, CallbackContext, CallbackPipeline, HookRegistry, PreGetContext, PreQueryContext};
use crate::config::DatastoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::query::PreparedQuery;
use crate::transaction::{Transaction, TransactionManager};
use entiscope_backend::{Backend, TransactionId, TransactionOptions};
use entiscope_model::{Entity, FetchMode, Key, KeyRange, QueryDescriptor};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// The transaction an operation was prepared under.
///
/// An explicit transaction is used as is. An ambient one is looked up again
/// on the context that executes the operation, which must carry the same
/// transaction.
struct Binding {
    tx: Option<Transaction>,
    explicit: bool,
}

impl Binding {
    fn transaction(&self) -> Option<Transaction> {
        self.tx.clone()
    }

    /// Resolves the transaction on the executing context.
    fn bind(self, ctx: &TxContext) -> CoreResult<(Option<Transaction>, Option<TransactionId>)> {
        if let Some(tx) = &self.tx {
            tx.ensure_active()?;
        }
        if self.explicit {
            let txid = self.tx.as_ref().map(Transaction::id);
            return Ok((self.tx, txid));
        }

        let ambient = ctx.current();
        let same = match (&ambient, &self.tx) {
            (Some(a), Some(b)) => Transaction::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if !same {
            return Err(CoreError::ambient_misuse(
                "executing context does not carry the ambient transaction",
            ));
        }
        let txid = ambient.as_ref().map(Transaction::id);
        Ok((ambient, txid))
    }
}

/// A get whose pre-get hooks have run.
pub(crate) struct GetPlan {
    binding: Binding,
    batch: KeyBatch,
    provided: HashMap<Key, Entity>,
    attachments: Attachments,
}

/// A put whose pre-put hooks have run.
pub(crate) struct PutPlan {
    binding: Binding,
    batch: EntityBatch,
    attachments: Attachments,
}

/// A delete whose pre-delete hooks have run.
pub(crate) struct DeletePlan {
    binding: Binding,
    keys: Vec<Key>,
    attachments: Attachments,
}

/// State shared by the sync and async facades.
///
/// Every operation is split in two halves: `prepare_*` runs the pre-hooks on
/// the calling context, `execute_*` runs the backend calls and post-hooks on
/// the executing context: the caller's own for the sync facade, a worker's
/// resumed one for the async facade.
pub(crate) struct DatastoreCore {
    backend: Arc<dyn Backend>,
    transactions: TransactionManager,
    hooks: HookRegistry,
    pipeline: OnceLock<CallbackPipeline>,
}

impl DatastoreCore {
    pub(crate) fn new(backend: Arc<dyn Backend>, config: DatastoreConfig) -> Self {
        Self {
            transactions: TransactionManager::new(
                Arc::clone(&backend),
                config.transaction_options,
            ),
            backend,
            hooks: config.hooks,
            pipeline: OnceLock::new(),
        }
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub(crate) fn transactions(&self) -> &TransactionManager {
        &self.transactions
    }

    /// Returns the pipeline, building it from the registry on first use.
    pub(crate) fn pipeline(&self) -> &CallbackPipeline {
        self.pipeline.get_or_init(|| {
            debug!(hooks = self.hooks.len(), "building callback pipeline");
            CallbackPipeline::new(self.hooks.clone())
        })
    }

    /// Picks the explicit transaction or the ambient one, and checks it is
    /// still active.
    pub(crate) fn resolve(
        &self,
        ctx: &TxContext,
        explicit: Option<&Transaction>,
    ) -> CoreResult<Option<Transaction>> {
        let tx = ctx.current_or(explicit);
        if let Some(tx) = &tx {
            tx.ensure_active()?;
        }
        Ok(tx)
    }

    fn binding(&self, ctx: &TxContext, explicit: Option<&Transaction>) -> CoreResult<Binding> {
        Ok(Binding {
            tx: self.resolve(ctx, explicit)?,
            explicit: explicit.is_some(),
        })
    }

    pub(crate) fn prepare_get(
        &self,
        ctx: &TxContext,
        explicit: Option<&Transaction>,
        batch: KeyBatch,
    ) -> CoreResult<GetPlan> {
        let binding = self.binding(ctx, explicit)?;
        let base = CallbackContext::new(binding.transaction(), batch.unique().to_vec(), Attachments::new());
        let mut hooks = PreGetContext::new(base);
        self.pipeline().pre_get(&mut hooks)?;
        let (base, provided) = hooks.into_parts();
        let (_, attachments) = base.into_parts();
        Ok(GetPlan {
            binding,
            batch,
            provided,
            attachments,
        })
    }

    pub(crate) fn execute_get(&self, ctx: &TxContext, plan: GetPlan) -> CoreResult<EntityMap> {
        let GetPlan {
            binding,
            batch,
            mut provided,
            attachments,
        } = plan;
        let (tx, txid) = binding.bind(ctx)?;

        let mut resolved: HashMap<Key, Arc<Entity>> = HashMap::with_capacity(batch.unique().len());
        let mut loaded_keys = Vec::new();
        let mut loaded = Vec::new();
        for key in batch.unique() {
            if let Some(entity) = provided.remove(key) {
                resolved.insert(key.clone(), Arc::new(entity));
                continue;
            }
            if let Some(entity) = self.backend.get(txid, key)? {
                loaded_keys.push(key.clone());
                loaded.push(entity);
            }
        }

        if !loaded.is_empty() {
            let mut hooks = CallbackContext::new(tx, loaded, attachments);
            self.pipeline().post_load(&mut hooks)?;
            let (loaded, _) = hooks.into_parts();
            for (key, entity) in loaded_keys.into_iter().zip(loaded) {
                resolved.insert(key, Arc::new(entity));
            }
        }

        debug!(
            requested = batch.input_len(),
            unique = batch.unique().len(),
            found = resolved.len(),
            "get"
        );
        Ok(batch.expand(&resolved))
    }

    pub(crate) fn prepare_put(
        &self,
        ctx: &TxContext,
        explicit: Option<&Transaction>,
        mut batch: EntityBatch,
    ) -> CoreResult<PutPlan> {
        let binding = self.binding(ctx, explicit)?;
        let mut hooks = CallbackContext::new(binding.transaction(), batch.take_unique(), Attachments::new());
        self.pipeline().pre_put(&mut hooks)?;
        let (entities, attachments) = hooks.into_parts();
        batch.set_unique(entities);
        Ok(PutPlan {
            binding,
            batch,
            attachments,
        })
    }

    pub(crate) fn execute_put(&self, ctx: &TxContext, plan: PutPlan) -> CoreResult<Vec<Key>> {
        let PutPlan {
            binding,
            mut batch,
            attachments,
        } = plan;
        let (tx, txid) = binding.bind(ctx)?;

        let mut stored = batch.take_unique();
        let mut keys = Vec::with_capacity(stored.len());
        for entity in &mut stored {
            let key = self.backend.put(txid, entity)?;
            entity.set_key(key.clone());
            keys.push(key);
        }

        let mut hooks = CallbackContext::new(tx, stored, attachments);
        self.pipeline().post_put(&mut hooks)?;

        debug!(requested = batch.input_len(), unique = keys.len(), "put");
        Ok(batch.expand(&keys))
    }

    pub(crate) fn prepare_delete(
        &self,
        ctx: &TxContext,
        explicit: Option<&Transaction>,
        batch: KeyBatch,
    ) -> CoreResult<DeletePlan> {
        let binding = self.binding(ctx, explicit)?;
        let mut hooks = CallbackContext::new(binding.transaction(), batch.unique().to_vec(), Attachments::new());
        self.pipeline().pre_delete(&mut hooks)?;
        let (keys, attachments) = hooks.into_parts();
        Ok(DeletePlan {
            binding,
            keys,
            attachments,
        })
    }

    pub(crate) fn execute_delete(&self, ctx: &TxContext, plan: DeletePlan) -> CoreResult<()> {
        let DeletePlan {
            binding,
            keys,
            attachments,
        } = plan;
        let (tx, txid) = binding.bind(ctx)?;

        for key in &keys {
            self.backend.delete(txid, key)?;
        }

        let count = keys.len();
        let mut hooks = CallbackContext::new(tx, keys, attachments);
        self.pipeline().post_delete(&mut hooks)?;

        debug!(unique = count, "delete");
        Ok(())
    }

    pub(crate) fn prepare_query(
        &self,
        tx: Option<Transaction>,
        query: QueryDescriptor,
    ) -> CoreResult<PreparedQuery> {
        let mut ctx = PreQueryContext::new(tx.clone(), query);
        self.pipeline().pre_query(&mut ctx)?;
        let query = ctx.into_query();
        if let FetchMode::Projection(properties) = query.fetch() {
            if properties.is_empty() {
                return Err(CoreError::invalid_query("projection names no properties"));
            }
        }
        debug!(kind = ?query.kind(), fetch = ?query.fetch(), "prepared query");
        Ok(PreparedQuery::new(Arc::clone(&self.backend), tx, query))
    }

    pub(crate) fn allocate_ids(
        &self,
        kind: &str,
        parent: Option<&Key>,
        count: u64,
    ) -> CoreResult<KeyRange> {
        let range = self.backend.allocate_ids(kind, parent, count)?;
        debug!(kind, start = range.start(), end = range.end(), "allocated ids");
        Ok(range)
    }
}

/// Blocking datastore facade.
///
/// Every call runs its pre-hooks, backend call and post-hooks inline on the
/// calling thread; the context is never suspended.
///
/// Operations take the execution context and an optional explicit
/// transaction. Without one, the context's ambient transaction is used; with
/// neither, the operation runs outside any transaction.
///
/// # Example
///
/// ```rust
/// use entiscope_backend::InMemoryBackend;
/// use entiscope_core::{Datastore, TxContext};
/// use entiscope_model::{Entity, Key};
/// use std::sync::Arc;
///
/// let datastore = Datastore::new(Arc::new(InMemoryBackend::new()));
/// let ctx = TxContext::new();
///
/// let tx = datastore.begin_transaction(&ctx).unwrap();
/// let key = datastore
///     .put(&ctx, None, Entity::new(Key::incomplete("Person")).with_property("name", "Ann"))
///     .unwrap();
/// assert!(datastore.get(&ctx, None, &key).is_ok());
/// tx.commit().unwrap();
/// ```
#[derive(Clone)]
pub struct Datastore {
    core: Arc<DatastoreCore>,
}

impl Datastore {
    /// Creates a facade with the default configuration.
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_config(backend, DatastoreConfig::default())
    }

    /// Creates a facade with a configuration.
    #[must_use]
    pub fn with_config(backend: Arc<dyn Backend>, config: DatastoreConfig) -> Self {
        Self {
            core: Arc::new(DatastoreCore::new(backend, config)),
        }
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

    /// Begins a transaction with the default options and makes it ambient.
    pub fn begin_transaction(&self, ctx: &TxContext) -> CoreResult<Transaction> {
        self.core.transactions().begin(ctx, None)
    }

    /// Begins a transaction with explicit options and makes it ambient.
    pub fn begin_transaction_with(
        &self,
        ctx: &TxContext,
        options: &TransactionOptions,
    ) -> CoreResult<Transaction> {
        self.core.transactions().begin(ctx, Some(options))
    }

    /// Returns the ambient transaction.
    #[must_use]
    pub fn current_transaction(&self, ctx: &TxContext) -> Option<Transaction> {
        ctx.current()
    }

    /// Returns the active transactions of the context, oldest first.
    #[must_use]
    pub fn active_transactions(&self, ctx: &TxContext) -> Vec<Transaction> {
        ctx.active_transactions()
    }

    /// Gets one entity.
    ///
    /// Fails with `EntityNotFound` if neither a pre-get hook nor the backend
    /// provides it.
    pub fn get(&self, ctx: &TxContext, tx: Option<&Transaction>, key: &Key) -> CoreResult<Entity> {
        self.get_many(ctx, tx, [key.clone()])?
            .into_iter()
            .next()
            .map(|(_, entity)| Arc::unwrap_or_clone(entity))
            .ok_or_else(|| CoreError::entity_not_found(key.clone()))
    }

    /// Gets several entities. Missing keys are omitted from the result.
    pub fn get_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        keys: impl IntoIterator<Item = Key>,
    ) -> CoreResult<EntityMap> {
        let plan = self.core.prepare_get(ctx, tx, KeyBatch::new(keys))?;
        self.core.execute_get(ctx, plan)
    }

    /// Puts one entity, returning its complete key.
    pub fn put(&self, ctx: &TxContext, tx: Option<&Transaction>, entity: Entity) -> CoreResult<Key> {
        let keys = self.put_many(ctx, tx, [entity])?;
        keys.into_iter()
            .next()
            .ok_or_else(|| CoreError::invalid_operation("put produced no key"))
    }

    /// Puts several entities, returning their keys in input order.
    pub fn put_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        entities: impl IntoIterator<Item = Entity>,
    ) -> CoreResult<Vec<Key>> {
        let plan = self.core.prepare_put(ctx, tx, EntityBatch::new(entities))?;
        self.core.execute_put(ctx, plan)
    }

    /// Deletes one entity. Deleting an absent key is not an error.
    pub fn delete(&self, ctx: &TxContext, tx: Option<&Transaction>, key: &Key) -> CoreResult<()> {
        self.delete_many(ctx, tx, [key.clone()])
    }

    /// Deletes several entities.
    pub fn delete_many(
        &self,
        ctx: &TxContext,
        tx: Option<&Transaction>,
        keys: impl IntoIterator<Item = Key>,
    ) -> CoreResult<()> {
        let plan = self.core.prepare_delete(ctx, tx, KeyBatch::new(keys))?;
        self.core.execute_delete(ctx, plan)
    }

    /// Runs the pre-query hooks and returns a lazily executed query.
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
    pub fn allocate_ids(&self, kind: &str, parent: Option<&Key>, count: u64) -> CoreResult<KeyRange> {
        self.core.allocate_ids(kind, parent, count)
    }
}

impl std::fmt::Debug for Datastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Datastore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{Hook, HookError};
    use entiscope_backend::InMemoryBackend;
    use entiscope_model::Value;
    use parking_lot::Mutex;

    fn datastore_with(hooks: HookRegistry) -> (Datastore, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let datastore = Datastore::with_config(
            Arc::clone(&backend) as Arc<dyn Backend>,
            DatastoreConfig::new().hooks(hooks),
        );
        (datastore, backend)
    }

    fn person(id: i64, name: &str) -> Entity {
        Entity::new(Key::with_id("Person", id)).with_property("name", name)
    }

    #[test]
    fn single_get_missing_is_not_found() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let err = ds.get(&ctx, None, &Key::with_id("Person", 9)).unwrap_err();
        assert!(matches!(err, CoreError::EntityNotFound { .. }));
    }

    #[test]
    fn batch_get_omits_missing() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        ds.put(&ctx, None, person(1, "ann")).unwrap();

        let map = ds
            .get_many(&ctx, None, [Key::with_id("Person", 1), Key::with_id("Person", 2)])
            .unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&Key::with_id("Person", 1)));
    }

    #[test]
    fn duplicate_keys_fetch_once() {
        let (ds, backend) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        ds.put(&ctx, None, person(1, "ann")).unwrap();
        backend.stats().reset();

        let key = Key::with_id("Person", 1);
        let map = ds.get_many(&ctx, None, [key.clone(), key.clone(), key]).unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(backend.stats().snapshot().gets, 1);
    }

    #[test]
    fn ambient_transaction_reads_own_writes() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let tx = ds.begin_transaction(&ctx).unwrap();
        let key = ds.put(&ctx, None, person(1, "ann")).unwrap();

        assert!(ds.get(&ctx, None, &key).is_ok());
        let outside = TxContext::new();
        assert!(ds.get(&outside, None, &key).is_err());

        tx.commit().unwrap();
        assert!(ds.get(&outside, None, &key).is_ok());
    }

    #[test]
    fn terminal_transaction_is_rejected() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let tx = ds.begin_transaction(&ctx).unwrap();
        tx.commit().unwrap();

        let err = ds.put(&ctx, Some(&tx), person(1, "ann")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransactionState { .. }));
    }

    #[test]
    fn pre_get_hook_short_circuits_fetch() {
        let hooks = HookRegistry::new().with(
            "Virtual",
            Hook::pre_get(|ctx| {
                let keys: Vec<Key> = ctx.current_elements().cloned().collect();
                for key in keys {
                    let entity = Entity::new(key.clone()).with_property("computed", true);
                    ctx.set_result(key, entity);
                }
                Ok(())
            }),
        );
        let (ds, backend) = datastore_with(hooks);
        let ctx = TxContext::new();

        let entity = ds.get(&ctx, None, &Key::with_id("Virtual", 1)).unwrap();
        assert_eq!(entity.property("computed"), Some(&Value::Bool(true)));
        assert_eq!(backend.stats().snapshot().gets, 0);
    }

    #[test]
    fn pre_get_results_answer_only_requested_keys() {
        let hooks = HookRegistry::new().with(
            "Person",
            Hook::pre_get(|ctx| {
                let other = Key::with_id("Person", 2);
                ctx.set_result(other.clone(), person(2, "substitute"));
                Ok(())
            }),
        );
        let (ds, backend) = datastore_with(hooks);
        let ctx = TxContext::new();
        ds.put(&ctx, None, person(1, "ann")).unwrap();
        backend.stats().reset();

        let map = ds.get_many(&ctx, None, [Key::with_id("Person", 1)]).unwrap();
        assert_eq!(map.len(), 1);
        let ann = map.get(&Key::with_id("Person", 1)).unwrap();
        assert_eq!(ann.property("name"), Some(&Value::from("ann")));
        assert_eq!(backend.stats().snapshot().gets, 1);
    }

    #[test]
    fn pre_put_failure_aborts_before_backend() {
        let hooks = HookRegistry::new().with(
            "Person",
            Hook::pre_put(|_| Err(HookError::new("rejected"))),
        );
        let (ds, backend) = datastore_with(hooks);
        let ctx = TxContext::new();

        let err = ds.put_many(&ctx, None, [person(1, "a"), person(2, "b")]).unwrap_err();
        assert_eq!(err.to_string(), "rejected");
        assert_eq!(backend.stats().snapshot().puts, 0);
    }

    #[test]
    fn single_put_runs_post_put_with_completed_key() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let hooks = HookRegistry::new()
            .with(
                "Note",
                Hook::pre_put(|ctx| {
                    ctx.attach("source", "pre-put");
                    Ok(())
                }),
            )
            .with(
                "Note",
                Hook::post_put(move |ctx| {
                    let key = ctx.elements()[0].key().clone();
                    let source = ctx.attachment("source").cloned();
                    log.lock().push((key, source));
                    Ok(())
                }),
            );
        let (ds, _) = datastore_with(hooks);
        let ctx = TxContext::new();

        let key = ds.put(&ctx, None, Entity::new(Key::incomplete("Note"))).unwrap();
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, key);
        assert_eq!(seen[0].1, Some(Value::from("pre-put")));
    }

    #[test]
    fn pre_put_mutation_is_stored() {
        let hooks = HookRegistry::new().with(
            "Person",
            Hook::pre_put(|ctx| {
                for entity in ctx.current_elements_mut() {
                    entity.set_property("audited", true);
                }
                Ok(())
            }),
        );
        let (ds, _) = datastore_with(hooks);
        let ctx = TxContext::new();
        let key = ds.put(&ctx, None, person(1, "ann")).unwrap();

        assert!(ds.get(&ctx, None, &key).unwrap().has_property("audited"));
    }

    #[test]
    fn put_many_keeps_order_and_dedupes() {
        let (ds, backend) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let keys = ds
            .put_many(
                &ctx,
                None,
                [
                    person(1, "first"),
                    Entity::new(Key::incomplete("Person")),
                    person(1, "last"),
                ],
            )
            .unwrap();

        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], keys[2]);
        assert!(keys[1].is_complete());
        assert_eq!(backend.stats().snapshot().puts, 2);
        let stored = ds.get(&ctx, None, &keys[0]).unwrap();
        assert_eq!(stored.property("name"), Some(&Value::from("last")));
    }

    #[test]
    fn delete_is_idempotent() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let key = ds.put(&ctx, None, person(1, "ann")).unwrap();

        ds.delete(&ctx, None, &key).unwrap();
        ds.delete(&ctx, None, &key).unwrap();
        assert!(ds.get(&ctx, None, &key).is_err());
    }

    #[test]
    fn empty_projection_is_rejected() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        let query = QueryDescriptor::new("Person").project(Vec::<String>::new());
        assert!(matches!(
            ds.prepare(&ctx, None, query),
            Err(CoreError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn ambient_plans_execute_only_where_the_transaction_is_carried() {
        let (ds, backend) = datastore_with(HookRegistry::new());
        let core = &ds.core;
        let ctx = TxContext::new();
        let tx = ds.begin_transaction(&ctx).unwrap();

        let plan = core
            .prepare_put(&ctx, None, EntityBatch::new([person(1, "ann")]))
            .unwrap();
        let bare = TxContext::detached();
        let err = core.execute_put(&bare, plan).unwrap_err();
        assert!(matches!(err, CoreError::AmbientMisuse { .. }));
        assert_eq!(backend.stats().snapshot().puts, 0);

        let plan = core
            .prepare_put(&ctx, None, EntityBatch::new([person(1, "ann")]))
            .unwrap();
        let handle = ctx.suspend().unwrap();
        let worker = TxContext::detached();
        worker.resume(&handle).unwrap();
        let keys = core.execute_put(&worker, plan).unwrap();

        assert!(backend.get(Some(tx.id()), &keys[0]).unwrap().is_some());
        assert!(backend.get(None, &keys[0]).unwrap().is_none());
    }

    #[test]
    fn explicit_plans_execute_on_any_context() {
        let (ds, backend) = datastore_with(HookRegistry::new());
        let core = &ds.core;
        let ctx = TxContext::new();
        let tx = ds.begin_transaction(&ctx).unwrap();
        let caller = TxContext::new();

        let plan = core
            .prepare_put(&caller, Some(&tx), EntityBatch::new([person(1, "ann")]))
            .unwrap();
        let keys = core.execute_put(&TxContext::detached(), plan).unwrap();
        assert!(backend.get(Some(tx.id()), &keys[0]).unwrap().is_some());
    }

    #[test]
    fn ambient_transaction_finished_before_execution_is_rejected() {
        let (ds, backend) = datastore_with(HookRegistry::new());
        let core = &ds.core;
        let ctx = TxContext::new();
        let tx = ds.begin_transaction(&ctx).unwrap();

        let plan = core
            .prepare_delete(&ctx, None, KeyBatch::new([Key::with_id("Person", 1)]))
            .unwrap();
        tx.rollback().unwrap();

        let err = core.execute_delete(&ctx, plan).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransactionState { .. }));
        assert_eq!(backend.stats().snapshot().deletes, 0);
    }

    #[test]
    fn pipeline_built_lazily_once() {
        let (ds, _) = datastore_with(HookRegistry::new());
        let ctx = TxContext::new();
        ds.put(&ctx, None, person(1, "ann")).unwrap();
        let first = ds.pipeline() as *const CallbackPipeline;
        ds.get(&ctx, None, &Key::with_id("Person", 1)).unwrap();
        assert_eq!(first, ds.pipeline() as *const CallbackPipeline);
    }
}
