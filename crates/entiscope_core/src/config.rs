//! Datastore configuration.

use crate::callback::HookRegistry;
use entiscope_backend::TransactionOptions;

/// Configuration of the worker pool behind the async facade.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Maximum number of operations running at once; excess work queues.
    pub threads: usize,

    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            thread_name: "entiscope-worker".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of worker threads.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// Configuration of a datastore facade.
#[derive(Debug, Clone, Default)]
pub struct DatastoreConfig {
    /// Hooks run around every operation.
    pub hooks: HookRegistry,

    /// Worker pool used by the async facade.
    pub worker_pool: WorkerPoolConfig,

    /// Options used by `begin_transaction` when none are given.
    pub transaction_options: TransactionOptions,
}

impl DatastoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hook registry.
    #[must_use]
    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Sets the worker pool configuration.
    #[must_use]
    pub fn worker_pool(mut self, worker_pool: WorkerPoolConfig) -> Self {
        self.worker_pool = worker_pool;
        self
    }

    /// Sets the default transaction options.
    #[must_use]
    pub fn transaction_options(mut self, options: TransactionOptions) -> Self {
        self.transaction_options = options;
        self
    }
}
