//! Backend statistics.
//!
//! Counters let callers observe how often the store was actually reached,
//! which is what batch deduplication and fetch-mode push-down are about.

use std::sync::atomic::{AtomicU64, Ordering};

/// Backend statistics.
///
/// All counters are atomic and can be read while operations are in progress.
#[derive(Debug, Default)]
pub struct BackendStats {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
    queries: AtomicU64,
    transactions_started: AtomicU64,
    transactions_committed: AtomicU64,
    transactions_rolled_back: AtomicU64,
    properties_materialized: AtomicU64,
    ids_allocated: AtomicU64,
}

impl BackendStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_start(&self) {
        self.transactions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_rollback(&self) {
        self.transactions_rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_materialized(&self, properties: u64) {
        self.properties_materialized
            .fetch_add(properties, Ordering::Relaxed);
    }

    pub(crate) fn record_ids_allocated(&self, count: u64) {
        self.ids_allocated.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of every counter.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            transactions_started: self.transactions_started.load(Ordering::Relaxed),
            transactions_committed: self.transactions_committed.load(Ordering::Relaxed),
            transactions_rolled_back: self.transactions_rolled_back.load(Ordering::Relaxed),
            properties_materialized: self.properties_materialized.load(Ordering::Relaxed),
            ids_allocated: self.ids_allocated.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.gets,
            &self.puts,
            &self.deletes,
            &self.queries,
            &self.transactions_started,
            &self.transactions_committed,
            &self.transactions_rolled_back,
            &self.properties_materialized,
            &self.ids_allocated,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A snapshot of backend statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Single-key reads served.
    pub gets: u64,
    /// Entities written.
    pub puts: u64,
    /// Keys deleted.
    pub deletes: u64,
    /// Query cursors evaluated.
    pub queries: u64,
    /// Transactions started.
    pub transactions_started: u64,
    /// Transactions committed.
    pub transactions_committed: u64,
    /// Transactions rolled back.
    pub transactions_rolled_back: u64,
    /// Properties copied into query results.
    pub properties_materialized: u64,
    /// Ids reserved through `allocate_ids`.
    pub ids_allocated: u64,
}
