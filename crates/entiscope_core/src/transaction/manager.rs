//! Transaction manager.

use crate::ambient::TxContext;
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use entiscope_backend::{Backend, TransactionOptions};
use std::sync::Arc;
use tracing::debug;

/// Begins transactions against the backend and makes them ambient.
///
/// Every transaction begun here is independent of the ones already active on
/// the context: a "nested" begin simply adds a second concurrent transaction
/// on top of the context's ambient stack.
pub struct TransactionManager {
    backend: Arc<dyn Backend>,
    default_options: TransactionOptions,
}

impl TransactionManager {
    /// Creates a new transaction manager.
    pub fn new(backend: Arc<dyn Backend>, default_options: TransactionOptions) -> Self {
        Self {
            backend,
            default_options,
        }
    }

    /// Returns the options used when none are given.
    #[must_use]
    pub fn default_options(&self) -> &TransactionOptions {
        &self.default_options
    }

    /// Begins a transaction and pushes it onto the context's ambient stack.
    ///
    /// Fails with `AmbientMisuse` if the context is currently suspended.
    pub fn begin(
        &self,
        ctx: &TxContext,
        options: Option<&TransactionOptions>,
    ) -> CoreResult<Transaction> {
        if !ctx.is_attached() {
            return Err(CoreError::ambient_misuse(
                "cannot begin a transaction on a suspended context",
            ));
        }
        let options = *options.unwrap_or(&self.default_options);
        let id = self.backend.begin_transaction(&options)?;
        let tx = Transaction::new(id, options, Arc::clone(&self.backend));
        ctx.push(tx.clone());
        debug!(
            tx = %id,
            cross_group = options.cross_group,
            read_only = options.read_only,
            "began transaction"
        );
        Ok(tx)
    }
}
