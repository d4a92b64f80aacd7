//! Transaction handles.

use crate::error::{CoreError, CoreResult};
use entiscope_backend::{Backend, TransactionId, TransactionOptions};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

impl TransactionState {
    /// Returns true for `Committed` and `RolledBack`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != TransactionState::Active
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Active => f.write_str("active"),
            TransactionState::Committed => f.write_str("committed"),
            TransactionState::RolledBack => f.write_str("rolled back"),
        }
    }
}

struct TransactionInner {
    id: TransactionId,
    options: TransactionOptions,
    state: Mutex<TransactionState>,
    backend: Arc<dyn Backend>,
}

impl Drop for TransactionInner {
    fn drop(&mut self) {
        if *self.state.get_mut() != TransactionState::Active {
            return;
        }
        warn!(tx = %self.id, "transaction dropped while active, rolling back");
        if let Err(e) = self.backend.rollback(self.id) {
            warn!(tx = %self.id, error = %e, "implicit rollback failed");
        }
    }
}

/// Handle to a transaction.
///
/// Handles are cheap to clone and all clones refer to the same transaction.
/// Several transactions may be active at once; beginning a new one never
/// nests it inside another.
///
/// When the last handle of a transaction that is still active is dropped,
/// the transaction is rolled back.
#[derive(Clone)]
pub struct Transaction {
    inner: Arc<TransactionInner>,
}

impl Transaction {
    pub(crate) fn new(
        id: TransactionId,
        options: TransactionOptions,
        backend: Arc<dyn Backend>,
    ) -> Self {
        Self {
            inner: Arc::new(TransactionInner {
                id,
                options,
                state: Mutex::new(TransactionState::Active),
                backend,
            }),
        }
    }

    /// Returns the backend transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    /// Returns the options the transaction was begun with.
    #[must_use]
    pub fn options(&self) -> &TransactionOptions {
        &self.inner.options
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        *self.inner.state.lock()
    }

    /// Checks if the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Fails with `InvalidTransactionState` unless the transaction is active.
    pub fn ensure_active(&self) -> CoreResult<()> {
        Self::check_active(self.inner.id, *self.inner.state.lock())
    }

    /// Commits the transaction.
    ///
    /// If the backend refuses the commit the transaction stays active.
    pub fn commit(&self) -> CoreResult<()> {
        let mut state = self.inner.state.lock();
        Self::check_active(self.inner.id, *state)?;
        self.inner.backend.commit(self.inner.id)?;
        *state = TransactionState::Committed;
        debug!(tx = %self.inner.id, "committed");
        Ok(())
    }

    /// Rolls the transaction back.
    pub fn rollback(&self) -> CoreResult<()> {
        let mut state = self.inner.state.lock();
        Self::check_active(self.inner.id, *state)?;
        self.inner.backend.rollback(self.inner.id)?;
        *state = TransactionState::RolledBack;
        debug!(tx = %self.inner.id, "rolled back");
        Ok(())
    }

    /// Returns true if both handles refer to the same transaction.
    #[must_use]
    pub fn ptr_eq(a: &Transaction, b: &Transaction) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    fn check_active(id: TransactionId, state: TransactionState) -> CoreResult<()> {
        if state.is_terminal() {
            return Err(CoreError::InvalidTransactionState { id, state });
        }
        Ok(())
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}
