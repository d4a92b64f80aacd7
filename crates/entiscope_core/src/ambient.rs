//! Ambient transaction tracking.
//!
//! A [`TxContext`] is the execution context an operation runs in. It holds
//! the stack of transactions begun on it; the newest one that is still active
//! is the *ambient* transaction used by operations that do not pass a
//! transaction explicitly.
//!
//! Crossing a thread boundary is done with an explicit handle:
//!
//! 1. the caller suspends its context, getting a [`SuspendedTransactions`];
//! 2. the handle travels with the task;
//! 3. the worker resumes it on its own detached context, runs, and suspends
//!    again so it goes back to the pool clean;
//! 4. the caller resumes its own handle.
//!
//! [`TxContext::suspend_scope`] and [`TxContext::resume_scope`] return guards
//! that perform the matching half on drop, on every exit path.

use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct ContextState {
    attached: bool,
    stack: Vec<Transaction>,
    suspensions: u64,
    outstanding: Option<u64>,
}

/// Execution context carrying the ambient transaction stack.
///
/// A context belongs to one thread of execution at a time: it can be moved
/// but not shared.
#[derive(Debug)]
pub struct TxContext {
    id: u64,
    state: RefCell<ContextState>,
}

/// Opaque handle to the ambient stack detached by [`TxContext::suspend`].
///
/// The handle may be cloned to hand a copy to a worker; the origin context
/// accepts back only the handle of its latest suspension, once.
#[derive(Debug, Clone)]
pub struct SuspendedTransactions {
    origin: u64,
    epoch: u64,
    transactions: Vec<Transaction>,
}

impl SuspendedTransactions {
    /// Returns the ambient transaction captured by this handle.
    #[must_use]
    pub fn current(&self) -> Option<Transaction> {
        newest_active(&self.transactions)
    }
}

fn newest_active(stack: &[Transaction]) -> Option<Transaction> {
    stack.iter().rev().find(|tx| tx.is_active()).cloned()
}

impl Default for TxContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TxContext {
    /// Creates an attached context with no transactions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_attachment(true)
    }

    /// Creates a detached context, the state of a pooled worker before it
    /// resumes a handed-over handle.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_attachment(false)
    }

    fn with_attachment(attached: bool) -> Self {
        Self {
            id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            state: RefCell::new(ContextState {
                attached,
                stack: Vec::new(),
                suspensions: 0,
                outstanding: None,
            }),
        }
    }

    /// Returns true unless the context is suspended or detached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.borrow().attached
    }

    /// Returns the ambient transaction: the newest transaction on the stack
    /// that is still active.
    #[must_use]
    pub fn current(&self) -> Option<Transaction> {
        newest_active(&self.state.borrow().stack)
    }

    /// Returns `explicit` when given, otherwise the ambient transaction.
    #[must_use]
    pub fn current_or(&self, explicit: Option<&Transaction>) -> Option<Transaction> {
        match explicit {
            Some(tx) => Some(tx.clone()),
            None => self.current(),
        }
    }

    /// Lists the active transactions on the stack, oldest first.
    #[must_use]
    pub fn active_transactions(&self) -> Vec<Transaction> {
        self.state
            .borrow()
            .stack
            .iter()
            .filter(|tx| tx.is_active())
            .cloned()
            .collect()
    }

    pub(crate) fn push(&self, tx: Transaction) {
        let mut state = self.state.borrow_mut();
        state.stack.retain(Transaction::is_active);
        state.stack.push(tx);
    }

    /// Detaches the ambient stack from this context.
    ///
    /// Fails with `AmbientMisuse` if the context is already detached.
    pub fn suspend(&self) -> CoreResult<SuspendedTransactions> {
        let mut state = self.state.borrow_mut();
        if !state.attached {
            return Err(CoreError::ambient_misuse("context is already suspended"));
        }
        state.attached = false;
        state.suspensions += 1;
        state.outstanding = Some(state.suspensions);
        Ok(SuspendedTransactions {
            origin: self.id,
            epoch: state.suspensions,
            transactions: std::mem::take(&mut state.stack),
        })
    }

    /// Reattaches a suspended stack.
    ///
    /// Fails with `AmbientMisuse` if the context is attached, or if the handle
    /// was suspended from this context but is not its latest outstanding
    /// suspension.
    pub fn resume(&self, handle: &SuspendedTransactions) -> CoreResult<()> {
        let mut state = self.state.borrow_mut();
        if state.attached {
            return Err(CoreError::ambient_misuse(
                "context already has attached transactions",
            ));
        }
        if handle.origin == self.id {
            if state.outstanding != Some(handle.epoch) {
                return Err(CoreError::ambient_misuse("stale suspension handle"));
            }
            state.outstanding = None;
        }
        state.stack = handle.transactions.clone();
        state.attached = true;
        Ok(())
    }

    /// Suspends the context until the returned guard is dropped.
    pub fn suspend_scope(&self) -> CoreResult<SuspendGuard<'_>> {
        let handle = self.suspend()?;
        Ok(SuspendGuard { ctx: self, handle })
    }

    /// Resumes `handle` on this context until the returned guard is dropped,
    /// which suspends it again.
    pub fn resume_scope(&self, handle: &SuspendedTransactions) -> CoreResult<ResumeGuard<'_>> {
        self.resume(handle)?;
        Ok(ResumeGuard { ctx: self })
    }
}

/// Resumes the suspended stack when dropped.
#[derive(Debug)]
pub struct SuspendGuard<'a> {
    ctx: &'a TxContext,
    handle: SuspendedTransactions,
}

impl SuspendGuard<'_> {
    /// Returns the handle of the suspension held by this guard.
    #[must_use]
    pub fn handle(&self) -> &SuspendedTransactions {
        &self.handle
    }
}

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.resume(&self.handle) {
            warn!(error = %e, "failed to restore suspended transactions");
        }
    }
}

/// Suspends the context again when dropped.
#[derive(Debug)]
pub struct ResumeGuard<'a> {
    ctx: &'a TxContext,
}

impl Drop for ResumeGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.ctx.suspend() {
            warn!(error = %e, "failed to detach resumed transactions");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionManager;
    use entiscope_backend::{InMemoryBackend, TransactionOptions};
    use std::sync::Arc;

    fn manager() -> TransactionManager {
        TransactionManager::new(
            Arc::new(InMemoryBackend::new()),
            TransactionOptions::default(),
        )
    }

    #[test]
    fn resume_restores_identical_transaction() {
        let tm = manager();
        let ctx = TxContext::new();
        let tx = tm.begin(&ctx, None).unwrap();

        let handle = ctx.suspend().unwrap();
        assert!(ctx.current().is_none());
        ctx.resume(&handle).unwrap();

        assert!(Transaction::ptr_eq(&ctx.current().unwrap(), &tx));
    }

    #[test]
    fn double_resume_is_misuse() {
        let ctx = TxContext::new();
        let handle = ctx.suspend().unwrap();
        ctx.resume(&handle).unwrap();

        assert!(matches!(
            ctx.resume(&handle),
            Err(CoreError::AmbientMisuse { .. })
        ));
    }

    #[test]
    fn stale_handle_is_misuse() {
        let ctx = TxContext::new();
        let first = ctx.suspend().unwrap();
        ctx.resume(&first).unwrap();
        let _second = ctx.suspend().unwrap();

        assert!(matches!(
            ctx.resume(&first),
            Err(CoreError::AmbientMisuse { .. })
        ));
    }

    #[test]
    fn double_suspend_is_misuse() {
        let ctx = TxContext::new();
        let _handle = ctx.suspend().unwrap();
        assert!(matches!(ctx.suspend(), Err(CoreError::AmbientMisuse { .. })));
    }

    #[test]
    fn ambient_falls_back_after_rollback() {
        let tm = manager();
        let ctx = TxContext::new();
        let tx1 = tm.begin(&ctx, None).unwrap();
        let tx2 = tm.begin(&ctx, None).unwrap();

        assert!(Transaction::ptr_eq(&ctx.current().unwrap(), &tx2));
        tx2.rollback().unwrap();
        assert!(Transaction::ptr_eq(&ctx.current().unwrap(), &tx1));
        assert_eq!(ctx.active_transactions().len(), 1);
    }

    #[test]
    fn explicit_transaction_wins() {
        let tm = manager();
        let ctx = TxContext::new();
        let tx1 = tm.begin(&ctx, None).unwrap();
        let _tx2 = tm.begin(&ctx, None).unwrap();

        let chosen = ctx.current_or(Some(&tx1)).unwrap();
        assert!(Transaction::ptr_eq(&chosen, &tx1));
    }

    #[test]
    fn guards_pair_on_every_exit() {
        let tm = manager();
        let ctx = TxContext::new();
        let tx = tm.begin(&ctx, None).unwrap();

        let result: CoreResult<()> = (|| {
            let guard = ctx.suspend_scope()?;
            let worker = TxContext::detached();
            {
                let _attached = worker.resume_scope(guard.handle())?;
                assert!(Transaction::ptr_eq(&worker.current().unwrap(), &tx));
            }
            assert!(!worker.is_attached());
            assert!(worker.current().is_none());
            Err(CoreError::Cancelled)
        })();

        assert!(result.is_err());
        assert!(ctx.is_attached());
        assert!(Transaction::ptr_eq(&ctx.current().unwrap(), &tx));
    }

    #[test]
    fn worker_handle_does_not_consume_origin_suspension() {
        let ctx = TxContext::new();
        let guard = ctx.suspend_scope().unwrap();
        let worker = TxContext::detached();
        worker.resume(guard.handle()).unwrap();
        worker.suspend().unwrap();
        drop(guard);
        assert!(ctx.is_attached());
    }
}
