//! Transaction handles and their manager.
//!
//! The access layer does not implement isolation itself. A [`Transaction`]
//! is a handle over a backend transaction id with a local state machine
//! (`Active` to `Committed` or `RolledBack`), and the
//! [`TransactionManager`] begins transactions and makes them ambient on a
//! [`TxContext`](crate::TxContext).

mod manager;
mod state;

pub use manager::TransactionManager;
pub use state::{Transaction, TransactionState};
