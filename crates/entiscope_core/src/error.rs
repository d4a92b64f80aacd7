//! Error types for the access layer.

use crate::callback::HookError;
use crate::transaction::TransactionState;
use entiscope_backend::{BackendError, TransactionId};
use entiscope_model::Key;
use thiserror::Error;

/// Result type for access-layer operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in access-layer operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Backing store failure, propagated unchanged.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A single-key get resolved to nothing.
    #[error("entity not found: {key}")]
    EntityNotFound {
        /// The key that was requested.
        key: Key,
    },

    /// The transaction has already been committed or rolled back.
    #[error("transaction {id} is {state}")]
    InvalidTransactionState {
        /// The transaction.
        id: TransactionId,
        /// Its terminal state.
        state: TransactionState,
    },

    /// A hook failed; the message is the hook's own.
    #[error(transparent)]
    Callback(#[from] HookError),

    /// Suspend and resume were not paired.
    #[error("ambient transaction misuse: {message}")]
    AmbientMisuse {
        /// Description of the misuse.
        message: String,
    },

    /// The operation was cancelled before it started.
    #[error("operation cancelled")]
    Cancelled,

    /// The worker running the operation went away without a result.
    #[error("worker lost: {message}")]
    WorkerLost {
        /// Description of the failure.
        message: String,
    },

    /// The worker pool could not be started or is shut down.
    #[error("worker pool unavailable: {message}")]
    WorkerUnavailable {
        /// Description of the failure.
        message: String,
    },

    /// The query cannot be executed.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// A single result was requested but the query produced more.
    #[error("query returned more than one result")]
    TooManyResults,

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an entity not found error.
    pub fn entity_not_found(key: Key) -> Self {
        Self::EntityNotFound { key }
    }

    /// Creates an ambient misuse error.
    pub fn ambient_misuse(message: impl Into<String>) -> Self {
        Self::AmbientMisuse {
            message: message.into(),
        }
    }

    /// Creates a worker lost error.
    pub fn worker_lost(message: impl Into<String>) -> Self {
        Self::WorkerLost {
            message: message.into(),
        }
    }

    /// Creates a worker unavailable error.
    pub fn worker_unavailable(message: impl Into<String>) -> Self {
        Self::WorkerUnavailable {
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }
}
