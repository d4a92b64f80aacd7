//! Error types for backend operations.

use crate::types::TransactionId;
use entiscope_model::ModelError;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur in the backing store.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The transaction id is unknown or already finished.
    #[error("unknown transaction: {id}")]
    UnknownTransaction {
        /// The offending transaction id.
        id: TransactionId,
    },

    /// A write was attempted inside a read-only transaction.
    #[error("transaction {id} is read-only")]
    ReadOnlyTransaction {
        /// The read-only transaction id.
        id: TransactionId,
    },

    /// A complete key was required.
    #[error("incomplete key for kind {kind}")]
    IncompleteKey {
        /// Kind of the incomplete key.
        kind: String,
    },

    /// An argument was out of range.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// Entity encoding error.
    #[error("codec error: {0}")]
    Codec(#[from] ModelError),

    /// The store cannot serve the request.
    #[error("backend unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl BackendError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}
