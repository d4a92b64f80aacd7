//! Error types for search operations.

use thiserror::Error;

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur while parsing, translating or running searches.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The query string is malformed.
    #[error("parse error at {position}: {message}")]
    Parse {
        /// Character offset of the problem.
        position: usize,
        /// Description of the problem.
        message: String,
    },

    /// The query tree cannot be translated.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Description of the problem.
        message: String,
    },

    /// A document failed validation.
    #[error("invalid document {id}: {message}")]
    InvalidDocument {
        /// Document identifier.
        id: String,
        /// Description of the problem.
        message: String,
    },
}

impl SearchError {
    /// Creates a parse error.
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Creates an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            id: id.into(),
            message: message.into(),
        }
    }
}
