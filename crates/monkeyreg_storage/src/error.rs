//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// Absence of a record is not an error: `get`, `update` and `delete`
/// report it through `Option`/`bool` outcomes.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An item with the same id is already stored.
    #[error("duplicate id: {id} already exists")]
    DuplicateId {
        /// The conflicting id.
        id: String,
    },

    /// The remote backend could not be reached or refused the request.
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// Transport, auth or table-state description.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serializing the collection failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored item could not be converted to the canonical form.
    #[error("malformed item: {message}")]
    MalformedItem {
        /// Description of the problem.
        message: String,
    },
}

impl StorageError {
    /// Creates a duplicate id error.
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    /// Creates a backend unavailable error.
    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Creates a malformed item error.
    pub fn malformed_item(message: impl Into<String>) -> Self {
        Self::MalformedItem {
            message: message.into(),
        }
    }

    /// Returns true if this error came from the remote transport.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::BackendUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StorageError::duplicate_id("monkey_1a2b3c4d");
        assert_eq!(err.to_string(), "duplicate id: monkey_1a2b3c4d already exists");

        let err = StorageError::backend_unavailable("table not active");
        assert!(err.to_string().contains("table not active"));
        assert!(err.is_unavailable());
    }
}
