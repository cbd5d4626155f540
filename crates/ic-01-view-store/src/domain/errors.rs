//! # Domain Errors
//!
//! Error types for the view store.

use thiserror::Error;

/// Key-value adapter errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    Corruption { message: String },
}

impl KVStoreError {
    pub(crate) fn io(err: impl std::fmt::Display) -> Self {
        Self::IOError {
            message: err.to_string(),
        }
    }
}

/// Errors returned by view repositories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewStoreError {
    /// No record under the requested key.
    #[error("{namespace} record not found: {key}")]
    NotFound { namespace: String, key: String },

    /// The secondary key already belongs to another record.
    #[error("{namespace} secondary key {key:?} already owned by {owner}")]
    DuplicateKey {
        namespace: String,
        key: String,
        owner: String,
    },

    /// The backing store failed.
    #[error("Storage failure: {0}")]
    Storage(#[from] KVStoreError),

    /// A record could not be encoded or decoded.
    #[error("Serialization failure: {message}")]
    Serialization { message: String },
}

impl ViewStoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_from_kv() {
        let err: ViewStoreError = KVStoreError::io("disk failure").into();
        assert!(matches!(err, ViewStoreError::Storage(_)));
        assert!(err.to_string().contains("disk failure"));
    }

    #[test]
    fn test_not_found_display() {
        let err = ViewStoreError::NotFound {
            namespace: "icode".into(),
            key: "42".into(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "icode record not found: 42");
    }
}
