//! Storage backend trait definition for persisted documents.
//!
//! A backend stores opaque string documents under string keys. The script
//! repository keeps its whole store in one such document.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during storage backend operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// The storage backend is not available.
    #[error("Storage backend not available: {0}")]
    BackendUnavailable(String),

    /// Reading or writing the underlying medium failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// A document could not be encoded before writing.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored document could not be decoded.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The location derived from a key or the configuration is unusable.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// The operation did not finish within the configured timeout.
    #[error("Storage operation timed out: {0}")]
    Timeout(String),
}

/// Trait that abstracts storage backend operations.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and can be shared between tasks
/// behind an `Arc`. Backends do not serialize read-modify-write sequences;
/// callers that need that hold their own lock.
#[mockall::automock]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Load the document stored under a key
    ///
    /// # Arguments
    /// * `key` - The key to load
    ///
    /// # Returns
    /// * `Ok(Some(document))` - The stored document
    /// * `Ok(None)` - Nothing has been stored under the key
    /// * `Err(StorageError)` - If loading fails
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Save a document under a key
    ///
    /// # Arguments
    /// * `key` - The key to save to
    /// * `document` - The full document, replacing any previous one
    ///
    /// # Expected Behavior
    ///
    /// - Should overwrite an existing document as a whole
    /// - Readers must never observe a partially written document
    async fn save(&self, key: &str, document: &str) -> Result<(), StorageError>;

    /// Delete the document stored under a key
    ///
    /// Deleting a key that holds nothing is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Check if the backend is available
    ///
    /// # Expected Behavior
    ///
    /// - Should return `false` rather than an error when the medium cannot be
    ///   reached or written
    async fn is_available(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend() {
        let mut backend = MockStorageBackend::new();
        backend
            .expect_load()
            .withf(|key| key == "doc")
            .returning(|_| Ok(Some("{}".to_string())));
        backend
            .expect_save()
            .returning(|_, _| Err(StorageError::Io("disk full".to_string())));

        assert_eq!(backend.load("doc").await.unwrap().as_deref(), Some("{}"));
        let err = backend.save("doc", "{}").await.unwrap_err();
        assert_eq!(err.to_string(), "I/O error: disk full");
    }
}
