//! In-memory storage backend.
//!
//! Documents live in a `DashMap` shared through an `Arc`, so clones of a
//! backend see the same data. Nothing survives the process.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use super::{StorageBackend, StorageError};

#[derive(Debug, Default, Clone)]
pub struct InMemoryBackend {
    storage: Arc<DashMap<String, String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.storage.get(key).map(|entry| entry.value().clone()))
    }

    async fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        self.storage.insert(key.to_string(), document.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.storage.remove(key);
        Ok(())
    }

    async fn is_available(&self) -> bool {
        true
    }
}
