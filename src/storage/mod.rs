//! Persistence backends for the script repository.
//!
//! The repository only ever needs "load the document under this key" and
//! "replace the document under this key", so backends are small. Two ship
//! with the crate:
//!
//! - [`InMemoryBackend`]: process-local, used by tests and previews
//! - [`LocalFileSystemBackend`]: one JSON file per key, written atomically

mod backend;
mod in_memory;
mod local_fs;

use std::sync::Arc;

use tracing::debug;

pub use backend::{MockStorageBackend, StorageBackend, StorageError};
pub use in_memory::InMemoryBackend;
pub use local_fs::LocalFileSystemBackend;

use crate::config::{BackendType, StorageConfig};

/// Builds the backend selected by the configuration.
pub fn create_backend(config: &StorageConfig) -> Arc<dyn StorageBackend> {
    debug!("creating {:?} storage backend", config.backend_type);
    match config.backend_type {
        BackendType::InMemory => Arc::new(InMemoryBackend::new()),
        BackendType::LocalFileSystem => Arc::new(LocalFileSystemBackend::new(config.local.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_backend() {
        let config = StorageConfig {
            backend_type: BackendType::InMemory,
            ..Default::default()
        };
        let backend = create_backend(&config);
        backend.save("k", "v").await.unwrap();
        assert_eq!(backend.load("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn test_create_local_backend() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let mut config = StorageConfig::default();
        config.local.base_dir = temp_dir.path().to_string_lossy().to_string();

        let backend = create_backend(&config);
        backend.save("k", "v").await.unwrap();
        assert!(temp_dir.path().join("k.json").exists());
    }
}
