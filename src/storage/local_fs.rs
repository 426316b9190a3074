//! Local file system storage backend.
//!
//! Each key is stored in its own file, `<base_dir>/<key>.<extension>`.
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a reader sees either the old or the new document.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{StorageBackend, StorageError};
use crate::config::LocalFileSystemConfig;

/// Local file system backend
///
/// # Thread Safety
///
/// Individual writes are atomic. Concurrent read-modify-write sequences on
/// the same key are not serialized here.
#[derive(Debug, Clone)]
pub struct LocalFileSystemBackend {
    config: LocalFileSystemConfig,
}

impl LocalFileSystemBackend {
    pub fn new(config: LocalFileSystemConfig) -> Self {
        Self { config }
    }

    pub fn base_dir(&self) -> &Path {
        Path::new(&self.config.base_dir)
    }

    /// Get the file path for a key
    fn get_file_path(&self, key: &str) -> PathBuf {
        let filename = format!("{}.{}", sanitize_key(key), self.config.file_extension);
        self.base_dir().join(filename)
    }

    async fn ensure_base_dir_exists(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.base_dir()).await.map_err(|e| {
            StorageError::InvalidPath(format!(
                "Failed to create directory {}: {}",
                self.config.base_dir, e
            ))
        })
    }

    /// Write data to a file atomically
    ///
    /// # Arguments
    /// * `path` - The path to write to
    /// * `data` - The data to write
    async fn write_atomically(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let dir = path.parent().ok_or_else(|| {
            StorageError::InvalidPath(format!("{} has no parent directory", path.display()))
        })?;
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StorageError::InvalidPath(format!("Failed to create directory: {}", e)))?;

        // the temp file is removed on drop unless persisted
        let temp_path = NamedTempFile::new_in(dir)
            .map_err(|e| StorageError::Io(format!("Failed to create temporary file: {}", e)))?
            .into_temp_path();

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to open temporary file: {}", e)))?;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::Io(format!("Failed to write to file: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| StorageError::Io(format!("Failed to flush file: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::Io(format!("Failed to sync file: {}", e)))?;
        drop(file);

        temp_path
            .persist(path)
            .map_err(|e| StorageError::Io(format!("Failed to rename file: {}", e.error)))?;
        Ok(())
    }
}

/// Replaces characters that are problematic in file names.
fn sanitize_key(key: &str) -> String {
    key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

#[async_trait]
impl StorageBackend for LocalFileSystemBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.get_file_path(key);
        match fs::read_to_string(&path).await {
            Ok(document) => Ok(Some(document)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", path.display());
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(StorageError::Deserialization(
                format!("{} is not valid UTF-8: {}", path.display(), e),
            )),
            Err(e) => Err(StorageError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        self.ensure_base_dir_exists().await?;
        let path = self.get_file_path(key);
        self.write_atomically(&path, document.as_bytes()).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.get_file_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(format!("Failed to delete file: {}", e))),
        }
    }

    async fn is_available(&self) -> bool {
        if self.ensure_base_dir_exists().await.is_err() {
            return false;
        }
        let probe = self.base_dir().join("test_availability.tmp");
        if self.write_atomically(&probe, b"test").await.is_err() {
            return false;
        }
        let _ = fs::remove_file(&probe).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Create a test backend with a temporary directory
    fn create_test_backend() -> (LocalFileSystemBackend, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = LocalFileSystemConfig {
            base_dir: temp_dir.path().to_string_lossy().to_string(),
            file_extension: "json".to_string(),
        };
        (LocalFileSystemBackend::new(config), temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (backend, temp_dir) = create_test_backend();
        assert_eq!(backend.load("selner").await.unwrap(), None);

        backend.save("selner", r#"{"scripts":{}}"#).await.unwrap();
        assert_eq!(
            backend.load("selner").await.unwrap().as_deref(),
            Some(r#"{"scripts":{}}"#)
        );
        assert!(temp_dir.path().join("selner.json").exists());
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let (backend, temp_dir) = create_test_backend();
        backend.save("doc", "one").await.unwrap();
        backend.save("doc", "two").await.unwrap();

        assert_eq!(backend.load("doc").await.unwrap().as_deref(), Some("two"));
        let entries = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let (backend, _temp_dir) = create_test_backend();
        backend.save("doc", "value").await.unwrap();
        backend.delete("doc").await.unwrap();
        assert_eq!(backend.load("doc").await.unwrap(), None);
        // deleting again is fine
        backend.delete("doc").await.unwrap();
    }

    #[tokio::test]
    async fn test_keys_are_sanitized() {
        let (backend, temp_dir) = create_test_backend();
        backend.save("../escape", "value").await.unwrap();

        assert!(temp_dir.path().join(".._escape.json").exists());
        assert_eq!(backend.load("../escape").await.unwrap().as_deref(), Some("value"));
    }

    #[tokio::test]
    async fn test_creates_missing_base_dir() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let backend = LocalFileSystemBackend::new(LocalFileSystemConfig {
            base_dir: nested.to_string_lossy().to_string(),
            file_extension: "json".to_string(),
        });

        assert!(backend.is_available().await);
        backend.save("doc", "value").await.unwrap();
        assert!(nested.join("doc.json").exists());
        assert!(!nested.join("test_availability.tmp").exists());
    }

    #[tokio::test]
    async fn test_unavailable_when_base_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();
        let backend = LocalFileSystemBackend::new(LocalFileSystemConfig {
            base_dir: file.to_string_lossy().to_string(),
            file_extension: "json".to_string(),
        });

        assert!(!backend.is_available().await);
        assert!(matches!(
            backend.save("doc", "value").await,
            Err(StorageError::InvalidPath(_))
        ));
    }
}
