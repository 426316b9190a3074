//! Script Repository
//!
//! Named scripts and the list of recently used names, persisted as a single
//! JSON document in a [`StorageBackend`].
//!
//! Every operation reloads the document, so there is no cached state to go
//! stale. Operations run one at a time behind a mutex spanning
//! reload → mutate → persist, and each mutation performs exactly one read and
//! one write. Every backend call is bounded by the configured operation
//! timeout.

mod store;

use std::{future::Future, sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

pub use store::{Script, Store};

use crate::{
    config::{RepositoryConfig, StorageConfig},
    storage::{create_backend, InMemoryBackend, StorageBackend, StorageError},
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Script storage is unavailable: {0}")]
    StorageUnavailable(#[from] StorageError),

    #[error("Invalid script: {0}")]
    InvalidScript(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub struct ScriptRepository {
    backend: Arc<dyn StorageBackend>,
    config: RepositoryConfig,
    operation_timeout: Duration,
    lock: Mutex<()>,
}

impl ScriptRepository {
    pub fn new(
        backend: Arc<dyn StorageBackend>,
        config: RepositoryConfig,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            config,
            operation_timeout,
            lock: Mutex::new(()),
        }
    }

    /// Repository over the backend selected by `storage`.
    pub fn from_config(config: RepositoryConfig, storage: &StorageConfig) -> Self {
        Self::new(create_backend(storage), config, storage.operation_timeout)
    }

    /// Repository over a fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryBackend::new()),
            RepositoryConfig::default(),
            StorageConfig::default().operation_timeout,
        )
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub async fn is_available(&self) -> bool {
        self.backend.is_available().await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_script(&self, name: &str) -> RepositoryResult<Option<Script>> {
        let _guard = self.lock.lock().await;
        let store = self.read().await?;
        Ok(store.get(name).cloned())
    }

    /// All scripts, sorted by name.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_scripts(&self) -> RepositoryResult<Vec<Script>> {
        let _guard = self.lock.lock().await;
        let store = self.read().await?;
        Ok(store.scripts.into_values().collect())
    }

    /// Scripts in most-recently-used order.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_recently_used(&self) -> RepositoryResult<Vec<Script>> {
        let _guard = self.lock.lock().await;
        let store = self.read().await?;
        Ok(store.recently_used())
    }

    /// Inserts or overwrites a script and marks it as used.
    #[instrument(level = "debug", skip(self, script), fields(name = %script.name))]
    pub async fn save_script(&self, script: Script) -> RepositoryResult<()> {
        if script.name.is_empty() {
            return Err(RepositoryError::InvalidScript(
                "script name must not be empty".to_string(),
            ));
        }

        let _guard = self.lock.lock().await;
        let mut store = self.read().await?;
        let name = script.name.clone();
        store.insert(script.normalized());
        store.touch(&name, self.config.recency_limit);
        self.write(&store).await
    }

    /// Stores a script under a name that is not taken yet and marks it as
    /// used. Returns `false` without writing anything when the name is
    /// already stored, so concurrent creators cannot overwrite each other.
    #[instrument(level = "debug", skip(self, script), fields(name = %script.name))]
    pub async fn create_script(&self, script: Script) -> RepositoryResult<bool> {
        if script.name.is_empty() {
            return Err(RepositoryError::InvalidScript(
                "script name must not be empty".to_string(),
            ));
        }

        let _guard = self.lock.lock().await;
        let mut store = self.read().await?;
        if store.get(&script.name).is_some() {
            debug!("Script {} already exists", script.name);
            return Ok(false);
        }
        let name = script.name.clone();
        store.insert(script.normalized());
        store.touch(&name, self.config.recency_limit);
        self.write(&store).await?;
        Ok(true)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn record_used(&self, name: &str) -> RepositoryResult<()> {
        let _guard = self.lock.lock().await;
        let mut store = self.read().await?;
        store.touch(name, self.config.recency_limit);
        self.write(&store).await
    }

    /// Removes a script and its recency entry. Unknown names leave the store
    /// unchanged, but it is still written back.
    #[instrument(level = "debug", skip(self))]
    pub async fn remove_script(&self, name: &str) -> RepositoryResult<()> {
        let _guard = self.lock.lock().await;
        let mut store = self.read().await?;
        if store.remove(name).is_none() {
            debug!("No script named {}", name);
        }
        self.write(&store).await
    }

    async fn read(&self) -> RepositoryResult<Store> {
        let key = &self.config.key;
        let document = self.bounded("load", self.backend.load(key)).await?;
        Ok(Store::from_document(document.as_deref())?)
    }

    async fn write(&self, store: &Store) -> RepositoryResult<()> {
        let document = store.to_document()?;
        let key = &self.config.key;
        self.bounded("save", self.backend.save(key, &document)).await?;
        debug!("Persisted {} scripts", store.scripts.len());
        Ok(())
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, StorageError> {
        tokio::time::timeout(self.operation_timeout, call)
            .await
            .map_err(|_| {
                StorageError::Timeout(format!(
                    "{} of '{}' took longer than {} ms",
                    operation,
                    self.config.key,
                    self.operation_timeout.as_millis()
                ))
            })?
    }
}
