use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use selner::{
    config::{BackendType, RepositoryConfig, SelnerConfig},
    eval::{EvalError, Evaluator, PreviewOutcome},
    repository::ScriptRepository,
    selner::{CoordinatorError, Selner},
    storage::{InMemoryBackend, StorageBackend, StorageError},
};
use tempfile::TempDir;

use crate::selections;

fn in_memory() -> Selner {
    Selner::new(Evaluator::default(), ScriptRepository::in_memory())
}

#[tokio::test]
async fn test_create_then_run_stored() {
    let selner = in_memory();
    let out = selner
        .new_script(
            "upper",
            "sel.toUpperCase()",
            Some("Upper case".to_string()),
            &selections(&["lorem ipsum"]),
        )
        .await
        .unwrap();
    assert_eq!(out, vec!["LOREM IPSUM"]);

    let out = selner
        .run_stored("upper", &selections(&["a", "", "b"]))
        .await
        .unwrap();
    assert_eq!(out, vec!["A", "B"]);
}

#[tokio::test]
async fn test_save_remove_get_is_absent() {
    let selner = in_memory();
    selner
        .new_script("tmp", "sel", None, &selections(&["x"]))
        .await
        .unwrap();
    selner.remove("tmp").await.unwrap();

    assert!(selner.repository().get_script("tmp").await.unwrap().is_none());
    assert!(selner.recent().await.unwrap().is_empty());
    assert!(matches!(
        selner.run_stored("tmp", &selections(&["x"])).await,
        Err(CoordinatorError::ScriptNotFound(_))
    ));
}

#[tokio::test]
async fn test_capability_access_fails_without_saving() {
    let selner = in_memory();
    let err = selner
        .run_without_saving("fetch(\"https://example.com\")", &selections(&["x"]))
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::Eval(EvalError::Type(_))));
    assert!(selner.scripts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_no_selection() {
    let selner = in_memory();
    assert!(matches!(
        selner.new_script("a", "sel", None, &[]).await,
        Err(CoordinatorError::NoSelection)
    ));
    assert!(selner.scripts().await.unwrap().is_empty());
}

#[test]
fn test_preview_with_no_selection_uses_empty_sample() {
    let selner = in_memory();
    assert_eq!(
        selner.preview("sel.length", &[]),
        PreviewOutcome::Info("\"\" -> \"0\"".to_string())
    );
    assert!(selner.preview("sel.", &selections(&["x"])).is_error());
}

#[tokio::test]
async fn test_from_config_persists_to_disk() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = SelnerConfig::default();
    config.storage.backend_type = BackendType::LocalFileSystem;
    config.storage.local.base_dir = temp_dir.path().to_string_lossy().to_string();

    let selner = Selner::from_config(config.clone());
    selner
        .new_script("trim", "sel.trim()", None, &selections(&["  x  "]))
        .await
        .unwrap();

    let reopened = Selner::from_config(config);
    let names: Vec<String> = reopened
        .scripts()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, vec!["trim"]);
}

/// Yields on every call so that concurrent sessions interleave between
/// storage operations.
struct YieldingBackend(InMemoryBackend);

#[async_trait]
impl StorageBackend for YieldingBackend {
    async fn load(&self, key: &str) -> Result<Option<String>, StorageError> {
        tokio::task::yield_now().await;
        self.0.load(key).await
    }
    async fn save(&self, key: &str, document: &str) -> Result<(), StorageError> {
        tokio::task::yield_now().await;
        self.0.save(key, document).await
    }
    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.0.delete(key).await
    }
    async fn is_available(&self) -> bool {
        true
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_name_keep_one() {
    let repository = ScriptRepository::new(
        Arc::new(YieldingBackend(InMemoryBackend::new())),
        RepositoryConfig::default(),
        Duration::from_secs(5),
    );
    let selner = Arc::new(Selner::new(Evaluator::default(), repository));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let selner = Arc::clone(&selner);
            tokio::spawn(async move {
                let body = format!("sel + '{}'", i);
                let result = selner
                    .new_script("shared", &body, None, &selections(&["x"]))
                    .await;
                (body, result)
            })
        })
        .collect();

    let mut created = Vec::new();
    for joined in futures::future::join_all(handles).await {
        let (body, result) = joined.unwrap();
        match result {
            Ok(_) => created.push(body),
            Err(CoordinatorError::AlreadyExists(name)) => assert_eq!(name, "shared"),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(created.len(), 1);
    let stored = selner.repository().get_script("shared").await.unwrap().unwrap();
    assert_eq!(stored.body, created[0]);
}
