use std::{sync::Arc, time::Duration};

use mockall::Sequence;
use pretty_assertions::assert_eq;
use selner::{
    config::{LocalFileSystemConfig, RepositoryConfig},
    repository::{RepositoryError, Script, ScriptRepository},
    storage::{InMemoryBackend, LocalFileSystemBackend, MockStorageBackend, StorageBackend, StorageError},
};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

fn repository_over(backend: impl StorageBackend + 'static) -> ScriptRepository {
    ScriptRepository::new(Arc::new(backend), RepositoryConfig::default(), TIMEOUT)
}

fn names(scripts: &[Script]) -> Vec<&str> {
    scripts.iter().map(|s| s.name.as_str()).collect()
}

#[tokio::test]
async fn test_mutations_read_once_and_write_once() {
    let mut backend = MockStorageBackend::new();
    let mut seq = Sequence::new();
    backend
        .expect_load()
        .withf(|key| key == "selner")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(None));
    backend
        .expect_save()
        .withf(|key, document| {
            key == "selner"
                && document
                    == r#"{"scripts":{"upper":{"name":"upper","body":"sel.toUpperCase()"}},"recency":["upper"]}"#
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let repository = repository_over(backend);
    repository
        .save_script(Script::new("upper", "sel.toUpperCase()", None))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_record_used_writes_even_for_unknown_names() {
    let mut backend = MockStorageBackend::new();
    backend
        .expect_load()
        .times(1)
        .returning(|_| Ok(Some(r#"{"scripts":{},"recency":[]}"#.to_string())));
    backend
        .expect_save()
        .withf(|_, document| document == r#"{"scripts":{},"recency":[]}"#)
        .times(1)
        .returning(|_, _| Ok(()));

    repository_over(backend).record_used("ghost").await.unwrap();
}

#[tokio::test]
async fn test_removing_absent_script_still_writes_once() {
    let mut backend = MockStorageBackend::new();
    backend.expect_load().times(1).returning(|_| Ok(None));
    backend
        .expect_save()
        .withf(|_, document| document == r#"{"scripts":{},"recency":[]}"#)
        .times(1)
        .returning(|_, _| Ok(()));

    repository_over(backend).remove_script("nothing").await.unwrap();
}

#[tokio::test]
async fn test_create_over_taken_name_never_writes() {
    let mut backend = MockStorageBackend::new();
    backend.expect_load().times(1).returning(|_| {
        Ok(Some(
            r#"{"scripts":{"a":{"name":"a","body":"sel"}},"recency":["a"]}"#.to_string(),
        ))
    });
    backend.expect_save().never();

    let created = repository_over(backend)
        .create_script(Script::new("a", "sel.trim()", None))
        .await
        .unwrap();
    assert!(!created);
}

#[tokio::test]
async fn test_storage_failures_surface_as_unavailable() {
    let mut backend = MockStorageBackend::new();
    backend
        .expect_load()
        .returning(|_| Err(StorageError::BackendUnavailable("offline".to_string())));
    backend.expect_save().never();

    let repository = repository_over(backend);
    assert_eq!(
        repository.get_script("any").await.unwrap_err(),
        RepositoryError::StorageUnavailable(StorageError::BackendUnavailable("offline".to_string()))
    );
    assert!(matches!(
        repository.save_script(Script::new("a", "sel", None)).await,
        Err(RepositoryError::StorageUnavailable(_))
    ));
}

#[tokio::test]
async fn test_write_failure_surfaces_as_unavailable() {
    let mut backend = MockStorageBackend::new();
    backend.expect_load().returning(|_| Ok(None));
    backend
        .expect_save()
        .returning(|_, _| Err(StorageError::Io("disk full".to_string())));

    let err = repository_over(backend)
        .save_script(Script::new("a", "sel", None))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Script storage is unavailable: I/O error: disk full"
    );
}

#[tokio::test]
async fn test_empty_name_never_touches_storage() {
    let mut backend = MockStorageBackend::new();
    backend.expect_load().never();
    backend.expect_save().never();

    let err = repository_over(backend)
        .save_script(Script::new("", "sel", None))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidScript(_)));
}

#[tokio::test]
async fn test_reads_reflect_external_writes() {
    let backend = InMemoryBackend::new();
    let repository = repository_over(backend.clone());
    repository.save_script(Script::new("a", "sel", None)).await.unwrap();

    // another writer replaces the document behind the repository's back
    backend
        .save(
            "selner",
            r#"{"scripts":{"b":{"name":"b","body":"sel.trim()"}},"recency":["b"]}"#,
        )
        .await
        .unwrap();

    assert_eq!(repository.get_script("a").await.unwrap(), None);
    assert_eq!(names(&repository.list_recently_used().await.unwrap()), vec!["b"]);
}

#[tokio::test]
async fn test_dangling_recency_names_are_skipped() {
    let backend = InMemoryBackend::new();
    backend
        .save(
            "selner",
            r#"{"scripts":{"a":{"name":"a","body":"sel"}},"recency":["gone","a"]}"#,
        )
        .await
        .unwrap();

    let repository = repository_over(backend);
    assert_eq!(names(&repository.list_recently_used().await.unwrap()), vec!["a"]);
}

#[tokio::test]
async fn test_concurrent_saves_are_not_lost() {
    let repository = Arc::new(ScriptRepository::in_memory());

    let mut handles = Vec::new();
    for i in 0..20 {
        let repository = Arc::clone(&repository);
        handles.push(tokio::spawn(async move {
            repository
                .save_script(Script::new(format!("script{}", i), "sel", None))
                .await
                .unwrap();
        }));
    }
    futures::future::join_all(handles)
        .await
        .into_iter()
        .for_each(|result| result.unwrap());

    assert_eq!(repository.list_scripts().await.unwrap().len(), 20);
    assert_eq!(repository.list_recently_used().await.unwrap().len(), 20);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    struct SlowBackend;

    #[async_trait::async_trait]
    impl StorageBackend for SlowBackend {
        async fn load(&self, _key: &str) -> Result<Option<String>, StorageError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
        async fn save(&self, _key: &str, _document: &str) -> Result<(), StorageError> {
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<(), StorageError> {
            Ok(())
        }
        async fn is_available(&self) -> bool {
            true
        }
    }

    let repository = ScriptRepository::new(
        Arc::new(SlowBackend),
        RepositoryConfig::default(),
        Duration::from_millis(20),
    );
    assert!(matches!(
        repository.list_scripts().await,
        Err(RepositoryError::StorageUnavailable(StorageError::Timeout(_)))
    ));
}

#[tokio::test]
async fn test_persists_across_instances_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let config = LocalFileSystemConfig {
        base_dir: temp_dir.path().to_string_lossy().to_string(),
        file_extension: "json".to_string(),
    };

    let first = repository_over(LocalFileSystemBackend::new(config.clone()));
    first
        .save_script(Script::new("upper", "sel.toUpperCase()", Some("Shout".into())))
        .await
        .unwrap();
    first.save_script(Script::new("lower", "sel.toLowerCase()", None)).await.unwrap();
    first.record_used("upper").await.unwrap();

    let second = repository_over(LocalFileSystemBackend::new(config));
    assert_eq!(
        second.get_script("upper").await.unwrap(),
        Some(Script::new("upper", "sel.toUpperCase()", Some("Shout".into())))
    );
    assert_eq!(
        names(&second.list_recently_used().await.unwrap()),
        vec!["upper", "lower"]
    );
    assert!(temp_dir.path().join("selner.json").exists());
}
