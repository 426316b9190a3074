use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};
use thiserror::Error;

/// Top level configuration, usually read from a JSON file with [`from_file`].
/// Every section and field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SelnerConfig {
    #[serde(default)]
    pub evaluator: EvaluatorConfig,

    #[serde(default)]
    pub repository: RepositoryConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Guardrails for script evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvaluatorConfig {
    /// Name under which the selected text is visible to scripts.
    #[serde(default = "default_input_binding")]
    pub input_binding: String,

    /// Longest accepted script source, in characters.
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,

    /// Node visits plus callback invocations allowed per evaluation.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Longest string, in characters, an evaluation may produce.
    #[serde(default = "default_max_string_length")]
    pub max_string_length: usize,

    /// Most elements an array may hold, counting those of nested arrays.
    #[serde(default = "default_max_array_length")]
    pub max_array_length: usize,

    /// Deepest nesting of arrays and closures a value may reach.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            input_binding: default_input_binding(),
            max_expression_length: default_max_expression_length(),
            max_steps: default_max_steps(),
            max_string_length: default_max_string_length(),
            max_array_length: default_max_array_length(),
            max_nesting_depth: default_max_nesting_depth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepositoryConfig {
    /// Storage key holding the whole script document.
    #[serde(default = "default_repository_key")]
    pub key: String,

    /// Caps the recency list. Unbounded when absent.
    #[serde(default)]
    pub recency_limit: Option<usize>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            key: default_repository_key(),
            recency_limit: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend_type: BackendType,

    /// Upper bound for a single backend read or write.
    #[serde(default = "default_operation_timeout", with = "duration_ms")]
    pub operation_timeout: Duration,

    #[serde(default)]
    pub local: LocalFileSystemConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend_type: BackendType::default(),
            operation_timeout: default_operation_timeout(),
            local: LocalFileSystemConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BackendType {
    InMemory,
    #[default]
    LocalFileSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocalFileSystemConfig {
    /// Base directory path
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// File extension for stored documents
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
}

impl Default for LocalFileSystemConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            file_extension: default_file_extension(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl SelnerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, message: &str| {
            Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: message.to_string(),
            })
        };

        if !is_identifier(&self.evaluator.input_binding) {
            return invalid("input_binding", "must be a valid identifier");
        }
        if self.evaluator.max_expression_length == 0 {
            return invalid("max_expression_length", "must be greater than 0");
        }
        if self.evaluator.max_steps == 0 {
            return invalid("max_steps", "must be greater than 0");
        }
        if self.evaluator.max_nesting_depth == 0 {
            return invalid("max_nesting_depth", "must be greater than 0");
        }
        if self.repository.key.is_empty() {
            return invalid("key", "cannot be empty");
        }
        if self.storage.operation_timeout.is_zero() {
            return invalid("operation_timeout", "must be greater than 0");
        }
        if self.storage.backend_type == BackendType::LocalFileSystem
            && self.storage.local.base_dir.is_empty()
        {
            return invalid("base_dir", "cannot be empty");
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T, ConfigError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, ConfigError> {
    Ok(serde_json::from_str(s)?)
}

fn default_input_binding() -> String {
    "sel".to_string()
}
fn default_max_expression_length() -> usize {
    4096
}
fn default_max_steps() -> usize {
    100_000
}
fn default_max_string_length() -> usize {
    10_000_000
}
fn default_max_array_length() -> usize {
    1_000_000
}
fn default_max_nesting_depth() -> usize {
    64
}
fn default_repository_key() -> String {
    "selner".to_string()
}
fn default_operation_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_base_dir() -> String {
    std::env::temp_dir()
        .join("selner")
        .to_string_lossy()
        .to_string()
}
fn default_file_extension() -> String {
    "json".to_string()
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: SelnerConfig = from_str("{}").unwrap();
        assert_eq!(config, SelnerConfig::default());
        assert_eq!(config.evaluator.input_binding, "sel");
        assert_eq!(config.repository.key, "selner");
        assert_eq!(config.repository.recency_limit, None);
        assert_eq!(config.storage.operation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_partial_document() {
        let config: SelnerConfig = from_str(
            r#"{
                "evaluator": { "max_steps": 10 },
                "repository": { "recency_limit": 20 },
                "storage": { "backend_type": "InMemory", "operation_timeout": 250 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.evaluator.max_steps, 10);
        assert_eq!(config.evaluator.max_expression_length, 4096);
        assert_eq!(config.evaluator.max_nesting_depth, 64);
        assert_eq!(config.repository.recency_limit, Some(20));
        assert_eq!(config.storage.backend_type, BackendType::InMemory);
        assert_eq!(config.storage.operation_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_validate() {
        let mut config = SelnerConfig::default();
        assert!(config.validate().is_ok());

        config.evaluator.input_binding = "1abc".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "input_binding"
        ));

        let mut config = SelnerConfig::default();
        config.storage.operation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = SelnerConfig::default();
        config.evaluator.max_nesting_depth = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_nesting_depth"
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("selner.json");
        std::fs::write(&path, r#"{ "repository": { "key": "custom" } }"#).unwrap();

        let config = SelnerConfig::from_file(&path).unwrap();
        assert_eq!(config.repository.key, "custom");

        assert!(matches!(
            SelnerConfig::from_file(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
