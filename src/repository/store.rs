use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::storage::StorageError;

/// A named, persisted expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Script {
    pub fn new(
        name: impl Into<String>,
        body: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
            description,
        }
        .normalized()
    }

    /// Empty descriptions are stored as absent.
    pub fn normalized(mut self) -> Self {
        if self.description.as_deref() == Some("") {
            self.description = None;
        }
        self
    }
}

/// The whole persisted document.
///
/// Every name in `recency` is a key of `scripts`, and appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub scripts: BTreeMap<String, Script>,
    #[serde(default)]
    pub recency: Vec<String>,
}

impl Store {
    /// Decodes a stored document. A missing document is an empty store.
    pub fn from_document(document: Option<&str>) -> Result<Self, StorageError> {
        match document {
            None => Ok(Self::default()),
            Some(document) => serde_json::from_str(document)
                .map_err(|e| StorageError::Deserialization(format!("Malformed store: {}", e))),
        }
    }

    pub fn to_document(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Script> {
        self.scripts.get(name)
    }

    /// Inserts or overwrites in place.
    pub fn insert(&mut self, script: Script) {
        self.scripts.insert(script.name.clone(), script);
    }

    /// Moves `name` to the front of the recency list. Names that are not
    /// stored scripts are only removed, never inserted.
    pub fn touch(&mut self, name: &str, limit: Option<usize>) {
        self.recency.retain(|n| n != name);
        if self.scripts.contains_key(name) {
            self.recency.insert(0, name.to_string());
        }
        if let Some(limit) = limit {
            self.recency.truncate(limit);
        }
    }

    /// Deletes a script together with its recency entry.
    pub fn remove(&mut self, name: &str) -> Option<Script> {
        let removed = self.scripts.remove(name);
        self.recency.retain(|n| n != name);
        removed
    }

    /// Resolves the recency list, skipping names without a script.
    pub fn recently_used(&self) -> Vec<Script> {
        self.recency
            .iter()
            .filter_map(|name| {
                let script = self.scripts.get(name);
                if script.is_none() {
                    warn!("Recency list refers to unknown script: {}", name);
                }
                script.cloned()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store_with(names: &[&str]) -> Store {
        let mut store = Store::default();
        for name in names {
            store.insert(Script::new(*name, "sel", None));
        }
        store
    }

    #[test]
    fn test_empty_description_is_absent() {
        let script = Script::new("upper", "sel.toUpperCase()", Some(String::new()));
        assert_eq!(script.description, None);
        assert_eq!(
            serde_json::to_string(&script).unwrap(),
            r#"{"name":"upper","body":"sel.toUpperCase()"}"#
        );
    }

    #[test]
    fn test_document_layout() {
        let mut store = store_with(&["b", "a"]);
        store.touch("a", None);
        let document = store.to_document().unwrap();
        assert_eq!(
            document,
            r#"{"scripts":{"a":{"name":"a","body":"sel"},"b":{"name":"b","body":"sel"}},"recency":["a"]}"#
        );
        assert_eq!(Store::from_document(Some(&document)).unwrap(), store);
    }

    #[test]
    fn test_missing_and_malformed_documents() {
        assert_eq!(Store::from_document(None).unwrap(), Store::default());
        assert_eq!(Store::from_document(Some("{}")).unwrap(), Store::default());
        assert!(matches!(
            Store::from_document(Some("not json")),
            Err(StorageError::Deserialization(_))
        ));
    }

    #[test]
    fn test_touch_orders_and_dedups() {
        let mut store = store_with(&["a", "b", "c"]);
        store.touch("a", None);
        store.touch("b", None);
        store.touch("a", None);
        assert_eq!(store.recency, vec!["a", "b"]);

        store.touch("ghost", None);
        assert_eq!(store.recency, vec!["a", "b"]);
    }

    #[test]
    fn test_touch_with_limit() {
        let mut store = store_with(&["a", "b", "c"]);
        for name in ["a", "b", "c"] {
            store.touch(name, Some(2));
        }
        assert_eq!(store.recency, vec!["c", "b"]);
    }

    #[test]
    fn test_remove_clears_recency() {
        let mut store = store_with(&["a", "b"]);
        store.touch("a", None);
        store.touch("b", None);
        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert_eq!(store.recency, vec!["b"]);
        assert!(store.get("a").is_none());
    }

    #[test]
    fn test_recently_used_skips_dangling_names() {
        let mut store = store_with(&["a"]);
        store.recency = vec!["gone".to_string(), "a".to_string()];
        let names: Vec<String> = store.recently_used().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a"]);
    }
}
