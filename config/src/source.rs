//! # Configuration Sources
//!
//! A source yields a partial settings tree addressed by the same dotted paths
//! as [`crate::Settings`]. Sources are ordered; later ones win per leaf.

use errors::ConfigError;
use serde_json::{Map, Value};

/// Pluggable provider of partial configuration.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Abstracts where configuration comes from (process environment, files,
/// the secret store, programmatic overrides) so the `ConfigManager` can merge
/// them uniformly.
///
/// ## Contract
/// - `load` returns a JSON object; an empty object means "nothing to add"
/// - Errors are reported as `ConfigError::SourceRead`; the manager logs them
///   and continues with an empty partial tree
/// - `name` identifies the source in logs and in `replace_source`
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> Result<Map<String, Value>, ConfigError>;
}

/// Inserts `value` at a dotted `path`, creating intermediate objects.
///
/// A non-object value sitting on the way is replaced by an object.
pub fn set_path(tree: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
    let mut cursor = tree;

    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            cursor.insert(segment.to_string(), value);
            return;
        }

        let entry = cursor
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        cursor = match entry {
            Value::Object(map) => map,
            _ => return,
        };
    }
}

/// Reads the value at a dotted `path`.
pub fn get_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|s| !s.is_empty())
        .try_fold(tree, |node, segment| node.get(segment))
}

/// In-memory overrides, typically the last source in the chain.
#[derive(Debug, Clone, Default)]
pub struct OverrideSource {
    name: String,
    tree: Map<String, Value>,
}

impl OverrideSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tree: Map::new(),
        }
    }

    /// Wraps an already nested object. Non-object values yield an empty source.
    pub fn from_tree(name: impl Into<String>, tree: Value) -> Self {
        let tree = match tree {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            tree,
        }
    }

    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        set_path(&mut self.tree, path, value.into());
        self
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        set_path(&mut self.tree, path, value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl ConfigSource for OverrideSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        Ok(self.tree.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_path_creates_nested_objects() {
        let mut tree = Map::new();
        set_path(&mut tree, "llm.azure_openai.additional_settings.endpoint", json!("x"));
        assert_eq!(
            Value::Object(tree),
            json!({"llm": {"azure_openai": {"additional_settings": {"endpoint": "x"}}}})
        );
    }

    #[test]
    fn test_set_path_replaces_scalar_on_the_way() {
        let mut tree = Map::new();
        set_path(&mut tree, "api", json!("flat"));
        set_path(&mut tree, "api.port", json!("8080"));
        assert_eq!(Value::Object(tree), json!({"api": {"port": "8080"}}));
    }

    #[test]
    fn test_get_path() {
        let tree = json!({"embedding": {"models": {"qwen3-8b": {"dimensions": 4096}}}});
        assert_eq!(
            get_path(&tree, "embedding.models.qwen3-8b.dimensions"),
            Some(&json!(4096))
        );
        assert_eq!(get_path(&tree, "embedding.missing"), None);
    }

    #[test]
    fn test_override_source_builder() {
        let source = OverrideSource::new("cli")
            .with("api.port", 9000)
            .with("api.debug", true);
        assert_eq!(source.name(), "cli");
        assert_eq!(
            Value::Object(source.load().unwrap()),
            json!({"api": {"port": 9000, "debug": true}})
        );
    }

    #[test]
    fn test_from_tree_ignores_non_objects() {
        assert!(OverrideSource::from_tree("x", json!([1, 2])).is_empty());
    }
}
