//! # Configuration File Loading
//!
//! Loads partial settings trees from YAML, JSON or TOML files.
//!
//! Supports automatic format detection based on file extension.

use crate::source::ConfigSource;
use errors::ConfigError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Structured file formats a [`FileSource`] understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    /// Detects the format from the extension, case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

/// Parse a configuration file into a partial tree.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Reads a structured file into the dotted-path shape the environment source
/// produces, so the manager can merge both the same way.
///
/// ## Supported Formats
/// - `.yaml` / `.yml`: YAML
/// - `.json`: JSON
/// - `.toml`: TOML
///
/// ## Usage
/// ```rust,no_run
/// use config::load_file_tree;
/// use std::path::Path;
///
/// let tree = load_file_tree(Path::new("config.yaml")).unwrap_or_default();
/// println!("{} top-level sections", tree.len());
/// ```
///
/// ## Error Handling
/// - Missing file: `Ok` with an empty tree
/// - Unknown extension, unreadable file, invalid syntax or a non-mapping
///   document root: `ConfigError::SourceRead`
pub fn load_file_tree(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let source_name = path.display().to_string();
    let read_error = |reason: String| ConfigError::SourceRead {
        source_name: source_name.clone(),
        reason,
    };

    let format = FileFormat::from_path(path).map_err(|e| read_error(e.to_string()))?;

    if !path.exists() {
        tracing::debug!("Configuration file {} not found, skipping", source_name);
        return Ok(Map::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| read_error(e.to_string()))?;

    let document: Value = match format {
        FileFormat::Yaml => {
            serde_yaml::from_str(&contents).map_err(|e| read_error(e.to_string()))?
        }
        FileFormat::Json => {
            serde_json::from_str(&contents).map_err(|e| read_error(e.to_string()))?
        }
        FileFormat::Toml => toml::from_str(&contents).map_err(|e| read_error(e.to_string()))?,
    };

    match document {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(read_error(format!(
            "document root must be a mapping, found {}",
            type_name(&other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

/// A configuration file, re-read on every reload.
#[derive(Debug, Clone)]
pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("file:{}", path.display()),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Map<String, Value>, ConfigError> {
        load_file_tree(&self.path)
    }
}
