//! # Sanitized Export
//!
//! Writes a settings snapshot to disk with every credential replaced by a
//! fixed placeholder.

use crate::settings::Settings;
use errors::ConfigError;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

/// Replacement written for every credential field.
pub const SECRET_PLACEHOLDER: &str = "[set via secure environment]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Yaml,
    Json,
}

impl ExportFormat {
    /// Picks the format from the target extension; anything but `.json` is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Whether `key` names a credential. Numeric values never are, which keeps
/// fields such as `max_tokens` intact.
pub fn is_credential(key: &str, value: &Value) -> bool {
    if value.is_number() {
        return false;
    }
    let key = key.to_lowercase();
    key == "api_key"
        || key.ends_with("_api_key")
        || key.contains("password")
        || key.contains("secret")
        || key.contains("token")
}

/// Replaces every credential leaf in place.
pub fn sanitize(tree: &mut Value) {
    match tree {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if !value.is_object() && !value.is_array() && is_credential(key, value) {
                    *value = Value::String(SECRET_PLACEHOLDER.to_string());
                } else {
                    sanitize(value);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(sanitize),
        _ => {}
    }
}

/// Renders the sanitized snapshot in `format`.
pub fn render_sanitized(settings: &Settings, format: ExportFormat) -> Result<String, ConfigError> {
    let mut tree = serde_json::to_value(settings).map_err(|e| ConfigError::Export {
        path: String::new(),
        reason: e.to_string(),
    })?;
    sanitize(&mut tree);

    let rendered = match format {
        ExportFormat::Json => serde_json::to_string_pretty(&tree).map_err(|e| e.to_string()),
        ExportFormat::Yaml => serde_yaml::to_string(&tree).map_err(|e| e.to_string()),
    };
    rendered.map_err(|reason| ConfigError::Export {
        path: String::new(),
        reason,
    })
}

/// Export a sanitized settings snapshot.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Produces a shareable copy of the effective configuration. Credentials
/// (`api_key`, password, secret and token fields) are replaced with
/// [`SECRET_PLACEHOLDER`] regardless of the output format.
///
/// ## Atomicity
/// The file is written to a temporary sibling and renamed into place, so
/// readers never observe a partial export.
pub fn export_settings(
    settings: &Settings,
    path: &Path,
    format: ExportFormat,
) -> Result<(), ConfigError> {
    let export_error = |reason: String| ConfigError::Export {
        path: path.display().to_string(),
        reason,
    };

    let rendered = render_sanitized(settings, format).map_err(|e| export_error(e.to_string()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| export_error(e.to_string()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| export_error(e.to_string()))?;
    tmp.write_all(rendered.as_bytes())
        .map_err(|e| export_error(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| export_error(e.error.to_string()))?;

    tracing::info!("Exported sanitized configuration to {}", path.display());
    Ok(())
}
