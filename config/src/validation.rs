//! # Configuration Validation
//!
//! Turns a merged, coerced tree into a validated [`Settings`] snapshot.

use crate::settings::Settings;
use errors::ConfigError;
use serde_json::Value;
use validator::Validate;

/// Validate a merged settings tree.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Final gate before a snapshot is published: the tree must deserialize into
/// the schema (types, shapes) and then pass every `validator` rule.
///
/// ## Usage
/// ```rust
/// use config::{Settings, validate_tree};
///
/// let settings = validate_tree(&Settings::default_tree()).unwrap();
/// assert_eq!(settings, Settings::default());
/// ```
///
/// ## Validation Rules
/// - `api.port`, `monitoring.prometheus_port`: 1-65535
/// - `transformation.default_temperature`: 0.0-1.0
/// - `logging.level`: trace/debug/info/warn/error (any case)
/// - `logging.format`: text/json
/// - `llm.default_provider`: a known provider tag
/// - `environment`: development/staging/production/test
pub fn validate_tree(tree: &Value) -> Result<Settings, ConfigError> {
    let settings: Settings =
        serde_json::from_value(tree.clone()).map_err(|e| ConfigError::Validation {
            reason: e.to_string(),
        })?;

    settings.validate().map_err(|e| ConfigError::Validation {
        reason: e.to_string(),
    })?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::deep_merge;
    use serde_json::json;

    #[test]
    fn test_validate_default_tree() {
        assert!(validate_tree(&Settings::default_tree()).is_ok());
    }

    #[test]
    fn test_wrong_type_rejected() {
        let mut tree = Settings::default_tree();
        deep_merge(&mut tree, json!({"api": {"port": "not-a-port"}}));
        let err = validate_tree(&tree).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut tree = Settings::default_tree();
        deep_merge(&mut tree, json!({"api": {"workers": 0}}));
        assert!(validate_tree(&tree).is_err());

        let mut tree = Settings::default_tree();
        deep_merge(&mut tree, json!({"api": {"port": 70000}}));
        assert!(validate_tree(&tree).is_err());
    }

    #[test]
    fn test_invalid_choice_rejected() {
        let mut tree = Settings::default_tree();
        deep_merge(&mut tree, json!({"logging": {"format": "xml"}}));
        assert!(validate_tree(&tree).is_err());

        let mut tree = Settings::default_tree();
        deep_merge(&mut tree, json!({"environment": "moon"}));
        assert!(validate_tree(&tree).is_err());
    }

    #[test]
    fn test_valid_override_accepted() {
        let mut tree = Settings::default_tree();
        deep_merge(
            &mut tree,
            json!({"api": {"port": 8080}, "llm": {"default_provider": "openai"}}),
        );
        let settings = validate_tree(&tree).unwrap();
        assert_eq!(settings.api.port, 8080);
        assert_eq!(settings.llm.default_provider, "openai");
    }
}
