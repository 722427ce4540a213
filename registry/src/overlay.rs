//! Settings overlays handed to provider adapters.

use errors::RegistryError;
use serde_json::{Map, Value};

/// Record defaults overlaid by the caller's values. Shallow: a caller key
/// replaces the whole default value.
pub fn merge_overlay(defaults: &Map<String, Value>, caller: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = defaults.clone();
    merged.extend(caller.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Checks the well-known generation keys. Unknown keys pass through and
/// `null` means unset.
pub fn validate_overlay(overlay: &Map<String, Value>) -> Result<(), RegistryError> {
    match overlay.get("temperature") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let valid = value.as_f64().is_some_and(|t| (0.0..=1.0).contains(&t));
            if !valid {
                return Err(RegistryError::InvalidOverlay {
                    field: "temperature".to_string(),
                    reason: format!("expected a number between 0 and 1, got {}", value),
                });
            }
        }
    }

    match overlay.get("max_tokens") {
        None | Some(Value::Null) => {}
        Some(value) => {
            if !value.as_u64().is_some_and(|n| n > 0) {
                return Err(RegistryError::InvalidOverlay {
                    field: "max_tokens".to_string(),
                    reason: format!("expected a positive integer, got {}", value),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_caller_wins() {
        let defaults = map(json!({"temperature": 0.1, "endpoint": "https://a"}));
        let caller = map(json!({"temperature": 0.5}));
        let merged = merge_overlay(&defaults, &caller);
        assert_eq!(merged["temperature"], json!(0.5));
        assert_eq!(merged["endpoint"], json!("https://a"));
    }

    #[test]
    fn test_temperature_bounds() {
        assert!(validate_overlay(&map(json!({"temperature": 0}))).is_ok());
        assert!(validate_overlay(&map(json!({"temperature": 1.0}))).is_ok());
        assert!(validate_overlay(&map(json!({"temperature": null}))).is_ok());
        assert!(matches!(
            validate_overlay(&map(json!({"temperature": 1.5}))),
            Err(RegistryError::InvalidOverlay { field, .. }) if field == "temperature"
        ));
        assert!(validate_overlay(&map(json!({"temperature": "hot"}))).is_err());
    }

    #[test]
    fn test_max_tokens_positive_integer() {
        assert!(validate_overlay(&map(json!({"max_tokens": 1024}))).is_ok());
        assert!(validate_overlay(&map(json!({"max_tokens": 0}))).is_err());
        assert!(validate_overlay(&map(json!({"max_tokens": -5}))).is_err());
        assert!(validate_overlay(&map(json!({"max_tokens": 10.5}))).is_err());
    }

    #[test]
    fn test_unknown_keys_pass() {
        assert!(validate_overlay(&map(json!({"top_k": "anything"}))).is_ok());
    }
}
