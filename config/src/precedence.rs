//! # Configuration Precedence
//!
//! Deep merge of partial trees and string-to-type coercion of merged leaves.
//!
//! # Precedence Order
//! Sources are applied in registration order on top of the schema defaults;
//! the last source defining a leaf wins.

use serde_json::{Map, Number, Value};

/// Merges `overlay` onto `base`.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Applies one source's partial tree to the accumulated tree.
///
/// ## Deep Merge
/// Objects merge key-by-key. Everything else (scalars, lists, and values whose
/// type differs from the base) is overwritten outright by the overlay.
///
/// ## Usage
/// ```rust
/// use config::deep_merge;
/// use serde_json::json;
///
/// let mut base = json!({"api": {"host": "0.0.0.0", "port": 8000}});
/// deep_merge(&mut base, json!({"api": {"port": "8080"}}));
/// assert_eq!(base, json!({"api": {"host": "0.0.0.0", "port": "8080"}}));
/// ```
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Converts one raw string using the fixed precedence:
/// boolean token, then integer, then float, then string.
///
/// Boolean tokens are `true/yes/y/1` and `false/no/n/0`, any case. `1` and
/// `0` are therefore booleans here; [`coerce_tree`] prefers numbers for
/// leaves the schema declares numeric.
pub fn coerce_scalar(raw: &str) -> Value {
    if let Some(flag) = parse_bool_token(raw) {
        return Value::Bool(flag);
    }
    parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string()))
}

pub fn parse_bool_token(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Optional leading `-`, then one or more ASCII digits.
pub fn parse_integer(raw: &str) -> Option<Value> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>()
        .ok()
        .map(Value::from)
        .or_else(|| raw.parse::<u64>().ok().map(Value::from))
}

/// Exactly one `.` and a finite decimal.
pub fn parse_float(raw: &str) -> Option<Value> {
    if raw.matches('.').count() != 1 {
        return None;
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn parse_number(raw: &str) -> Option<Value> {
    parse_integer(raw).or_else(|| parse_float(raw))
}

/// Walks every leaf of `tree` and types string values using `schema`, the
/// default tree, as the guide.
///
/// - declared string: left unchanged
/// - declared list: comma-separated items, trimmed, empty items dropped
/// - declared number: integer, then float, then the fixed precedence
/// - anything else (booleans, keys absent from the schema such as the
///   contents of `additional_settings`): the fixed precedence
///
/// Values that are already non-string pass through unchanged.
pub fn coerce_tree(tree: &mut Value, schema: Option<&Value>) {
    match tree {
        Value::Object(map) => coerce_object(map, schema),
        Value::Array(items) => {
            if schema.is_none() {
                for item in items {
                    coerce_tree(item, None);
                }
            }
        }
        Value::String(raw) => {
            if let Some(typed) = coerce_leaf(raw, schema) {
                *tree = typed;
            }
        }
        _ => {}
    }
}

fn coerce_object(map: &mut Map<String, Value>, schema: Option<&Value>) {
    for (key, value) in map.iter_mut() {
        let child_schema = schema.and_then(|s| s.get(key));
        coerce_tree(value, child_schema);
    }
}

fn coerce_leaf(raw: &str, schema: Option<&Value>) -> Option<Value> {
    match schema {
        Some(Value::String(_)) => None,
        Some(Value::Array(_)) => Some(Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        )),
        Some(Value::Number(_)) => Some(parse_number(raw).unwrap_or_else(|| coerce_scalar(raw))),
        _ => Some(coerce_scalar(raw)),
    }
}
