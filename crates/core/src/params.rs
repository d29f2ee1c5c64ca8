//! Lenient extraction of typed parameters from a JSON params object, plus a
//! small builder for parameter schema entries.
//!
//! Extraction never fails: a missing key or a value of the wrong type yields
//! the supplied default. Range checking happens later in
//! [`SimConfig::validate`](crate::config::SimConfig::validate).

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Extracts an `f64` from `params[name]`, accepting integers too.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a non-negative integer from `params[name]`.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// Extracts a `bool` from `params[name]`.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Deserializes `params[name]` into any serde type (typically a unit enum
/// such as [`BoundaryPolicy`](crate::config::BoundaryPolicy)).
pub fn param_enum<T: DeserializeOwned>(params: &Value, name: &str, default: T) -> T {
    params
        .get(name)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(default)
}

/// Builds one numeric schema entry.
pub fn number_schema(default: f64, min: f64, max: f64, description: &str) -> Value {
    json!({
        "type": "number",
        "default": default,
        "min": min,
        "max": max,
        "description": description,
    })
}

/// Builds one integer schema entry.
pub fn integer_schema(default: usize, min: usize, max: usize, description: &str) -> Value {
    json!({
        "type": "integer",
        "default": default,
        "min": min,
        "max": max,
        "description": description,
    })
}

/// Builds one string-choice schema entry.
pub fn choice_schema(default: &str, choices: &[&str], description: &str) -> Value {
    json!({
        "type": "string",
        "default": default,
        "choices": choices,
        "description": description,
    })
}
