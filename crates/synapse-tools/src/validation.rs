//! Parameter validation helpers.
//!
//! Typed extraction from [`serde_json::Value`] with user-friendly error
//! messages returned as [`ToolOutput`] (not panics or unwraps) — validation
//! failures go back to the model as error-flagged tool results.

use serde_json::Value;

use synapse_core::tools::{error_result, ToolOutput};

/// Extract a required string parameter.
///
/// Returns `Err(ToolOutput)` with `is_error=true` if the parameter is
/// missing, null, empty, or the wrong type.
pub fn validate_required_string(
    args: &Value,
    param: &str,
    description: &str,
) -> Result<String, ToolOutput> {
    match args.get(param) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_) | Value::Null) | None => Err(error_result(format!(
            "Missing required parameter: {param} ({description})"
        ))),
        Some(_) => Err(error_result(format!(
            "Invalid type for parameter: {param} (expected string)"
        ))),
    }
}

/// Extract a required number parameter.
pub fn validate_required_number(
    args: &Value,
    param: &str,
    description: &str,
) -> Result<f64, ToolOutput> {
    match args.get(param) {
        Some(value) if value.is_number() => value.as_f64().ok_or_else(|| {
            error_result(format!("Invalid number for parameter: {param}"))
        }),
        Some(Value::Null) | None => Err(error_result(format!(
            "Missing required parameter: {param} ({description})"
        ))),
        Some(_) => Err(error_result(format!(
            "Invalid type for parameter: {param} (expected number)"
        ))),
    }
}

/// Extract an optional string parameter.
pub fn get_optional_string(args: &Value, param: &str) -> Option<String> {
    args.get(param).and_then(Value::as_str).map(String::from)
}

/// Extract an optional boolean parameter.
pub fn get_optional_bool(args: &Value, param: &str) -> Option<bool> {
    args.get(param).and_then(Value::as_bool)
}

/// Extract an optional integer parameter.
pub fn get_optional_u64(args: &Value, param: &str) -> Option<u64> {
    args.get(param).and_then(Value::as_u64)
}
