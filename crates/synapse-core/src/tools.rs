//! Tool definition and result types shared across crates.
//!
//! A [`ToolDefinition`] is the callable, schema-carrying shape handed to an
//! LLM provider. A [`ToolOutput`] is what a tool execution produces — always
//! a JSON value plus an error flag, never a transport-level failure.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// JSON Schema for a tool's input contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Schema type — always `"object"` for tool inputs.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property schemas keyed by parameter name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Map<String, Value>>,
    /// Names of required parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl ToolParameterSchema {
    /// An empty object schema (tool takes no parameters).
    pub fn empty() -> Self {
        Self {
            schema_type: "object".into(),
            properties: None,
            required: None,
        }
    }
}

/// Callable tool definition sent to the LLM provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Input contract.
    pub parameters: ToolParameterSchema,
}

/// The result of one tool execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    /// Arbitrary JSON output handed back to the model.
    pub content: Value,
    /// Whether the content describes a failure the model should react to.
    pub is_error: bool,
}

/// Successful text output.
pub fn text_result(text: impl Into<String>) -> ToolOutput {
    ToolOutput {
        content: json!({ "text": text.into() }),
        is_error: false,
    }
}

/// Successful structured output.
pub fn json_result(content: Value) -> ToolOutput {
    ToolOutput {
        content,
        is_error: false,
    }
}

/// Error output describing a failure to the model.
pub fn error_result(message: impl Into<String>) -> ToolOutput {
    ToolOutput {
        content: json!({ "error": message.into() }),
        is_error: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_schema_shape() {
        let schema = ToolParameterSchema::empty();
        let v = serde_json::to_value(&schema).unwrap();
        assert_eq!(v["type"], "object");
        assert!(v.get("properties").is_none());
        assert!(v.get("required").is_none());
    }

    #[test]
    fn text_result_not_error() {
        let out = text_result("done");
        assert!(!out.is_error);
        assert_eq!(out.content["text"], "done");
    }

    #[test]
    fn error_result_flags_error() {
        let out = error_result("bad input");
        assert!(out.is_error);
        assert_eq!(out.content["error"], "bad input");
    }

    #[test]
    fn definition_serde_round_trip() {
        let def = ToolDefinition {
            name: "calculator".into(),
            description: "Arithmetic".into(),
            parameters: ToolParameterSchema::empty(),
        };
        let v = serde_json::to_value(&def).unwrap();
        let back: ToolDefinition = serde_json::from_value(v).unwrap();
        assert_eq!(back, def);
    }
}
