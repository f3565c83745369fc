//! Builder for tool JSON Schema definitions.
//!
//! Replaces the repetitive `Map::new()` + `insert()` boilerplate in every
//! tool's `definition()` method with a concise builder API.

use serde_json::Value;

use synapse_core::tools::{ToolDefinition, ToolParameterSchema};

/// Fluent builder for [`ToolDefinition`] schemas.
///
/// ```ignore
/// ToolSchemaBuilder::new("calculator", "Basic arithmetic")
///     .required_property("operation", json!({"type": "string"}))
///     .property("precision", json!({"type": "number"}))
///     .build()
/// ```
pub struct ToolSchemaBuilder {
    name: String,
    description: String,
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ToolSchemaBuilder {
    /// Create a new builder with the given tool name and description.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    /// Add an optional property.
    pub fn property(mut self, name: &str, schema: Value) -> Self {
        let _ = self.properties.insert(name.into(), schema);
        self
    }

    /// Add a required property.
    pub fn required_property(mut self, name: &str, schema: Value) -> Self {
        let _ = self.properties.insert(name.into(), schema);
        self.required.push(name.into());
        self
    }

    /// Build the final [`ToolDefinition`].
    pub fn build(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description,
            parameters: ToolParameterSchema {
                schema_type: "object".into(),
                properties: if self.properties.is_empty() {
                    None
                } else {
                    Some(self.properties)
                },
                required: if self.required.is_empty() {
                    None
                } else {
                    Some(self.required)
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_schema() {
        let def = ToolSchemaBuilder::new("empty", "No params").build();
        assert_eq!(def.name, "empty");
        assert_eq!(def.parameters.schema_type, "object");
        assert!(def.parameters.properties.is_none());
        assert!(def.parameters.required.is_none());
    }

    #[test]
    fn required_property_in_both_properties_and_required() {
        let def = ToolSchemaBuilder::new("t", "d")
            .required_property("name", json!({"type": "string"}))
            .build();
        assert!(def.parameters.properties.unwrap().contains_key("name"));
        assert_eq!(def.parameters.required.unwrap(), vec!["name"]);
    }

    #[test]
    fn optional_property_not_in_required() {
        let def = ToolSchemaBuilder::new("t", "d")
            .property("limit", json!({"type": "number"}))
            .build();
        assert!(def.parameters.properties.unwrap().contains_key("limit"));
        assert!(def.parameters.required.is_none());
    }

    #[test]
    fn mixed_properties_correct_separation() {
        let def = ToolSchemaBuilder::new("t", "d")
            .required_property("operation", json!({"type": "string"}))
            .required_property("a", json!({"type": "number"}))
            .property("precision", json!({"type": "number"}))
            .build();
        assert_eq!(def.parameters.properties.unwrap().len(), 3);
        assert_eq!(def.parameters.required.unwrap(), vec!["operation", "a"]);
    }
}
