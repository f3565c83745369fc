//! Dependency-free arithmetic tool.
//!
//! Useful on its own for quick computations and as the canonical example of
//! a tool with no external dependencies: its constructor ignores the
//! context and its health probe always passes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use synapse_core::tools::{error_result, json_result, ToolDefinition, ToolOutput};

use crate::errors::ToolError;
use crate::schema::ToolSchemaBuilder;
use crate::traits::{ContextVariables, SynapseTool, ToolDescriptor, ToolInvocation};
use crate::validation::{validate_required_number, validate_required_string};

/// Basic four-operation calculator.
pub struct CalculatorTool;

/// Registry descriptor for the calculator.
pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        "calculator",
        "Perform basic arithmetic on two numbers",
        |_ctx: &ContextVariables| Ok(Arc::new(CalculatorTool) as Arc<dyn SynapseTool>),
    )
}

#[async_trait]
impl SynapseTool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn definition(&self) -> ToolDefinition {
        ToolSchemaBuilder::new(
            "calculator",
            "Perform basic arithmetic on two numbers",
        )
        .required_property(
            "operation",
            json!({
                "type": "string",
                "enum": ["add", "subtract", "multiply", "divide"],
                "description": "The operation to perform"
            }),
        )
        .required_property("a", json!({"type": "number", "description": "First operand"}))
        .required_property("b", json!({"type": "number", "description": "Second operand"}))
        .build()
    }

    async fn execute(&self, params: Value, _ctx: &ToolInvocation) -> Result<ToolOutput, ToolError> {
        let operation = match validate_required_string(&params, "operation", "add/subtract/multiply/divide") {
            Ok(op) => op,
            Err(output) => return Ok(output),
        };
        let a = match validate_required_number(&params, "a", "first operand") {
            Ok(n) => n,
            Err(output) => return Ok(output),
        };
        let b = match validate_required_number(&params, "b", "second operand") {
            Ok(n) => n,
            Err(output) => return Ok(output),
        };

        let result = match operation.as_str() {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Ok(error_result("division by zero"));
                }
                a / b
            }
            other => {
                return Ok(error_result(format!("unknown operation: {other}")));
            }
        };

        Ok(json_result(json!({ "result": result })))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;

    fn ctx() -> ToolInvocation {
        ToolInvocation {
            tool_call_id: "call_1".to_string(),
            thread_id: "thr_1".to_string(),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn add_five_and_three() {
        let out = CalculatorTool
            .execute(json!({"operation": "add", "a": 5, "b": 3}), &ctx())
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(out.content["result"], json!(8.0));
    }

    #[tokio::test]
    async fn all_operations() {
        let cases = [
            ("subtract", 5.0, 3.0, 2.0),
            ("multiply", 5.0, 3.0, 15.0),
            ("divide", 6.0, 3.0, 2.0),
        ];
        for (op, a, b, expected) in cases {
            let out = CalculatorTool
                .execute(json!({"operation": op, "a": a, "b": b}), &ctx())
                .await
                .unwrap();
            assert_eq!(out.content["result"], json!(expected), "{op}");
        }
    }

    #[tokio::test]
    async fn divide_by_zero_is_tool_error_result() {
        let out = CalculatorTool
            .execute(json!({"operation": "divide", "a": 1, "b": 0}), &ctx())
            .await
            .unwrap();
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn missing_operand_reported_to_model() {
        let out = CalculatorTool
            .execute(json!({"operation": "add", "a": 5}), &ctx())
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.content["error"].as_str().unwrap().contains("b"));
    }

    #[tokio::test]
    async fn descriptor_builds_without_context_and_is_healthy() {
        let tool = (descriptor().constructor)(&ContextVariables::default()).unwrap();
        assert_eq!(tool.name(), "calculator");
        assert!(tool.health().await.healthy);
    }

    #[test]
    fn definition_declares_required_params() {
        let def = CalculatorTool.definition();
        assert_eq!(
            def.parameters.required.unwrap(),
            vec!["operation", "a", "b"]
        );
    }
}
