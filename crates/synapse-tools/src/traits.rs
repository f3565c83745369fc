//! Core trait and dependency abstractions for the tool system.
//!
//! Defines [`SynapseTool`] — the trait every tool implements — plus the
//! [`ContextVariables`] container holding the external dependencies (HTTP
//! client, service base URLs, credentials, scope ids) a tool's constructor
//! may declare. Constructors fail fast when a declared dependency is absent,
//! so a misconfigured deployment surfaces at registration time rather than
//! mid-conversation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use synapse_core::tools::{ToolDefinition, ToolOutput};

use crate::errors::ToolError;

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// External dependencies tools are constructed from.
#[derive(Clone, Default)]
pub struct ContextVariables {
    /// Shared HTTP client for outbound calls.
    pub http: Option<reqwest::Client>,
    /// Service base URLs keyed by service name.
    pub base_urls: HashMap<String, String>,
    /// Credentials keyed by name.
    pub credentials: HashMap<String, String>,
    /// Project scope, when the conversation runs inside a project.
    pub project_id: Option<String>,
    /// Virtual-lab scope, when the conversation runs inside a lab.
    pub virtual_lab_id: Option<String>,
}

impl ContextVariables {
    /// The HTTP client, or `MissingContext`.
    pub fn require_http(&self) -> Result<reqwest::Client, ToolError> {
        self.http.clone().ok_or(ToolError::MissingContext {
            variable: "http_client".to_string(),
        })
    }

    /// A service base URL, or `MissingContext`.
    pub fn require_base_url(&self, service: &str) -> Result<String, ToolError> {
        self.base_urls
            .get(service)
            .cloned()
            .ok_or_else(|| ToolError::MissingContext {
                variable: format!("base_url:{service}"),
            })
    }

    /// A credential, or `MissingContext`.
    pub fn require_credential(&self, name: &str) -> Result<String, ToolError> {
        self.credentials
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::MissingContext {
                variable: format!("credential:{name}"),
            })
    }
}

/// Execution context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolInvocation {
    /// Unique ID of this tool call.
    pub tool_call_id: String,
    /// Thread the conversation runs in.
    pub thread_id: String,
    /// Cancellation token for cooperative cancellation.
    pub cancellation: CancellationToken,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of a tool health probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthStatus {
    /// Whether the tool's dependencies respond.
    pub healthy: bool,
    /// Failure detail when unhealthy.
    pub detail: Option<String>,
}

impl HealthStatus {
    /// A passing probe.
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: None,
        }
    }

    /// A failing probe with a reason.
    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: Some(detail.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SynapseTool trait
// ─────────────────────────────────────────────────────────────────────────────

/// The core trait every tool implements.
#[async_trait]
pub trait SynapseTool: Send + Sync {
    /// Tool name — the exact string sent to/from the LLM.
    fn name(&self) -> &str;

    /// Generate the schema sent to the LLM.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with JSON arguments.
    async fn execute(&self, params: Value, ctx: &ToolInvocation) -> Result<ToolOutput, ToolError>;

    /// Probe the tool's external dependencies. Tools without external
    /// dependencies are healthy by definition.
    async fn health(&self) -> HealthStatus {
        HealthStatus::healthy()
    }
}

impl std::fmt::Debug for dyn SynapseTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynapseTool")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}

/// Constructor producing a tool instance from context variables.
pub type ToolConstructor =
    Arc<dyn Fn(&ContextVariables) -> Result<Arc<dyn SynapseTool>, ToolError> + Send + Sync>;

/// Static tool metadata plus its constructor, as held by the registry.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Constructor invoked at instantiation time.
    pub constructor: ToolConstructor,
}

impl ToolDescriptor {
    /// Build a descriptor from a constructor closure.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        constructor: impl Fn(&ContextVariables) -> Result<Arc<dyn SynapseTool>, ToolError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            constructor: Arc::new(constructor),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_http_reports_variable() {
        let ctx = ContextVariables::default();
        let err = ctx.require_http().unwrap_err();
        assert!(matches!(
            err,
            ToolError::MissingContext { ref variable } if variable == "http_client"
        ));
    }

    #[test]
    fn present_base_url_resolves() {
        let mut ctx = ContextVariables::default();
        let _ = ctx
            .base_urls
            .insert("literature".to_string(), "https://api.example".to_string());
        assert_eq!(
            ctx.require_base_url("literature").unwrap(),
            "https://api.example"
        );
        assert!(ctx.require_base_url("entitycore").is_err());
    }
}
