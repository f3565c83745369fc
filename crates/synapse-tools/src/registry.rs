//! Tool registry — central index of registered tool descriptors.
//!
//! Maps tool names to [`ToolDescriptor`]s (static metadata + constructor).
//! The runtime registers descriptors at startup, resolves them when the
//! model requests a call, and instantiates them lazily against the current
//! [`ContextVariables`]. Instantiation fails fast when a declared
//! dependency is absent.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::errors::ToolError;
use crate::traits::{ContextVariables, HealthStatus, SynapseTool, ToolDescriptor};

/// One tool's health probe outcome.
#[derive(Clone, Debug)]
pub struct HealthReport {
    /// Tool name.
    pub name: String,
    /// Probe outcome.
    pub status: HealthStatus,
}

/// Central registry mapping tool names to their descriptors.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register a descriptor. A second registration under the same name is
    /// a configuration error, not an overwrite.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), ToolError> {
        if self.entries.contains_key(&descriptor.name) {
            return Err(ToolError::DuplicateName(descriptor.name));
        }
        debug!(tool_name = %descriptor.name, "tool registered");
        let _ = self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Look up a descriptor by name without instantiating.
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor, ToolError> {
        self.entries
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))
    }

    /// Instantiate a tool against the given context. The constructor fails
    /// fast with `MissingContext` when a declared dependency is absent.
    pub fn instantiate(
        &self,
        name: &str,
        context: &ContextVariables,
    ) -> Result<Arc<dyn SynapseTool>, ToolError> {
        let descriptor = self.resolve(name)?;
        (descriptor.constructor)(context)
    }

    /// All registered tool names, sorted alphabetically.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether a tool with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every registered tool.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Probe every registered tool concurrently.
    ///
    /// A tool that cannot be instantiated reports unhealthy with the
    /// constructor error; one probe's failure never hides the others.
    pub async fn health_check_all(&self, context: &ContextVariables) -> Vec<HealthReport> {
        let probes = self.names().into_iter().map(|name| {
            let instance = self.instantiate(&name, context);
            async move {
                let status = match instance {
                    Ok(tool) => tool.health().await,
                    Err(error) => HealthStatus::unhealthy(error.to_string()),
                };
                HealthReport { name, status }
            }
        });
        join_all(probes).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
