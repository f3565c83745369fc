//! Provider registry — resolves provider-prefixed model identifiers.
//!
//! Model identifiers are `"provider/model"` strings; an unprefixed
//! identifier resolves against the registry's default provider. Resolution
//! fails fast with [`LlmError::Configuration`] before any network call when
//! the provider is not registered.
//!
//! The registry is an explicit value owned by the orchestrator's caller —
//! there is no process-global singleton.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::{LlmError, Result};
use crate::traits::LlmProvider;

/// A resolved model: the provider to call and the bare model name.
#[derive(Clone)]
pub struct ResolvedModel {
    /// Provider that will serve the call.
    pub provider: Arc<dyn LlmProvider>,
    /// Model name with the provider prefix stripped.
    pub model: String,
}

impl std::fmt::Debug for ResolvedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedModel")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Name-keyed provider map with an explicit default provider.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    default_provider: Option<String>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name. The first registered provider
    /// becomes the default unless [`set_default`](Self::set_default) is called.
    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        let name = provider.name().to_string();
        if self.default_provider.is_none() {
            self.default_provider = Some(name.clone());
        }
        let _ = self.providers.insert(name, provider);
    }

    /// Set the provider used for unprefixed model identifiers.
    pub fn set_default(&mut self, name: impl Into<String>) {
        self.default_provider = Some(name.into());
    }

    /// Resolve a `"provider/model"` (or bare `"model"`) identifier.
    ///
    /// Errors with [`LlmError::Configuration`] when the provider is unknown
    /// — surfaced before any network or database activity.
    pub fn resolve(&self, model_id: &str) -> Result<ResolvedModel> {
        let (provider_name, model) = match model_id.split_once('/') {
            Some((provider, model)) => (provider.to_string(), model.to_string()),
            None => {
                let default = self
                    .default_provider
                    .clone()
                    .ok_or_else(|| LlmError::Configuration("no default provider".into()))?;
                (default, model_id.to_string())
            }
        };

        let provider = self
            .providers
            .get(&provider_name)
            .cloned()
            .ok_or(LlmError::Configuration(provider_name))?;

        Ok(ResolvedModel { provider, model })
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatRequest, EventStream};
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct NamedProvider(&'static str);

    #[async_trait]
    impl LlmProvider for NamedProvider {
        fn name(&self) -> &str {
            self.0
        }
        async fn stream_chat(
            &self,
            _request: ChatRequest,
            _cancel: CancellationToken,
        ) -> crate::errors::Result<EventStream> {
            Ok(Box::pin(futures::stream::empty()))
        }
    }

    #[test]
    fn resolve_prefixed_model() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedProvider("openai")));

        let resolved = registry.resolve("openai/gpt-4.1").unwrap();
        assert_eq!(resolved.provider.name(), "openai");
        assert_eq!(resolved.model, "gpt-4.1");
    }

    #[test]
    fn resolve_unprefixed_uses_default() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedProvider("openai")));
        registry.register(Arc::new(NamedProvider("gemini")));

        let resolved = registry.resolve("gpt-4.1").unwrap();
        assert_eq!(resolved.provider.name(), "openai");
        assert_eq!(resolved.model, "gpt-4.1");
    }

    #[test]
    fn set_default_overrides_first_registered() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedProvider("openai")));
        registry.register(Arc::new(NamedProvider("gemini")));
        registry.set_default("gemini");

        let resolved = registry.resolve("flash").unwrap();
        assert_eq!(resolved.provider.name(), "gemini");
    }

    #[test]
    fn unknown_provider_is_configuration_error() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedProvider("openai")));

        let err = registry.resolve("anthropic/claude").unwrap_err();
        assert!(matches!(err, LlmError::Configuration(name) if name == "anthropic"));
    }

    #[test]
    fn empty_registry_has_no_default() {
        let registry = ProviderRegistry::new();
        let err = registry.resolve("gpt-4.1").unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn model_name_keeps_later_slashes() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(NamedProvider("hf")));

        let resolved = registry.resolve("hf/org/model").unwrap();
        assert_eq!(resolved.model, "org/model");
    }
}
