//! Provider registry core implementation.
//!
//! This module provides the [`ProviderRegistry`] which holds every
//! configured inference backend under a name.

use agent_sdk::InferenceGateway;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A registry of named inference backends.
///
/// The first provider registered becomes the default until
/// [`ProviderRegistry::set_default`] picks another one.
#[derive(Default)]
pub struct ProviderRegistry {
    pub(crate) providers: RwLock<HashMap<String, Arc<dyn InferenceGateway>>>,
    pub(crate) default_provider: RwLock<Option<String>>,
}

impl ProviderRegistry {
    /// Creates a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider with the given name
    pub fn register(&self, name: impl Into<String>, provider: impl InferenceGateway + 'static) {
        self.register_arc(name, Arc::new(provider));
    }

    /// Registers a provider wrapped in Arc
    pub fn register_arc(&self, name: impl Into<String>, provider: Arc<dyn InferenceGateway>) {
        let name = name.into();
        debug!(provider_name = %name, "Registering inference provider");
        {
            let mut default = self.default_provider.write();
            if default.is_none() {
                *default = Some(name.clone());
            }
        }
        self.providers.write().insert(name, provider);
    }

    /// Sets the default provider name
    pub fn set_default(&self, name: impl Into<String>) {
        let name = name.into();
        debug!(provider_name = %name, "Setting default inference provider");
        *self.default_provider.write() = Some(name);
    }

    /// Gets a provider by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn InferenceGateway>> {
        self.providers.read().get(name).cloned()
    }

    /// Name of the default provider, if any
    pub fn default_name(&self) -> Option<String> {
        self.default_provider.read().clone()
    }

    /// Gets the default provider
    pub fn default_provider(&self) -> Option<Arc<dyn InferenceGateway>> {
        let name = self.default_name()?;
        self.get(&name)
    }

    /// Lists all registered provider names, sorted
    pub fn list_providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered providers
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Returns true if no providers are registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.list_providers())
            .field("default", &self.default_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_sdk::{ChatRequest, ChatResponse, InferenceError};
    use async_trait::async_trait;

    struct MockProvider;

    #[async_trait]
    impl InferenceGateway for MockProvider {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, InferenceError> {
            Ok(ChatResponse::new("ok"))
        }
    }

    #[test]
    fn registry_should_create_empty() {
        let registry = ProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.default_provider().is_none());
    }

    #[test]
    fn first_registered_provider_becomes_default() {
        let registry = ProviderRegistry::new();
        registry.register("ollama", MockProvider);
        registry.register("openai", MockProvider);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.default_name().as_deref(), Some("ollama"));
        assert_eq!(registry.list_providers(), vec!["ollama", "openai"]);
        assert!(registry.get("anthropic").is_none());
    }

    #[test]
    fn set_default_overrides_first_registration() {
        let registry = ProviderRegistry::new();
        registry.register_arc("ollama", Arc::new(MockProvider));
        registry.register_arc("openai", Arc::new(MockProvider));
        registry.set_default("openai");

        assert_eq!(registry.default_name().as_deref(), Some("openai"));
        assert!(registry.default_provider().is_some());
    }

    #[test]
    fn default_pointing_at_unknown_name_yields_none() {
        let registry = ProviderRegistry::new();
        registry.register("ollama", MockProvider);
        registry.set_default("missing");
        assert!(registry.default_provider().is_none());
    }
}
