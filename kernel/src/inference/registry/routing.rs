//! Provider routing implementation.
//!
//! The registry itself is an [`InferenceGateway`] that forwards to its
//! default provider, so the orchestrator never needs to know which backend
//! is configured.

use crate::inference::registry::core::ProviderRegistry;
use agent_sdk::{ChatRequest, ChatResponse, InferenceError, InferenceGateway};
use async_trait::async_trait;

impl ProviderRegistry {
    /// Sends a chat request to the named provider
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is not found or if the chat request fails.
    pub async fn chat_with(
        &self,
        provider_name: &str,
        request: ChatRequest,
    ) -> Result<ChatResponse, InferenceError> {
        let provider = self
            .get(provider_name)
            .ok_or_else(|| InferenceError::ProviderNotFound(provider_name.to_string()))?;

        provider.chat(request).await
    }
}

#[async_trait]
impl InferenceGateway for ProviderRegistry {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        let provider = self.default_provider().ok_or_else(|| {
            InferenceError::ProviderNotFound("No default provider configured".to_string())
        })?;

        provider.chat(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_sdk::Message;

    struct MockProvider {
        response: String,
    }

    #[async_trait]
    impl InferenceGateway for MockProvider {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, InferenceError> {
            Ok(ChatResponse::new(self.response.clone()))
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new("llama3.1", vec![Message::user("Hi")])
    }

    #[tokio::test]
    async fn chat_with_should_route_to_named_provider() {
        let registry = ProviderRegistry::new();
        registry.register(
            "openai",
            MockProvider {
                response: "Hello from OpenAI".to_string(),
            },
        );
        registry.register(
            "ollama",
            MockProvider {
                response: "Hello from Ollama".to_string(),
            },
        );

        let response = registry.chat_with("ollama", request()).await.unwrap();
        assert_eq!(response.content, "Hello from Ollama");
    }

    #[tokio::test]
    async fn chat_with_should_error_when_provider_not_found() {
        let registry = ProviderRegistry::new();
        let result = registry.chat_with("nonexistent", request()).await;
        assert!(matches!(
            result.unwrap_err(),
            InferenceError::ProviderNotFound(name) if name == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn chat_uses_default_provider() {
        let registry = ProviderRegistry::new();
        registry.register(
            "openai",
            MockProvider {
                response: "OpenAI".to_string(),
            },
        );
        registry.register(
            "ollama",
            MockProvider {
                response: "Ollama".to_string(),
            },
        );
        registry.set_default("ollama");

        let response = registry.chat(request()).await.unwrap();
        assert_eq!(response.content, "Ollama");
    }

    #[tokio::test]
    async fn chat_should_error_when_empty() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.chat(request()).await.unwrap_err(),
            InferenceError::ProviderNotFound(_)
        ));
    }
}
