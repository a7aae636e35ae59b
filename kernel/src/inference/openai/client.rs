//! `OpenAI` API HTTP client implementation.
//!
//! Speaks the chat-completions endpoint of `OpenAI` and of any compatible
//! server (vLLM, LM Studio, llama.cpp). Streams with server-sent events when
//! the caller attached a sink or a cancel flag.

use crate::inference::http::send_with_retry;
use crate::inference::openai::mapping::{
    create_request, map_response, parse_stream_line, OpenAIChatResponse,
};
use crate::inference::streaming::{
    collect_stream, RetryConfig, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_RETRIES,
};
use agent_sdk::{ChatRequest, ChatResponse, InferenceError, InferenceGateway};
use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

/// Configuration for the `OpenAI` provider
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// The API key, omitted for local servers that do not check it
    pub api_key: Option<SecretString>,
    /// The base URL for the API, ending in `/`
    pub base_url: Url,
    /// Maximum number of retries for rate limits and transient errors
    pub max_retries: Option<u32>,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: Option<u64>,
}

impl OpenAIConfig {
    /// Creates a new config with default retry settings
    #[must_use]
    pub fn new(api_key: Option<SecretString>, base_url: Url) -> Self {
        Self {
            api_key,
            base_url,
            max_retries: None,
            base_delay_ms: None,
        }
    }

    /// Sets the maximum number of retries
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the base delay for exponential backoff
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.base_delay_ms = Some(delay_ms);
        self
    }
}

/// Provider implementation for `OpenAI`-compatible APIs.
pub struct OpenAIProvider {
    client: Client,
    config: OpenAIConfig,
    retry_config: RetryConfig,
}

impl OpenAIProvider {
    /// Creates a new `OpenAI` provider with the given configuration.
    #[must_use]
    pub fn new(config: OpenAIConfig) -> Self {
        let retry_config = RetryConfig::new()
            .with_max_retries(config.max_retries.unwrap_or(DEFAULT_MAX_RETRIES))
            .with_base_delay_ms(config.base_delay_ms.unwrap_or(DEFAULT_BASE_DELAY_MS));

        Self {
            client: Client::new(),
            retry_config,
            config,
        }
    }

    fn endpoint(&self) -> Result<Url, InferenceError> {
        self.config
            .base_url
            .join("chat/completions")
            .map_err(|e| InferenceError::ConfigError(format!("Invalid URL join: {e}")))
    }
}

impl std::fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("base_url", &self.config.base_url.as_str())
            .field("retry_config", &self.retry_config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InferenceGateway for OpenAIProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        let url = self.endpoint()?;
        let stream = request.wants_stream();
        if !request.tools.is_empty() {
            debug!(tools = request.tools.len(), "Tools are described in the prompt, not declared");
        }
        let body = create_request(request.model.clone(), request.messages.clone(), stream);

        let res = send_with_retry("openai", &self.retry_config, || {
            let builder = self.client.post(url.clone()).json(&body);
            match &self.config.api_key {
                Some(key) => builder.bearer_auth(key.expose_secret()),
                None => builder,
            }
        })
        .await?;

        if stream {
            return collect_stream(res, &request, parse_stream_line).await;
        }

        let body: OpenAIChatResponse = res
            .json()
            .await
            .map_err(|e| InferenceError::ProviderError(format!("Parse error: {e}")))?;
        map_response(body).map_err(InferenceError::ProviderError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://api.openai.com/v1/").unwrap()
    }

    #[test]
    fn test_openai_config_with_retries() {
        let config = OpenAIConfig::new(Some(SecretString::from("test-key".to_string())), base_url())
            .with_max_retries(5)
            .with_base_delay_ms(500);
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.base_delay_ms, Some(500));
    }

    #[test]
    fn test_openai_provider_defaults() {
        let provider = OpenAIProvider::new(OpenAIConfig::new(None, base_url()));
        assert_eq!(provider.retry_config, RetryConfig::new());
        assert_eq!(
            provider.endpoint().unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let provider = OpenAIProvider::new(OpenAIConfig::new(
            Some(SecretString::from("sk-very-secret".to_string())),
            base_url(),
        ));
        assert!(!format!("{provider:?}").contains("sk-very-secret"));
    }
}
