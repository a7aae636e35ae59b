//! Ollama HTTP client.

use crate::inference::http::send_with_retry;
use crate::inference::ollama::mapping::{
    map_response, parse_stream_line, OllamaChatRequest, OllamaChatResponse,
};
use crate::inference::streaming::{collect_stream, RetryConfig};
use agent_sdk::{ChatRequest, ChatResponse, InferenceError, InferenceGateway};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

/// Where a default Ollama install listens
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Configuration for the Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Daemon address, with or without a trailing `/`
    pub base_url: String,
    /// Retry policy for transient failures
    pub retry: RetryConfig,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

impl OllamaConfig {
    /// Creates a config pointing at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            retry: RetryConfig::new(),
        }
    }

    /// Sets the retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Provider for a local Ollama daemon.
#[derive(Debug)]
pub struct OllamaProvider {
    http: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Creates a provider with a fresh HTTP client.
    #[must_use]
    pub fn new(config: OllamaConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let trimmed = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{trimmed}/{path}")
    }
}

#[async_trait]
impl InferenceGateway for OllamaProvider {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        let url = self.endpoint("/api/chat");
        let payload = OllamaChatRequest {
            model: request.model.clone(),
            messages: request.messages.clone(),
            stream: request.wants_stream(),
        };
        info!(
            model = request.model.as_str(),
            url = %url,
            messages = request.messages.len(),
            stream = payload.stream,
            "Sending request to Ollama"
        );

        let res = send_with_retry("ollama", &self.config.retry, || {
            self.http.post(&url).json(&payload)
        })
        .await?;

        if payload.stream {
            return collect_stream(res, &request, parse_stream_line).await;
        }

        let body: OllamaChatResponse = res
            .json()
            .await
            .map_err(|e| InferenceError::ProviderError(format!("Parse error: {e}")))?;
        debug!("Received response from Ollama");
        map_response(body).map_err(InferenceError::ProviderError)
    }
}
