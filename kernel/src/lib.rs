//! Flexi Kernel - host runtime for the Flexi agent.
//!
//! This crate wires the [`agent_sdk`] orchestrator to real inference
//! backends (`OpenAI`-compatible and Ollama), layered settings and logging,
//! and ships the `flexi` command-line binary.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]

/// LLM inference providers and registry.
pub mod inference;
/// Infrastructure components (config, telemetry).
pub mod infrastructure;

use agent_sdk::InferenceGateway;
use inference::{OllamaConfig, OllamaProvider, OpenAIConfig, OpenAIProvider, ProviderRegistry};
use infrastructure::config::{InferenceSettings, ProviderKind};
use reqwest::Url;
use std::sync::Arc;

/// Default `OpenAI` endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1/";

/// Builds a registry holding the configured provider as its default.
///
/// # Errors
///
/// Returns an error if the configured base URL cannot be parsed.
pub fn build_registry(settings: &InferenceSettings) -> anyhow::Result<ProviderRegistry> {
    let retry = inference::RetryConfig::new()
        .with_max_retries(settings.max_retries)
        .with_base_delay_ms(settings.base_delay_ms);

    let provider: Arc<dyn InferenceGateway> = match settings.provider {
        ProviderKind::Ollama => {
            let base = settings
                .base_url
                .clone()
                .unwrap_or_else(|| inference::ollama::DEFAULT_OLLAMA_URL.to_string());
            Arc::new(OllamaProvider::new(OllamaConfig::new(base).with_retry(retry)))
        }
        ProviderKind::OpenAI => {
            let raw = settings.base_url.as_deref().unwrap_or(DEFAULT_OPENAI_URL);
            // Url::join drops the last segment unless the base ends in '/'
            let base = if raw.ends_with('/') {
                Url::parse(raw)?
            } else {
                Url::parse(&format!("{raw}/"))?
            };
            let config = OpenAIConfig::new(settings.api_key.clone(), base)
                .with_max_retries(retry.max_retries)
                .with_base_delay_ms(retry.base_delay_ms);
            Arc::new(OpenAIProvider::new(config))
        }
    };

    let registry = ProviderRegistry::new();
    registry.register_arc(settings.provider.as_str(), provider);
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_defaults_to_configured_provider() {
        let settings = InferenceSettings {
            provider: ProviderKind::OpenAI,
            base_url: Some("http://localhost:8000/v1".to_string()),
            ..InferenceSettings::default()
        };
        let registry = build_registry(&settings).unwrap();
        assert_eq!(registry.default_name().as_deref(), Some("openai"));

        let registry = build_registry(&InferenceSettings::default()).unwrap();
        assert_eq!(registry.list_providers(), vec!["ollama"]);
    }

    #[test]
    fn bad_url_is_an_error() {
        let settings = InferenceSettings {
            provider: ProviderKind::OpenAI,
            base_url: Some("not a url".to_string()),
            ..InferenceSettings::default()
        };
        assert!(build_registry(&settings).is_err());
    }
}
