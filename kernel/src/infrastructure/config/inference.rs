//! Inference provider configuration.
//!
//! This module defines which backend the kernel talks to and how.

use secrecy::SecretString;
use serde::Deserialize;

/// Supported inference backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// A local Ollama daemon.
    #[default]
    Ollama,
    /// Any `OpenAI`-compatible chat completions endpoint.
    OpenAI,
}

impl ProviderKind {
    /// Registry name of the provider.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }
}

/// Inference provider settings.
#[derive(Debug, Deserialize, Clone)]
pub struct InferenceSettings {
    /// Backend to use.
    #[serde(default)]
    pub provider: ProviderKind,
    /// Base URL; each provider has its own default.
    pub base_url: Option<String>,
    /// API key for `OpenAI`-compatible endpoints.
    pub api_key: Option<SecretString>,
    /// Retries for rate limits and transient HTTP failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: None,
            api_key: None,
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}
