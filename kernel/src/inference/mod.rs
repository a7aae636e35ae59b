//! Inference providers.
//!
//! Every provider implements [`agent_sdk::InferenceGateway`]; the
//! [`ProviderRegistry`] wraps the configured ones and is what the
//! orchestrator is handed.

pub mod http;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod streaming;

pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};
pub use registry::ProviderRegistry;
pub use streaming::{RetryConfig, StreamEvent};
