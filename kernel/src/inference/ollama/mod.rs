//! Ollama provider implementation.
//!
//! Talks to a local Ollama daemon through `/api/chat`, streaming
//! newline-delimited JSON when the caller wants chunks.

pub mod client;
pub mod mapping;

pub use client::{OllamaConfig, OllamaProvider, DEFAULT_OLLAMA_URL};
pub use mapping::{map_response, parse_stream_line, OllamaChatRequest, OllamaChatResponse};
