//! `OpenAI` API provider implementation.
//!
//! This module provides integration with `OpenAI`-compatible chat completions.

pub mod client;
pub mod mapping;

pub use client::{OpenAIConfig, OpenAIProvider};
pub use mapping::{
    create_request, map_response, parse_stream_line, OpenAIChatRequest, OpenAIChatResponse,
};
