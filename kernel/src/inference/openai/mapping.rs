//! `OpenAI` API type mapping.
//!
//! This module provides types for mapping between internal and `OpenAI` API formats.

use crate::inference::streaming::StreamEvent;
use agent_sdk::{ChatResponse, Message, Usage};
use serde::{Deserialize, Serialize};

/// `OpenAI` API chat request format
#[derive(Debug, Serialize)]
pub struct OpenAIChatRequest {
    /// The model identifier (e.g., "gpt-4o")
    pub model: String,
    /// The conversation messages
    pub messages: Vec<Message>,
    /// Whether the server should answer with server-sent events
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// `OpenAI` API choice structure
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: Message,
}

/// `OpenAI` API usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    /// Number of tokens in the prompt
    #[serde(rename = "prompt_tokens")]
    pub prompt: u32,
    /// Number of tokens in the completion
    #[serde(rename = "completion_tokens")]
    pub completion: u32,
    /// Total number of tokens used
    #[serde(rename = "total_tokens")]
    pub total: u32,
}

/// `OpenAI` API chat response format
#[derive(Debug, Deserialize)]
pub struct OpenAIChatResponse {
    /// The generated completion choices
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information if available
    pub usage: Option<OpenAIUsage>,
}

/// One server-sent `chat.completion.chunk`
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChunk {
    /// Incremental choices
    #[serde(default)]
    pub choices: Vec<OpenAIStreamChoice>,
}

/// Choice inside a stream chunk
#[derive(Debug, Deserialize)]
pub struct OpenAIStreamChoice {
    /// Text added by this chunk
    #[serde(default)]
    pub delta: OpenAIDelta,
}

/// Incremental message content
#[derive(Debug, Default, Deserialize)]
pub struct OpenAIDelta {
    /// New text, absent on role-only and final chunks
    pub content: Option<String>,
}

/// Maps `OpenAI` API response to internal `ChatResponse`
///
/// # Errors
///
/// Returns an error if no choices are returned in the response.
pub fn map_response(body: OpenAIChatResponse) -> Result<ChatResponse, String> {
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "No choices returned".to_string())?;

    let mut response = ChatResponse::new(choice.message.content);
    response.usage = body.usage.map(|u| Usage {
        prompt_tokens: u.prompt,
        completion_tokens: u.completion,
        total_tokens: u.total,
    });
    Ok(response)
}

/// Creates an `OpenAI` API request from internal types
#[must_use]
pub fn create_request(model: String, messages: Vec<Message>, stream: bool) -> OpenAIChatRequest {
    OpenAIChatRequest {
        model,
        messages,
        stream,
    }
}

/// Interprets one line of a server-sent event stream.
#[must_use]
pub fn parse_stream_line(line: &str) -> StreamEvent {
    let Some(data) = line.strip_prefix("data:") else {
        return StreamEvent::Skip;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return StreamEvent::Done(None);
    }

    match serde_json::from_str::<OpenAIStreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
            .map_or(StreamEvent::Skip, StreamEvent::Delta),
        Err(_) => StreamEvent::Skip,
    }
}
