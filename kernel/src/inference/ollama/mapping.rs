//! Ollama wire types.

use crate::inference::streaming::StreamEvent;
use agent_sdk::{ChatResponse, Message, Usage};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    /// Model tag, e.g. `llama3.1:8b`
    pub model: String,
    /// The conversation messages
    pub messages: Vec<Message>,
    /// Ollama streams unless told otherwise, so this is always sent
    pub stream: bool,
}

/// One response object; the whole body when not streaming, one line when streaming
#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    /// Generated message or message fragment
    pub message: Option<OllamaMessage>,
    /// True on the final object
    #[serde(default)]
    pub done: bool,
    /// Prompt tokens, reported on the final object
    pub prompt_eval_count: Option<u32>,
    /// Completion tokens, reported on the final object
    pub eval_count: Option<u32>,
    /// Server-side failure reported in-band
    pub error: Option<String>,
}

/// Message content inside a response
#[derive(Debug, Deserialize)]
pub struct OllamaMessage {
    /// Generated text
    #[serde(default)]
    pub content: String,
}

impl OllamaChatResponse {
    fn usage(&self) -> Option<Usage> {
        let prompt_tokens = self.prompt_eval_count?;
        let completion_tokens = self.eval_count.unwrap_or(0);
        Some(Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        })
    }
}

/// Maps a non-streaming Ollama response to a `ChatResponse`
///
/// # Errors
///
/// Returns an error if the server reported one or sent no message.
pub fn map_response(body: OllamaChatResponse) -> Result<ChatResponse, String> {
    if let Some(error) = body.error {
        return Err(error);
    }
    let usage = body.usage();
    let message = body.message.ok_or_else(|| "missing message".to_string())?;

    let mut response = ChatResponse::new(message.content);
    response.usage = usage;
    Ok(response)
}

/// Interprets one NDJSON line of a streaming response.
#[must_use]
pub fn parse_stream_line(line: &str) -> StreamEvent {
    let Ok(chunk) = serde_json::from_str::<OllamaChatResponse>(line) else {
        return StreamEvent::Skip;
    };
    if chunk.done {
        return StreamEvent::Done(chunk.usage());
    }
    match chunk.message {
        Some(message) if !message.content.is_empty() => StreamEvent::Delta(message.content),
        _ => StreamEvent::Skip,
    }
}
