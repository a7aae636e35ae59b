//! Inference gateway abstraction.
//!
//! The orchestrator talks to a language model only through
//! [`InferenceGateway`]. Concrete HTTP providers live in the kernel crate;
//! tests drive the loop with scripted gateways.

use crate::tools::ToolDoc;
use crate::types::Message;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Marker appended to the partial text of a cancelled call.
pub const CANCELLED_MARKER: &str = "\n[Inference cancelled]";

/// A chat-completion backend.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Sends the messages and returns the assembled response text.
    ///
    /// Implementations that stream must forward each chunk to
    /// `request.sink` and check `request.cancel` between chunks.
    ///
    /// # Errors
    ///
    /// Returns an [`InferenceError`] when the backend cannot produce a response.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError>;
}

/// Receives streamed text as it arrives.
pub trait ChunkSink: Send + Sync {
    /// Called once per chunk, in order.
    fn on_chunk(&self, chunk: &str);
}

impl ChunkSink for tokio::sync::mpsc::UnboundedSender<String> {
    fn on_chunk(&self, chunk: &str) {
        // A closed receiver only means nobody is watching anymore.
        let _ = self.send(chunk.to_string());
    }
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Creates a flag in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the in-flight call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Request for a chat completion.
#[derive(Clone)]
pub struct ChatRequest {
    /// The model to use for completion.
    pub model: String,
    /// The conversation, system prompt first.
    pub messages: Vec<Message>,
    /// Tools to declare natively to the backend, if it supports that.
    pub tools: Vec<ToolDoc>,
    /// Optional observer for streamed chunks.
    pub sink: Option<Arc<dyn ChunkSink>>,
    /// Optional cancellation flag checked between chunks.
    pub cancel: Option<CancelFlag>,
}

impl ChatRequest {
    /// Creates a new chat request.
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            tools: Vec::new(),
            sink: None,
            cancel: None,
        }
    }

    /// Attaches a chunk observer.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn ChunkSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches a cancellation flag.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Declares tools natively.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDoc>) -> Self {
        self.tools = tools;
        self
    }

    /// Returns true when the caller wants chunks or may cancel mid-call.
    #[must_use]
    pub fn wants_stream(&self) -> bool {
        self.sink.is_some() || self.cancel.is_some()
    }

    /// Returns true when the attached flag was raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Forwards a chunk to the sink, if any.
    pub fn emit(&self, chunk: &str) {
        if let Some(sink) = &self.sink {
            sink.on_chunk(chunk);
        }
    }
}

impl fmt::Debug for ChatRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatRequest")
            .field("model", &self.model)
            .field("messages", &self.messages.len())
            .field("tools", &self.tools.len())
            .field("streaming", &self.wants_stream())
            .finish()
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Total tokens.
    pub total_tokens: u32,
}

/// Response from a chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    /// The assembled response text.
    pub content: String,
    /// Token usage, when the backend reports it.
    pub usage: Option<Usage>,
    /// True when the call stopped early because of a cancellation request.
    pub cancelled: bool,
}

impl ChatResponse {
    /// Creates a complete response.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            cancelled: false,
        }
    }

    /// Creates a cancelled response from the text received so far.
    pub fn cancelled(partial: impl Into<String>) -> Self {
        let mut content = partial.into();
        content.push_str(CANCELLED_MARKER);
        Self {
            content,
            usage: None,
            cancelled: true,
        }
    }
}

/// Errors that can occur during inference operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InferenceError {
    /// Error from the LLM provider
    #[error("Provider Error: {0}")]
    ProviderError(String),
    /// Rate limit exceeded
    #[error("Rate Limit Exceeded")]
    RateLimit,
    /// Context length exceeded the model's limit
    #[error("Context Length Exceeded")]
    ContextLengthExceeded,
    /// Network error during request
    #[error("Network Error: {0}")]
    NetworkError(String),
    /// Configuration error
    #[error("Configuration Error: {0}")]
    ConfigError(String),
    /// Provider not found in registry
    #[error("Provider Not Found: {0}")]
    ProviderNotFound(String),
}

impl InferenceError {
    /// Returns `true` if this error is transient and retry may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit | Self::NetworkError(_) => true,
            Self::ProviderError(msg) => msg.contains("HTTP 50") || msg.contains("HTTP 52"),
            Self::ContextLengthExceeded | Self::ConfigError(_) | Self::ProviderNotFound(_) => false,
        }
    }
}
