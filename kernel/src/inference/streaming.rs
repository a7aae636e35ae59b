//! Retry policy and incremental line decoding shared by the HTTP providers.
//!
//! Both wire formats the kernel speaks are line oriented: `OpenAI` streams
//! server-sent events (`data: {...}` lines) and Ollama streams one JSON
//! object per line. [`LineBuffer`] turns arbitrary byte chunks into complete
//! lines so a provider can forward text as soon as it arrives.

use agent_sdk::{ChatRequest, ChatResponse, InferenceError, Usage};
use futures_util::StreamExt;
use reqwest::Response;
use std::time::Duration;
use tracing::debug;

/// Default maximum number of retries for transient errors
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default base delay for exponential backoff (in milliseconds)
pub const DEFAULT_BASE_DELAY_MS: u64 = 1000;
/// Maximum delay cap (in milliseconds)
pub const MAX_DELAY_MS: u64 = 30000;
/// How often the cancel flag is polled while waiting for the next chunk
pub const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Retry configuration for HTTP providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts for failed requests
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfig {
    /// Creates a new retry config with default values
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
        }
    }

    /// Sets the maximum number of retries
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay for exponential backoff
    #[must_use]
    pub const fn with_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.base_delay_ms = delay_ms;
        self
    }

    /// Calculates the delay for a given retry attempt with jitter
    #[must_use]
    pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        // base_delay * 2^attempt, shift clamped so large attempts saturate
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let capped_delay = self.base_delay_ms.saturating_mul(factor).min(MAX_DELAY_MS);

        // 0-25% jitter; rand_jitter_factor is in [0, 1000)
        let jitter = capped_delay
            .saturating_mul(rand_jitter_factor())
            .saturating_div(4000);
        Duration::from_millis(capped_delay.saturating_add(jitter))
    }
}

/// Simple pseudo-random jitter factor in `[0, 1000)`
#[must_use]
pub fn rand_jitter_factor() -> u64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    u64::from(nanos % 1000)
}

/// Splits a byte stream into complete, trimmed, non-empty lines.
///
/// Bytes are held until their line ends, so a character split across two
/// chunks is decoded whole.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and drains every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = decode_line(&line) {
                lines.push(line);
            }
        }
        lines
    }

    /// Returns whatever was left after the final newline.
    pub fn finish(&mut self) -> Option<String> {
        decode_line(&std::mem::take(&mut self.pending))
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(bytes);
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// What a single decoded line means for the assembled response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// More text.
    Delta(String),
    /// End of the stream, with usage when the backend reports it.
    Done(Option<Usage>),
    /// Comments, keep-alives, empty deltas and anything unparsable.
    Skip,
}

/// Reads a streaming response to the end, forwarding every delta.
///
/// Each delta is passed to [`ChatRequest::emit`] before it is appended. The
/// cancel flag is checked after every delta and while idle; once it is
/// raised the text received so far is returned as a cancelled response.
///
/// # Errors
///
/// Returns a network error if the body stream fails mid-way.
pub async fn collect_stream<F>(
    res: Response,
    request: &ChatRequest,
    parse: F,
) -> Result<ChatResponse, InferenceError>
where
    F: Fn(&str) -> StreamEvent,
{
    let mut body = res.bytes_stream();
    let mut lines = LineBuffer::new();
    let mut content = String::new();

    loop {
        if request.is_cancelled() {
            debug!(received = content.len(), "Stream cancelled");
            return Ok(ChatResponse::cancelled(content));
        }

        let Ok(next) = tokio::time::timeout(CANCEL_POLL, body.next()).await else {
            continue;
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(|e| InferenceError::NetworkError(e.to_string()))?;

        for line in lines.push(&chunk) {
            match parse(&line) {
                StreamEvent::Delta(text) => {
                    request.emit(&text);
                    content.push_str(&text);
                    if request.is_cancelled() {
                        debug!(received = content.len(), "Stream cancelled");
                        return Ok(ChatResponse::cancelled(content));
                    }
                }
                StreamEvent::Done(usage) => {
                    let mut response = ChatResponse::new(content);
                    response.usage = usage;
                    return Ok(response);
                }
                StreamEvent::Skip => {}
            }
        }
    }

    let mut usage = None;
    if let Some(line) = lines.finish() {
        match parse(&line) {
            StreamEvent::Delta(text) => {
                request.emit(&text);
                content.push_str(&text);
            }
            StreamEvent::Done(reported) => usage = reported,
            StreamEvent::Skip => {}
        }
    }

    let mut response = ChatResponse::new(content);
    response.usage = usage;
    Ok(response)
}
