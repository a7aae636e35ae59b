//! Per-request action log.

use crate::decision::{Choice, Verdict};
use crate::engine::state::{ActionKind, LoopState};
use crate::types::ExecutionResult;
use serde::Serialize;
use std::fmt::{self, Write};

const PREVIEW_CHARS: usize = 200;

/// Something that happened during a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    /// Raw model output.
    ModelResponse {
        /// Response text.
        content: String,
    },
    /// A parsed top-level choice.
    Decision {
        /// The choice.
        choice: Choice,
    },
    /// A correction sent back to the model.
    Correction {
        /// What was wrong.
        reason: String,
    },
    /// An executor ran.
    Execution {
        /// Action type.
        kind: ActionKind,
        /// Its outcome.
        result: ExecutionResult,
    },
    /// Summary of a successful execution.
    Summary {
        /// Summary text.
        content: String,
    },
    /// A completion verdict.
    Verdict {
        /// True for "yes".
        answered: bool,
    },
    /// The oldest turns were dropped.
    Truncation {
        /// Number of messages removed.
        dropped: usize,
    },
    /// An inference call was cancelled.
    Cancelled {
        /// Text received before cancellation.
        partial: String,
    },
    /// Retry budget exhausted.
    RetriesExhausted {
        /// Failed attempts.
        attempts: u32,
    },
}

impl From<Verdict> for LogEvent {
    fn from(verdict: Verdict) -> Self {
        LogEvent::Verdict {
            answered: verdict == Verdict::Yes,
        }
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogEvent::ModelResponse { content } => write!(f, "model: {}", preview(content)),
            LogEvent::Decision { choice } => write!(f, "decision: {choice}"),
            LogEvent::Correction { reason } => write!(f, "correction: {reason}"),
            LogEvent::Execution { kind, result } => {
                write!(f, "{kind} -> {}: {}", result.status, preview(&result.message))
            }
            LogEvent::Summary { content } => write!(f, "summary: {}", preview(content)),
            LogEvent::Verdict { answered } => {
                write!(f, "verdict: {}", if *answered { "yes" } else { "no" })
            }
            LogEvent::Truncation { dropped } => write!(f, "truncated {dropped} messages"),
            LogEvent::Cancelled { partial } => write!(f, "cancelled: {}", preview(partial)),
            LogEvent::RetriesExhausted { attempts } => {
                write!(f, "retries exhausted after {attempts} attempts")
            }
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.trim().replace('\n', " ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

/// One log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// State the event happened in.
    pub state: LoopState,
    /// What happened.
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Ordered record of a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
}

impl ActionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn record(&mut self, state: LoopState, event: impl Into<LogEvent>) {
        self.entries.push(LogEntry {
            state,
            event: event.into(),
        });
    }

    /// Entries in order.
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Number of correction events.
    #[must_use]
    pub fn corrections(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.event, LogEvent::Correction { .. }))
            .count()
    }

    /// Number of executions.
    #[must_use]
    pub fn executions(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.event, LogEvent::Execution { .. }))
            .count()
    }

    /// One numbered line per entry.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            let _ = writeln!(out, "[{}] {}: {}", i + 1, entry.state, entry.event);
        }
        out
    }
}
