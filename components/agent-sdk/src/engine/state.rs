//! Loop states and the retry budget.

use serde::Serialize;
use std::fmt;

/// The kind of action being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Generated Python code.
    Python,
    /// A registry tool.
    Tool,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Python => write!(f, "python"),
            ActionKind::Tool => write!(f, "tool"),
        }
    }
}

/// States of the decision/execution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    /// Asking the model what to do next.
    Deciding,
    /// Producing and running an action.
    Executing(ActionKind),
    /// Asking whether the request is satisfied.
    Checking,
    /// Producing the final answer.
    Answering,
    /// Retry budget exhausted.
    Failed,
    /// Final answer produced.
    Done,
}

impl LoopState {
    /// Returns true for `Failed` and `Done`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Failed | LoopState::Done)
    }
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Deciding => write!(f, "DECIDING"),
            LoopState::Executing(kind) => write!(f, "EXECUTING({kind})"),
            LoopState::Checking => write!(f, "CHECKING"),
            LoopState::Answering => write!(f, "ANSWERING"),
            LoopState::Failed => write!(f, "FAILED"),
            LoopState::Done => write!(f, "DONE"),
        }
    }
}

/// Failed attempts for one request, bounded by `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryCounter {
    used: u32,
    max: u32,
}

impl RetryCounter {
    /// Starts a fresh budget.
    #[must_use]
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    /// Records one failed attempt. Returns true once the count exceeds the bound.
    pub fn consume(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        self.is_exhausted()
    }

    /// Returns true once more than `max` attempts failed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.used > self.max
    }

    /// Failed attempts so far.
    #[must_use]
    pub fn used(&self) -> u32 {
        self.used
    }

    /// The bound.
    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }
}
