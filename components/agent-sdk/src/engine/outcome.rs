//! Results of one orchestrated request.

use crate::engine::log::ActionLog;
use crate::executor::Action;
use std::time::Duration;

/// How a request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The model produced a final answer.
    Answered {
        /// The answer text.
        answer: String,
        /// Everything that happened.
        log: ActionLog,
    },
    /// The retry budget ran out.
    Failed {
        /// Failure message followed by the rendered log.
        message: String,
        /// Everything that happened.
        log: ActionLog,
    },
    /// An inference call was cancelled and the policy is to abort.
    Cancelled {
        /// Text received before cancellation.
        partial: String,
        /// Everything that happened.
        log: ActionLog,
    },
}

impl RunOutcome {
    /// The action log, whatever the outcome.
    #[must_use]
    pub fn log(&self) -> &ActionLog {
        match self {
            RunOutcome::Answered { log, .. }
            | RunOutcome::Failed { log, .. }
            | RunOutcome::Cancelled { log, .. } => log,
        }
    }

    /// The answer, failure message or partial text.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            RunOutcome::Answered { answer, .. } => answer,
            RunOutcome::Failed { message, .. } => message,
            RunOutcome::Cancelled { partial, .. } => partial,
        }
    }

    /// Returns true for [`RunOutcome::Answered`].
    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self, RunOutcome::Answered { .. })
    }
}

/// Outcome plus the bookkeeping needed to persist a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// How the request ended.
    pub outcome: RunOutcome,
    /// The request as the user gave it.
    pub request: String,
    /// Decision system prompt used for the request.
    pub instructions: String,
    /// Last successfully executed action.
    pub last_action: Option<Action>,
    /// Number of executor calls.
    pub executions: u32,
    /// Wall-clock time for the whole request.
    pub elapsed: Duration,
}
