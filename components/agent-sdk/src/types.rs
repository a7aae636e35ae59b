//! Core types for agent operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a message in the conversation history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message sender.
    pub role: Role,
    /// The content of the message.
    pub content: String,
}

impl Message {
    /// Creates a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Identifies the role of a message sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instruction or context.
    System,
    /// User input, including correction requests issued by the loop.
    User,
    /// Assistant/AI response.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Ordered message history sent to the model.
///
/// The first message is the user's request and is never dropped by
/// [`Conversation::truncate`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts a conversation with the user's request.
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(request)],
        }
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Returns the messages in insertion order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true when there are no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the last message, if any.
    #[must_use]
    pub fn last_content(&self) -> Option<&str> {
        self.messages.last().map(|m| m.content.as_str())
    }

    /// Drops the oldest messages after the pinned request so that at most
    /// `keep_recent` follow it, optionally inserting `summary` in their place.
    ///
    /// Returns how many messages were dropped.
    pub fn truncate(&mut self, keep_recent: usize, summary: Option<String>) -> usize {
        let tail = self.messages.len().saturating_sub(1);
        if tail <= keep_recent {
            return 0;
        }
        let dropped = tail - keep_recent;
        self.messages.drain(1..=dropped);
        if let Some(summary) = summary {
            self.messages.insert(1, Message::user(summary));
        }
        dropped
    }

    /// Drops everything except the pinned request.
    pub fn reset(&mut self) {
        self.messages.truncate(1);
    }
}

/// Outcome class of an action execution.
///
/// Serialized as the literal strings `"200"`, `"500"` and `"TIMEOUT"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// The action completed successfully.
    #[serde(rename = "200")]
    Ok,
    /// The action ran but failed, or could not be started.
    #[serde(rename = "500")]
    Error,
    /// The action exceeded its time budget.
    #[serde(rename = "TIMEOUT")]
    Timeout,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Ok => write!(f, "200"),
            ExecutionStatus::Error => write!(f, "500"),
            ExecutionStatus::Timeout => write!(f, "TIMEOUT"),
        }
    }
}

/// Uniform result of running a Python snippet or a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Outcome class.
    pub status: ExecutionStatus,
    /// Human readable status message shown to the model.
    pub message: String,
}

impl ExecutionResult {
    /// Creates a successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Ok,
            message: message.into(),
        }
    }

    /// Creates a failed result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            message: message.into(),
        }
    }

    /// Creates a timed out result.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            status: ExecutionStatus::Timeout,
            message: message.into(),
        }
    }

    /// Returns true when the status is `200`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Ok
    }
}
