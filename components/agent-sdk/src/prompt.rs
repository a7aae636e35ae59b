//! Prompt templates.
//!
//! Every model call is `[system prompt] + conversation (+ trailing question)`.
//! The system prompt depends on the loop state; the conversation is owned by
//! the orchestrator.

use crate::corpus::CodebaseCorpus;
use crate::tools::ToolRegistry;
use crate::types::{Conversation, ExecutionResult, ExecutionStatus, Message};

const DEFAULT_PERSONA: &str = "Flexi";

/// Which system prompt a call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Choose between python, tool and respond.
    Decision,
    /// Write Python code.
    Python,
    /// Write a tool instruction.
    Tool,
    /// Summarize an execution result.
    Summary,
    /// Judge whether the request is satisfied.
    Check,
    /// Produce the final answer.
    Answer,
}

/// Builds role-tagged message lists from templates.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    summary_context: Option<String>,
    corpus: Option<CodebaseCorpus>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    /// Creates a builder with the default persona.
    #[must_use]
    pub fn new() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            summary_context: None,
            corpus: None,
        }
    }

    /// Overrides the assistant name used in every template.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Appends `Summary Context:` with this text to every system message.
    #[must_use]
    pub fn with_summary_context(mut self, summary: impl Into<String>) -> Self {
        let summary = summary.into();
        self.summary_context = (!summary.trim().is_empty()).then_some(summary);
        self
    }

    /// Includes a codebase corpus in the initial request.
    #[must_use]
    pub fn with_corpus(mut self, corpus: CodebaseCorpus) -> Self {
        self.corpus = (!corpus.is_empty()).then_some(corpus);
        self
    }

    /// The pinned first user message for `request`.
    #[must_use]
    pub fn initial_request(&self, request: &str) -> String {
        match &self.corpus {
            Some(corpus) => format!("## Codebase\n{}\n\n## Request\n{request}", corpus.render()),
            None => request.to_string(),
        }
    }

    /// The system message for `kind`.
    #[must_use]
    pub fn system(&self, kind: PromptKind, tools: &ToolRegistry) -> Message {
        let persona = &self.persona;
        let mut content = match kind {
            PromptKind::Decision => format!(
                "# You are {persona}, an AI agent capable of reflection, code execution and tool usage.\n\
                 # Handle the user request by reasoning step by step:\n\
                 - 1) Understand the user request.\n\
                 - 2) Choose whether to run python, use a tool, or respond directly.\n\
                 # Respond with your choice as a JSON object wrapped in triple backticks (starting with ```json).\n\
                 ```json\n{{\"use\": \"python\"}}\n```\n\
                 Allowed values for \"use\": python, tool, respond.\n\
                 # Available Tools:\n{}",
                tools_section(tools)
            ),
            PromptKind::Python => format!(
                "# You are {persona}, an expert Python developer.\n\
                 # Write complete Python code that solves the user request and prints the result.\n\
                 # Wrap the code in triple backticks starting with ```python.\n\
                 # If execution fails, fix the code and try again."
            ),
            PromptKind::Tool => format!(
                "# You are {persona}, an AI agent capable of reflection and tool usage.\n\
                 # Output one JSON instruction wrapped in triple backticks (starting with ```json).\n\
                 # Do not show any expected output. If execution fails, adjust the parameters.\n\
                 ```json\n{{\"tool\": \"<name>\", \"parameters\": {{}}}}\n```\n\
                 # Available Tools:\n{}",
                tools_section(tools)
            ),
            PromptKind::Summary => {
                "# You are a personal assistant. Extract and summarize key points from the provided text."
                    .to_string()
            }
            PromptKind::Check => format!(
                "# You are {persona}, determine if the user's request was fulfilled.\n\
                 # Respond with a JSON object wrapped in triple backticks:\n\
                 ```json\n{{\"use\": \"yes\"}}\n```\n\
                 Allowed values for \"use\": yes, no."
            ),
            PromptKind::Answer => {
                format!("# You are {persona}, answer using only the provided information.")
            }
        };

        if let Some(summary) = &self.summary_context {
            content.push_str("\n\nSummary Context:\n");
            content.push_str(summary);
        }
        Message::system(content)
    }

    /// `[system] + conversation + trailing` for one call.
    #[must_use]
    pub fn messages(
        &self,
        kind: PromptKind,
        tools: &ToolRegistry,
        conversation: &Conversation,
        trailing: Option<Message>,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 2);
        messages.push(self.system(kind, tools));
        messages.extend(conversation.messages().iter().cloned());
        messages.extend(trailing);
        messages
    }
}

fn tools_section(tools: &ToolRegistry) -> String {
    if tools.is_empty() {
        return "- None".to_string();
    }
    format!("- Names: {}\n{}", tools.names().join(", "), tools.help_text())
}

/// `Was the request '<request>' answered?`
#[must_use]
pub fn check_question(request: &str) -> String {
    format!("Was the request '{request}' answered?")
}

/// The final-answer question.
#[must_use]
pub fn answer_question(request: &str) -> String {
    format!("What is the final answer to the following request: '{request}'?")
}

/// Reports a successful action and asks for a summary.
#[must_use]
pub fn execution_report(label: &str, instruction: &str, result: &ExecutionResult) -> String {
    format!(
        "# Generated {label}:\n\n{instruction}\n\n# Execution result:\n\n{}\n\n# Summarize the result above.",
        result.message
    )
}

/// Reports a failed action and asks for a fix.
#[must_use]
pub fn failure_report(label: &str, instruction: &str, result: &ExecutionResult) -> String {
    let request = match result.status {
        ExecutionStatus::Timeout => {
            "# The execution took too long and was stopped. Make it finish faster or do less work"
        }
        _ if label == "code" => "# Fix and complete the code",
        _ => "# Fix the above error",
    };
    format!(
        "# Generated {label}:\n\n{instruction}\n\n# Execution result:\n\n{}\n\n{request}",
        result.message
    )
}

/// Sent after a `no` verdict.
pub const RECONSIDER: &str =
    "The request has not been answered yet. Reconsider the approach and choose the next step as a JSON object with a 'use' key: python, tool or respond.";
