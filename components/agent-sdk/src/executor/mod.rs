//! Action executors.
//!
//! Executors are a stateless effect boundary: they run one action and
//! report an [`ExecutionResult`]. They never retry and never touch the
//! conversation; the orchestrator decides what happens next.

pub mod python;
pub mod tool;

use crate::config::AgentConfig;
use crate::tools::ToolRegistry;
use crate::types::ExecutionResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use python::PythonExecutor;
pub use tool::ToolExecutor;

/// An action the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Python source to run in a fresh interpreter.
    Python(String),
    /// A `{"tool": ..., "parameters": ...}` instruction.
    Tool(Value),
}

/// Runs actions on behalf of the orchestrator.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Runs the action and reports its outcome. Never fails: every problem
    /// becomes a non-200 result.
    async fn execute(&self, action: &Action) -> ExecutionResult;
}

/// Executes Python out of process and tools through the registry.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    python: PythonExecutor,
    tools: ToolExecutor,
}

impl LocalExecutor {
    /// Combines the two executors.
    #[must_use]
    pub fn new(python: PythonExecutor, tools: ToolExecutor) -> Self {
        Self { python, tools }
    }

    /// Builds both executors from configuration.
    #[must_use]
    pub fn from_config(config: &AgentConfig, registry: Arc<ToolRegistry>) -> Self {
        Self::new(PythonExecutor::from_config(config), ToolExecutor::new(registry))
    }
}

#[async_trait]
impl ActionExecutor for LocalExecutor {
    async fn execute(&self, action: &Action) -> ExecutionResult {
        match action {
            Action::Python(code) => self.python.run(code).await,
            Action::Tool(instruction) => self.tools.run(instruction).await,
        }
    }
}
