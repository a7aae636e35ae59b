//! Tool instruction execution.

use crate::error::ToolError;
use crate::tools::{ToolArgs, ToolRegistry};
use crate::types::ExecutionResult;
use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs `{"tool": ..., "parameters": ...}` instructions against a registry.
///
/// Every outcome is an [`ExecutionResult`]; tool errors and panics become
/// `500` results instead of escaping to the caller.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    /// Creates an executor over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves and invokes the instruction.
    pub async fn run(&self, instruction: &Value) -> ExecutionResult {
        let Some(object) = instruction.as_object() else {
            return ExecutionResult::error("Error: Instruction must be a mapping.");
        };
        let Some(name) = object.get("tool").and_then(Value::as_str) else {
            return ExecutionResult::error(
                "Error: 'tool' key (string) missing or invalid in instruction.",
            );
        };

        let tool = match self.registry.lookup(name) {
            Ok(tool) => tool,
            Err(ToolError::NotFound { .. }) => {
                warn!(tool = name, "Model requested an unknown tool");
                return ExecutionResult::error(format!("Error: Tool '{name}' not found."));
            }
            Err(e) => return ExecutionResult::error(format!("Tool execution failed:\n{e}")),
        };

        let args = ToolArgs::from_parameters(object.get("parameters").cloned().unwrap_or(Value::Null));
        debug!(tool = name, ?args, "Invoking tool");

        match AssertUnwindSafe(tool.call(args)).catch_unwind().await {
            Ok(Ok(output)) => ExecutionResult::ok(format!(
                "Tool '{name}' executed successfully.\nResult:\n{output}"
            )),
            Ok(Err(e)) => {
                warn!(tool = name, error = %e, "Tool failed");
                ExecutionResult::error(format!("Tool execution failed:\n{e}"))
            }
            Err(panic) => {
                let text = panic_message(panic.as_ref());
                warn!(tool = name, panic = %text, "Tool panicked");
                ExecutionResult::error(format!("Tool execution failed:\n{text}"))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "tool panicked".to_string()
    }
}
