//! Agent SDK - the Flexi decision/execution loop.
//!
//! A request is handled by asking the model what to do, parsing its fenced
//! JSON decision, running Python or a registered tool, feeding the result
//! back, and asking whether the request is satisfied. Malformed output and
//! failed executions are corrected under a bounded retry budget.
//!
//! # Features
//!
//! - **Orchestrator**: explicit `DECIDING -> EXECUTING -> CHECKING -> ANSWERING` state machine
//! - **Tool Registry**: builtin tools plus command-backed manifests from a directory
//! - **Executors**: out-of-process Python with timeouts, panic-safe tool calls
//! - **Response Parser**: fenced block extraction and single JSON decisions
//! - **Inference Gateway**: async chat trait with streaming sinks and cancellation
//!
//! # Example
//!
//! ```rust
//! use agent_sdk::{
//!     AgentConfig, ChatRequest, ChatResponse, InferenceError, InferenceGateway,
//!     OrchestratorBuilder,
//! };
//! use std::sync::Arc;
//!
//! struct AlwaysRespond;
//!
//! #[async_trait::async_trait]
//! impl InferenceGateway for AlwaysRespond {
//!     async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
//!         let system = &request.messages[0].content;
//!         if system.contains("Allowed values for \"use\": python, tool, respond") {
//!             Ok(ChatResponse::new("```json\n{\"use\": \"respond\"}\n```"))
//!         } else {
//!             Ok(ChatResponse::new("68"))
//!         }
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let agent = OrchestratorBuilder::new()
//!     .gateway(Arc::new(AlwaysRespond))
//!     .config(AgentConfig::builder().max_retries(3).build()?)
//!     .build()?;
//!
//! let report = agent.run("what is 17 * 4").await?;
//! assert_eq!(report.outcome.text(), "68");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod corpus;
pub mod decision;
pub mod engine;
pub mod error;
pub mod executor;
pub mod inference;
pub mod parser;
pub mod prompt;
pub mod session;
pub mod tools;
pub mod types;

// Re-export commonly used types
pub use self::config::{AgentConfig, AgentConfigBuilder, CancellationPolicy, ContinuationPolicy};
pub use corpus::CodebaseCorpus;
pub use decision::{Choice, ToolInstruction, Verdict};
pub use engine::{ActionLog, LoopState, Orchestrator, OrchestratorBuilder, RunOutcome, RunReport};
pub use error::{
    AgentError, ConfigError, DecisionError, FileSystemError, ParseError, ResultExt, ToolError,
};
pub use executor::{Action, ActionExecutor, LocalExecutor, PythonExecutor, ToolExecutor};
pub use inference::{
    CancelFlag, ChatRequest, ChatResponse, ChunkSink, InferenceError, InferenceGateway, Usage,
};
pub use parser::{extract_fenced_blocks, extract_single_json};
pub use prompt::PromptBuilder;
pub use session::{CycleRecord, SessionStore};
pub use tools::builtin::{BuiltinSettings, builtin_tools};
pub use tools::{Tool, ToolArgs, ToolDoc, ToolRegistry};
pub use types::{Conversation, ExecutionResult, ExecutionStatus, Message, Role};

/// Version of the agent SDK.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes logging for the SDK, honouring `RUST_LOG`.
///
/// This should be called once at the start of the application.
///
/// # Errors
///
/// Returns an error if the tracing subscriber has already been set.
pub fn init_logging() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .finish(),
    )
}
