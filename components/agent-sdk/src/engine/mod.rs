//! Orchestration engine: the state machine, its log and its outcomes.

pub mod builder;
pub mod log;
pub mod orchestrator;
pub mod outcome;
pub mod state;

pub use builder::OrchestratorBuilder;
pub use log::{ActionLog, LogEntry, LogEvent};
pub use orchestrator::Orchestrator;
pub use outcome::{RunOutcome, RunReport};
pub use state::{ActionKind, LoopState, RetryCounter};
