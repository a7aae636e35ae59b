//! Error types for the agent SDK.
//!
//! This module provides a structured error hierarchy using `thiserror`
//! for proper error handling throughout the agent loop.

use crate::inference::InferenceError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for agent operations.
///
/// Protocol violations and failed executions are not errors at this level:
/// the orchestrator recovers from them with correction prompts. Only
/// conditions that re-asking the model cannot fix surface here.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Error during inference API call.
    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    /// Error while building or using the tool registry.
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The user request was empty.
    #[error("Request must not be empty")]
    EmptyRequest,

    /// Error related to file system operations.
    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    Context {
        /// Context message describing what was happening.
        context: String,
        /// The underlying source error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors raised while extracting structured data from model output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// No fenced block with the `json` tag was found.
    #[error("no fenced json block found")]
    NoJsonBlock,

    /// Every `json` block failed to deserialize.
    #[error("no fenced json block contained valid JSON: {0}")]
    InvalidJson(String),
}

/// Errors raised while validating a parsed JSON value as a decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionError {
    /// The payload was valid JSON but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// Short description of the JSON type that was found.
        found: &'static str,
    },

    /// A required key was absent.
    #[error("missing key '{key}'")]
    MissingKey {
        /// The missing key.
        key: &'static str,
    },

    /// A key was present but held the wrong JSON type.
    #[error("key '{key}' must be a {expected}")]
    WrongType {
        /// The offending key.
        key: &'static str,
        /// The type that was expected.
        expected: &'static str,
    },

    /// A key held a value outside the allowed set.
    #[error("value '{value}' for key '{key}' is not one of {allowed}")]
    DisallowedValue {
        /// The offending key.
        key: &'static str,
        /// The value the model produced.
        value: String,
        /// Human readable list of accepted values.
        allowed: &'static str,
    },
}

/// Errors related to tool lookup and invocation.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool not found in registry.
    #[error("Tool '{name}' not found")]
    NotFound {
        /// Name of the tool that was not found.
        name: String,
    },

    /// Invalid arguments provided to tool.
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments {
        /// Name of the tool.
        tool: String,
        /// Reason why arguments are invalid.
        reason: String,
    },

    /// Tool execution failed.
    #[error("Tool '{tool}' execution failed: {source}")]
    ExecutionFailed {
        /// Name of the tool that failed.
        tool: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Tool was blocked for security reasons.
    #[error("Tool '{tool}' blocked: {reason}")]
    Blocked {
        /// Name of the blocked tool.
        tool: String,
        /// Reason why the tool was blocked.
        reason: String,
    },

    /// Tool exceeded its time budget.
    #[error("Tool '{tool}' timed out after {seconds}s")]
    Timeout {
        /// Name of the tool.
        tool: String,
        /// Budget in seconds.
        seconds: u64,
    },

    /// A custom tool manifest could not be loaded.
    #[error("Invalid tool manifest {path}: {reason}")]
    InvalidManifest {
        /// Path of the manifest file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors related to configuration values.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Missing required configuration.
    #[error("Missing configuration: {key}")]
    Missing {
        /// The configuration key that is missing.
        key: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration for '{key}': {value}")]
    Invalid {
        /// The configuration key.
        key: String,
        /// The invalid value.
        value: String,
    },
}

/// Errors related to file system operations.
#[derive(Error, Debug)]
pub enum FileSystemError {
    /// Path traversal attempt detected.
    #[error("Path traversal detected: {path}")]
    PathTraversal {
        /// The path that attempted traversal.
        path: PathBuf,
    },

    /// File is too large to process.
    #[error("File too large: {path} ({size} bytes, max: {max_size})")]
    FileTooLarge {
        /// The path of the file.
        path: PathBuf,
        /// Actual size of the file.
        size: u64,
        /// Maximum allowed size.
        max_size: u64,
    },

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a persisted record failed.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenience extension trait for adding context to errors.
pub trait ResultExt<T, E> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Context`] wrapping the original error.
    fn with_context<C, F>(self, f: F) -> Result<T, AgentError>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E> ResultExt<T, E> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context<C, F>(self, f: F) -> Result<T, AgentError>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| AgentError::Context {
            context: f().to_string(),
            source: Box::new(e),
        })
    }
}
