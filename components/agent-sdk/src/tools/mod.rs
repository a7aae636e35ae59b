//! Tool system: the capability trait, argument shapes and the registry.

pub mod builtin;
pub mod constants;
pub mod manifest;
pub mod registry;
pub mod validation;

use crate::error::ToolError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// A named capability the model may invoke.
///
/// The doc text is the only place a tool is advertised to the model, so it
/// should describe the expected parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of the tool.
    fn name(&self) -> Cow<'static, str>;

    /// Returns the documentation shown in the system prompt.
    fn doc(&self) -> Cow<'static, str>;

    /// Invokes the tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the tool fails.
    async fn call(&self, args: ToolArgs) -> Result<String, ToolError>;
}

/// Arguments as the model supplied them.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArgs {
    /// No parameters (`null` or absent).
    None,
    /// A JSON object, bound by parameter name.
    Keyword(Map<String, Value>),
    /// Any other JSON value, bound by position.
    Positional(Value),
}

impl ToolArgs {
    /// Classifies a `parameters` value.
    #[must_use]
    pub fn from_parameters(parameters: Value) -> Self {
        match parameters {
            Value::Null => Self::None,
            Value::Object(map) => Self::Keyword(map),
            other => Self::Positional(other),
        }
    }

    /// Looks up a parameter by name or, for positional arguments, by index.
    ///
    /// A positional scalar counts as index 0; a positional array is indexed.
    #[must_use]
    pub fn get(&self, key: &str, position: usize) -> Option<&Value> {
        match self {
            Self::None => None,
            Self::Keyword(map) => map.get(key),
            Self::Positional(Value::Array(items)) => items.get(position),
            Self::Positional(value) => (position == 0).then_some(value),
        }
    }

    /// Returns a required string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when it is missing or not a string.
    pub fn required_str(&self, tool: &str, key: &str, position: usize) -> Result<&str, ToolError> {
        match self.get(key, position) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(invalid(tool, format!("'{key}' must be a string"))),
            None => Err(invalid(tool, format!("Missing '{key}' argument"))),
        }
    }

    /// Returns an optional string parameter.
    #[must_use]
    pub fn optional_str(&self, key: &str, position: usize) -> Option<&str> {
        self.get(key, position).and_then(Value::as_str)
    }

    /// Returns an optional unsigned integer parameter, accepting numeric strings.
    #[must_use]
    pub fn optional_u64(&self, key: &str, position: usize) -> Option<u64> {
        match self.get(key, position)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Returns the arguments as a single JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::None => Value::Null,
            Self::Keyword(map) => Value::Object(map.clone()),
            Self::Positional(value) => value.clone(),
        }
    }
}

/// Name and documentation of a registered tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDoc {
    /// Registry name.
    pub name: String,
    /// Documentation text.
    pub doc: String,
}

pub(crate) fn invalid(tool: &str, reason: impl Into<String>) -> ToolError {
    ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn failed(
    tool: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
) -> ToolError {
    ToolError::ExecutionFailed {
        tool: tool.to_string(),
        source: source.into(),
    }
}

pub use registry::ToolRegistry;
pub use validation::{validate_file_size, validate_path, validate_shell_command};
