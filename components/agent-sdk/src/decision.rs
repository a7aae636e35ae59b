//! Typed decisions parsed from model output.
//!
//! The model answers every structured question with a fenced JSON block. The
//! three shapes it may produce are validated here into closed enums, so an
//! unknown value is rejected instead of being guessed at.

use crate::error::DecisionError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Top-level choice of the next action: `{"use": "python" | "tool" | "respond"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    /// Generate and run Python code.
    Python,
    /// Invoke a registered tool.
    Tool,
    /// Answer directly without executing anything.
    Respond,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Python => write!(f, "python"),
            Choice::Tool => write!(f, "tool"),
            Choice::Respond => write!(f, "respond"),
        }
    }
}

/// Completion check verdict: `{"use": "yes" | "no"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The request has been satisfied.
    Yes,
    /// The request is not satisfied yet.
    No,
}

/// A tool invocation: `{"tool": name, "parameters": value}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInstruction {
    /// Exact registry name of the tool.
    pub tool: String,
    /// Arguments; an object maps to keyword arguments, anything else is positional.
    pub parameters: Value,
}

/// Parses a top-level choice.
///
/// # Errors
///
/// Returns a [`DecisionError`] naming the exact problem.
pub fn parse_choice(value: &Value) -> Result<Choice, DecisionError> {
    let raw = use_value(value)?;
    match raw.as_str() {
        "python" => Ok(Choice::Python),
        "tool" => Ok(Choice::Tool),
        "respond" => Ok(Choice::Respond),
        _ => Err(DecisionError::DisallowedValue {
            key: "use",
            value: raw,
            allowed: "python, tool, respond",
        }),
    }
}

/// Parses a completion verdict.
///
/// # Errors
///
/// Returns a [`DecisionError`] naming the exact problem.
pub fn parse_verdict(value: &Value) -> Result<Verdict, DecisionError> {
    let raw = use_value(value)?;
    match raw.as_str() {
        "yes" => Ok(Verdict::Yes),
        "no" => Ok(Verdict::No),
        _ => Err(DecisionError::DisallowedValue {
            key: "use",
            value: raw,
            allowed: "yes, no",
        }),
    }
}

/// Parses a tool instruction. Both keys are required.
///
/// # Errors
///
/// Returns a [`DecisionError`] naming the exact problem.
pub fn parse_tool_instruction(value: &Value) -> Result<ToolInstruction, DecisionError> {
    let object = as_object(value)?;
    let tool = match object.get("tool") {
        None => return Err(DecisionError::MissingKey { key: "tool" }),
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(_) => {
            return Err(DecisionError::WrongType {
                key: "tool",
                expected: "non-empty string",
            });
        }
    };
    let parameters = object
        .get("parameters")
        .cloned()
        .ok_or(DecisionError::MissingKey { key: "parameters" })?;
    Ok(ToolInstruction { tool, parameters })
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, DecisionError> {
    value.as_object().ok_or(DecisionError::NotAnObject {
        found: json_type(value),
    })
}

fn use_value(value: &Value) -> Result<String, DecisionError> {
    match as_object(value)?.get("use") {
        None => Err(DecisionError::MissingKey { key: "use" }),
        Some(Value::String(raw)) => Ok(raw.trim().to_lowercase()),
        Some(_) => Err(DecisionError::WrongType {
            key: "use",
            expected: "string",
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_choice_accepts_known_values_case_insensitively() {
        assert_eq!(parse_choice(&json!({"use": "python"})), Ok(Choice::Python));
        assert_eq!(parse_choice(&json!({"use": " Tool "})), Ok(Choice::Tool));
        assert_eq!(parse_choice(&json!({"use": "RESPOND"})), Ok(Choice::Respond));
    }

    #[test]
    fn test_choice_rejects_unknown_value() {
        let err = parse_choice(&json!({"use": "shell"})).unwrap_err();
        assert!(matches!(err, DecisionError::DisallowedValue { ref value, .. } if value == "shell"));
    }

    #[test]
    fn test_choice_rejects_missing_key_and_arrays() {
        assert_eq!(
            parse_choice(&json!({"action": "python"})),
            Err(DecisionError::MissingKey { key: "use" })
        );
        assert_eq!(
            parse_choice(&json!([{"use": "python"}])),
            Err(DecisionError::NotAnObject { found: "an array" })
        );
        assert_eq!(
            parse_choice(&json!({"use": 1})),
            Err(DecisionError::WrongType {
                key: "use",
                expected: "string"
            })
        );
    }

    #[test]
    fn test_verdict_does_not_accept_choices() {
        assert_eq!(parse_verdict(&json!({"use": "yes"})), Ok(Verdict::Yes));
        assert_eq!(parse_verdict(&json!({"use": "No"})), Ok(Verdict::No));
        assert!(parse_verdict(&json!({"use": "respond"})).is_err());
    }

    #[test]
    fn test_tool_instruction_requires_parameters() {
        assert_eq!(
            parse_tool_instruction(&json!({"tool": "get_directory_tree"})),
            Err(DecisionError::MissingKey { key: "parameters" })
        );
    }

    #[test]
    fn test_tool_instruction_parses_any_parameter_shape() {
        let keyword =
            parse_tool_instruction(&json!({"tool": "read_file", "parameters": {"path": "a"}}))
                .unwrap();
        assert_eq!(keyword.tool, "read_file");
        assert_eq!(keyword.parameters, json!({"path": "a"}));

        let positional =
            parse_tool_instruction(&json!({"tool": "execute_bash_command", "parameters": "ls"}))
                .unwrap();
        assert_eq!(positional.parameters, json!("ls"));
    }

    #[test]
    fn test_tool_instruction_rejects_non_string_name() {
        assert!(matches!(
            parse_tool_instruction(&json!({"tool": 3, "parameters": {}})),
            Err(DecisionError::WrongType { key: "tool", .. })
        ));
    }
}
