//! Shell command tool.

use crate::error::ToolError;
use crate::tools::constants::shell;
use crate::tools::{Tool, ToolArgs, failed, invalid, validate_shell_command};
use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Runs allowlisted shell commands inside the workspace root.
///
/// # Security
///
/// - The first word must be in the configured allowlist
/// - Shell metacharacters (`;`, `&`, `|`, `>`, `<`, `` ` ``, `$`, `(`) are blocked
/// - The child is killed when the time budget runs out
///
/// Accepts the command as a string, as a list of words, or as
/// `{"command": ...}` holding either.
pub struct ShellTool {
    allowlist: Vec<String>,
    working_dir: PathBuf,
    timeout: Duration,
}

impl ShellTool {
    /// Creates a shell tool.
    #[must_use]
    pub fn new(allowlist: Vec<String>, working_dir: PathBuf, timeout: Duration) -> Self {
        Self {
            allowlist,
            working_dir,
            timeout,
        }
    }

    /// Returns the configured allowlist.
    #[must_use]
    pub fn allowlist(&self) -> &[String] {
        &self.allowlist
    }

    fn command_line(args: &ToolArgs) -> Result<String, ToolError> {
        let raw = match args {
            ToolArgs::Keyword(map) => map.get("command"),
            ToolArgs::Positional(value) => Some(value),
            ToolArgs::None => None,
        }
        .ok_or_else(|| invalid(shell::EXECUTE_BASH, "Missing 'command' argument"))?;

        match raw {
            Value::String(command) => Ok(command.clone()),
            Value::Array(words) => words
                .iter()
                .map(|word| {
                    word.as_str().map(str::to_string).ok_or_else(|| {
                        invalid(shell::EXECUTE_BASH, "Command words must be strings")
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|words| words.join(" ")),
            _ => Err(invalid(
                shell::EXECUTE_BASH,
                "'command' must be a string or a list of strings",
            )),
        }
    }
}

#[async_trait]
impl Tool for ShellTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(shell::EXECUTE_BASH)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Owned(format!(
            "Executes a shell command and returns its output. Parameters: {{\"command\": string}}. Allowed commands: {}.",
            self.allowlist.join(", ")
        ))
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let command = Self::command_line(&args)?;
        validate_shell_command(&command, &self.allowlist)?;

        let output = tokio::time::timeout(
            self.timeout,
            Command::new("sh")
                .arg("-c")
                .arg(&command)
                .current_dir(&self.working_dir)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| ToolError::Timeout {
            tool: shell::EXECUTE_BASH.to_string(),
            seconds: self.timeout.as_secs(),
        })?
        .map_err(|e| failed(shell::EXECUTE_BASH, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            Err(failed(
                shell::EXECUTE_BASH,
                format!(
                    "Exit code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(allowlist: &[&str]) -> ShellTool {
        ShellTool::new(
            allowlist.iter().map(ToString::to_string).collect(),
            std::env::temp_dir(),
            Duration::from_secs(10),
        )
    }

    #[test]
    fn test_shell_tool_doc_lists_allowlist() {
        let tool = tool(&["ls", "cat"]);
        assert_eq!(tool.name(), shell::EXECUTE_BASH);
        assert!(tool.doc().contains("ls, cat"));
        assert_eq!(tool.allowlist(), &["ls".to_string(), "cat".to_string()]);
    }

    #[tokio::test]
    async fn test_shell_missing_command() {
        let result = tool(&["ls"]).call(ToolArgs::None).await;

        assert!(matches!(
            result,
            Err(ToolError::InvalidArguments { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("command")
        ));
    }

    #[tokio::test]
    async fn test_shell_blocked_command() {
        let result = tool(&["ls", "cat"])
            .call(ToolArgs::from_parameters(json!("rm -rf /")))
            .await;

        assert!(matches!(
            result,
            Err(ToolError::Blocked { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("allowed")
        ));
    }

    #[tokio::test]
    async fn test_shell_injection_attack() {
        let result = tool(&["ls"])
            .call(ToolArgs::from_parameters(json!({"command": "ls; rm -rf /"})))
            .await;

        // "ls;" is the first word, so the allowlist rejects it
        assert!(matches!(
            result,
            Err(ToolError::Blocked { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("allowed")
        ));
    }

    #[tokio::test]
    async fn test_shell_pipe_attack() {
        let result = tool(&["cat"])
            .call(ToolArgs::from_parameters(json!("cat /etc/passwd | grep root")))
            .await;

        assert!(matches!(
            result,
            Err(ToolError::Blocked { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("dangerous")
        ));
    }

    #[tokio::test]
    async fn test_shell_dollar_attack() {
        let result = tool(&["echo"])
            .call(ToolArgs::from_parameters(json!("echo $(whoami)")))
            .await;

        assert!(matches!(
            result,
            Err(ToolError::Blocked { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("dangerous")
        ));
    }

    #[tokio::test]
    async fn test_shell_newline_cannot_chain_a_second_command() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ShellTool::new(
            vec!["echo".to_string()],
            dir.path().to_path_buf(),
            Duration::from_secs(5),
        );

        let result = tool
            .call(ToolArgs::from_parameters(json!({"command": "echo hi\ntouch marker"})))
            .await;

        assert!(matches!(
            result,
            Err(ToolError::Blocked { tool, reason })
            if tool == shell::EXECUTE_BASH && reason.contains("dangerous")
        ));
        assert!(!dir.path().join("marker").exists());
    }

    #[tokio::test]
    async fn test_shell_valid_echo_from_word_list() {
        let out = tool(&["echo"])
            .call(ToolArgs::from_parameters(json!(["echo", "hello", "world"])))
            .await
            .unwrap();
        assert_eq!(out.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_shell_nonzero_exit_is_error() {
        let result = tool(&["ls"])
            .call(ToolArgs::from_parameters(json!("ls /definitely/not/here")))
            .await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }
}
