//! Out-of-process Python execution.
//!
//! Each run writes the code to its own temporary file and starts a fresh
//! interpreter on it. Model-generated code never runs inside this process.

use crate::config::AgentConfig;
use crate::types::ExecutionResult;
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs Python snippets in a child interpreter with a wall-clock budget.
#[derive(Debug, Clone)]
pub struct PythonExecutor {
    interpreter: String,
    timeout: Duration,
    scratch_dir: Option<PathBuf>,
}

impl PythonExecutor {
    /// Creates an executor for `interpreter` with the given budget.
    #[must_use]
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
            scratch_dir: None,
        }
    }

    /// Writes temporary sources into `dir` instead of the system temp dir.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Builds an executor from the agent configuration.
    #[must_use]
    pub fn from_config(config: &AgentConfig) -> Self {
        let executor = Self::new(config.python_interpreter.clone(), config.python_timeout);
        match &config.scratch_dir {
            Some(dir) => executor.with_scratch_dir(dir.clone()),
            None => executor,
        }
    }

    /// The configured budget.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn source_file(&self, code: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("flexi-").suffix(".py");
        let mut file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(code.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    /// Runs `code` and maps the outcome:
    ///
    /// - exit code 0: `200` with stdout
    /// - non-zero exit: `500` with stderr
    /// - budget exceeded: `TIMEOUT`, and the child is killed
    ///
    /// The temporary source file is removed on every path.
    pub async fn run(&self, code: &str) -> ExecutionResult {
        if code.trim().is_empty() {
            return ExecutionResult::error("Execution failed: No code provided.");
        }

        // Dropping the handle deletes the file, whichever way this function returns.
        let source = match self.source_file(code) {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Could not create temporary Python source");
                return ExecutionResult::error(format!(
                    "Execution failed: could not create temporary file: {e}"
                ));
            }
        };
        debug!(path = %source.path().display(), "Running generated Python");

        let child = Command::new(&self.interpreter)
            .arg("-u")
            .arg(source.path())
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ExecutionResult::error(format!(
                    "Execution failed: Python interpreter '{}' not found.",
                    self.interpreter
                ));
            }
            Err(e) => {
                return ExecutionResult::error(format!(
                    "Execution failed: could not start '{}': {e}",
                    self.interpreter
                ));
            }
        };

        // On timeout the wait future is dropped, which kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return ExecutionResult::error(format!("Execution failed: {e}"));
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "Generated Python timed out");
                return ExecutionResult::timeout(format!(
                    "Execution timed out after {} seconds.",
                    self.timeout.as_secs_f64()
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            let shown = if stdout.trim().is_empty() {
                "[No output]"
            } else {
                stdout.trim_end()
            };
            ExecutionResult::ok(format!("Execution successful.\nOutput:\n{shown}"))
        } else {
            let code = output
                .status
                .code()
                .map_or_else(|| "unknown".to_string(), |c| c.to_string());
            ExecutionResult::error(format!(
                "Execution failed with exit code {code}.\nError:\n{}",
                stderr.trim_end()
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ExecutionStatus;

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    fn executor(dir: &tempfile::TempDir, timeout: Duration) -> PythonExecutor {
        PythonExecutor::new("python3", timeout).with_scratch_dir(dir.path())
    }

    fn scratch_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_print_returns_200() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let result = executor(&dir, Duration::from_secs(30))
            .run("print(1+1)")
            .await;

        assert_eq!(result.status, ExecutionStatus::Ok);
        assert!(result.message.contains('2'));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_exception_returns_500_with_traceback() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let result = executor(&dir, Duration::from_secs(30))
            .run("raise ValueError('x')")
            .await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.message.contains("ValueError"));
        assert!(result.message.starts_with("Execution failed with exit code 1."));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_sleep_past_budget_times_out() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let result = executor(&dir, Duration::from_millis(500))
            .run("import time; time.sleep(999)")
            .await;

        assert_eq!(result.status, ExecutionStatus::Timeout);
        assert!(result.message.contains("timed out"));
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_silent_success_reports_no_output() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let result = executor(&dir, Duration::from_secs(30)).run("x = 1").await;
        assert_eq!(result.message, "Execution successful.\nOutput:\n[No output]");
    }

    #[tokio::test]
    async fn test_empty_code_is_rejected_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let result = executor(&dir, Duration::from_secs(1)).run("   \n").await;
        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.message, "Execution failed: No code provided.");
        assert!(scratch_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_500_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let result = PythonExecutor::new("definitely-not-a-python-binary", Duration::from_secs(1))
            .with_scratch_dir(dir.path())
            .run("print(1)")
            .await;

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(result.message.contains("not found"));
        assert!(scratch_is_empty(&dir));
    }
}
