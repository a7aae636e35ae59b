//! Custom tools declared by manifest files.
//!
//! Dropping a manifest into the custom tools directory adds a tool without
//! rebuilding. A manifest names an external program; the tool's parameters
//! are written to its stdin as JSON and its stdout becomes the result:
//!
//! ```toml
//! name = "word_count"
//! doc = "Counts words. Parameters: {\"text\": string}"
//! program = "python3"
//! args = ["tools/word_count.py"]
//! timeout_secs = 30
//! ```
//!
//! Loading a manifest means trusting the program it runs.

use crate::error::ToolError;
use crate::tools::{Tool, ToolArgs, failed};
use async_trait::async_trait;
use serde::Deserialize;
use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const MANIFEST_EXTENSIONS: [&str; 4] = ["toml", "json", "yaml", "yml"];

/// Declarative description of a command-backed tool.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ToolManifest {
    /// Registry name.
    pub name: String,
    /// Documentation shown to the model.
    pub doc: String,
    /// Program to execute.
    pub program: String,
    /// Fixed arguments passed before anything else.
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock budget for one invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Working directory; relative paths resolve against the manifest's directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ToolManifest {
    /// Loads a manifest from a TOML, JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidManifest`] if the file cannot be parsed or
    /// is missing required fields.
    pub fn load(path: &Path) -> Result<Self, ToolError> {
        let invalid = |reason: String| ToolError::InvalidManifest {
            path: path.to_path_buf(),
            reason,
        };

        let mut manifest: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| invalid(e.to_string()))?;

        if manifest.name.trim().is_empty() {
            return Err(invalid("'name' must not be empty".to_string()));
        }
        if manifest.program.trim().is_empty() {
            return Err(invalid("'program' must not be empty".to_string()));
        }

        if let Some(dir) = &manifest.working_dir
            && dir.is_relative()
            && let Some(parent) = path.parent()
        {
            manifest.working_dir = Some(parent.join(dir));
        }

        Ok(manifest)
    }
}

/// Loads every manifest in `dir`, sorted by file name.
///
/// A directory that does not exist yields no tools.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or any manifest is invalid.
pub fn load_manifest_dir(dir: &Path) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Custom tools directory not present");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir).map_err(|e| ToolError::InvalidManifest {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let manifest = ToolManifest::load(path)?;
            debug!(tool = %manifest.name, path = %path.display(), "Loaded custom tool");
            Ok(Arc::new(CommandTool::new(manifest)) as Arc<dyn Tool>)
        })
        .collect()
}

/// Tool that runs the program named by a [`ToolManifest`].
#[derive(Debug, Clone)]
pub struct CommandTool {
    manifest: ToolManifest,
}

impl CommandTool {
    /// Wraps a manifest.
    #[must_use]
    pub fn new(manifest: ToolManifest) -> Self {
        Self { manifest }
    }
}

#[async_trait]
impl Tool for CommandTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(self.manifest.name.clone())
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Owned(self.manifest.doc.clone())
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let name = self.manifest.name.as_str();
        let payload = serde_json::to_vec(&args.to_value()).map_err(|e| failed(name, e))?;

        let mut command = Command::new(&self.manifest.program);
        command
            .args(&self.manifest.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.manifest.working_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| failed(name, e))?;
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                // A program may exit without reading its parameters.
                match stdin.write_all(&payload).await {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };
        let run = async {
            let (written, output) = tokio::join!(write, child.wait_with_output());
            written?;
            output
        };

        let output = tokio::time::timeout(Duration::from_secs(self.manifest.timeout_secs), run)
            .await
            .map_err(|_| ToolError::Timeout {
                tool: name.to_string(),
                seconds: self.manifest.timeout_secs,
            })?
            .map_err(|e| failed(name, e))?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(failed(
                name,
                format!("{}: {}", output.status, stderr.trim_end()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, file: &str, body: &str) -> PathBuf {
        let path = dir.join(file);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_toml_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "cat.toml",
            "name = \"echo_params\"\ndoc = \"Echoes its parameters\"\nprogram = \"cat\"\n",
        );

        let manifest = ToolManifest::load(&path).unwrap();
        assert_eq!(manifest.name, "echo_params");
        assert_eq!(manifest.program, "cat");
        assert!(manifest.args.is_empty());
        assert_eq!(manifest.timeout_secs, 60);
    }

    #[test]
    fn test_manifest_missing_program_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", r#"{"name": "x", "doc": "y"}"#);
        assert!(matches!(
            ToolManifest::load(&path),
            Err(ToolError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_load_dir_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            r#"{"name": "a", "doc": "first", "program": "cat"}"#,
        );
        write(dir.path(), "notes.txt", "not a manifest");

        let tools = load_manifest_dir(dir.path()).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "a");
    }

    #[tokio::test]
    async fn test_command_tool_receives_parameters_on_stdin() {
        let tool = CommandTool::new(ToolManifest {
            name: "echo_params".to_string(),
            doc: String::new(),
            program: "cat".to_string(),
            args: vec![],
            timeout_secs: 10,
            working_dir: None,
        });

        let out = tool
            .call(ToolArgs::from_parameters(json!({"path": "."})))
            .await
            .unwrap();
        assert_eq!(out, r#"{"path":"."}"#);
    }

    #[tokio::test]
    async fn test_command_tool_failure_carries_stderr() {
        let tool = CommandTool::new(ToolManifest {
            name: "fails".to_string(),
            doc: String::new(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()],
            timeout_secs: 10,
            working_dir: None,
        });

        let err = tool.call(ToolArgs::None).await.unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    fn shell_tool(script: &str, timeout_secs: u64) -> CommandTool {
        CommandTool::new(ToolManifest {
            name: "script".to_string(),
            doc: String::new(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            timeout_secs,
            working_dir: None,
        })
    }

    fn large_parameters() -> ToolArgs {
        ToolArgs::from_parameters(json!({"text": "x".repeat(300 * 1024)}))
    }

    #[tokio::test]
    async fn test_command_tool_timeout_covers_stdin_write() {
        let started = std::time::Instant::now();
        let result = shell_tool("sleep 5", 1).call(large_parameters()).await;

        assert!(matches!(
            result,
            Err(ToolError::Timeout { seconds: 1, .. })
        ));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_command_tool_ignoring_stdin_still_succeeds() {
        let out = shell_tool("echo done", 10)
            .call(large_parameters())
            .await
            .unwrap();
        assert_eq!(out, "done");
    }
}
