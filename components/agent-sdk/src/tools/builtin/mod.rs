//! Tools available to every agent without manifests.

pub mod fs;
pub mod http;
pub mod shell;

use crate::error::ToolError;
use crate::tools::Tool;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use fs::{CreateFileTool, DirectoryTreeTool, ModifyFileTool, ReadFileTool};
pub use http::{FetchUrlTool, HttpPostTool};
pub use shell::ShellTool;

/// Settings shared by the builtin tools.
#[derive(Debug, Clone)]
pub struct BuiltinSettings {
    /// Root that file tools are confined to.
    pub workspace_root: PathBuf,
    /// Commands the shell tool may run.
    pub shell_allowlist: Vec<String>,
    /// Budget for shell commands and HTTP requests.
    pub command_timeout: Duration,
    /// Largest file `read_file` returns.
    pub max_file_size: u64,
    /// Deepest level `get_directory_tree` descends to.
    pub max_depth: usize,
}

/// Instantiates every builtin tool.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be constructed.
pub fn builtin_tools(settings: &BuiltinSettings) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
    let client = reqwest::Client::builder()
        .timeout(settings.command_timeout)
        .build()
        .map_err(|e| crate::tools::failed(crate::tools::constants::http::FETCH_URL, e))?;

    Ok(vec![
        Arc::new(ShellTool::new(
            settings.shell_allowlist.clone(),
            settings.workspace_root.clone(),
            settings.command_timeout,
        )),
        Arc::new(CreateFileTool::new(settings.workspace_root.clone())),
        Arc::new(ReadFileTool::new(
            settings.workspace_root.clone(),
            settings.max_file_size,
        )),
        Arc::new(ModifyFileTool::new(settings.workspace_root.clone())),
        Arc::new(DirectoryTreeTool::new(
            settings.workspace_root.clone(),
            settings.max_depth,
        )),
        Arc::new(FetchUrlTool::new(client.clone())),
        Arc::new(HttpPostTool::new(client)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolRegistry;

    #[test]
    fn test_builtin_names() {
        let root = tempfile::tempdir().unwrap();
        let settings = BuiltinSettings {
            workspace_root: root.path().to_path_buf(),
            shell_allowlist: vec!["ls".to_string()],
            command_timeout: Duration::from_secs(5),
            max_file_size: 1024,
            max_depth: 3,
        };

        let registry = ToolRegistry::build(builtin_tools(&settings).unwrap(), None).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "create_file",
                "execute_bash_command",
                "fetch_url_content",
                "get_directory_tree",
                "http_post_data",
                "modify_file",
                "read_file",
            ]
        );
    }
}
