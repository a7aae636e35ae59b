//! File system tools confined to the workspace root.
//!
//! Every path argument goes through [`validate_path`] first, so `..` and
//! absolute paths outside the root are refused before any I/O happens.

use crate::error::ToolError;
use crate::tools::constants::fs;
use crate::tools::constants::walk::IGNORED_DIRS;
use crate::tools::{Tool, ToolArgs, failed, invalid, validate_file_size, validate_path};
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn resolve(tool: &str, root: &Path, path: &str) -> Result<PathBuf, ToolError> {
    validate_path(path, root).map_err(|e| failed(tool, e))
}

/// Creates a file, overwriting any existing content.
pub struct CreateFileTool {
    root: PathBuf,
}

impl CreateFileTool {
    /// Creates the tool for `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(fs::CREATE_FILE)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed(
            "Creates a file with the given content, creating parent directories. Parameters: {\"file_path\": string, \"content\": string}.",
        )
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let path = args.required_str(fs::CREATE_FILE, "file_path", 0)?;
        let content = args.required_str(fs::CREATE_FILE, "content", 1)?;
        let target = resolve(fs::CREATE_FILE, &self.root, path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| failed(fs::CREATE_FILE, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| failed(fs::CREATE_FILE, e))?;

        Ok(format!("File created at: {path} ({} bytes)", content.len()))
    }
}

/// Reads a UTF-8 file up to a size limit.
pub struct ReadFileTool {
    root: PathBuf,
    max_size: u64,
}

impl ReadFileTool {
    /// Creates the tool for `root`.
    #[must_use]
    pub fn new(root: PathBuf, max_size: u64) -> Self {
        Self { root, max_size }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(fs::READ_FILE)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed("Returns the content of a text file. Parameters: {\"file_path\": string}.")
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let path = args.required_str(fs::READ_FILE, "file_path", 0)?;
        let target = resolve(fs::READ_FILE, &self.root, path)?;
        validate_file_size(&target, self.max_size).map_err(|e| failed(fs::READ_FILE, e))?;

        tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| failed(fs::READ_FILE, e))
    }
}

/// Replaces a single line of an existing file.
pub struct ModifyFileTool {
    root: PathBuf,
}

impl ModifyFileTool {
    /// Creates the tool for `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ModifyFileTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(fs::MODIFY_FILE)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed(
            "Replaces one line of a file (1-indexed). Parameters: {\"file_path\": string, \"content\": string, \"line_number\": integer}.",
        )
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let path = args.required_str(fs::MODIFY_FILE, "file_path", 0)?;
        let content = args.required_str(fs::MODIFY_FILE, "content", 1)?;
        let line_number = args
            .optional_u64("line_number", 2)
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n > 0)
            .ok_or_else(|| invalid(fs::MODIFY_FILE, "'line_number' must be a positive integer"))?;
        let target = resolve(fs::MODIFY_FILE, &self.root, path)?;

        let original = tokio::fs::read_to_string(&target)
            .await
            .map_err(|e| failed(fs::MODIFY_FILE, e))?;
        let mut lines: Vec<&str> = original.lines().collect();
        if line_number > lines.len() {
            return Err(invalid(
                fs::MODIFY_FILE,
                format!(
                    "Line number {line_number} exceeds file length ({})",
                    lines.len()
                ),
            ));
        }
        lines[line_number - 1] = content;

        let mut updated = lines.join("\n");
        updated.push('\n');
        tokio::fs::write(&target, updated)
            .await
            .map_err(|e| failed(fs::MODIFY_FILE, e))?;

        Ok(format!("File modified at: {path} (line {line_number})"))
    }
}

/// Renders an indented directory tree, skipping build and VCS directories.
pub struct DirectoryTreeTool {
    root: PathBuf,
    max_depth: usize,
}

impl DirectoryTreeTool {
    /// Creates the tool for `root`.
    #[must_use]
    pub fn new(root: PathBuf, max_depth: usize) -> Self {
        Self { root, max_depth }
    }
}

#[async_trait]
impl Tool for DirectoryTreeTool {
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(fs::DIRECTORY_TREE)
    }

    fn doc(&self) -> Cow<'static, str> {
        Cow::Borrowed(
            "Lists files and directories as an indented tree. Parameters: {\"path\": string} (defaults to the workspace root).",
        )
    }

    async fn call(&self, args: ToolArgs) -> Result<String, ToolError> {
        let path = args.optional_str("path", 0).unwrap_or(".");
        let start = resolve(fs::DIRECTORY_TREE, &self.root, path)?;
        if !start.is_dir() {
            return Err(invalid(
                fs::DIRECTORY_TREE,
                format!("'{path}' is not a directory"),
            ));
        }

        let mut tree = String::new();
        let walker = WalkDir::new(&start)
            .max_depth(self.max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| IGNORED_DIRS.contains(&name))
            });

        for entry in walker {
            let entry = entry.map_err(|e| failed(fs::DIRECTORY_TREE, e))?;
            let indent = "    ".repeat(entry.depth());
            let name = if entry.depth() == 0 {
                path.to_string()
            } else {
                entry.file_name().to_string_lossy().into_owned()
            };
            if entry.file_type().is_dir() {
                let _ = writeln!(tree, "{indent}{}/", name.trim_end_matches('/'));
            } else {
                let _ = writeln!(tree, "{indent}{name}");
            }
        }

        Ok(tree)
    }
}
