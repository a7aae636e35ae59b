//! Codebase corpus for grounding prompts in local source files.

use crate::error::FileSystemError;
use crate::tools::constants::walk::IGNORED_DIRS;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// One source file included in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    /// Path relative to the corpus root.
    pub path: PathBuf,
    /// Fence language, taken from the extension.
    pub language: String,
    /// File content.
    pub content: String,
}

/// Source files collected from a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodebaseCorpus {
    files: Vec<CorpusFile>,
}

impl CodebaseCorpus {
    /// Walks `root` and collects UTF-8 files whose extension is in
    /// `extensions`, skipping files larger than `max_bytes` and the usual
    /// build and VCS directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory walk fails.
    pub fn load(root: &Path, extensions: &[&str], max_bytes: u64) -> Result<Self, FileSystemError> {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
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
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(language) = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .filter(|ext| extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
            else {
                continue;
            };

            let size = entry.metadata().map_err(std::io::Error::from)?.len();
            if size > max_bytes {
                debug!(path = %entry.path().display(), size, "Skipping large file");
                continue;
            }
            let Ok(content) = std::fs::read_to_string(entry.path()) else {
                debug!(path = %entry.path().display(), "Skipping non UTF-8 file");
                continue;
            };

            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            files.push(CorpusFile {
                path: relative,
                language: language.to_lowercase(),
                content,
            });
        }

        info!(root = %root.display(), files = files.len(), "Codebase corpus loaded");
        Ok(Self { files })
    }

    /// Files in walk order.
    #[must_use]
    pub fn files(&self) -> &[CorpusFile] {
        &self.files
    }

    /// Returns true when no file matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Renders every file as a headed fenced block.
    #[must_use]
    pub fn render(&self) -> String {
        self.files
            .iter()
            .map(|file| {
                format!(
                    "## {}\n```{}\n{}\n```",
                    file.path.display(),
                    file.language,
                    file.content.trim_end()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
