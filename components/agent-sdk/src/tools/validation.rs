//! Security validation for tool operations.

use crate::error::{FileSystemError, ToolError};
use crate::tools::constants;
use std::path::{Component, Path, PathBuf};

/// Resolves `path` against `base_dir`, refusing anything that escapes it.
///
/// # Errors
///
/// Returns an error if the path contains parent directory references (`..`),
/// is absolute and outside the base directory, or resolves (through symlinks)
/// outside the base directory.
pub fn validate_path(path: &str, base_dir: &Path) -> Result<PathBuf, FileSystemError> {
    let path = Path::new(path);

    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        return Err(FileSystemError::PathTraversal {
            path: path.to_path_buf(),
        });
    }

    let canonical_base = base_dir.canonicalize().map_err(|e| {
        FileSystemError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Base directory not found: {e}"),
        ))
    })?;

    if path.is_absolute() && !(path.starts_with(base_dir) || path.starts_with(&canonical_base)) {
        return Err(FileSystemError::PathTraversal {
            path: path.to_path_buf(),
        });
    }

    let resolved = base_dir.join(path);

    // Files that do not exist yet are checked through their closest existing ancestor.
    let existing = resolved
        .ancestors()
        .find(|ancestor| ancestor.exists())
        .unwrap_or(base_dir);
    if let Ok(canonical) = existing.canonicalize()
        && !canonical.starts_with(&canonical_base)
    {
        return Err(FileSystemError::PathTraversal {
            path: path.to_path_buf(),
        });
    }

    Ok(resolved)
}

/// Checks if a file size is within limits.
///
/// # Errors
///
/// Returns an error if the file metadata cannot be read or if the file size
/// exceeds the specified maximum.
pub fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FileSystemError> {
    let size = std::fs::metadata(path)?.len();

    if size > max_size {
        return Err(FileSystemError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size,
        });
    }

    Ok(())
}

/// Validates a shell command against an allowlist.
///
/// # Errors
///
/// Returns an error if the command is empty, not in the allowlist, or
/// contains shell metacharacters (`;`, `&`, `|`, `>`, `<`, `` ` ``, `$`, `(`)
/// or line breaks, which `sh` treats as command separators.
pub fn validate_shell_command(
    command: &str,
    allowlist: &[impl AsRef<str>],
) -> Result<(), ToolError> {
    let Some(first_word) = command.split_whitespace().next() else {
        return Err(ToolError::InvalidArguments {
            tool: constants::shell::EXECUTE_BASH.to_string(),
            reason: "Command is empty".to_string(),
        });
    };

    if !allowlist.iter().any(|allowed| first_word == allowed.as_ref()) {
        return Err(ToolError::Blocked {
            tool: constants::shell::EXECUTE_BASH.to_string(),
            reason: format!("Command '{first_word}' is not in the allowed list"),
        });
    }

    let dangerous_chars = [b';', b'&', b'|', b'>', b'<', b'`', b'$', b'(', b'\n', b'\r'];
    if command.bytes().any(|c| dangerous_chars.contains(&c)) {
        return Err(ToolError::Blocked {
            tool: constants::shell::EXECUTE_BASH.to_string(),
            reason: "Command contains potentially dangerous characters".to_string(),
        });
    }

    Ok(())
}
