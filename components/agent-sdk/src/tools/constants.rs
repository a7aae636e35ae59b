//! Builtin tool names.
//!
//! Using constants prevents typos between tool implementations, prompts
//! and tests.

/// Tool names for file system operations.
pub mod fs {
    /// Create or overwrite a file.
    pub const CREATE_FILE: &str = "create_file";

    /// Read content from a file.
    pub const READ_FILE: &str = "read_file";

    /// Replace one line of a file.
    pub const MODIFY_FILE: &str = "modify_file";

    /// Render a directory tree.
    pub const DIRECTORY_TREE: &str = "get_directory_tree";
}

/// Tool names for shell operations.
pub mod shell {
    /// Execute an allowlisted shell command.
    pub const EXECUTE_BASH: &str = "execute_bash_command";
}

/// Tool names for HTTP operations.
pub mod http {
    /// GET a URL and return the body.
    pub const FETCH_URL: &str = "fetch_url_content";

    /// POST JSON to a URL.
    pub const POST_DATA: &str = "http_post_data";
}

/// Directory walking.
pub mod walk {
    /// Build, dependency and VCS directories skipped by directory walks.
    pub const IGNORED_DIRS: [&str; 6] = [
        ".git",
        "node_modules",
        "__pycache__",
        "target",
        ".next",
        ".venv",
    ];
}
