//! Configuration management for agents.
//!
//! Provides a strongly-typed configuration system with environment variable
//! support and sensible defaults.

use crate::error::ConfigError;
use crate::tools::builtin::BuiltinSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// Lower bound accepted for `max_history_messages`.
pub const MIN_HISTORY_MESSAGES: usize = 3;

/// What the loop keeps when the completion check answers "no".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationPolicy {
    /// Keep the whole conversation and ask the model to reconsider.
    #[default]
    FullContext,
    /// Restart from the original request plus the reconsider instruction.
    FreshPrompt,
}

impl FromStr for ContinuationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "full_context" => Ok(Self::FullContext),
            "fresh_prompt" => Ok(Self::FreshPrompt),
            _ => Err(ConfigError::Invalid {
                key: "continuation".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// How a cancelled inference call is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationPolicy {
    /// End the request with a distinct cancelled outcome.
    #[default]
    Abort,
    /// Count it as a malformed response and ask again.
    Retry,
}

impl FromStr for CancellationPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "retry" => Ok(Self::Retry),
            _ => Err(ConfigError::Invalid {
                key: "cancellation".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Agent configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentConfig {
    /// Model identifier passed to the inference gateway.
    #[serde(default = "default_model")]
    pub model: String,

    /// Correction rounds allowed per request before the loop fails.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Interpreter used by the Python executor.
    #[serde(default = "default_python_interpreter")]
    pub python_interpreter: String,

    /// Wall-clock budget for one Python run.
    #[serde(default = "default_python_timeout", with = "seconds_serde")]
    pub python_timeout: Duration,

    /// Directory for temporary Python sources; the system temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Directory scanned for custom tool manifests.
    #[serde(default)]
    pub custom_tools_dir: Option<PathBuf>,

    /// Root that file tools and shell commands are confined to.
    #[serde(default = "default_workspace_root")]
    pub workspace_root: PathBuf,

    /// Commands the shell tool may run.
    #[serde(default = "default_shell_allowlist")]
    pub shell_allowlist: Vec<String>,

    /// Budget for shell commands and HTTP requests made by tools.
    #[serde(default = "default_command_timeout", with = "seconds_serde")]
    pub command_timeout: Duration,

    /// Maximum file size to read (in bytes).
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum depth for directory traversal.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Behaviour after a "no" completion verdict.
    #[serde(default)]
    pub continuation: ContinuationPolicy,

    /// Behaviour after a cancelled inference call.
    #[serde(default)]
    pub cancellation: CancellationPolicy,

    /// Conversation length that triggers truncation of the oldest turns.
    ///
    /// At least [`MIN_HISTORY_MESSAGES`]: the request, a summary of dropped
    /// turns and the latest message.
    #[serde(default)]
    pub max_history_messages: Option<usize>,

    /// Whether to log prompts and responses in full.
    #[serde(default)]
    pub verbose: bool,
}

impl AgentConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables are prefixed with `FLEXI_AGENT_`.
    /// For example: `FLEXI_AGENT_MAX_RETRIES=5`
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an unparsable or invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a full variable
    /// name such as `FLEXI_AGENT_MODEL` to its value.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is unparsable or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("FLEXI_AGENT_{name}"));
        let mut config = Self::default();

        if let Some(val) = var("MODEL") {
            config.model = val;
        }
        if let Some(val) = var("MAX_RETRIES") {
            config.max_retries = parse_value("max_retries", &val)?;
        }
        if let Some(val) = var("PYTHON_INTERPRETER") {
            config.python_interpreter = val;
        }
        if let Some(val) = var("PYTHON_TIMEOUT_SECONDS") {
            config.python_timeout = Duration::from_secs(parse_value("python_timeout", &val)?);
        }
        if let Some(val) = var("SCRATCH_DIR") {
            config.scratch_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = var("CUSTOM_TOOLS_DIR") {
            config.custom_tools_dir = Some(PathBuf::from(val));
        }
        if let Some(val) = var("WORKSPACE_ROOT") {
            config.workspace_root = PathBuf::from(val);
        }
        if let Some(val) = var("SHELL_ALLOWLIST") {
            config.shell_allowlist = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(val) = var("CONTINUATION") {
            config.continuation = val.parse()?;
        }
        if let Some(val) = var("CANCELLATION") {
            config.cancellation = val.parse()?;
        }
        if let Some(val) = var("MAX_HISTORY_MESSAGES") {
            config.max_history_messages = Some(parse_value("max_history_messages", &val)?);
        }
        if let Some(val) = var("VERBOSE") {
            config.verbose = val == "1" || val.eq_ignore_ascii_case("true");
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<&Self, ConfigError> {
        let invalid = |key: &str, value: String| ConfigError::Invalid {
            key: key.to_string(),
            value,
        };

        if self.max_retries == 0 || self.max_retries > MAX_RETRIES_LIMIT {
            return Err(invalid("max_retries", self.max_retries.to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "empty".to_string()));
        }
        if self.python_interpreter.trim().is_empty() {
            return Err(invalid("python_interpreter", "empty".to_string()));
        }
        if self.python_timeout.is_zero() {
            return Err(invalid("python_timeout", "0".to_string()));
        }
        if self.max_file_size == 0 {
            return Err(invalid("max_file_size", "0".to_string()));
        }
        if let Some(max) = self.max_history_messages
            && max < MIN_HISTORY_MESSAGES
        {
            return Err(invalid("max_history_messages", max.to_string()));
        }

        Ok(self)
    }

    /// Settings for the builtin tools derived from this configuration.
    #[must_use]
    pub fn builtin_settings(&self) -> BuiltinSettings {
        BuiltinSettings {
            workspace_root: self.workspace_root.clone(),
            shell_allowlist: self.shell_allowlist.clone(),
            command_timeout: self.command_timeout,
            max_file_size: self.max_file_size,
            max_depth: self.max_depth,
        }
    }

    /// Returns a builder for creating configuration.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_retries: default_max_retries(),
            python_interpreter: default_python_interpreter(),
            python_timeout: default_python_timeout(),
            scratch_dir: None,
            custom_tools_dir: None,
            workspace_root: default_workspace_root(),
            shell_allowlist: default_shell_allowlist(),
            command_timeout: default_command_timeout(),
            max_file_size: default_max_file_size(),
            max_depth: default_max_depth(),
            continuation: ContinuationPolicy::default(),
            cancellation: CancellationPolicy::default(),
            max_history_messages: None,
            verbose: false,
        }
    }
}

/// Builder for constructing [`AgentConfig`].
#[derive(Debug, Default)]
pub struct AgentConfigBuilder {
    config: Option<AgentConfig>,
}

impl AgentConfigBuilder {
    fn with(mut self, apply: impl FnOnce(&mut AgentConfig)) -> Self {
        apply(self.config.get_or_insert_with(AgentConfig::default));
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(self, model: impl Into<String>) -> Self {
        let model = model.into();
        self.with(|c| c.model = model)
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn max_retries(self, retries: u32) -> Self {
        self.with(|c| c.max_retries = retries)
    }

    /// Sets the Python interpreter.
    #[must_use]
    pub fn python_interpreter(self, interpreter: impl Into<String>) -> Self {
        let interpreter = interpreter.into();
        self.with(|c| c.python_interpreter = interpreter)
    }

    /// Sets the Python wall-clock budget.
    #[must_use]
    pub fn python_timeout(self, timeout: Duration) -> Self {
        self.with(|c| c.python_timeout = timeout)
    }

    /// Sets the scratch directory for Python sources.
    #[must_use]
    pub fn scratch_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.with(|c| c.scratch_dir = Some(dir))
    }

    /// Sets the custom tools directory.
    #[must_use]
    pub fn custom_tools_dir(self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.with(|c| c.custom_tools_dir = Some(dir))
    }

    /// Sets the workspace root for file tools.
    #[must_use]
    pub fn workspace_root(self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.with(|c| c.workspace_root = root)
    }

    /// Sets the shell command allowlist.
    #[must_use]
    pub fn shell_allowlist(self, allowlist: Vec<String>) -> Self {
        self.with(|c| c.shell_allowlist = allowlist)
    }

    /// Sets the tool command budget.
    #[must_use]
    pub fn command_timeout(self, timeout: Duration) -> Self {
        self.with(|c| c.command_timeout = timeout)
    }

    /// Sets the maximum file size for reading.
    #[must_use]
    pub fn max_file_size(self, size: u64) -> Self {
        self.with(|c| c.max_file_size = size)
    }

    /// Sets the maximum directory traversal depth.
    #[must_use]
    pub fn max_depth(self, depth: usize) -> Self {
        self.with(|c| c.max_depth = depth)
    }

    /// Sets the continuation policy.
    #[must_use]
    pub fn continuation(self, policy: ContinuationPolicy) -> Self {
        self.with(|c| c.continuation = policy)
    }

    /// Sets the cancellation policy.
    #[must_use]
    pub fn cancellation(self, policy: CancellationPolicy) -> Self {
        self.with(|c| c.cancellation = policy)
    }

    /// Sets the conversation length that triggers truncation.
    #[must_use]
    pub fn max_history_messages(self, max: usize) -> Self {
        self.with(|c| c.max_history_messages = Some(max))
    }

    /// Sets whether to enable verbose logging.
    #[must_use]
    pub fn verbose(self, verbose: bool) -> Self {
        self.with(|c| c.verbose = verbose)
    }

    /// Builds the configuration, validating all values.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is invalid.
    pub fn build(self) -> Result<AgentConfig, ConfigError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// Default value functions
fn default_model() -> String {
    "llama3.1".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_python_interpreter() -> String {
    "python3".to_string()
}

fn default_python_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_max_depth() -> usize {
    4
}

fn default_shell_allowlist() -> Vec<String> {
    [
        "ls", "cat", "echo", "pwd", "find", "grep", "head", "tail", "wc", "sort", "uniq", "date",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

// Durations are written as whole seconds
mod seconds_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
