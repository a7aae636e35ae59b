//! Configuration management for the Flexi kernel.
//!
//! Settings are layered: built-in defaults, then an optional `flexi.toml`,
//! then `FLEXI__*` environment variables (`FLEXI__AGENT__MAX_RETRIES=5`,
//! `FLEXI__INFERENCE__PROVIDER=openai`).
//!
//! # Example
//!
//! ```
//! use flexi_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! assert!(settings.agent.max_retries > 0);
//! ```

pub mod history;
pub mod inference;
pub mod telemetry;

pub use history::HistorySettings;
pub use inference::{InferenceSettings, ProviderKind};
pub use telemetry::TelemetrySettings;

use agent_sdk::AgentConfig;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "flexi";

/// Top-level configuration for the Flexi kernel.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Inference provider settings.
    #[serde(default)]
    pub inference: InferenceSettings,
    /// Orchestrator settings.
    #[serde(default)]
    pub agent: AgentConfig,
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    /// Cycle history settings.
    #[serde(default)]
    pub history: HistorySettings,
}

impl Settings {
    /// Loads settings from `flexi.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None, environment())
    }

    /// Loads settings from `file` instead of `flexi.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or a value is invalid.
    pub fn from_file(file: &Path) -> Result<Self, ConfigError> {
        Self::load(Some(file), environment())
    }

    fn load(file: Option<&Path>, env: Environment) -> Result<Self, ConfigError> {
        let file = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let s = Config::builder()
            .set_default("telemetry.level", telemetry::default_level())?
            .add_source(file)
            .add_source(env)
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings
            .agent
            .validate()
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        Ok(settings)
    }
}

fn environment() -> Environment {
    Environment::with_prefix("FLEXI")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("agent.shell_allowlist")
}
