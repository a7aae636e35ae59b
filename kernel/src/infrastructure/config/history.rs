//! Cycle history configuration.

use serde::Deserialize;
use std::path::PathBuf;

/// Where completed cycles are recorded.
#[derive(Debug, Deserialize, Clone)]
pub struct HistorySettings {
    /// Whether records are written at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Target directory; the platform data dir when unset.
    pub dir: Option<PathBuf>,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            dir: None,
        }
    }
}

impl HistorySettings {
    /// Resolved history directory.
    #[must_use]
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("flexi")
                .join("history")
        })
    }
}

fn default_enabled() -> bool {
    true
}
