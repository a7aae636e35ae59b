//! Write-only persistence of completed cycles.

use crate::engine::RunReport;
use crate::error::FileSystemError;
use crate::executor::Action;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Input side of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleInput {
    /// System instructions for the decision step.
    pub instructions: String,
    /// The user's request.
    pub prompt: String,
}

/// Output side of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutput {
    /// Final answer, failure message or partial text.
    pub response: String,
    /// Last executed Python code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Last executed tool instruction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<Value>,
}

/// Timing of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleProcessing {
    /// Seconds from request to outcome.
    pub time_taken: f64,
    /// Executor calls.
    pub executions: u32,
}

/// One request and how it was handled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleRecord {
    /// When the record was created.
    pub timestamp: DateTime<Utc>,
    /// What was asked.
    pub input: CycleInput,
    /// What came back.
    pub output: CycleOutput,
    /// How long it took.
    pub processing: CycleProcessing,
}

impl CycleRecord {
    /// Builds a record from a finished run.
    #[must_use]
    pub fn from_report(report: &RunReport) -> Self {
        let (code, tool) = match &report.last_action {
            Some(Action::Python(code)) => (Some(code.clone()), None),
            Some(Action::Tool(instruction)) => (None, Some(instruction.clone())),
            None => (None, None),
        };
        Self {
            timestamp: Utc::now(),
            input: CycleInput {
                instructions: report.instructions.clone(),
                prompt: report.request.clone(),
            },
            output: CycleOutput {
                response: report.outcome.text().to_string(),
                code,
                tool,
            },
            processing: CycleProcessing {
                time_taken: report.elapsed.as_secs_f64(),
                executions: report.executions,
            },
        }
    }
}

/// Directory of pretty-printed JSON cycle records.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Creates a store writing into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes one record and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file written.
    pub async fn write(&self, record: &CycleRecord) -> Result<PathBuf, FileSystemError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!(
            "{}-{}.json",
            record.timestamp.format("%Y%m%d-%H%M%S"),
            uuid::Uuid::new_v4().simple()
        );
        let path = self.dir.join(name);
        let body = serde_json::to_string_pretty(record)?;
        tokio::fs::write(&path, body).await?;
        debug!(path = %path.display(), "Cycle record written");
        Ok(path)
    }
}
