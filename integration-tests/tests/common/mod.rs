//! Shared fixtures for the agent loop scenarios.
//!
//! Provides a scripted model, a scratch workspace and a helper that wires
//! them into an orchestrator with the real builtin tools and executors.

#![allow(dead_code)]

use agent_sdk::{
    AgentConfig, ChatRequest, ChatResponse, InferenceError, InferenceGateway, Message,
    Orchestrator, OrchestratorBuilder, ToolRegistry, builtin_tools,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tempfile::TempDir;

/// Replays canned replies in order and records every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    /// Creates a model that answers with `replies`, one per call.
    pub fn new<S: AsRef<str>>(replies: &[S]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.as_ref().to_string()).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    /// Messages of the `index`-th call.
    pub fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock()[index].clone()
    }

    /// Index of the first call whose system prompt contains `marker`.
    pub fn find_call(&self, marker: &str) -> Option<usize> {
        self.requests
            .lock()
            .iter()
            .position(|messages| messages[0].content.contains(marker))
    }
}

#[async_trait]
impl InferenceGateway for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.requests.lock().push(request.messages);
        self.replies
            .lock()
            .pop_front()
            .map(ChatResponse::new)
            .ok_or_else(|| InferenceError::ProviderError("script exhausted".to_string()))
    }
}

/// Marker of the completion-check system prompt.
pub const CHECK_PROMPT: &str = "determine if the user's request was fulfilled";

/// Wraps `body` in a json fence.
pub fn json_block(body: &str) -> String {
    format!("```json\n{body}\n```")
}

/// Wraps `code` in a python fence.
pub fn python_block(code: &str) -> String {
    format!("```python\n{code}\n```")
}

/// A temporary workspace holding `files`.
pub fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (name, content) in files {
        std::fs::write(dir.path().join(name), content).expect("write fixture");
    }
    dir
}

/// Configuration rooted at `root` with a short Python budget.
pub fn config(root: &std::path::Path, max_retries: u32) -> AgentConfig {
    AgentConfig::builder()
        .max_retries(max_retries)
        .workspace_root(root)
        .python_timeout(std::time::Duration::from_secs(10))
        .build()
        .expect("valid config")
}

/// An orchestrator using the real tools and executors.
pub fn agent(model: Arc<ScriptedModel>, config: AgentConfig) -> Orchestrator {
    let tools = ToolRegistry::build(
        builtin_tools(&config.builtin_settings()).expect("builtin tools"),
        None,
    )
    .expect("registry");
    OrchestratorBuilder::new()
        .gateway(model)
        .tools(Arc::new(tools))
        .config(config)
        .build()
        .expect("orchestrator")
}

/// Whether a usable `python3` is on the PATH.
pub fn python_available() -> bool {
    std::process::Command::new("python3")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}
