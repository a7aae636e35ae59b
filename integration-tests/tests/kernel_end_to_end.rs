//! The kernel's provider registry driving the agent loop against a mocked
//! Ollama daemon.

mod common;

use agent_sdk::{AgentConfig, InferenceGateway, OrchestratorBuilder};
use anyhow::Result;
use flexi_kernel::build_registry;
use flexi_kernel::infrastructure::config::{InferenceSettings, ProviderKind};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn ollama_reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "model": "llama3.1",
        "message": {"role": "assistant", "content": content},
        "done": true
    }))
}

fn settings(server: &MockServer) -> InferenceSettings {
    InferenceSettings {
        provider: ProviderKind::Ollama,
        base_url: Some(server.uri()),
        max_retries: 0,
        ..InferenceSettings::default()
    }
}

#[tokio::test]
async fn test_registry_backed_agent_answers_arithmetic() -> Result<()> {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("capable of reflection, code execution and tool usage"))
        .respond_with(ollama_reply(&common::json_block(r#"{"use": "respond"}"#)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_string_contains("answer using only the provided information"))
        .respond_with(ollama_reply("68"))
        .expect(1)
        .mount(&server)
        .await;

    let registry: Arc<dyn InferenceGateway> = Arc::new(build_registry(&settings(&server))?);
    let agent = OrchestratorBuilder::new()
        .gateway(registry)
        .config(AgentConfig::builder().max_retries(3).build()?)
        .build()?;

    let report = agent.run("what is 17 * 4").await?;

    assert_eq!(report.outcome.text(), "68");
    assert_eq!(report.executions, 0);
    Ok(())
}

#[tokio::test]
async fn test_unreachable_backend_surfaces_as_error() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .mount(&server)
        .await;

    let agent = OrchestratorBuilder::new()
        .gateway(Arc::new(build_registry(&settings(&server))?))
        .build()?;

    let err = agent.run("what is 17 * 4").await.unwrap_err();
    assert!(err.to_string().contains("Bad Request"));
    Ok(())
}
