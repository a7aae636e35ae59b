//! Orchestrator builder.

use crate::config::AgentConfig;
use crate::engine::Orchestrator;
use crate::error::{AgentError, ConfigError};
use crate::executor::{ActionExecutor, LocalExecutor};
use crate::inference::{CancelFlag, ChunkSink, InferenceGateway};
use crate::prompt::PromptBuilder;
use crate::tools::ToolRegistry;
use std::sync::Arc;

/// Builder for constructing orchestrators.
#[derive(Default)]
pub struct OrchestratorBuilder {
    gateway: Option<Arc<dyn InferenceGateway>>,
    executor: Option<Arc<dyn ActionExecutor>>,
    tools: Option<Arc<ToolRegistry>>,
    prompts: Option<PromptBuilder>,
    config: Option<AgentConfig>,
    sink: Option<Arc<dyn ChunkSink>>,
    cancel: Option<CancelFlag>,
}

impl OrchestratorBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the inference gateway. Required.
    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn InferenceGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Sets the executor. Defaults to a [`LocalExecutor`] over the registry.
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the tool registry. Defaults to an empty registry.
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Sets the prompt builder.
    #[must_use]
    pub fn prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Streams every model chunk to `sink`.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ChunkSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attaches a cancellation flag to every model call.
    #[must_use]
    pub fn cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if no gateway was set or the configuration is invalid.
    pub fn build(self) -> Result<Orchestrator, AgentError> {
        let gateway = self.gateway.ok_or_else(|| ConfigError::Missing {
            key: "gateway".to_string(),
        })?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let tools = self.tools.unwrap_or_default();
        let executor = self.executor.unwrap_or_else(|| {
            Arc::new(LocalExecutor::from_config(&config, Arc::clone(&tools)))
        });

        Ok(Orchestrator {
            gateway,
            executor,
            tools,
            prompts: self.prompts.unwrap_or_default(),
            config,
            sink: self.sink,
            cancel: self.cancel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_gateway() {
        let err = OrchestratorBuilder::new().build().unwrap_err();
        assert!(matches!(
            err,
            AgentError::Config(ConfigError::Missing { key }) if key == "gateway"
        ));
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        struct Silent;

        #[async_trait::async_trait]
        impl InferenceGateway for Silent {
            async fn chat(
                &self,
                _request: crate::inference::ChatRequest,
            ) -> Result<crate::inference::ChatResponse, crate::inference::InferenceError> {
                Ok(crate::inference::ChatResponse::new(""))
            }
        }

        let mut config = AgentConfig::default();
        config.max_retries = 0;
        let err = OrchestratorBuilder::new()
            .gateway(Arc::new(Silent))
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(ConfigError::Invalid { .. })));
    }
}
