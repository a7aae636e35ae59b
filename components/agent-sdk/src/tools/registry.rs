//! Tool registry for looking up and invoking tools by name.

use crate::error::ToolError;
use crate::tools::manifest::load_manifest_dir;
use crate::tools::{Tool, ToolArgs, ToolDoc};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Name to capability mapping, read-only once built.
///
/// Share it across orchestrations with an `Arc`.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty tool registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from builtin tools layered under the manifests in `custom_dir`.
    ///
    /// Custom tools override builtins with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read or a manifest is invalid.
    pub fn build(
        builtins: impl IntoIterator<Item = Arc<dyn Tool>>,
        custom_dir: Option<&Path>,
    ) -> Result<Self, ToolError> {
        let mut registry = Self::new();
        for tool in builtins {
            registry.register(tool);
        }

        if let Some(dir) = custom_dir {
            for tool in load_manifest_dir(dir)? {
                if let Some(previous) = registry.register(tool) {
                    info!(tool = %previous.name(), "Custom tool overrides builtin");
                }
            }
        }

        debug!(tools = ?registry.names(), "Tool registry built");
        Ok(registry)
    }

    /// Registers a tool, returning the entry it replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        self.tools.insert(tool.name().into_owned(), tool)
    }

    /// Looks up a tool by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::NotFound`] when no tool has that name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    /// Looks up and invokes a tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown or its invocation fails.
    pub async fn invoke(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        self.lookup(name)?.call(args).await
    }

    /// Returns tool names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Returns the documentation of every tool in sorted order.
    #[must_use]
    pub fn docs(&self) -> Vec<ToolDoc> {
        self.tools
            .iter()
            .map(|(name, tool)| ToolDoc {
                name: name.clone(),
                doc: tool.doc().into_owned(),
            })
            .collect()
    }

    /// Returns `name: doc` lines for the system prompt.
    #[must_use]
    pub fn help_text(&self) -> String {
        let mut text = String::new();
        for doc in self.docs() {
            let _ = writeln!(text, "{}: {}", doc.name, doc.doc);
        }
        text
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::borrow::Cow;

    struct EchoTool {
        name: &'static str,
        reply: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> Cow<'static, str> {
            Cow::Borrowed(self.name)
        }

        fn doc(&self) -> Cow<'static, str> {
            Cow::Borrowed("Echoes a fixed reply.")
        }

        async fn call(&self, _args: ToolArgs) -> Result<String, ToolError> {
            Ok(self.reply.to_string())
        }
    }

    fn echo(name: &'static str, reply: &'static str) -> Arc<dyn Tool> {
        Arc::new(EchoTool { name, reply })
    }

    #[tokio::test]
    async fn test_lookup_and_invoke() {
        let registry = ToolRegistry::build(vec![echo("greet", "hello")], None).unwrap();

        assert_eq!(registry.invoke("greet", ToolArgs::None).await.unwrap(), "hello");
        assert!(matches!(
            registry.lookup("missing"),
            Err(ToolError::NotFound { name }) if name == "missing"
        ));
    }

    #[test]
    fn test_help_text_is_sorted() {
        let registry =
            ToolRegistry::build(vec![echo("zeta", "z"), echo("alpha", "a")], None).unwrap();
        assert_eq!(
            registry.help_text(),
            "alpha: Echoes a fixed reply.\nzeta: Echoes a fixed reply.\n"
        );
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_register_returns_replaced_entry() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(echo("greet", "one")).is_none());
        assert!(registry.register(echo("greet", "two")).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_custom_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("custom");
        let registry = ToolRegistry::build(vec![echo("greet", "hello")], Some(&missing)).unwrap();
        assert_eq!(registry.len(), 1);
    }
}
