//! Tool Registry - name to tool map
//!
//! Each agent owns its own registry. Spawned agents receive a filtered
//! copy of the orchestrator's registry, so cloning is cheap (`Arc` per tool).

use crew_foundation::{Error, Result, Tool, ToolContext, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Tool registry
///
/// ```ignore
/// let mut registry = ToolRegistry::new();
/// registry.register(Arc::new(MyTool));
///
/// if let Some(tool) = registry.get("my_tool") {
///     let result = tool.execute(input, &context).await?;
/// }
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    pub fn register_all(&mut self, tools: Vec<Arc<dyn Tool>>) {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn all(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.values().cloned().collect()
    }

    /// Tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// (name, description) pairs
    pub fn list(&self) -> Vec<(&str, String)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.as_str(), tool.meta().description))
            .collect()
    }

    /// Tool definitions as sent to the model, sorted by name
    pub fn schemas(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                let meta = tool.meta();
                serde_json::json!({
                    "name": meta.name,
                    "description": meta.description,
                    "input_schema": tool.schema()
                })
            })
            .collect()
    }

    /// Copy holding only `names` that exist here, in the given order,
    /// stopping after `cap` tools (`0` = no cap).
    pub fn select(&self, names: &[&str], cap: usize) -> ToolRegistry {
        let mut out = ToolRegistry::new();
        for name in names {
            if cap > 0 && out.len() >= cap {
                break;
            }
            if let Some(tool) = self.tools.get(*name) {
                out.tools.insert((*name).to_string(), Arc::clone(tool));
            }
        }
        out
    }

    /// Copy holding at most `cap` tools, first by name (`0` = no cap).
    pub fn capped(&self, cap: usize) -> ToolRegistry {
        if cap == 0 {
            return self.clone();
        }
        let names: Vec<&str> = self.names().into_iter().take(cap).collect();
        self.select(&names, 0)
    }

    /// Run a tool by name
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        context: &dyn ToolContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        let start = Instant::now();
        let result = tool.execute(input, context).await;
        debug!(
            "Tool '{}' executed in {}ms, ok: {}",
            name,
            start.elapsed().as_millis(),
            result.as_ref().map(|r| r.success).unwrap_or(false)
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crew_foundation::{ToolExecutionContext, ToolMeta};

    struct NamedTool(&'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            self.0
        }

        fn meta(&self) -> ToolMeta {
            ToolMeta::new(self.0).description(format!("{} tool", self.0))
        }

        fn schema(&self) -> Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }

        async fn execute(&self, _input: Value, _context: &dyn ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success(format!("ran {}", self.0)))
        }
    }

    fn registry(names: &[&'static str]) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for name in names {
            registry.register(Arc::new(NamedTool(*name)));
        }
        registry
    }

    #[test]
    fn test_register_and_remove() {
        let mut registry = registry(&["view", "agent"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("agent"));

        assert!(registry.remove("agent").is_some());
        assert!(!registry.contains("agent"));
        assert_eq!(registry.names(), vec!["view"]);
    }

    #[test]
    fn test_select_keeps_order_and_cap() {
        let registry = registry(&["view", "read_lines", "grep", "ls"]);

        let picked = registry.select(&["grep", "missing", "view", "ls"], 2);
        assert_eq!(picked.len(), 2);
        assert!(picked.contains("grep"));
        assert!(picked.contains("view"));
        assert!(!picked.contains("ls"));

        let all = registry.select(&["grep", "view", "ls"], 0);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_capped_is_deterministic() {
        let registry = registry(&["zeta", "alpha", "mid"]);
        let capped = registry.capped(2);
        assert_eq!(capped.names(), vec!["alpha", "mid"]);
        assert_eq!(registry.capped(0).len(), 3);
    }

    #[test]
    fn test_schemas_shape() {
        let registry = registry(&["view"]);
        let schemas = registry.schemas();
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0]["name"], "view");
        assert_eq!(schemas[0]["description"], "view tool");
        assert_eq!(schemas[0]["input_schema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_execute_by_name() {
        let registry = registry(&["view"]);
        let ctx = ToolExecutionContext::new(".", "tester");

        let result = registry
            .execute("view", serde_json::json!({}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.output, "ran view");

        let missing = registry.execute("nope", serde_json::json!({}), &ctx).await;
        assert!(matches!(missing, Err(Error::ToolNotFound(_))));
    }
}
