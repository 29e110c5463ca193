//! Core agent
//!
//! A `CoreAgent` is the runnable part of a team member: prompt, model
//! client and tool registry. Cloning a parent with `spawn` gives a child
//! that shares the client but owns its own registry and cost counters.
//!
//! ```text
//! CoreAgent (agent_0)
//!   ├── client ───────────────┐ shared Arc
//!   ├── tools: full registry  │
//!   └── spawn() ──► CoreAgent ┘ (coder)
//!                     └── tools: curated subset
//! ```

mod runner;

pub use runner::{AgentRunner, ModelRunner, RunRequest};

use crate::model::ModelClient;
use crate::tool::ToolRegistry;
use crew_foundation::Tool;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

// ============================================================================
// Cost tracking
// ============================================================================

/// Token usage accumulated by one agent
#[derive(Debug, Default)]
pub struct CostTracker {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    requests: AtomicU64,
}

impl CostTracker {
    pub fn record(&self, input_tokens: u64, output_tokens: u64) {
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens.load(Ordering::Relaxed)
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens.load(Ordering::Relaxed)
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens() + self.output_tokens()
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

// ============================================================================
// CoreAgent
// ============================================================================

/// Runnable agent: prompt + client + tools
pub struct CoreAgent {
    prompt: String,
    client: Arc<dyn ModelClient>,
    model_name: String,
    tools: RwLock<ToolRegistry>,
    cost: CostTracker,
    /// Cached `tools.schemas()`; cleared whenever the registry changes
    schema_cache: Mutex<Option<Arc<Vec<Value>>>>,
}

impl std::fmt::Debug for CoreAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreAgent")
            .field("model_name", &self.model_name)
            .field("provider", &self.client.provider())
            .field("tools", &*self.tools.read())
            .finish()
    }
}

impl CoreAgent {
    pub fn new(
        client: Arc<dyn ModelClient>,
        model_name: impl Into<String>,
        tools: ToolRegistry,
    ) -> Self {
        Self {
            prompt: String::new(),
            client,
            model_name: model_name.into(),
            tools: RwLock::new(tools),
            cost: CostTracker::default(),
            schema_cache: Mutex::new(None),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Child agent sharing this agent's client unless one is given
    pub fn spawn(
        &self,
        client: Option<(Arc<dyn ModelClient>, String)>,
        tools: ToolRegistry,
        prompt: impl Into<String>,
    ) -> CoreAgent {
        let (client, model_name) =
            client.unwrap_or_else(|| (Arc::clone(&self.client), self.model_name.clone()));
        CoreAgent::new(client, model_name, tools).with_prompt(prompt)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn client(&self) -> Arc<dyn ModelClient> {
        Arc::clone(&self.client)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Snapshot of the registry
    pub fn tools(&self) -> ToolRegistry {
        self.tools.read().clone()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.read().contains(name)
    }

    /// Register (or replace) a tool
    pub fn add_tool(&self, tool: Arc<dyn Tool>) {
        self.tools.write().register(tool);
        self.invalidate_tool_cache();
    }

    pub fn remove_tool(&self, name: &str) -> bool {
        let removed = self.tools.write().remove(name).is_some();
        if removed {
            self.invalidate_tool_cache();
        }
        removed
    }

    pub fn invalidate_tool_cache(&self) {
        *self.schema_cache.lock() = None;
    }

    /// Tool definitions for the model, built once per registry change
    pub fn tool_schemas(&self) -> Arc<Vec<Value>> {
        let mut cache = self.schema_cache.lock();
        if let Some(schemas) = cache.as_ref() {
            return Arc::clone(schemas);
        }
        let schemas = Arc::new(self.tools.read().schemas());
        *cache = Some(Arc::clone(&schemas));
        schemas
    }

    pub fn cost(&self) -> &CostTracker {
        &self.cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MockClient;
    use async_trait::async_trait;
    use crew_foundation::{Result, Tool, ToolContext, ToolMeta, ToolResult};

    struct Noop(&'static str);

    #[async_trait]
    impl Tool for Noop {
        fn name(&self) -> &str {
            self.0
        }
        fn meta(&self) -> ToolMeta {
            ToolMeta::new(self.0)
        }
        fn schema(&self) -> Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, _input: Value, _context: &dyn ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success(""))
        }
    }

    fn parent() -> CoreAgent {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(Noop("view")));
        tools.register(Arc::new(Noop("agent")));
        CoreAgent::new(Arc::new(MockClient::echo()), "mock/echo", tools).with_prompt("lead")
    }

    #[test]
    fn test_schema_cache_invalidated_on_remove() {
        let agent = parent();
        assert_eq!(agent.tool_schemas().len(), 2);

        assert!(agent.remove_tool("agent"));
        assert_eq!(agent.tool_schemas().len(), 1);
        assert!(!agent.remove_tool("agent"));
    }

    #[test]
    fn test_spawn_inherits_client() {
        let agent = parent();
        let child = agent.spawn(None, agent.tools().select(&["view"], 0), "You are a coder agent");
        assert_eq!(child.model_name(), "mock/echo");
        assert_eq!(child.prompt(), "You are a coder agent");
        assert_eq!(child.tool_names(), vec!["view".to_string()]);
        // parent untouched
        assert!(agent.has_tool("agent"));
    }

    #[test]
    fn test_cost_tracker() {
        let cost = CostTracker::default();
        cost.record(10, 5);
        cost.record(1, 1);
        assert_eq!(cost.total_tokens(), 17);
        assert_eq!(cost.requests(), 2);
    }
}
