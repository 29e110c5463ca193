//! Core Traits - the tool interface
//!
//! Tools are named, schema-described actions a model can invoke. The
//! registry in Layer2-core stores them as `Arc<dyn Tool>`; the team layer
//! adds the delegation tools on top.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ============================================================================
// Tool Trait
// ============================================================================

/// Tool metadata
#[derive(Debug, Clone)]
pub struct ToolMeta {
    /// Unique name
    pub name: String,
    pub display_name: String,
    pub description: String,
    /// filesystem, execute, network, delegation, ...
    pub category: String,
}

impl ToolMeta {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            category: "general".to_string(),
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// Result of `Tool::execute`
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    /// Failure text, shown to the model in place of output
    pub error: Option<String>,
    pub metadata: HashMap<String, Value>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            metadata: HashMap::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(message.into()),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Text handed back to the model either way
    pub fn content(&self) -> &str {
        if self.success {
            &self.output
        } else {
            self.error.as_deref().unwrap_or("Unknown error")
        }
    }
}

/// Tool interface
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier used by the registry
    fn name(&self) -> &str;

    fn meta(&self) -> ToolMeta;

    /// JSON schema of the input object
    fn schema(&self) -> Value;

    /// Run the tool.
    ///
    /// `Err` is reserved for infrastructure failures; problems the model
    /// should see come back as `ToolResult::error`.
    async fn execute(&self, input: Value, context: &dyn ToolContext) -> Result<ToolResult>;
}

/// Environment a tool runs in
pub trait ToolContext: Send + Sync {
    fn working_dir(&self) -> &Path;

    /// Name of the agent invoking the tool
    fn agent_name(&self) -> &str;

    fn env(&self) -> &HashMap<String, String>;
}

/// Plain `ToolContext`
#[derive(Debug, Clone)]
pub struct ToolExecutionContext {
    working_dir: PathBuf,
    agent_name: String,
    env: HashMap<String, String>,
}

impl ToolExecutionContext {
    pub fn new(working_dir: impl Into<PathBuf>, agent_name: impl Into<String>) -> Self {
        Self {
            working_dir: working_dir.into(),
            agent_name: agent_name.into(),
            env: HashMap::new(),
        }
    }

    /// Current directory, invoked by agent 0
    pub fn current() -> Result<Self> {
        Ok(Self::new(std::env::current_dir()?, "agent_0"))
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

impl ToolContext for ToolExecutionContext {
    fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn env(&self) -> &HashMap<String, String> {
        &self.env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_content() {
        assert_eq!(ToolResult::success("done").content(), "done");
        let failed = ToolResult::error("nope");
        assert!(!failed.success);
        assert_eq!(failed.content(), "nope");
    }

    #[test]
    fn test_meta_builder() {
        let meta = ToolMeta::new("agent")
            .display_name("Agent")
            .description("Delegate work")
            .category("delegation");
        assert_eq!(meta.name, "agent");
        assert_eq!(meta.display_name, "Agent");
        assert_eq!(meta.category, "delegation");
    }
}
