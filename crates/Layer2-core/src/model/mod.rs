//! Model clients
//!
//! `ModelClient` is the narrow seam to a language model. Real provider
//! clients live outside this workspace; `MockClient` backs tests and the CLI
//! demo mode, and is also the fallback when a role's model cannot be built.

mod mock;

pub use mock::MockClient;

use async_trait::async_trait;
use crew_foundation::{ChatMessage, Error, Result, TokenUsage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// One request to a model
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Tool definitions from `ToolRegistry::schemas`
    pub tools: Vec<Value>,
}

/// Tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Model reply
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    /// Empty when the model is done
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tool_call(mut self, name: impl Into<String>, input: Value) -> Self {
        let id = format!("call_{}", self.tool_calls.len() + 1);
        self.tool_calls.push(ToolCall {
            id,
            name: name.into(),
            input,
        });
        self
    }
}

/// Language model client
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Provider name, used in logs
    fn provider(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

/// Model selection from a role file
///
/// ```yaml
/// model:
///   provider: openai
///   options:
///     model: gpt-4o-mini
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub provider: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, String>,
}

impl ModelSpec {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            options: HashMap::new(),
        }
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// `provider/model`, as shown in logs and used for tokenizer selection
    pub fn display_name(&self) -> String {
        match self.options.get("model") {
            Some(model) => format!("{}/{}", self.provider, model),
            None => self.provider.clone(),
        }
    }
}

/// Builds clients from role model specs
pub trait ModelFactory: Send + Sync {
    fn create(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelClient>>;
}

/// Factory that only knows the `mock` provider
#[derive(Debug, Default, Clone, Copy)]
pub struct MockModelFactory;

impl ModelFactory for MockModelFactory {
    fn create(&self, spec: &ModelSpec) -> Result<Arc<dyn ModelClient>> {
        match spec.provider.as_str() {
            "mock" => Ok(Arc::new(MockClient::echo())),
            other => Err(Error::Config(format!("unsupported model provider: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_display_name() {
        let spec = ModelSpec::new("openai").option("model", "gpt-4o-mini");
        assert_eq!(spec.display_name(), "openai/gpt-4o-mini");
        assert_eq!(ModelSpec::new("mock").display_name(), "mock");
    }

    #[test]
    fn test_mock_factory() {
        let factory = MockModelFactory;
        assert!(factory.create(&ModelSpec::new("mock")).is_ok());
        assert!(matches!(
            factory.create(&ModelSpec::new("openai")),
            Err(Error::Config(_))
        ));
    }
}
