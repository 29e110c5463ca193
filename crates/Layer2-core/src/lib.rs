//! crew-core: Core runtime for Crew
//!
//! Layer2 - everything needed to run a single agent
//!
//! # Modules
//!
//! - `tool`: `ToolRegistry`, the per-agent tool map
//! - `model`: `ModelClient` seam, `MockClient`, model specs and factories
//! - `agent`: `CoreAgent` and the `AgentRunner` that drives model/tool rounds
//!
//! # Example
//!
//! ```ignore
//! use crew_core::{CoreAgent, MockClient, ModelRunner, AgentRunner, RunRequest, ToolRegistry};
//!
//! let agent = CoreAgent::new(Arc::new(MockClient::echo()), "mock", ToolRegistry::new())
//!     .with_prompt("You are a coder agent");
//!
//! let output = ModelRunner::new(".")
//!     .run(&agent, RunRequest { input: "hi".into(), ..Default::default() })
//!     .await?;
//! ```

pub mod agent;
pub mod model;
pub mod tool;

// Agent
pub use agent::{AgentRunner, CoreAgent, CostTracker, ModelRunner, RunRequest};

// Model
pub use model::{
    Completion, CompletionRequest, MockClient, MockModelFactory, ModelClient, ModelFactory,
    ModelSpec, ToolCall,
};

// Tool
pub use tool::ToolRegistry;

// Re-export foundation types
pub use crew_foundation::{
    Error, Result, Tool, ToolContext, ToolExecutionContext, ToolMeta, ToolResult,
};
