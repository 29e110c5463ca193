//! Core Module - shared interfaces and types
//!
//! - `types.rs`: chat messages and token usage passed between layers
//! - `traits.rs`: the `Tool` interface every delegation-visible action implements
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Layer4-CLI                                  │
//! ├──────────────────────────────────────────────┤
//! │  Layer2-task  (Team, delegation, AgentTool)  │
//! │  Layer2-core  (ToolRegistry, CoreAgent)      │
//! ├──────────────────────────────────────────────┤
//! │  Layer1-foundation (this layer)              │
//! │  ├── Tool / ToolContext traits               │
//! │  └── ChatMessage / TokenUsage                │
//! └──────────────────────────────────────────────┘
//! ```

mod traits;
mod types;

pub use traits::{Tool, ToolContext, ToolExecutionContext, ToolMeta, ToolResult};
pub use types::{ChatMessage, ChatRole, TokenUsage};
