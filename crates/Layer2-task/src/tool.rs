//! Delegation Tools - how the orchestrator hands work to team members
//!
//! ## Tools
//!
//! - `agent` - delegate one task to a named agent (spawned on first use)
//! - `parallel_agents` - delegate several tasks at once
//!
//! ## Example
//!
//! ```ignore
//! agent.execute(json!({
//!     "agent": "coder",
//!     "input": "create hello.py that prints hi"
//! }), &ctx).await;
//!
//! parallel_agents.execute(json!({
//!     "tasks": [
//!         { "agent": "coder", "input": "write the API" },
//!         { "role": "writer", "task": "document the API" }
//!     ]
//! }), &ctx).await;
//! ```
//!
//! Both tools hold a weak handle to the team so the parent agent that owns
//! them never keeps the team alive. Spawned agents never receive them.

use crate::team::{ParallelCall, Team};
use async_trait::async_trait;
use crew_foundation::{Result, Tool, ToolContext, ToolMeta, ToolResult};
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tracing::info;

const AGENT_KEYS: &[&str] = &["agent", "role"];
const INPUT_KEYS: &[&str] = &["input", "task", "message", "query", "instructions"];

/// First non-empty string among `keys`
fn first_string(input: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| input.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn team_gone() -> ToolResult {
    ToolResult::error("team is no longer available")
}

/// Register `agent` and `parallel_agents` on the team's parent agent
pub fn install_delegation_tools(team: &Arc<Team>) {
    let handle = Arc::downgrade(team);
    team.parent()
        .add_tool(Arc::new(AgentTool::new(handle.clone())));
    team.parent()
        .add_tool(Arc::new(ParallelAgentsTool::new(handle)));
    info!("Delegation tools installed for team {}", team.name());
}

// ============================================================================
// agent
// ============================================================================

pub struct AgentTool {
    team: Weak<Team>,
}

impl AgentTool {
    pub const NAME: &'static str = "agent";

    pub fn new(team: Weak<Team>) -> Self {
        Self { team }
    }
}

#[async_trait]
impl Tool for AgentTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .display_name("Agent")
            .description("Delegate work to another agent")
            .category("delegation")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agent": {
                    "type": "string",
                    "description": "Agent name (e.g. coder, reviewer, writer). Spawned on first use."
                },
                "role": {
                    "type": "string",
                    "description": "Alias for 'agent'"
                },
                "input": {
                    "type": "string",
                    "description": "The task for the agent"
                },
                "task": {
                    "type": "string",
                    "description": "Alias for 'input'"
                },
                "message": {
                    "type": "string",
                    "description": "Alias for 'input'"
                },
                "query": {
                    "type": "string",
                    "description": "Alias for 'input'"
                },
                "instructions": {
                    "type": "string",
                    "description": "Alias for 'input'"
                }
            },
            "required": []
        })
    }

    async fn execute(&self, input: Value, _context: &dyn ToolContext) -> Result<ToolResult> {
        let Some(agent) = first_string(&input, AGENT_KEYS) else {
            return Ok(ToolResult::error("agent name is required (use 'agent' or 'role')"));
        };
        let Some(task) = first_string(&input, INPUT_KEYS) else {
            return Ok(ToolResult::error(
                "input is required (use 'input', 'task', 'message', 'query', or 'instructions')",
            ));
        };
        let Some(team) = self.team.upgrade() else {
            return Ok(team_gone());
        };

        Ok(match team.call(&agent, &task).await {
            Ok(result) => ToolResult::success(result).with_metadata("agent", json!(agent)),
            Err(e) => ToolResult::error(e.to_string()).with_metadata("agent", json!(agent)),
        })
    }
}

// ============================================================================
// parallel_agents
// ============================================================================

pub struct ParallelAgentsTool {
    team: Weak<Team>,
}

impl ParallelAgentsTool {
    pub const NAME: &'static str = "parallel_agents";

    pub fn new(team: Weak<Team>) -> Self {
        Self { team }
    }
}

#[async_trait]
impl Tool for ParallelAgentsTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn meta(&self) -> ToolMeta {
        ToolMeta::new(Self::NAME)
            .display_name("Parallel Agents")
            .description("Delegate several independent tasks to agents at the same time")
            .category("delegation")
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "description": "Tasks to run concurrently. The first failure cancels the rest.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "agent": { "type": "string", "description": "Agent name" },
                            "role": { "type": "string", "description": "Alias for 'agent'" },
                            "input": { "type": "string", "description": "The task" },
                            "task": { "type": "string", "description": "Alias for 'input'" }
                        }
                    }
                }
            },
            "required": ["tasks"]
        })
    }

    async fn execute(&self, input: Value, _context: &dyn ToolContext) -> Result<ToolResult> {
        let Some(items) = input.get("tasks").and_then(Value::as_array) else {
            return Ok(ToolResult::error("tasks must be an array"));
        };
        let calls: Vec<ParallelCall> = items
            .iter()
            .map(|item| {
                ParallelCall::new(
                    first_string(item, AGENT_KEYS).unwrap_or_default(),
                    first_string(item, &INPUT_KEYS[..2]).unwrap_or_default(),
                )
            })
            .collect();
        let Some(team) = self.team.upgrade() else {
            return Ok(team_gone());
        };

        Ok(match team.call_parallel(&calls).await {
            Ok(report) => ToolResult::success(report).with_metadata("tasks", json!(calls.len())),
            Err(e) => ToolResult::error(e.to_string()),
        })
    }
}
