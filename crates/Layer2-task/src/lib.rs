//! # crew-team
//!
//! Multi-agent team coordination for Crew.
//!
//! ## Features
//!
//! - Agent lifecycle: spawn from roles, register, stop
//! - Delegation sessions with timeouts and a work-completion check
//! - Shared memory backed by a durable `SharedStore`
//! - Coordination log and workspace events
//! - Agent-to-agent messaging, help requests and proposals
//! - Advisory file locks, change notices and agent status reports
//! - Task table with parallel execution
//! - Bounded task context per agent tier
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  agent_0 (parent CoreAgent)                  │
//! │   └── tools: agent, parallel_agents          │
//! │              │                               │
//! │              ▼                               │
//! │  Team ── DelegationSession ──► AgentRunner   │
//! │   ├── agents (coder, reviewer, ...)          │
//! │   ├── shared memory ──► SharedStore          │
//! │   ├── coordination log / workspace events    │
//! │   ├── messages                               │
//! │   └── tasks                                  │
//! └──────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod context;
pub mod notify;
pub mod roles;
pub mod team;
pub mod tool;
pub mod types;

// Team
pub use team::{
    mentions_work, workspace_context, DelegationSession, ParallelCall, SharedValue, Team,
    TeamBuilder, WorkCheck, FILE_CHANGE_LIMIT, MESSAGE_CHANNEL_CAPACITY, ORCHESTRATOR,
    RECENT_WINDOW, WORKSPACE_EVENTS_KEY, WORKSPACE_EVENT_LIMIT,
};

// Members and roles
pub use agent::{Agent, AgentInfo};
pub use roles::{
    curated_tools, default_prompt, load_role_file, load_roles, RoleConfig, DELEGATION_TOOLS,
};

// Records
pub use types::{
    event_types, AgentStatus, CoordinationEvent, DetailedAgentStatus, EventMetadata, FileChange,
    FileLock, GlobalMetrics, LockType, Message, StatusChange, Task, TaskRequest, TaskStatus,
    WorkState, WorkspaceEvent,
};

// Context
pub use context::{
    ContextCompressor, ContextTier, ProjectSummary, ProjectSummaryCache, CONTEXT_SENTINEL,
};

// Narration
pub use notify::{CommLog, Notifier, COMM_LOG_FILE};

// Tools
pub use tool::{install_delegation_tools, AgentTool, ParallelAgentsTool};
