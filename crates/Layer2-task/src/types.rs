//! Team data types - agents, tasks, messages and event records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

// ============================================================================
// Status enums
// ============================================================================

/// Team member status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Starting,
    Ready,
    Working,
    Error,
    Stopping,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Starting => "starting",
            AgentStatus::Ready => "ready",
            AgentStatus::Working => "working",
            AgentStatus::Error => "error",
            AgentStatus::Stopping => "stopping",
        };
        f.write_str(s)
    }
}

/// Task lifecycle: assigned → running → completed | failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Assigned,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Event types
// ============================================================================

/// Coordination event type names
pub mod event_types {
    pub const DELEGATION: &str = "delegation";
    pub const DELEGATION_SUCCESS: &str = "delegation_success";
    pub const DELEGATION_SUCCESS_TIMEOUT: &str = "delegation_success_timeout";
    pub const DELEGATION_TIMEOUT: &str = "delegation_timeout";
    pub const DELEGATION_FAILED: &str = "delegation_failed";
    pub const DELEGATION_STARTED: &str = "delegation_started";
    pub const SHARED_MEMORY_UPDATE: &str = "shared_memory_update";
    pub const DIRECT_MESSAGE: &str = "direct_message";
    pub const WORKSPACE_EVENT: &str = "workspace_event";
    pub const HELP_REQUEST: &str = "help_request";
    pub const COLLABORATION_PROPOSAL: &str = "collaboration_proposal";
    pub const FILE_LOCKED: &str = "file_locked";
    pub const FILE_UNLOCKED: &str = "file_unlocked";
    pub const FILE_CHANGED: &str = "file_changed";
    pub const STATUS_UPDATE: &str = "status_update";
}

/// Metadata carried by a coordination event
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventMetadata {
    #[default]
    None,
    Delegation {
        task_length: usize,
        agent_type: String,
    },
    DelegationSuccess {
        result_length: usize,
        agent_type: String,
    },
    /// Timed out, but the work check found fresh files
    CompletedAfterTimeout {
        timeout: String,
    },
    DelegationFailed {
        error: String,
    },
    SharedMemory {
        key: String,
        value_type: String,
    },
    DirectMessage {
        message_type: String,
    },
    Workspace {
        event_type: String,
        data: HashMap<String, Value>,
    },
    /// Unstructured payload
    Json {
        data: Value,
    },
}

/// Immutable record of an orchestration action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinationEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub from: String,
    pub to: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl CoordinationEvent {
    /// `HH:MM:SS from -> to | content`
    pub fn history_line(&self) -> String {
        format!(
            "{} {} -> {} | {}",
            self.timestamp.format("%H:%M:%S"),
            self.from,
            self.to,
            self.content
        )
    }
}

/// Agent-observable change in the shared workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEvent {
    pub id: String,
    pub agent_id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, Value>,
}

// ============================================================================
// Messages and tasks
// ============================================================================

/// Agent-to-agent message; inboxes are views over the team's message list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
}

/// Unit of work run by one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub agent_id: String,
    pub input: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Input for `Team::execute_parallel_tasks`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Agent name
    pub agent_id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub input: String,
}

impl TaskRequest {
    pub fn new(
        agent_id: impl Into<String>,
        task_type: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            input: input.into(),
        }
    }
}

// ============================================================================
// Collaboration
// ============================================================================

/// Advisory lock kinds. Reads share; writes exclude other writes;
/// exclusive excludes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockType {
    Read,
    Write,
    Exclusive,
}

impl LockType {
    /// True when a live lock of kind `self` blocks a request for `other`
    pub fn conflicts_with(self, other: LockType) -> bool {
        matches!(
            (self, other),
            (LockType::Exclusive, _) | (_, LockType::Exclusive) | (LockType::Write, LockType::Write)
        )
    }
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockType::Read => "read",
            LockType::Write => "write",
            LockType::Exclusive => "exclusive",
        };
        f.write_str(s)
    }
}

/// Advisory lock on a workspace path, held until released or expired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileLock {
    pub file_path: String,
    pub agent_id: String,
    pub lock_type: LockType,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileLock {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// What an agent reported doing to a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    pub agent_id: String,
    /// created, modified, deleted, moved
    pub change_type: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

/// Self-reported activity, finer grained than `AgentStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkState {
    Idle,
    Working,
    Waiting,
    Blocked,
    Error,
    Collaborating,
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkState::Idle => "idle",
            WorkState::Working => "working",
            WorkState::Waiting => "waiting",
            WorkState::Blocked => "blocked",
            WorkState::Error => "error",
            WorkState::Collaborating => "collaborating",
        };
        f.write_str(s)
    }
}

/// Latest status report from one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedAgentStatus {
    pub agent_id: String,
    pub status: WorkState,
    pub current_task: String,
    /// 0.0 to 1.0
    pub task_progress: f64,
    /// Agents this one waits on
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Agents waiting on this one
    #[serde(default)]
    pub dependents: Vec<String>,
    pub last_activity: DateTime<Utc>,
}

/// One transition in the status history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub agent_id: String,
    /// `None` for an agent's first report
    pub old_status: Option<WorkState>,
    pub new_status: WorkState,
    pub timestamp: DateTime<Utc>,
}

/// Team-wide rollup of status reports and the task table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalMetrics {
    /// Agents that have reported a status
    pub total_agents: usize,
    /// Working or collaborating
    pub active_agents: usize,
    pub idle_agents: usize,
    /// Blocked or waiting
    pub blocked_agents: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub failed_tasks: usize,
    /// Active agents over reporting agents
    pub system_efficiency: f64,
    /// Agents with more than one dependent
    pub bottlenecks: Vec<String>,
    pub last_update: Option<DateTime<Utc>>,
}

// ============================================================================
// Ids
// ============================================================================

static LAST_NANOS: AtomicI64 = AtomicI64::new(0);

/// Wall-clock nanoseconds, strictly increasing within the process so
/// ids built from it never collide.
pub fn unique_nanos() -> i64 {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut last = LAST_NANOS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_NANOS.compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(current) => last = current,
        }
    }
}
