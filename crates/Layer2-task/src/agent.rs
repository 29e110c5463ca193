//! Team member - a `CoreAgent` plus identity and status

use crate::types::AgentStatus;
use chrono::{DateTime, Utc};
use crew_core::CoreAgent;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct StatusState {
    status: AgentStatus,
    last_seen: DateTime<Utc>,
}

/// Team-level wrapper around a runnable agent
///
/// Identity fields are fixed at creation; status has its own lock so
/// callers can flip it without holding the team lock.
#[derive(Debug)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: String,
    pub started_at: DateTime<Utc>,
    pub metadata: HashMap<String, String>,
    core: Arc<CoreAgent>,
    state: Mutex<StatusState>,
}

impl Agent {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        role: impl Into<String>,
        core: Arc<CoreAgent>,
        status: AgentStatus,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            role: role.into(),
            started_at: now,
            metadata: HashMap::new(),
            core,
            state: Mutex::new(StatusState {
                status,
                last_seen: now,
            }),
        }
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn core(&self) -> &Arc<CoreAgent> {
        &self.core
    }

    pub fn status(&self) -> AgentStatus {
        self.state.lock().status
    }

    /// Update status and touch `last_seen`
    pub fn set_status(&self, status: AgentStatus) {
        let mut state = self.state.lock();
        state.status = status;
        state.last_seen = Utc::now();
    }

    /// Flip `from` to `to` only if still in `from`
    pub fn transition(&self, from: AgentStatus, to: AgentStatus) -> bool {
        let mut state = self.state.lock();
        if state.status != from {
            return false;
        }
        state.status = to;
        state.last_seen = Utc::now();
        true
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        self.state.lock().last_seen
    }

    pub fn info(&self) -> AgentInfo {
        let state = self.state.lock();
        AgentInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            status: state.status,
            started_at: self.started_at,
            last_seen: state.last_seen,
            model: self.core.model_name().to_string(),
            tools: self.core.tool_names(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Serializable snapshot of a team member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub started_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub model: String,
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}
