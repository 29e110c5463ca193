//! Collaboration aids - advisory file locks, change notices and status reports
//!
//! Locks are advisory. Nothing stops an agent from touching a locked path,
//! but a conflicting `acquire_file_lock` fails until the holder releases
//! the lock or it expires. Reads share a path; a write excludes other
//! writes; an exclusive lock excludes everything.

use super::Team;
use crate::types::{
    event_types, DetailedAgentStatus, EventMetadata, FileChange, FileLock, GlobalMetrics,
    LockType, StatusChange, TaskStatus, WorkState,
};
use chrono::Utc;
use crew_foundation::{display_duration, Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Change notices kept in memory, oldest dropped first
pub const FILE_CHANGE_LIMIT: usize = 200;

impl Team {
    // ========================================================================
    // File locks
    // ========================================================================

    /// Take a lock on `path` for `duration`. An agent asking again for a
    /// path it already holds replaces its own lock.
    pub fn acquire_file_lock(
        &self,
        agent: &str,
        path: &str,
        lock_type: LockType,
        duration: Duration,
    ) -> Result<FileLock> {
        let ttl = chrono::Duration::from_std(duration)
            .map_err(|e| Error::InvalidInput(format!("lock duration: {}", e)))?;
        let now = Utc::now();
        let lock = FileLock {
            file_path: path.to_string(),
            agent_id: agent.to_string(),
            lock_type,
            acquired_at: now,
            expires_at: now + ttl,
        };

        {
            let mut state = self.state.write();
            let held = state.file_locks.entry(path.to_string()).or_default();
            held.retain(|l| l.is_live(now));
            if let Some(blocking) = held
                .iter()
                .find(|l| l.agent_id != agent && l.lock_type.conflicts_with(lock_type))
            {
                return Err(Error::FileLocked {
                    path: path.to_string(),
                    lock_type: blocking.lock_type.to_string(),
                    holder: blocking.agent_id.clone(),
                });
            }
            held.retain(|l| l.agent_id != agent);
            held.push(lock.clone());
        }

        self.log_coordination_event(
            event_types::FILE_LOCKED,
            agent,
            "*",
            path,
            EventMetadata::Json {
                data: json!({
                    "file_path": path,
                    "lock_type": lock_type,
                    "duration": display_duration(&duration),
                }),
            },
        );
        info!("🔒 {} took a {} lock on {}", agent, lock_type, path);
        Ok(lock)
    }

    /// Drop `agent`'s lock on `path`
    pub fn release_file_lock(&self, agent: &str, path: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            let now = Utc::now();
            let held = state
                .file_locks
                .get_mut(path)
                .filter(|held| held.iter().any(|l| l.is_live(now)))
                .ok_or_else(|| Error::NotFound(format!("no lock found for file {}", path)))?;

            let before = held.len();
            held.retain(|l| l.agent_id != agent);
            if held.len() == before {
                let holder = held
                    .iter()
                    .map(|l| l.agent_id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(Error::InvalidInput(format!(
                    "lock on {} is owned by agent {}",
                    path, holder
                )));
            }
            if held.is_empty() {
                state.file_locks.remove(path);
            }
        }

        self.log_coordination_event(
            event_types::FILE_UNLOCKED,
            agent,
            "*",
            path,
            EventMetadata::Json {
                data: json!({ "file_path": path }),
            },
        );
        debug!("🔓 {} released {}", agent, path);
        Ok(())
    }

    /// Unexpired locks, by path
    pub fn file_locks(&self) -> Vec<FileLock> {
        let now = Utc::now();
        let mut locks: Vec<FileLock> = self
            .state
            .read()
            .file_locks
            .values()
            .flatten()
            .filter(|l| l.is_live(now))
            .cloned()
            .collect();
        locks.sort_by(|a, b| {
            a.file_path
                .cmp(&b.file_path)
                .then(a.acquired_at.cmp(&b.acquired_at))
        });
        locks
    }

    // ========================================================================
    // Change notices
    // ========================================================================

    /// Record that `agent` changed `path` and tell the rest of the team
    pub fn notify_file_change(
        &self,
        agent: &str,
        path: &str,
        change_type: &str,
        metadata: HashMap<String, Value>,
    ) -> FileChange {
        let change = FileChange {
            file_path: path.to_string(),
            agent_id: agent.to_string(),
            change_type: change_type.to_string(),
            timestamp: Utc::now(),
            metadata,
        };

        {
            let mut state = self.state.write();
            state.file_changes.push(change.clone());
            if state.file_changes.len() > FILE_CHANGE_LIMIT {
                let excess = state.file_changes.len() - FILE_CHANGE_LIMIT;
                state.file_changes.drain(..excess);
            }
        }

        self.log_coordination_event(
            event_types::FILE_CHANGED,
            agent,
            "*",
            &format!("{} {}", change_type, path),
            EventMetadata::Json {
                data: json!({
                    "file_path": path,
                    "change_type": change_type,
                    "metadata": change.metadata,
                }),
            },
        );

        if !self.quiet() {
            let mut data = change.metadata.clone();
            data.insert("file_path".to_string(), Value::from(path));
            data.insert("change_type".to_string(), Value::from(change_type));
            self.publish_workspace_event(
                agent,
                event_types::FILE_CHANGED,
                &format!("{} {}", change_type, path),
                data,
            );
        }
        change
    }

    /// Change notices, oldest first; `Some(path)` narrows to one file
    pub fn file_changes(&self, path: Option<&str>) -> Vec<FileChange> {
        self.state
            .read()
            .file_changes
            .iter()
            .filter(|c| path.map_or(true, |p| c.file_path == p))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Status reports
    // ========================================================================

    /// Replace `agent`'s status report. Progress is clamped to `0.0..=1.0`.
    pub fn update_detailed_agent_status(
        &self,
        agent: &str,
        status: WorkState,
        current_task: &str,
        progress: f64,
        dependencies: Vec<String>,
        dependents: Vec<String>,
    ) -> DetailedAgentStatus {
        let now = Utc::now();
        let progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        let report = DetailedAgentStatus {
            agent_id: agent.to_string(),
            status,
            current_task: current_task.to_string(),
            task_progress: progress,
            dependencies,
            dependents,
            last_activity: now,
        };

        {
            let mut state = self.state.write();
            let old_status = state.detailed_status.get(agent).map(|r| r.status);
            if old_status != Some(status) {
                state.status_history.push(StatusChange {
                    agent_id: agent.to_string(),
                    old_status,
                    new_status: status,
                    timestamp: now,
                });
            }
            state
                .detailed_status
                .insert(agent.to_string(), report.clone());
        }

        self.log_coordination_event(
            event_types::STATUS_UPDATE,
            agent,
            "*",
            &format!("Status changed to {}", status),
            EventMetadata::Json {
                data: json!({
                    "status": status,
                    "current_task": current_task,
                    "progress": progress,
                }),
            },
        );
        report
    }

    pub fn detailed_agent_status(&self, agent: &str) -> Result<DetailedAgentStatus> {
        self.state
            .read()
            .detailed_status
            .get(agent)
            .cloned()
            .ok_or_else(|| Error::AgentNotFound(agent.to_string()))
    }

    pub fn all_agent_statuses(&self) -> HashMap<String, DetailedAgentStatus> {
        self.state.read().detailed_status.clone()
    }

    /// Status transitions, oldest first; `Some(agent)` narrows to one agent
    pub fn status_history(&self, agent: Option<&str>) -> Vec<StatusChange> {
        self.state
            .read()
            .status_history
            .iter()
            .filter(|c| agent.map_or(true, |a| c.agent_id == a))
            .cloned()
            .collect()
    }

    /// Rollup of the status reports and the task table as of now
    pub fn global_metrics(&self) -> GlobalMetrics {
        let state = self.state.read();
        let mut metrics = GlobalMetrics {
            total_agents: state.detailed_status.len(),
            last_update: Some(Utc::now()),
            ..Default::default()
        };

        for report in state.detailed_status.values() {
            match report.status {
                WorkState::Working | WorkState::Collaborating => metrics.active_agents += 1,
                WorkState::Idle => metrics.idle_agents += 1,
                WorkState::Blocked | WorkState::Waiting => metrics.blocked_agents += 1,
                WorkState::Error => {}
            }
            if report.dependents.len() > 1 {
                metrics.bottlenecks.push(report.agent_id.clone());
            }
        }
        metrics.bottlenecks.sort();

        for task in state.tasks.values() {
            match task.status {
                TaskStatus::Completed => metrics.completed_tasks += 1,
                TaskStatus::Failed => metrics.failed_tasks += 1,
                TaskStatus::Assigned | TaskStatus::Running => metrics.pending_tasks += 1,
            }
        }

        if metrics.total_agents > 0 {
            metrics.system_efficiency = metrics.active_agents as f64 / metrics.total_agents as f64;
        }
        metrics
    }
}
