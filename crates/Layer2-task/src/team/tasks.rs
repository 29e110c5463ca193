//! Task table and parallel execution
//!
//! Tasks move `assigned → running → completed | failed` and never leave a
//! terminal state. Parallel runs share one cancellation token: the first
//! failure cancels the rest, and each cancelled task fails once its
//! delegation has wound down.

use super::Team;
use crate::types::{AgentStatus, Task, TaskRequest, TaskStatus};
use chrono::Utc;
use crew_foundation::{display_duration, Error, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const TASK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// One entry of a `call_parallel` batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelCall {
    pub agent: String,
    pub input: String,
}

impl ParallelCall {
    pub fn new(agent: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            input: input.into(),
        }
    }
}

impl Team {
    // ========================================================================
    // Task table
    // ========================================================================

    fn new_task(&self, agent: &str, task_type: &str, input: &str) -> Task {
        let now = Utc::now();
        let task = Task {
            id: uuid::Uuid::new_v4().to_string(),
            task_type: task_type.to_string(),
            agent_id: agent.to_string(),
            input: input.to_string(),
            result: String::new(),
            status: TaskStatus::Assigned,
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        };
        self.state
            .write()
            .tasks
            .insert(task.id.clone(), task.clone());
        task
    }

    /// Move a task forward; terminal tasks are left alone
    fn update_task(&self, id: &str, status: TaskStatus, result: Option<String>) {
        let mut state = self.state.write();
        let Some(task) = state.tasks.get_mut(id) else {
            return;
        };
        if task.status.is_terminal() {
            return;
        }
        task.status = status;
        if let Some(result) = result {
            task.result = result;
        }
        task.updated_at = Utc::now();
    }

    pub fn get_task(&self, id: &str) -> Option<Task> {
        self.state.read().tasks.get(id).cloned()
    }

    /// All tasks, oldest first
    pub fn list_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.state.read().tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }

    /// Record a task for an existing member and run it in the background
    pub fn assign_task(&self, agent: &str, task_type: &str, input: &str) -> Result<Task> {
        let member = self
            .get_agent(agent)
            .ok_or_else(|| Error::AgentNotFound(agent.to_string()))?;
        let team = self.arc()?;
        let task = self.new_task(&member.name, task_type, input);

        let id = task.id.clone();
        let name = member.name.clone();
        let input = input.to_string();
        tokio::spawn(async move {
            team.update_task(&id, TaskStatus::Running, None);
            match team.call(&name, &input).await {
                Ok(result) => team.update_task(&id, TaskStatus::Completed, Some(result)),
                Err(e) => team.update_task(&id, TaskStatus::Failed, Some(e.to_string())),
            }
        });

        info!("Assigned {} task {} to {}", task.task_type, task.id, task.agent_id);
        Ok(task)
    }

    /// Assign to the first ready member
    pub fn coordinate_task(&self, task_type: &str, input: &str) -> Result<Task> {
        let agents = self.list_agents();
        if agents.is_empty() {
            return Err(Error::Agent("no agents available for coordination".to_string()));
        }
        let ready = agents
            .iter()
            .find(|a| a.status == AgentStatus::Ready)
            .ok_or_else(|| Error::Agent("no ready agents available".to_string()))?;
        self.assign_task(&ready.name, task_type, input)
    }

    /// Poll until the task is terminal or `timeout` passes
    pub async fn wait_for_task(&self, id: &str, timeout: Duration) -> Result<Task> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let task = self
                .get_task(id)
                .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;
            if task.status.is_terminal() {
                return Ok(task);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "task {} did not complete within timeout",
                    id
                )));
            }
            tokio::time::sleep(TASK_POLL_INTERVAL).await;
        }
    }

    // ========================================================================
    // Parallel execution
    // ========================================================================

    /// Run every request concurrently, cancelling the rest on the first
    /// failure. Every agent must already be a member. Returns the finished
    /// tasks in request order.
    pub async fn execute_parallel_tasks(&self, requests: Vec<TaskRequest>) -> Result<Vec<Task>> {
        self.run_task_batch(requests, CancellationToken::new()).await
    }

    /// `execute_parallel_tasks` under one deadline shared by the whole batch.
    /// When it passes, unfinished tasks are cancelled and fail.
    pub async fn execute_with_timeout(
        &self,
        requests: Vec<TaskRequest>,
        timeout: Duration,
    ) -> Result<Vec<Task>> {
        let cancel = CancellationToken::new();
        let batch = self.run_task_batch(requests, cancel.clone());
        tokio::pin!(batch);

        tokio::select! {
            outcome = &mut batch => outcome,
            _ = tokio::time::sleep(timeout) => {
                cancel.cancel();
                match batch.await {
                    Ok(tasks) => Ok(tasks),
                    Err(e) => {
                        warn!("Task batch hit its deadline: {}", e);
                        Err(Error::Timeout(format!(
                            "task batch did not complete within {}",
                            display_duration(&timeout)
                        )))
                    }
                }
            }
        }
    }

    async fn run_task_batch(
        &self,
        requests: Vec<TaskRequest>,
        cancel: CancellationToken,
    ) -> Result<Vec<Task>> {
        let members = requests
            .iter()
            .map(|r| {
                self.get_agent(&r.agent_id)
                    .ok_or_else(|| Error::AgentNotFound(r.agent_id.clone()))
            })
            .collect::<Result<Vec<_>>>()?;
        let tasks: Vec<Task> = requests
            .iter()
            .zip(&members)
            .map(|(r, member)| self.new_task(&member.name, &r.task_type, &r.input))
            .collect();

        // Every session runs to its own end so cancelled siblings settle
        // their agent status and log their outcome
        let runs = tasks.iter().map(|task| {
            let cancel = cancel.clone();
            async move {
                self.update_task(&task.id, TaskStatus::Running, None);
                match self
                    .call_with_cancel(&task.agent_id, &task.input, cancel.child_token())
                    .await
                {
                    Ok(result) => {
                        self.update_task(&task.id, TaskStatus::Completed, Some(result));
                        Ok(())
                    }
                    Err(e) => {
                        self.update_task(&task.id, TaskStatus::Failed, Some(e.to_string()));
                        cancel.cancel();
                        Err(e)
                    }
                }
            }
        });
        let outcomes = join_all(runs).await;

        if let Some(idx) = cause_index(&outcomes) {
            if let Some(Err(e)) = outcomes.into_iter().nth(idx) {
                warn!("Parallel task batch failed: {}", e);
                return Err(e);
            }
        }
        Ok(tasks
            .iter()
            .filter_map(|task| self.get_task(&task.id))
            .collect())
    }

    /// Delegate several tasks at once and combine the answers
    pub async fn call_parallel(&self, calls: &[ParallelCall]) -> Result<String> {
        if calls.is_empty() {
            return Err(Error::InvalidInput("no tasks provided".to_string()));
        }
        for (idx, call) in calls.iter().enumerate() {
            if call.agent.trim().is_empty() {
                return Err(Error::InvalidInput(format!(
                    "task {}: agent name is required",
                    idx
                )));
            }
            if call.input.is_empty() {
                return Err(Error::InvalidInput(format!("task {}: input is required", idx)));
            }
        }

        let cancel = CancellationToken::new();
        let runs = calls.iter().enumerate().map(|(idx, call)| {
            let cancel = cancel.clone();
            async move {
                let preview: String = call.input.chars().take(50).collect();
                debug!("🚀 Starting parallel task {}: {} -> {}", idx, call.agent, preview);
                let outcome = self
                    .call_with_cancel(&call.agent, &call.input, cancel.child_token())
                    .await;
                if outcome.is_err() {
                    cancel.cancel();
                }
                outcome
            }
        });
        let outcomes = join_all(runs).await;

        if let Some(idx) = cause_index(&outcomes) {
            if let Err(e) = &outcomes[idx] {
                return Err(Error::Task(format!(
                    "task {} ({}) failed: {}",
                    idx, calls[idx].agent, e
                )));
            }
        }
        let results: Vec<String> = outcomes.into_iter().filter_map(|o| o.ok()).collect();

        let sections: Vec<String> = calls
            .iter()
            .zip(results)
            .enumerate()
            .map(|(idx, (call, result))| {
                format!("**Agent {} ({}):**\n{}", idx + 1, call.agent, result)
            })
            .collect();
        debug!("✅ Parallel execution completed with {} agents", calls.len());
        Ok(format!(
            "📋 **Parallel Agent Execution Results:**\n\n{}",
            sections.join("\n\n---\n\n")
        ))
    }
}

/// Index of the failure that set a batch off. Siblings it cancelled only
/// report `Cancelled`, so those count last.
fn cause_index<T>(outcomes: &[Result<T>]) -> Option<usize> {
    outcomes
        .iter()
        .position(|o| matches!(o, Err(e) if !matches!(e, Error::Cancelled)))
        .or_else(|| outcomes.iter().position(|o| o.is_err()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use async_trait::async_trait;
    use crew_core::{AgentRunner, CoreAgent, MockClient, RunRequest, ToolRegistry};
    use crew_foundation::{ContextSettings, CrewSettings};
    use std::sync::Arc;

    /// Answers with the first prompt line after a short delay; `broken`
    /// fails and `slow` takes seconds
    struct TableRunner;

    #[async_trait]
    impl AgentRunner for TableRunner {
        async fn run(&self, _agent: &CoreAgent, request: RunRequest) -> Result<String> {
            match request.agent_name.as_str() {
                "broken" => Err(Error::Agent("no luck".into())),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok("slow done".into())
                }
                name => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    let task = request.input.lines().next().unwrap_or_default();
                    Ok(format!("{} says {}", name, task))
                }
            }
        }
    }

    fn team() -> Arc<Team> {
        let settings = CrewSettings {
            context: ContextSettings {
                disabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let parent = Arc::new(CoreAgent::new(
            Arc::new(MockClient::echo()),
            "mock",
            ToolRegistry::new(),
        ));
        Team::builder("tasks", parent)
            .settings(settings)
            .without_store()
            .runner(Arc::new(TableRunner))
            .work_dir(std::env::temp_dir().join("crew-tasks-none"))
            .notifier(Notifier::Silent)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_assign_and_wait() {
        let team = team();
        assert!(matches!(
            team.assign_task("coder", "code", "x"),
            Err(Error::AgentNotFound(_))
        ));

        team.spawn_agent("coder", "coder").await.unwrap();
        let task = team.assign_task("coder", "code", "write it").unwrap();
        assert_eq!(task.status, TaskStatus::Assigned);

        let done = team
            .wait_for_task(&task.id, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result, "coder says write it");
        assert_eq!(team.list_tasks().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_task_records_error() {
        let team = team();
        team.spawn_agent("broken", "broken").await.unwrap();
        let task = team.assign_task("broken", "code", "anything").unwrap();
        let done = team
            .wait_for_task(&task.id, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(done.status, TaskStatus::Failed);
        assert!(done.result.contains("no luck"));
    }

    #[tokio::test]
    async fn test_wait_for_unknown_and_timeout() {
        let team = team();
        assert!(matches!(
            team.wait_for_task("nope", Duration::from_millis(10)).await,
            Err(Error::TaskNotFound(_))
        ));

        team.spawn_agent("slow", "slow").await.unwrap();
        let task = team.assign_task("slow", "code", "wait").unwrap();
        let err = team
            .wait_for_task(&task.id, Duration::from_millis(150))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Timeout: task {} did not complete within timeout", task.id)
        );
    }

    #[tokio::test]
    async fn test_coordinate_task() {
        let team = team();
        let err = team.coordinate_task("code", "x").unwrap_err();
        assert!(err.to_string().contains("no agents available for coordination"));

        let agent = team.spawn_agent("coder", "coder").await.unwrap();
        agent.set_status(AgentStatus::Working);
        let err = team.coordinate_task("code", "x").unwrap_err();
        assert!(err.to_string().contains("no ready agents available"));

        agent.set_status(AgentStatus::Ready);
        let task = team.coordinate_task("code", "x").unwrap();
        assert_eq!(task.agent_id, "coder");
    }

    #[tokio::test]
    async fn test_parallel_tasks_complete() {
        let team = team();
        team.spawn_agent("coder", "coder").await.unwrap();
        team.spawn_agent("writer", "writer").await.unwrap();
        let tasks = team
            .execute_parallel_tasks(vec![
                TaskRequest::new("coder", "code", "a"),
                TaskRequest::new("writer", "docs", "b"),
            ])
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Completed));
        assert_eq!(tasks[1].result, "writer says b");
    }

    #[tokio::test]
    async fn test_parallel_tasks_require_members() {
        let team = team();
        team.spawn_agent("coder", "coder").await.unwrap();
        let err = team
            .execute_parallel_tasks(vec![
                TaskRequest::new("coder", "code", "a"),
                TaskRequest::new("ghost", "code", "b"),
            ])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "agent ghost not found");
        assert!(team.list_tasks().is_empty());
        assert!(team.get_agent("ghost").is_none());
    }

    #[tokio::test]
    async fn test_parallel_failure_cancels_rest() {
        let team = team();
        team.spawn_agent("slow", "slow").await.unwrap();
        team.spawn_agent("broken", "broken").await.unwrap();
        let started = tokio::time::Instant::now();
        let err = team
            .execute_parallel_tasks(vec![
                TaskRequest::new("slow", "code", "a"),
                TaskRequest::new("broken", "code", "b"),
            ])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no luck"));
        assert!(started.elapsed() < Duration::from_secs(4));

        let tasks = team.list_tasks();
        assert!(tasks.iter().all(|t| t.status == TaskStatus::Failed));
        let slow = tasks.iter().find(|t| t.agent_id == "slow").unwrap();
        assert_eq!(slow.result, "Cancelled");
    }

    #[tokio::test]
    async fn test_parallel_failure_settles_siblings() {
        let team = team();
        team.spawn_agent("slow", "slow").await.unwrap();
        team.spawn_agent("broken", "broken").await.unwrap();
        let _ = team
            .execute_parallel_tasks(vec![
                TaskRequest::new("slow", "code", "a"),
                TaskRequest::new("broken", "code", "b"),
            ])
            .await;

        assert_eq!(team.get_agent("slow").unwrap().status(), AgentStatus::Ready);
        assert_eq!(team.get_agent("broken").unwrap().status(), AgentStatus::Error);

        let outcomes: Vec<(String, String)> = team
            .coordination_events()
            .into_iter()
            .filter(|e| e.event_type.starts_with("delegation_"))
            .map(|e| (e.event_type, e.from))
            .collect();
        assert!(outcomes.contains(&("delegation_timeout".to_string(), "slow".to_string())));
        assert!(outcomes.contains(&("delegation_failed".to_string(), "broken".to_string())));

        let task = team.coordinate_task("code", "again").unwrap();
        assert_eq!(task.agent_id, "slow");
    }

    #[tokio::test]
    async fn test_batch_deadline() {
        let team = team();
        team.spawn_agent("slow", "slow").await.unwrap();
        team.spawn_agent("coder", "coder").await.unwrap();
        let started = tokio::time::Instant::now();
        let err = team
            .execute_with_timeout(
                vec![
                    TaskRequest::new("coder", "code", "quick"),
                    TaskRequest::new("slow", "code", "long"),
                ],
                Duration::from_millis(200),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Timeout: task batch did not complete within 200ms"
        );
        assert!(started.elapsed() < Duration::from_secs(4));

        let tasks = team.list_tasks();
        let quick = tasks.iter().find(|t| t.agent_id == "coder").unwrap();
        assert_eq!(quick.status, TaskStatus::Completed);
        let long = tasks.iter().find(|t| t.agent_id == "slow").unwrap();
        assert_eq!(long.status, TaskStatus::Failed);
        assert_eq!(team.get_agent("slow").unwrap().status(), AgentStatus::Ready);
    }

    #[tokio::test]
    async fn test_batch_within_deadline() {
        let team = team();
        team.spawn_agent("coder", "coder").await.unwrap();
        let tasks = team
            .execute_with_timeout(
                vec![TaskRequest::new("coder", "code", "quick")],
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(tasks[0].result, "coder says quick");
    }

    #[tokio::test]
    async fn test_call_parallel_report() {
        let team = team();
        let report = team
            .call_parallel(&[
                ParallelCall::new("coder", "one"),
                ParallelCall::new("writer", "two"),
            ])
            .await
            .unwrap();
        assert_eq!(
            report,
            "📋 **Parallel Agent Execution Results:**\n\n**Agent 1 (coder):**\ncoder says one\n\n---\n\n**Agent 2 (writer):**\nwriter says two"
        );
    }

    #[tokio::test]
    async fn test_call_parallel_validation() {
        let team = team();
        assert!(team
            .call_parallel(&[])
            .await
            .unwrap_err()
            .to_string()
            .contains("no tasks provided"));
        let err = team
            .call_parallel(&[ParallelCall::new("coder", "x"), ParallelCall::new("", "y")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("task 1: agent name is required"));
        let err = team
            .call_parallel(&[ParallelCall::new("coder", "")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("task 0: input is required"));
    }

    #[tokio::test]
    async fn test_call_parallel_failure_names_cause() {
        let team = team();
        let started = tokio::time::Instant::now();
        let err = team
            .call_parallel(&[
                ParallelCall::new("slow", "one"),
                ParallelCall::new("broken", "two"),
            ])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Task error: task 1 (broken) failed:"));
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(team.get_agent("slow").unwrap().status(), AgentStatus::Ready);
    }
}
