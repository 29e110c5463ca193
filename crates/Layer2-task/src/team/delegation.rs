//! Delegation session - one `Team::call` from start to classified outcome
//!
//! ```text
//!   start ─► ensure agent ─► working ─► context ─► run (deadline | cancel)
//!                                                      │
//!          ┌───────────────┬───────────────────────────┼───────────────┐
//!          ▼               ▼                           ▼               ▼
//!       success     timeout + work            timeout, no work       error
//!     Ok(result)    Ok(completion note)   Err(DelegationTimeout)  Err(DelegationFailed)
//! ```
//!
//! Every outcome lands in the coordination log. Timeouts leave the agent
//! `ready`; runner errors leave it in `error`.

use super::{Team, ORCHESTRATOR};
use crate::agent::Agent;
use crate::types::{event_types, AgentStatus, EventMetadata};
use crew_core::RunRequest;
use crew_foundation::{display_duration, Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

enum Outcome {
    Completed(String),
    DeadlineExceeded,
    Cancelled,
    Failed(Error),
}

/// A single delegation of `input` to the agent named `agent`
pub struct DelegationSession<'a> {
    team: &'a Team,
    agent: String,
    input: String,
    timeout: Duration,
    cancel: CancellationToken,
}

impl<'a> DelegationSession<'a> {
    pub fn new(team: &'a Team, agent: &str, input: &str) -> Self {
        Self {
            team,
            agent: agent.trim().to_string(),
            input: input.to_string(),
            timeout: team.settings().delegation_timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Override the team's delegation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(self) -> Result<String> {
        self.start();

        let agent = self.ensure_agent()?;
        agent.set_status(AgentStatus::Working);
        self.team
            .notifier()
            .notify(&format!("🚀 {} agent working on task...\n", self.agent));
        self.team.comm_log().record(&format!(
            "DELEGATION: Agent 0 -> {} | Task: {}",
            self.agent, self.input
        ));

        let prompt = self.build_prompt();
        let deadline = Instant::now() + self.timeout;

        if !self.team.quiet() {
            let mut data = HashMap::new();
            data.insert("agent".to_string(), Value::from(self.agent.as_str()));
            data.insert(
                "timeout".to_string(),
                Value::from(display_duration(&self.timeout)),
            );
            self.team.publish_workspace_event(
                ORCHESTRATOR,
                event_types::DELEGATION_STARTED,
                &format!("Delegated to {}", self.agent),
                data,
            );
        }

        let outcome = self.execute(&agent, prompt, deadline).await;
        self.finish(&agent, outcome)
    }

    fn start(&self) {
        self.team
            .notifier()
            .notify(&format!("🔄 Delegating to {} agent...\n", self.agent));
        self.team.log_coordination_event(
            event_types::DELEGATION,
            ORCHESTRATOR,
            &self.agent,
            &self.input,
            EventMetadata::Delegation {
                task_length: self.input.len(),
                agent_type: self.agent.clone(),
            },
        );
    }

    fn ensure_agent(&self) -> Result<Arc<Agent>> {
        if self.team.get_agent(&self.agent).is_none() {
            self.team
                .notifier()
                .notify(&format!("🆕 Creating {} agent...\n", self.agent));
        }

        let (agent, created) = self
            .team
            .ensure_agent(&self.agent)
            .map_err(|e| Error::spawn_failed(&self.agent, e.to_string()))?;

        if created {
            self.team
                .notifier()
                .notify(&format!("✅ {} agent ready\n", self.agent));
        }
        Ok(agent)
    }

    /// Task text plus recent workspace events and unread messages, wrapped
    /// by the context compressor
    fn build_prompt(&self) -> String {
        let mut augmented = self.input.clone();
        augmented.push_str(&self.team.workspace_context());
        augmented.push_str(&self.team.take_inbox_context(&self.agent));
        self.team.compressor().wrap(&augmented, &self.agent)
    }

    async fn execute(&self, agent: &Agent, prompt: String, deadline: Instant) -> Outcome {
        let request = RunRequest {
            input: prompt,
            agent_name: self.agent.clone(),
            peers: self.team.agent_names(),
            deadline: Some(deadline),
        };
        let runner = Arc::clone(self.team.runner());
        let core = Arc::clone(agent.core());

        tokio::select! {
            result = runner.run(&core, request) => match result {
                Ok(output) => Outcome::Completed(output),
                Err(Error::Timeout(_)) => Outcome::DeadlineExceeded,
                Err(Error::Cancelled) => Outcome::Cancelled,
                Err(e) => Outcome::Failed(e),
            },
            _ = tokio::time::sleep_until(deadline) => Outcome::DeadlineExceeded,
            _ = self.cancel.cancelled() => Outcome::Cancelled,
        }
    }

    fn finish(&self, agent: &Agent, outcome: Outcome) -> Result<String> {
        match outcome {
            Outcome::Completed(result) => self.on_success(agent, result),
            Outcome::DeadlineExceeded | Outcome::Cancelled
                if self.team.work_check().work_completed(&self.input) =>
            {
                self.on_work_after_timeout(agent)
            }
            Outcome::DeadlineExceeded => Err(self.on_timeout(
                agent,
                Error::DelegationTimeout {
                    agent: self.agent.clone(),
                    timeout: self.timeout,
                },
            )),
            Outcome::Cancelled => Err(self.on_timeout(agent, Error::Cancelled)),
            Outcome::Failed(e) => Err(self.on_failure(agent, e)),
        }
    }

    fn on_success(&self, agent: &Agent, result: String) -> Result<String> {
        agent.set_status(AgentStatus::Ready);
        self.team
            .notifier()
            .notify(&format!("✅ {} agent completed task\n", self.agent));
        self.team.log_coordination_event(
            event_types::DELEGATION_SUCCESS,
            &self.agent,
            ORCHESTRATOR,
            "Task completed",
            EventMetadata::DelegationSuccess {
                result_length: result.len(),
                agent_type: self.agent.clone(),
            },
        );

        self.team
            .set_shared_data(&format!("last_result_{}", self.agent), result.as_str());
        self.team
            .set_shared_data(&format!("last_task_{}", self.agent), self.input.as_str());
        info!("Delegation to {} completed ({} bytes)", self.agent, result.len());
        Ok(result)
    }

    fn on_work_after_timeout(&self, agent: &Agent) -> Result<String> {
        let timeout = display_duration(&self.timeout);
        agent.set_status(AgentStatus::Ready);
        self.team.notifier().notify(&format!(
            "✅ {} agent completed work successfully (response timed out)\n",
            self.agent
        ));
        self.team.log_coordination_event(
            event_types::DELEGATION_SUCCESS_TIMEOUT,
            &self.agent,
            ORCHESTRATOR,
            "Task completed (response timed out but work was done)",
            EventMetadata::CompletedAfterTimeout {
                timeout: timeout.clone(),
            },
        );
        info!("Delegation to {} timed out after producing work", self.agent);
        Ok(format!(
            "✅ {} agent completed the work successfully (response generation timed out after {} but files were created)",
            self.agent, timeout
        ))
    }

    fn on_timeout(&self, agent: &Agent, err: Error) -> Error {
        agent.set_status(AgentStatus::Ready);
        self.team.notifier().notify(&format!(
            "⏳ {} agent timed out without completing work\n",
            self.agent
        ));
        self.team.log_coordination_event(
            event_types::DELEGATION_TIMEOUT,
            &self.agent,
            ORCHESTRATOR,
            &err.to_string(),
            EventMetadata::None,
        );

        if !self.team.quiet() {
            let mut data = HashMap::new();
            data.insert("agent".to_string(), Value::from(self.agent.as_str()));
            self.team.publish_workspace_event(
                ORCHESTRATOR,
                event_types::DELEGATION_TIMEOUT,
                &format!("Delegation to {} timed out", self.agent),
                data,
            );
        }
        warn!("Delegation to {} ended without a result: {}", self.agent, err);
        err
    }

    fn on_failure(&self, agent: &Agent, err: Error) -> Error {
        agent.set_status(AgentStatus::Error);
        let message = err.to_string();
        self.team.comm_log().record(&format!(
            "DELEGATION FAILED: {} | Error: {}",
            self.agent, message
        ));
        self.team.log_coordination_event(
            event_types::DELEGATION_FAILED,
            &self.agent,
            ORCHESTRATOR,
            &message,
            EventMetadata::DelegationFailed {
                error: message.clone(),
            },
        );
        debug!("Delegation to {} failed: {}", self.agent, message);
        Error::delegation_failed(&self.agent, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Notifier;
    use async_trait::async_trait;
    use crew_core::{AgentRunner, CoreAgent, MockClient, ToolRegistry};
    use crew_foundation::{ContextSettings, CrewSettings};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// Runner that sleeps, then answers or fails
    struct SlowRunner {
        delay: Duration,
        fail: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl SlowRunner {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fail: None,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentRunner for SlowRunner {
        async fn run(&self, _agent: &CoreAgent, request: RunRequest) -> Result<String> {
            self.prompts.lock().push(request.input.clone());
            tokio::time::sleep(self.delay).await;
            match &self.fail {
                Some(message) => Err(Error::Agent(message.clone())),
                None => Ok(format!("done by {}", request.agent_name)),
            }
        }
    }

    struct Fixture {
        team: Arc<Team>,
        runner: Arc<SlowRunner>,
        lines: Arc<Mutex<Vec<String>>>,
        dir: TempDir,
    }

    fn fixture(runner: SlowRunner, timeout: Duration) -> Fixture {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(runner);
        let (notifier, lines) = Notifier::capture();
        let settings = CrewSettings {
            delegation_timeout: timeout,
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
        let team = Team::builder("session", parent)
            .settings(settings)
            .without_store()
            .runner(runner.clone())
            .work_dir(dir.path())
            .notifier(notifier)
            .build()
            .unwrap();
        Fixture {
            team,
            runner,
            lines,
            dir,
        }
    }

    fn event_types_of(team: &Team) -> Vec<String> {
        team.coordination_events()
            .into_iter()
            .map(|e| e.event_type)
            .filter(|t| t != "shared_memory_update" && t != "workspace_event")
            .collect()
    }

    #[tokio::test]
    async fn test_success_path() {
        let fx = fixture(SlowRunner::new(Duration::ZERO), Duration::from_secs(5));

        let result = fx.team.call("coder", "write main.go").await.unwrap();
        assert_eq!(result, "done by coder");
        assert_eq!(
            event_types_of(&fx.team),
            vec!["delegation", "delegation_success"]
        );

        let agent = fx.team.get_agent("coder").unwrap();
        assert_eq!(agent.status(), AgentStatus::Ready);
        assert_eq!(
            fx.team.get_shared_data("last_result_coder").unwrap().as_text(),
            Some("done by coder")
        );
        assert_eq!(
            fx.team.get_shared_data("last_task_coder").unwrap().as_text(),
            Some("write main.go")
        );

        let lines = fx.lines.lock().clone();
        assert_eq!(
            lines,
            vec![
                "🔄 Delegating to coder agent...\n",
                "🆕 Creating coder agent...\n",
                "✅ coder agent ready\n",
                "🚀 coder agent working on task...\n",
                "✅ coder agent completed task\n",
            ]
        );
    }

    #[tokio::test]
    async fn test_reuses_existing_agent() {
        let fx = fixture(SlowRunner::new(Duration::ZERO), Duration::from_secs(5));
        fx.team.call("coder", "one").await.unwrap();
        let id = fx.team.get_agent("coder").unwrap().id.clone();
        fx.team.call("coder", "two").await.unwrap();

        assert_eq!(fx.team.list_agents().len(), 1);
        assert_eq!(fx.team.get_agent("coder").unwrap().id, id);
        let creates = fx
            .lines
            .lock()
            .iter()
            .filter(|l| l.starts_with("🆕"))
            .count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_timeout_without_work() {
        let fx = fixture(SlowRunner::new(Duration::from_secs(5)), Duration::from_millis(50));

        let err = fx.team.call("analyst", "Analyze reports").await.unwrap_err();
        assert!(matches!(err, Error::DelegationTimeout { .. }));
        assert!(err.to_string().contains("timed out after 50ms"));

        let types = event_types_of(&fx.team);
        assert_eq!(types, vec!["delegation", "delegation_timeout"]);
        assert_eq!(
            fx.team.get_agent("analyst").unwrap().status(),
            AgentStatus::Ready
        );
        let workspace = fx.team.workspace_events(0);
        assert_eq!(workspace.last().unwrap().event_type, "delegation_timeout");
    }

    #[tokio::test]
    async fn test_timeout_with_work_is_success() {
        let fx = fixture(SlowRunner::new(Duration::from_secs(5)), Duration::from_millis(50));
        std::fs::write(fx.dir.path().join("hello.py"), "print('hi')").unwrap();

        let result = fx
            .team
            .call("coder", "create a hello world script")
            .await
            .unwrap();
        assert_eq!(
            result,
            "✅ coder agent completed the work successfully (response generation timed out after 50ms but files were created)"
        );
        assert_eq!(
            event_types_of(&fx.team),
            vec!["delegation", "delegation_success_timeout"]
        );
    }

    #[tokio::test]
    async fn test_runner_error_sets_error_status() {
        let runner = SlowRunner {
            fail: Some("model exploded".into()),
            ..SlowRunner::new(Duration::ZERO)
        };
        let fx = fixture(runner, Duration::from_secs(5));

        let err = fx.team.call("coder", "fix it").await.unwrap_err();
        assert!(matches!(err, Error::DelegationFailed { .. }));
        let text = err.to_string();
        assert!(text.starts_with("❌ Agent 'coder' encountered an error:"));
        assert!(text.contains("model exploded"));
        assert!(text.contains("Break the task into smaller steps"));

        assert_eq!(fx.team.get_agent("coder").unwrap().status(), AgentStatus::Error);
        let failed = fx.team.coordination_events().pop().unwrap();
        assert_eq!(failed.event_type, "delegation_failed");
        assert!(matches!(failed.metadata, EventMetadata::DelegationFailed { .. }));
    }

    #[tokio::test]
    async fn test_cancel_stops_run() {
        let fx = fixture(SlowRunner::new(Duration::from_secs(5)), Duration::from_secs(5));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = fx
            .team
            .call_with_cancel("analyst", "Analyze reports", cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_prompt_carries_inbox_and_workspace() {
        let fx = fixture(SlowRunner::new(Duration::ZERO), Duration::from_secs(5));
        fx.team.call("coder", "first").await.unwrap();
        fx.team.call("writer", "second").await.unwrap();
        fx.team
            .send_message("writer", "coder", "docs are in /docs")
            .unwrap();

        fx.team.call("coder", "third").await.unwrap();
        let prompts = fx.runner.prompts.lock().clone();
        let last = prompts.last().unwrap();
        assert!(last.starts_with("third\n\nRECENT WORKSPACE EVENTS:\n"));
        assert!(last.contains("agent_0 | delegation_started: Delegated to writer"));
        assert!(last.contains("INBOX CONTEXT (Unread Messages):\n"));
        assert!(last.contains("writer: docs are in /docs"));
        assert!(fx.team.unread_inbox("coder").is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_surfaces() {
        let fx = fixture(SlowRunner::new(Duration::ZERO), Duration::from_secs(5));
        let err = fx.team.call("   ", "anything").await.unwrap_err();
        assert!(matches!(err, Error::SpawnFailed { .. }));
        assert!(err.to_string().starts_with("failed to spawn agent"));
    }
}
