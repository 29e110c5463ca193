//! Agent runner - drives model/tool rounds until the model answers

use super::CoreAgent;
use crate::model::CompletionRequest;
use async_trait::async_trait;
use crew_foundation::{ChatMessage, Error, Result, ToolExecutionContext};
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{debug, warn};

/// One run of an agent
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Fully built prompt (context already applied)
    pub input: String,
    /// Team name of the agent being run
    pub agent_name: String,
    /// Other team members, shown to the model
    pub peers: Vec<String>,
    /// Hard stop; checked between rounds
    pub deadline: Option<Instant>,
}

/// Executes an agent against a prompt
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, agent: &CoreAgent, request: RunRequest) -> Result<String>;
}

/// Runner that talks to the agent's `ModelClient`
#[derive(Debug, Clone)]
pub struct ModelRunner {
    working_dir: PathBuf,
    max_rounds: usize,
}

impl ModelRunner {
    pub const DEFAULT_MAX_ROUNDS: usize = 16;

    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = rounds.max(1);
        self
    }

    fn system_prompt(agent: &CoreAgent, request: &RunRequest) -> Option<String> {
        let mut prompt = agent.prompt().to_string();
        let peers: Vec<&str> = request
            .peers
            .iter()
            .map(String::as_str)
            .filter(|p| *p != request.agent_name)
            .collect();
        if !peers.is_empty() {
            if !prompt.is_empty() {
                prompt.push_str("\n\n");
            }
            prompt.push_str(&format!("Team members: {}", peers.join(", ")));
        }
        (!prompt.is_empty()).then_some(prompt)
    }
}

#[async_trait]
impl AgentRunner for ModelRunner {
    async fn run(&self, agent: &CoreAgent, request: RunRequest) -> Result<String> {
        let context = ToolExecutionContext::new(&self.working_dir, &request.agent_name);
        let tools = agent.tools();
        let mut messages = vec![ChatMessage::user(&request.input)];

        for round in 1..=self.max_rounds {
            if request.deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(Error::Timeout(format!(
                    "agent {} ran out of time after {} rounds",
                    request.agent_name,
                    round - 1
                )));
            }

            let completion = agent
                .client()
                .complete(CompletionRequest {
                    system_prompt: Self::system_prompt(agent, &request),
                    messages: messages.clone(),
                    tools: agent.tool_schemas().as_ref().clone(),
                })
                .await?;
            agent
                .cost()
                .record(completion.usage.input_tokens, completion.usage.output_tokens);

            if completion.tool_calls.is_empty() {
                debug!(
                    "Agent '{}' finished in {} round(s)",
                    request.agent_name, round
                );
                return Ok(completion.content);
            }

            messages.push(ChatMessage::assistant(&completion.content));
            for call in completion.tool_calls {
                let output = match tools.execute(&call.name, call.input, &context).await {
                    Ok(result) => result.content().to_string(),
                    Err(e) => {
                        warn!("Tool '{}' failed for {}: {}", call.name, request.agent_name, e);
                        format!("Error: {}", e)
                    }
                };
                messages.push(ChatMessage::user(format!(
                    "[tool {} ({})]\n{}",
                    call.name, call.id, output
                )));
            }
        }

        Err(Error::Agent(format!(
            "agent {} did not finish within {} rounds",
            request.agent_name, self.max_rounds
        )))
    }
}
