//! Mock model client

use super::{Completion, CompletionRequest, ModelClient};
use async_trait::async_trait;
use crew_foundation::{ChatRole, Error, Result, TokenUsage, TokenizerFactory};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug)]
enum Behavior {
    /// Reply with the last user message
    Echo,
    /// Pop scripted replies, then fall back to echo
    Scripted(Mutex<VecDeque<Completion>>),
    /// Always fail
    Fail(String),
}

/// Deterministic client for tests and offline runs
#[derive(Debug)]
pub struct MockClient {
    behavior: Behavior,
    delay: Option<Duration>,
}

impl MockClient {
    pub fn echo() -> Self {
        Self {
            behavior: Behavior::Echo,
            delay: None,
        }
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_completions(responses.into_iter().map(Completion::text))
    }

    /// Scripted replies that may carry tool calls
    pub fn with_completions(completions: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            behavior: Behavior::Scripted(Mutex::new(completions.into_iter().collect())),
            delay: None,
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Fail(message.into()),
            delay: None,
        }
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn echo_reply(request: &CompletionRequest) -> String {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        format!("mock response: {}", last_user)
    }
}

#[async_trait]
impl ModelClient for MockClient {
    fn provider(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut completion = match &self.behavior {
            Behavior::Echo => Completion::text(Self::echo_reply(&request)),
            Behavior::Scripted(queue) => queue
                .lock()
                .pop_front()
                .unwrap_or_else(|| Completion::text(Self::echo_reply(&request))),
            Behavior::Fail(message) => return Err(Error::Agent(message.clone())),
        };

        let tokenizer = crew_foundation::tokenizer::factory().get(
            TokenizerFactory::tokenizer_type_for("mock"),
        );
        let input_tokens: usize = request
            .messages
            .iter()
            .map(|m| tokenizer.count_tokens(&m.content))
            .sum::<usize>()
            + request
                .system_prompt
                .as_deref()
                .map(|p| tokenizer.count_tokens(p))
                .unwrap_or(0);

        completion.usage = TokenUsage::new(
            input_tokens as u64,
            tokenizer.count_tokens(&completion.content) as u64,
        );
        Ok(completion)
    }
}
