//! Error types for Crew
//!
//! Every crate in the workspace reports failures through this enum.

use std::time::Duration;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Crew error type
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Storage
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // Tools
    // ========================================================================
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    // ========================================================================
    // Agents
    // ========================================================================
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("agent {0} not found")]
    AgentNotFound(String),

    /// Sender or recipient of a message is not a member
    #[error("{side} agent {agent} not found")]
    ParticipantNotFound { side: &'static str, agent: String },

    #[error("failed to spawn agent {agent}: {message}")]
    SpawnFailed { agent: String, message: String },

    /// The delegated agent ran out of time and left no trace of work behind.
    #[error(
        "⏳ Delegation to '{agent}' timed out after {} without completing work. Consider simplifying the task, choosing a different agent, or increasing CREW_DELEGATION_TIMEOUT.",
        display_duration(.timeout)
    )]
    DelegationTimeout { agent: String, timeout: Duration },

    /// The delegated agent returned an error of its own.
    #[error(
        "❌ Agent '{agent}' encountered an error: {message}\n\nSuggestions:\n- Try a different approach\n- Simplify the request\n- Use alternative tools\n- Break the task into smaller steps"
    )]
    DelegationFailed { agent: String, message: String },

    // ========================================================================
    // Tasks
    // ========================================================================
    #[error("Task error: {0}")]
    Task(String),

    #[error("task {0} not found")]
    TaskNotFound(String),

    // ========================================================================
    // Files
    // ========================================================================
    #[error("file {path} has a {lock_type} lock by agent {holder}")]
    FileLocked {
        path: String,
        lock_type: String,
        holder: String,
    },

    // ========================================================================
    // Execution
    // ========================================================================
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // General
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // Conversions
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Other
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Formats a duration the way users write it (`50ms`, `15m`).
pub fn display_duration(d: &Duration) -> String {
    humantime::format_duration(*d).to_string()
}

impl Error {
    /// Errors a caller may reasonably try again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::DelegationTimeout { .. } | Error::Cancelled
        )
    }

    /// Errors whose message is meant to be shown to the user or the model as-is
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::AgentNotFound(_)
                | Error::ParticipantNotFound { .. }
                | Error::TaskNotFound(_)
                | Error::FileLocked { .. }
                | Error::NotFound(_)
                | Error::InvalidInput(_)
                | Error::DelegationTimeout { .. }
                | Error::DelegationFailed { .. }
                | Error::Cancelled
        )
    }

    /// True for deadline and cancellation failures
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Timeout(_) | Error::DelegationTimeout { .. } | Error::Cancelled
        )
    }

    pub fn spawn_failed(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Error::SpawnFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }

    pub fn sender_not_found(agent: impl Into<String>) -> Self {
        Error::ParticipantNotFound {
            side: "sender",
            agent: agent.into(),
        }
    }

    pub fn recipient_not_found(agent: impl Into<String>) -> Self {
        Error::ParticipantNotFound {
            side: "recipient",
            agent: agent.into(),
        }
    }

    pub fn delegation_failed(agent: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DelegationFailed {
            agent: agent.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From impls
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delegation_timeout_message() {
        let err = Error::DelegationTimeout {
            agent: "coder".to_string(),
            timeout: Duration::from_millis(50),
        };
        let msg = err.to_string();
        assert!(msg.contains("timed out after 50ms"));
        assert!(msg.contains("'coder'"));
        assert!(err.is_timeout());
        assert!(err.is_user_facing());
    }

    #[test]
    fn test_delegation_failed_suggestions() {
        let err = Error::delegation_failed("tester", "boom");
        let msg = err.to_string();
        assert!(msg.starts_with("❌ Agent 'tester' encountered an error: boom"));
        assert!(msg.contains("- Break the task into smaller steps"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_wording() {
        assert_eq!(
            Error::AgentNotFound("ghost".into()).to_string(),
            "agent ghost not found"
        );
        assert_eq!(
            Error::recipient_not_found("ghost").to_string(),
            "recipient agent ghost not found"
        );
        assert!(Error::sender_not_found("ghost").is_user_facing());
    }
}
