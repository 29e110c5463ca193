//! User-facing narration and the communication log
//!
//! Progress lines (`🔄 Delegating to coder agent...`) go to stderr unless the
//! team runs in quiet mode. The communication log is an opt-in append-only
//! file of coordination records.

use chrono::Utc;
use crew_foundation::CrewSettings;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Default communication log file, relative to the working directory
pub const COMM_LOG_FILE: &str = "agent_communication.log";

/// Where narration goes
#[derive(Debug, Clone, Default)]
pub enum Notifier {
    #[default]
    Stderr,
    Silent,
    /// Collects lines in memory
    Capture(Arc<Mutex<Vec<String>>>),
}

impl Notifier {
    pub fn from_settings(settings: &CrewSettings) -> Self {
        if settings.narrate() {
            Notifier::Stderr
        } else {
            Notifier::Silent
        }
    }

    pub fn capture() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (Notifier::Capture(Arc::clone(&lines)), lines)
    }

    pub fn notify(&self, text: &str) {
        match self {
            Notifier::Stderr => {
                let mut stderr = std::io::stderr().lock();
                let _ = stderr.write_all(text.as_bytes());
                let _ = stderr.flush();
            }
            Notifier::Silent => {}
            Notifier::Capture(lines) => lines.lock().push(text.to_string()),
        }
    }
}

/// Append-only log of agent communication
#[derive(Debug, Clone, Default)]
pub struct CommLog {
    path: Option<PathBuf>,
}

impl CommLog {
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Enabled only with `comm_log` on and quiet mode off
    pub fn from_settings(settings: &CrewSettings, dir: &std::path::Path) -> Self {
        if settings.comm_log && !settings.quiet {
            Self::to_file(dir.join(COMM_LOG_FILE))
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Record a line. Write failures are dropped.
    pub fn record(&self, line: &str) {
        debug!(target: "crew::team", "{}", line);

        let Some(path) = &self.path else {
            return;
        };
        let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{} {}", Utc::now().to_rfc3339(), line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_capture() {
        let (notifier, lines) = Notifier::capture();
        notifier.notify("🔄 Delegating to coder agent...\n");
        assert_eq!(lines.lock().len(), 1);
    }

    #[test]
    fn test_comm_log_appends() {
        let dir = TempDir::new().unwrap();
        let log = CommLog::to_file(dir.path().join(COMM_LOG_FILE));
        log.record("DELEGATION: Agent 0 -> coder | Task: x");
        log.record("COORDINATION: agent_0 -> coder | delegation: x");

        let content = std::fs::read_to_string(dir.path().join(COMM_LOG_FILE)).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("DELEGATION: Agent 0 -> coder"));
    }

    #[test]
    fn test_comm_log_follows_settings() {
        let dir = TempDir::new().unwrap();
        let mut settings = CrewSettings::default();
        assert!(!CommLog::from_settings(&settings, dir.path()).is_enabled());

        settings.comm_log = true;
        assert!(CommLog::from_settings(&settings, dir.path()).is_enabled());

        settings.quiet = true;
        assert!(!CommLog::from_settings(&settings, dir.path()).is_enabled());
    }
}
