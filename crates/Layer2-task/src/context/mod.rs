//! Context compressor - bounded prompt prefix per agent tier
//!
//! Every delegated task is wrapped as:
//!
//! ```text
//! <!--CREW_CTX_V1-->
//! Project: Rust; Dirs: crates/ docs/          <- full for tier 0, lite for tier 1
//! Files: src/main.rs notes.md                 <- tier 1 only, when referenced
//!
//! TASK:
//! <task text, truncated to fit the tier cap>
//! ```
//!
//! The sentinel makes wrapping idempotent: input that already starts with
//! it passes through untouched.

mod summary;

pub use summary::{Clock, ProjectSummary, ProjectSummaryCache, SystemClock, SUMMARY_TTL};

use crew_foundation::{ContextSettings, Tokenizer, TokenizerFactory};
use std::sync::Arc;
use tracing::debug;

/// Marker placed at the top of every wrapped prompt
pub const CONTEXT_SENTINEL: &str = "<!--CREW_CTX_V1-->\n";

/// Model whose tokenizer measures the caps
pub const CONTEXT_TOKENIZER_MODEL: &str = "gpt-4o-mini";

const TRUNCATION_MARKER: &str = "[truncated]";
const MIN_TASK_TOKENS: usize = 50;
const HEADER_SLACK: usize = 10;

/// Token budget class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextTier {
    /// Agent 0
    Orchestrator,
    Worker,
}

impl ContextTier {
    pub fn for_agent(agent_name: &str) -> Self {
        match agent_name {
            "0" | "agent_0" => ContextTier::Orchestrator,
            _ => ContextTier::Worker,
        }
    }
}

/// Builds the bounded prompt for a delegated task
pub struct ContextCompressor {
    settings: ContextSettings,
    summaries: Arc<ProjectSummaryCache>,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for ContextCompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextCompressor")
            .field("settings", &self.settings)
            .field("summaries", &self.summaries)
            .finish()
    }
}

impl ContextCompressor {
    pub fn new(settings: ContextSettings, summaries: Arc<ProjectSummaryCache>) -> Self {
        Self {
            settings,
            summaries,
            tokenizer: crew_foundation::tokenizer::factory().get(
                TokenizerFactory::tokenizer_type_for(CONTEXT_TOKENIZER_MODEL),
            ),
        }
    }

    pub fn cap(&self, tier: ContextTier) -> usize {
        match tier {
            ContextTier::Orchestrator => self.settings.cap_orchestrator,
            ContextTier::Worker => self.settings.cap_worker,
        }
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    /// Wrap `task` for `agent_name`
    pub fn wrap(&self, task: &str, agent_name: &str) -> String {
        if self.settings.disabled || task.starts_with(CONTEXT_SENTINEL) {
            return task.to_string();
        }

        let tier = ContextTier::for_agent(agent_name);
        let summary = self.summaries.get();

        let mut lines: Vec<String> = vec![CONTEXT_SENTINEL.trim_end_matches('\n').to_string()];
        match tier {
            ContextTier::Orchestrator => lines.push(summary.full),
            ContextTier::Worker => {
                lines.push(summary.lite);
                let refs = self.summaries.referenced_files(task);
                if !refs.is_empty() {
                    lines.push(format!("Files: {}", refs.join(" ")));
                }
            }
        }
        lines.push(String::new());
        lines.push("TASK:".to_string());
        lines.push(task.to_string());

        let assembled = lines.join("\n");
        let cap = self.cap(tier);
        let total = self.count_tokens(&assembled);
        if total <= cap {
            debug!(
                "CTX agent={} tier={:?} tokens={} truncated=false",
                agent_name, tier, total
            );
            return assembled;
        }

        let final_text = self.truncate(&assembled, cap);
        debug!(
            "CTX agent={} tier={:?} tokens={} truncated=true cap={}",
            agent_name,
            tier,
            self.count_tokens(&final_text),
            cap
        );
        final_text
    }

    /// Keep the sentinel and first summary line, shrink what follows `TASK:`
    fn truncate(&self, assembled: &str, cap: usize) -> String {
        let parts: Vec<&str> = assembled.split('\n').collect();
        let task_idx = parts.iter().position(|l| *l == "TASK:").unwrap_or(0);
        let first_summary_line = parts
            .iter()
            .take(4)
            .skip(1)
            .find(|l| !l.trim().is_empty())
            .copied();

        let mut header: Vec<&str> = vec![parts[0]];
        header.extend(first_summary_line);
        header.push("");
        header.push("TASK:");

        let remaining = parts[task_idx + 1..].join("\n");
        let allowed = cap
            .saturating_sub(self.count_tokens(&header.join("\n")))
            .saturating_sub(HEADER_SLACK)
            .max(MIN_TASK_TOKENS);

        let mut out = header.join("\n");
        out.push('\n');
        out.push_str(&self.shrink_task(&remaining, allowed));
        out
    }

    /// Cut `task` to `allowed` tokens, marking it only when something was cut
    fn shrink_task(&self, task: &str, allowed: usize) -> String {
        let mut shrunk = self.tokenizer.truncate(task, allowed);
        if shrunk.len() < task.len() {
            shrunk.push_str("\n...");
            shrunk.push_str(TRUNCATION_MARKER);
        }
        shrunk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compressor(dir: &TempDir, settings: ContextSettings) -> ContextCompressor {
        ContextCompressor::new(settings, Arc::new(ProjectSummaryCache::new(dir.path())))
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        dir
    }

    #[test]
    fn test_worker_layout() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());

        let out = ctx.wrap("update README.md please", "coder");
        assert_eq!(
            out,
            "<!--CREW_CTX_V1-->\nProject: Rust; Dirs: src/\nFiles: README.md\n\nTASK:\nupdate README.md please"
        );
    }

    #[test]
    fn test_orchestrator_layout() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());

        let out = ctx.wrap("plan work on README.md", "agent_0");
        assert_eq!(
            out,
            "<!--CREW_CTX_V1-->\nProject: Rust; Dirs: src/; Config: Cargo.toml\n\nTASK:\nplan work on README.md"
        );
        assert_eq!(ctx.wrap("x", "0"), ctx.wrap("x", "agent_0"));
    }

    #[test]
    fn test_idempotent() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());

        let once = ctx.wrap("write a script", "coder");
        let twice = ctx.wrap(&once, "coder");
        assert_eq!(once, twice);
        assert_eq!(twice.matches(CONTEXT_SENTINEL.trim_end()).count(), 1);
    }

    #[test]
    fn test_disabled_passes_through() {
        let dir = project();
        let settings = ContextSettings {
            disabled: true,
            ..Default::default()
        };
        assert_eq!(compressor(&dir, settings).wrap("task", "coder"), "task");
    }

    #[test]
    fn test_truncates_to_cap() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());
        let task = "word ".repeat(2_000);

        let out = ctx.wrap(&task, "coder");
        let cap = ctx.cap(ContextTier::Worker);
        let marker_overhead = ctx.count_tokens("\n...[truncated]");
        assert!(ctx.count_tokens(&out) <= cap + marker_overhead);
        assert!(out.starts_with("<!--CREW_CTX_V1-->\nProject: Rust; Dirs: src/\n\nTASK:\n"));
        assert!(out.ends_with("...[truncated]"));
        assert_eq!(out.matches("[truncated]").count(), 1);
    }

    #[test]
    fn test_exact_fit_is_not_marked() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());
        let task = "fits ".repeat(40);
        let exact = ctx.count_tokens(&task);

        assert_eq!(ctx.shrink_task(&task, exact), task);
        let cut = ctx.shrink_task(&task, exact - 1);
        assert!(cut.ends_with("\n...[truncated]"));
    }

    #[test]
    fn test_marker_added_even_if_task_mentions_it() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());
        let task = format!("[truncated] logs follow\n{}", "word ".repeat(2_000));

        let out = ctx.wrap(&task, "coder");
        assert!(out.ends_with("\n...[truncated]"));
        assert_eq!(out.matches("[truncated]").count(), 2);
    }

    #[test]
    fn test_orchestrator_cap_is_larger() {
        let dir = project();
        let ctx = compressor(&dir, ContextSettings::default());
        let task = "token ".repeat(700);

        let worker = ctx.wrap(&task, "coder");
        let lead = ctx.wrap(&task, "agent_0");
        assert!(worker.ends_with("[truncated]"));
        assert!(lead.len() > worker.len());
    }
}
