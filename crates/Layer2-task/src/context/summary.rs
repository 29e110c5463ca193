//! Project summary - a one-line description of the working tree
//!
//! Scanning the root on every delegation is wasteful when agents fire in
//! quick succession, so summaries are cached for a short TTL. The clock is
//! injectable so tests can expire the cache without sleeping.

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default summary lifetime
pub const SUMMARY_TTL: Duration = Duration::from_secs(10);

const UNKNOWN: &str = "Project: Unknown";
const MAX_DIRS: usize = 5;
const MAX_CONFIGS: usize = 4;
const MAX_REFERENCED_FILES: usize = 5;
const REFERENCE_EXTENSIONS: &[&str] = &["go", "md", "txt", "json", "yaml", "yml", "ts", "js", "py"];

/// Time source
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// `Instant::now`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Full and lite summary lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    /// `Project: T; Dirs: ...; Config: ...`
    pub full: String,
    /// `Project: T; Dirs: ...`
    pub lite: String,
}

impl ProjectSummary {
    fn unknown() -> Self {
        Self {
            full: UNKNOWN.to_string(),
            lite: UNKNOWN.to_string(),
        }
    }
}

struct CachedSummary {
    summary: ProjectSummary,
    expires_at: Instant,
}

/// TTL cache of the project summary for one root
pub struct ProjectSummaryCache {
    root: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    cached: RwLock<Option<CachedSummary>>,
}

impl std::fmt::Debug for ProjectSummaryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectSummaryCache")
            .field("root", &self.root)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ProjectSummaryCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, SUMMARY_TTL, Arc::new(SystemClock))
    }

    pub fn with_clock(root: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            root: root.into(),
            ttl,
            clock,
            cached: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cached summary, rescanning once the TTL has passed
    pub fn get(&self) -> ProjectSummary {
        let now = self.clock.now();
        if let Some(cached) = self.cached.read().as_ref() {
            if now < cached.expires_at {
                return cached.summary.clone();
            }
        }

        let Some(summary) = scan(&self.root) else {
            return ProjectSummary::unknown();
        };
        *self.cached.write() = Some(CachedSummary {
            summary: summary.clone(),
            expires_at: self.clock.now() + self.ttl,
        });
        summary
    }

    /// Up to five paths mentioned in `task` that exist under the root
    pub fn referenced_files(&self, task: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        for word in task.split_whitespace() {
            if out.len() >= MAX_REFERENCED_FILES {
                break;
            }
            if !word.contains('.') {
                continue;
            }
            let word = word.trim_matches(|c| "`'\"()[]{}<>,".contains(c));
            if word.len() > 80 || word.matches('/').count() > 2 {
                continue;
            }
            let allowed = Path::new(word)
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| REFERENCE_EXTENSIONS.contains(&e));
            if !allowed || out.iter().any(|seen| seen == word) {
                continue;
            }
            if self.root.join(word).exists() {
                out.push(word.to_string());
            }
        }

        out
    }
}

/// Read the top level of `root`; `None` when it cannot be listed
fn scan(root: &Path) -> Option<ProjectSummary> {
    let mut entries: Vec<(String, bool)> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (entry.file_name().to_string_lossy().into_owned(), is_dir)
        })
        .collect();
    entries.sort();

    let mut project_type = "Unknown";
    let mut dirs = Vec::new();
    let mut configs = Vec::new();

    for (name, is_dir) in &entries {
        if name.starts_with('.') && name != ".gitignore" {
            continue;
        }
        if *is_dir {
            dirs.push(format!("{}/", name));
            continue;
        }
        let detected = match name.as_str() {
            "go.mod" => {
                project_type = "Go";
                None
            }
            "package.json" => Some("Node"),
            "pyproject.toml" | "requirements.txt" => Some("Python"),
            "Cargo.toml" => Some("Rust"),
            "docker-compose.yml" | "Dockerfile" | "Makefile" => None,
            _ => continue,
        };
        if let Some(kind) = detected {
            if project_type == "Unknown" {
                project_type = kind;
            }
        }
        configs.push(name.clone());
    }

    dirs.truncate(MAX_DIRS);
    configs.truncate(MAX_CONFIGS);

    Some(ProjectSummary {
        full: format!(
            "Project: {}; Dirs: {}; Config: {}",
            project_type,
            dirs.join(" "),
            configs.join(" ")
        ),
        lite: format!("Project: {}; Dirs: {}", project_type, dirs.join(" ")),
    })
}
