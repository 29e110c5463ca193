//! Work-completion heuristic
//!
//! When a delegation times out before the agent answers, the team checks
//! whether the agent probably produced artifacts anyway: the task must talk
//! about making something, and the working tree must hold a freshly
//! modified source-like file or directory. Best-effort only.

use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How recent a file must be to count as work
pub const RECENT_WINDOW: Duration = Duration::from_secs(5 * 60);

const WORK_KEYWORDS: &[&str] = &[
    "create",
    "write",
    "generate",
    "build",
    "make",
    "implement",
    "add file",
    "new file",
    "script",
    "code",
    "project",
    "folder",
    "directory",
    "app",
    "api",
    "web",
    "flask",
    "django",
];

const ARTIFACT_EXTENSIONS: &[&str] = &[
    "py", "js", "go", "java", "cpp", "c", "html", "css", "json", "yaml", "yml", "md", "txt",
    "sql", "sh", "bat", "ts", "jsx", "tsx", "vue", "php",
];

/// True when the task text asks for something to be produced
pub fn mentions_work(task: &str) -> bool {
    let task = task.to_lowercase();
    WORK_KEYWORDS.iter().any(|k| task.contains(k))
}

/// Recent-artifact scan over one root
#[derive(Debug, Clone)]
pub struct WorkCheck {
    root: PathBuf,
    window: Duration,
}

impl WorkCheck {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            window: RECENT_WINDOW,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Keyword gate first; the tree is only walked when it passes
    pub fn work_completed(&self, task: &str) -> bool {
        mentions_work(task) && self.has_recent_artifact()
    }

    fn has_recent_artifact(&self) -> bool {
        let threshold = SystemTime::now()
            .checked_sub(self.window)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        WalkBuilder::new(&self.root)
            .hidden(true)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .build()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.depth() > 0)
            .filter(|entry| match entry.file_type() {
                Some(t) if t.is_dir() => true,
                Some(t) if t.is_file() => is_artifact(entry.path()),
                _ => false,
            })
            .any(|entry| modified_after(entry.path(), threshold))
    }
}

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARTIFACT_EXTENSIONS.contains(&e))
}

fn modified_after(path: &Path, threshold: SystemTime) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .is_ok_and(|modified| modified > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_keywords() {
        assert!(mentions_work("Please CREATE a new script"));
        assert!(mentions_work("set up a flask server"));
        assert!(!mentions_work("Analyze reports"));
        assert!(!mentions_work(""));
    }

    #[test]
    fn test_no_keyword_never_scans() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("fresh.py"), "print(1)").unwrap();
        assert!(!WorkCheck::new(dir.path()).work_completed("Analyze reports"));
    }

    #[test]
    fn test_recent_artifact() {
        let dir = TempDir::new().unwrap();
        let check = WorkCheck::new(dir.path());
        assert!(!check.work_completed("write a hello world script"));

        std::fs::write(dir.path().join("hello.py"), "print('hi')").unwrap();
        assert!(check.work_completed("write a hello world script"));
    }

    #[test]
    fn test_ignores_hidden_and_other_extensions() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/config.json"), "{}").unwrap();
        std::fs::write(dir.path().join(".env.json"), "{}").unwrap();
        std::fs::write(dir.path().join("binary.bin"), "x").unwrap();

        assert!(!WorkCheck::new(dir.path()).work_completed("build the project"));
    }

    #[test]
    fn test_fresh_directory_counts() {
        let dir = TempDir::new().unwrap();
        let check = WorkCheck::new(dir.path());
        assert!(!check.work_completed("create a project folder"));

        std::fs::create_dir(dir.path().join("project")).unwrap();
        assert!(check.work_completed("create a project folder"));

        let stale = WorkCheck::new(dir.path()).with_window(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!stale.work_completed("create a project folder"));
    }

    #[test]
    fn test_old_files_do_not_count() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("old.go"), "package main").unwrap();
        let check = WorkCheck::new(dir.path()).with_window(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        assert!(!check.work_completed("implement the api"));
    }
}
