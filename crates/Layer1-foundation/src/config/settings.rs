//! Crew Settings
//!
//! Resolution order: built-in defaults, then an optional `crew.toml`, then
//! `CREW_*` environment variables. A `Team` receives the resolved value
//! explicitly, so nothing below the CLI reads the process environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file name
pub const CREW_CONFIG_FILE: &str = "crew.toml";

/// Default delegation timeout (15 minutes)
pub const DEFAULT_DELEGATION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Token caps below this value are ignored
const MIN_CONTEXT_CAP: usize = 100;

// ============================================================================
// Sections
// ============================================================================

/// Context-window builder limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// Token cap for the orchestrator (tier 0)
    pub cap_orchestrator: usize,
    /// Token cap for workers (tier 1)
    pub cap_worker: usize,
    /// Pass task text through untouched
    pub disabled: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            cap_orchestrator: 1200,
            cap_worker: 600,
            disabled: false,
        }
    }
}

/// Durable store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub kind: StoreKind,
    /// Root directory for the file backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Expired-entry sweep interval
    #[serde(with = "humantime_serde")]
    pub gc_interval: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            path: None,
            gc_interval: Duration::from_secs(60),
        }
    }
}

impl StoreSettings {
    /// Root directory the file backend writes to
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_store_path)
    }
}

/// `<data_local_dir>/crew/store`, or `.crew_store` when there is no data dir
pub fn default_store_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("crew").join("store"))
        .unwrap_or_else(|| PathBuf::from(".crew_store"))
}

// ============================================================================
// CrewSettings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrewSettings {
    /// Upper bound for a single delegation
    #[serde(with = "humantime_serde")]
    pub delegation_timeout: Duration,

    /// UI mode: suppress stderr narration and skip best-effort workspace events
    pub quiet: bool,

    /// Verbose tracing
    pub debug: bool,

    /// Append coordination records to `agent_communication.log`
    pub comm_log: bool,

    /// Tool cap for spawned non-coder agents (0 = no cap)
    pub max_tools: usize,

    pub context: ContextSettings,

    pub store: StoreSettings,
}

impl Default for CrewSettings {
    fn default() -> Self {
        Self {
            delegation_timeout: DEFAULT_DELEGATION_TIMEOUT,
            quiet: false,
            debug: false,
            comm_log: false,
            max_tools: 5,
            context: ContextSettings::default(),
            store: StoreSettings::default(),
        }
    }
}

impl CrewSettings {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env_with(|key| std::env::var(key).ok());
        settings
    }

    /// Optional TOML file, then the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(p) if p.exists() => Self::from_toml_file(p)?,
            Some(p) => {
                return Err(Error::Config(format!(
                    "Settings file not found: {}",
                    p.display()
                )))
            }
            None => Self::default(),
        };
        settings.apply_env_with(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `CREW_*` overrides from an arbitrary lookup.
    ///
    /// Malformed values are ignored and the previous value is kept.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CREW_DELEGATION_TIMEOUT") {
            match humantime::parse_duration(raw.trim()) {
                Ok(d) if !d.is_zero() => self.delegation_timeout = d,
                _ => tracing::warn!("Ignoring invalid CREW_DELEGATION_TIMEOUT: {}", raw),
            }
        }

        if let Some(v) = lookup("CREW_TUI_MODE") {
            self.quiet = is_on(&v);
        }
        if let Some(v) = lookup("CREW_DEBUG") {
            self.debug = is_on(&v);
        }
        if let Some(v) = lookup("CREW_COMM_LOG") {
            self.comm_log = is_on(&v);
        }
        if let Some(v) = lookup("CREW_DISABLE_CONTEXT") {
            self.context.disabled = is_on(&v);
        }

        if let Some(cap) = lookup("CREW_CTX_CAP_AGENT0").and_then(|v| parse_cap(&v)) {
            self.context.cap_orchestrator = cap;
        }
        if let Some(cap) = lookup("CREW_CTX_CAP_WORKER").and_then(|v| parse_cap(&v)) {
            self.context.cap_worker = cap;
        }

        if let Some(max) = lookup("CREW_MAX_TOOLS").and_then(|v| v.trim().parse().ok()) {
            self.max_tools = max;
        }

        if let Some(kind) = lookup("CREW_STORE") {
            self.store.kind = if kind.trim() == "file" {
                StoreKind::File
            } else {
                StoreKind::Memory
            };
        }
        if let Some(path) = lookup("CREW_STORE_PATH").filter(|p| !p.trim().is_empty()) {
            self.store.path = Some(PathBuf::from(path));
        }
    }

    /// Stderr narration allowed
    pub fn narrate(&self) -> bool {
        !self.quiet
    }
}

fn is_on(value: &str) -> bool {
    value.trim() == "1"
}

fn parse_cap(value: &str) -> Option<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|cap| *cap > MIN_CONTEXT_CAP)
}
