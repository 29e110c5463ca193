//! Role configuration
//!
//! Roles are YAML files describing how to build an agent:
//!
//! ```yaml
//! name: coder
//! prompt: You write and fix code.
//! model:
//!   provider: mock
//! tools: [view, edit_range, bash]
//! restricted_tools: [bash]
//! capabilities: [rust, go]
//! ```

use crew_core::ModelSpec;
use crew_foundation::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Tools a spawned agent may never hold
pub const DELEGATION_TOOLS: &[&str] = &["agent", "parallel_agents"];

const CODER_TOOLS: &[&str] = &[
    "read_lines",
    "view",
    "edit_range",
    "create",
    "search_replace",
    "insert_at",
    "fileinfo",
    "bash",
    "sh",
    "ls",
    "find",
    "glob",
    "grep",
    "patch",
    "branch-tidy",
    "lsp_diagnostics",
];
const REVIEW_TOOLS: &[&str] = &["view", "read_lines", "lsp_diagnostics"];
const RESEARCH_TOOLS: &[&str] = &["web_search", "read_webpage", "api"];
const BASIC_TOOLS: &[&str] = &["view", "read_lines"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSpec>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restricted_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl RoleConfig {
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_restricted_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_model(mut self, model: ModelSpec) -> Self {
        self.model = Some(model);
        self
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Prompt used when a role has no config
pub fn default_prompt(role: &str) -> String {
    format!("You are a {} agent", role)
}

/// Tools a role gets when its config does not list any, and whether the
/// team's tool cap applies to them.
pub fn curated_tools(role: &str) -> (&'static [&'static str], bool) {
    match role.trim().to_lowercase().as_str() {
        "coder" => (CODER_TOOLS, false),
        "reviewer" | "critic" | "editor" | "tester" => (REVIEW_TOOLS, true),
        "researcher" | "writer" => (RESEARCH_TOOLS, true),
        _ => (BASIC_TOOLS, true),
    }
}

pub fn load_role_file(path: &Path) -> Result<RoleConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read role file {}: {}", path.display(), e)))?;
    serde_yaml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "failed to parse role YAML from {}: {}",
            path.display(),
            e
        ))
    })
}

/// Load every include path, resolving relative ones against `base_dir`.
/// Unreadable or unnamed roles are skipped with a warning.
pub fn load_roles<P: AsRef<Path>>(paths: &[P], base_dir: &Path) -> HashMap<String, RoleConfig> {
    let mut roles = HashMap::new();

    for path in paths {
        let path = path.as_ref();
        let full: PathBuf = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        };

        let role = match load_role_file(&full) {
            Ok(role) => role,
            Err(e) => {
                warn!("Skipping role {}: {}", full.display(), e);
                continue;
            }
        };
        if role.name.is_empty() {
            warn!("Role in {} has no name, skipping", full.display());
            continue;
        }

        info!(
            "Loaded role: {} (model: {})",
            role.name,
            role.model
                .as_ref()
                .map(|m| m.display_name())
                .unwrap_or_else(|| "inherited".to_string())
        );
        roles.insert(role.name.clone(), role);
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_curated_tools() {
        let (tools, capped) = curated_tools(" Coder ");
        assert!(!capped);
        assert_eq!(tools.len(), 16);
        assert_eq!(curated_tools("critic").0, REVIEW_TOOLS);
        assert_eq!(curated_tools("writer").0, RESEARCH_TOOLS);
        assert_eq!(curated_tools("planner"), (BASIC_TOOLS, true));
    }

    #[test]
    fn test_parse_yaml() {
        let role = RoleConfig::from_yaml(
            "name: reviewer\nprompt: Review diffs\nmodel:\n  provider: mock\n  options:\n    model: small\nrestricted_tools: [bash]\n",
        )
        .unwrap();
        assert_eq!(role.name, "reviewer");
        assert_eq!(role.model.unwrap().display_name(), "mock/small");
        assert_eq!(role.restricted_tools, vec!["bash"]);
        assert!(role.tools.is_empty());
    }

    #[test]
    fn test_load_roles_skips_bad_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("coder.yaml"), "name: coder\nprompt: Write code\n").unwrap();
        std::fs::write(dir.path().join("anon.yaml"), "prompt: nobody\n").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "name: [unclosed\n").unwrap();

        let roles = load_roles(
            &["coder.yaml", "anon.yaml", "broken.yaml", "missing.yaml"],
            dir.path(),
        );
        assert_eq!(roles.len(), 1);
        assert_eq!(roles["coder"].prompt, "Write code");
    }

    #[test]
    fn test_default_prompt() {
        assert_eq!(default_prompt("coder"), "You are a coder agent");
    }
}
