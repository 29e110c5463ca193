//! Team - the multi-agent coordination core
//!
//! A `Team` owns every member agent, the role table, shared memory, the
//! coordination and message logs, file locks, status reports and the task
//! table. One `RwLock` guards all of it; each `Agent` has its own lock for
//! status.
//!
//! ```text
//!   caller ──► Team::call(name, input)
//!                 │
//!                 ▼
//!         DelegationSession::run
//!                 │ ensure agent (spawn if absent)
//!                 │ workspace + inbox context
//!                 │ ContextCompressor::wrap
//!                 │ AgentRunner::run  (deadline / cancel)
//!                 ▼
//!         classify ─► success | timeout-with-work | timeout | error
//!                 │
//!                 ▼
//!         coordination log + shared memory ──► SharedStore
//! ```

mod collaboration;
mod coordination;
mod delegation;
mod messaging;
mod shared;
mod tasks;
mod work_check;
mod workspace;

pub use collaboration::FILE_CHANGE_LIMIT;
pub use delegation::DelegationSession;
pub use shared::SharedValue;
pub use messaging::MESSAGE_CHANNEL_CAPACITY;
pub use tasks::ParallelCall;
pub use work_check::{mentions_work, WorkCheck, RECENT_WINDOW};
pub use workspace::{workspace_context, WORKSPACE_EVENTS_KEY, WORKSPACE_EVENT_LIMIT};

use crate::agent::{Agent, AgentInfo};
use crate::context::{ContextCompressor, ProjectSummaryCache};
use crate::notify::{CommLog, Notifier};
use crate::roles::{self, RoleConfig, DELEGATION_TOOLS};
use crate::types::{
    AgentStatus, CoordinationEvent, DetailedAgentStatus, FileChange, FileLock, Message,
    StatusChange, Task,
};
use crew_core::{
    AgentRunner, CoreAgent, MockClient, MockModelFactory, ModelClient, ModelFactory, ModelRunner,
    ToolRegistry,
};
use crew_foundation::{spawn_gc, store_from_settings, CrewSettings, Error, Result, SharedStore};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Name the orchestrator goes by in event logs
pub const ORCHESTRATOR: &str = "agent_0";

/// Everything behind the team lock
#[derive(Default)]
pub(crate) struct TeamState {
    /// id → agent
    pub(crate) agents: HashMap<String, Arc<Agent>>,
    /// name → agent (same objects)
    pub(crate) agents_by_name: HashMap<String, Arc<Agent>>,
    /// Member names in insertion order
    pub(crate) names: Vec<String>,
    pub(crate) tasks: HashMap<String, Task>,
    pub(crate) roles: HashMap<String, RoleConfig>,
    pub(crate) shared: HashMap<String, SharedValue>,
    pub(crate) coordination: Vec<CoordinationEvent>,
    pub(crate) messages: Vec<Message>,
    /// Live message feeds by agent name
    pub(crate) subscribers: HashMap<String, mpsc::Sender<Message>>,
    /// path → locks held on it
    pub(crate) file_locks: HashMap<String, Vec<FileLock>>,
    pub(crate) file_changes: Vec<FileChange>,
    /// agent → latest status report
    pub(crate) detailed_status: HashMap<String, DetailedAgentStatus>,
    pub(crate) status_history: Vec<StatusChange>,
}

impl TeamState {
    fn insert_agent(&mut self, agent: Arc<Agent>) {
        if !self.agents_by_name.contains_key(&agent.name) {
            self.names.push(agent.name.clone());
        }
        self.agents_by_name
            .insert(agent.name.clone(), Arc::clone(&agent));
        self.agents.insert(agent.id.clone(), agent);
    }
}

/// Multi-agent team
pub struct Team {
    name: String,
    settings: CrewSettings,
    work_dir: PathBuf,
    parent: Arc<CoreAgent>,
    /// Tools spawned agents are curated from
    tool_pool: ToolRegistry,
    runner: Arc<dyn AgentRunner>,
    models: Arc<dyn ModelFactory>,
    pub(crate) store: Option<Arc<dyn SharedStore>>,
    compressor: ContextCompressor,
    work_check: WorkCheck,
    notifier: Notifier,
    comm_log: CommLog,
    pub(crate) state: RwLock<TeamState>,
    /// Expired-entry sweep, stopped when the team is dropped
    gc: Option<JoinHandle<()>>,
    /// Handle for background work that must outlive `&self`
    this: Weak<Team>,
}

impl Drop for Team {
    fn drop(&mut self) {
        if let Some(gc) = self.gc.take() {
            gc.abort();
        }
    }
}

impl std::fmt::Debug for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Team")
            .field("name", &self.name)
            .field("work_dir", &self.work_dir)
            .field("agents", &self.agent_names())
            .finish()
    }
}

impl Team {
    pub fn builder(name: impl Into<String>, parent: Arc<CoreAgent>) -> TeamBuilder {
        TeamBuilder::new(name, parent)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &CrewSettings {
        &self.settings
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn parent(&self) -> &Arc<CoreAgent> {
        &self.parent
    }

    pub fn store(&self) -> Option<&Arc<dyn SharedStore>> {
        self.store.as_ref()
    }

    pub fn compressor(&self) -> &ContextCompressor {
        &self.compressor
    }

    pub(crate) fn runner(&self) -> &Arc<dyn AgentRunner> {
        &self.runner
    }

    pub(crate) fn work_check(&self) -> &WorkCheck {
        &self.work_check
    }

    pub(crate) fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub(crate) fn comm_log(&self) -> &CommLog {
        &self.comm_log
    }

    pub(crate) fn arc(&self) -> Result<Arc<Team>> {
        self.this
            .upgrade()
            .ok_or_else(|| Error::Internal("team dropped".to_string()))
    }

    /// Best-effort events are skipped in quiet mode
    pub(crate) fn quiet(&self) -> bool {
        self.settings.quiet
    }

    // ========================================================================
    // Roles
    // ========================================================================

    pub fn add_role(&self, role: RoleConfig) {
        self.state.write().roles.insert(role.name.clone(), role);
    }

    /// Merge a loaded role set; later entries replace same-named roles
    pub fn with_roles(&self, roles: HashMap<String, RoleConfig>) {
        self.state.write().roles.extend(roles);
    }

    pub fn role(&self, name: &str) -> Option<RoleConfig> {
        self.state.read().roles.get(name).cloned()
    }

    pub fn roles(&self) -> HashMap<String, RoleConfig> {
        self.state.read().roles.clone()
    }

    /// Role names, sorted
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.read().roles.keys().cloned().collect();
        names.sort();
        names
    }

    // ========================================================================
    // Agent registry
    // ========================================================================

    /// Lookup by id, then by name
    pub fn get_agent(&self, id_or_name: &str) -> Option<Arc<Agent>> {
        let state = self.state.read();
        state
            .agents
            .get(id_or_name)
            .or_else(|| state.agents_by_name.get(id_or_name))
            .cloned()
    }

    /// Member names in the order they joined
    pub fn agent_names(&self) -> Vec<String> {
        self.state.read().names.clone()
    }

    pub fn list_agents(&self) -> Vec<AgentInfo> {
        let state = self.state.read();
        state
            .names
            .iter()
            .filter_map(|name| state.agents_by_name.get(name))
            .map(|agent| agent.info())
            .collect()
    }

    /// Build a new member from its role and register it.
    ///
    /// Role config is optional; a missing role gets a default prompt. The
    /// agent starts in `starting` and flips to `ready` in the background.
    pub async fn spawn_agent(&self, name: &str, role: &str) -> Result<Arc<Agent>> {
        let agent = self.build_agent(name, role)?;
        self.state.write().insert_agent(Arc::clone(&agent));
        info!("Spawned agent {} (role: {}, id: {})", agent.name, agent.role, agent.id);
        Self::mark_ready_later(&agent);
        Ok(agent)
    }

    /// Existing member named `name`, or a freshly spawned one. The check
    /// and insert happen under one write lock so concurrent calls never
    /// spawn twice.
    pub(crate) fn ensure_agent(&self, name: &str) -> Result<(Arc<Agent>, bool)> {
        if let Some(existing) = self.state.read().agents_by_name.get(name) {
            return Ok((Arc::clone(existing), false));
        }

        let built = self.build_agent(name, name)?;
        let mut state = self.state.write();
        if let Some(existing) = state.agents_by_name.get(name) {
            return Ok((Arc::clone(existing), false));
        }
        state.insert_agent(Arc::clone(&built));
        drop(state);

        info!("Spawned agent {} (id: {})", built.name, built.id);
        Self::mark_ready_later(&built);
        Ok((built, true))
    }

    fn mark_ready_later(agent: &Arc<Agent>) {
        let agent = Arc::clone(agent);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    agent.transition(AgentStatus::Starting, AgentStatus::Ready);
                });
            }
            Err(_) => {
                agent.transition(AgentStatus::Starting, AgentStatus::Ready);
            }
        }
    }

    fn build_agent(&self, name: &str, role: &str) -> Result<Arc<Agent>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("agent name is required".to_string()));
        }

        let config = self
            .role(role)
            .unwrap_or_else(|| RoleConfig::new(role, roles::default_prompt(role)));

        let tools = self.curate_tools(role, &config);
        let client = self.client_for(role, &config);

        let core = Arc::new(self.parent.spawn(client, tools, config.prompt.clone()));
        strip_delegation_tools(&core);

        let agent = Agent::new(
            uuid::Uuid::new_v4().to_string(),
            name,
            role,
            core,
            AgentStatus::Starting,
        )
        .with_metadata(config.metadata.clone());
        Ok(Arc::new(agent))
    }

    /// Role tool list (uncapped) or the curated defaults, minus restrictions
    fn curate_tools(&self, role: &str, config: &RoleConfig) -> ToolRegistry {
        let mut tools = if !config.tools.is_empty() {
            let names: Vec<&str> = config.tools.iter().map(String::as_str).collect();
            self.tool_pool.select(&names, 0)
        } else {
            let (curated, capped) = roles::curated_tools(role);
            let cap = if capped { self.settings.max_tools } else { 0 };
            self.tool_pool.select(curated, cap)
        };

        if !config.restricted_tools.is_empty() {
            for restricted in &config.restricted_tools {
                tools.remove(restricted);
            }
            debug!(
                "Restricted {} tools for role {}: {:?}",
                config.restricted_tools.len(),
                role,
                config.restricted_tools
            );
        }
        tools
    }

    /// `None` means: share the parent's client
    fn client_for(
        &self,
        role: &str,
        config: &RoleConfig,
    ) -> Option<(Arc<dyn ModelClient>, String)> {
        let spec = config.model.as_ref()?;
        match self.models.create(spec) {
            Ok(client) => {
                debug!("Created {} model client for role {}", spec.display_name(), role);
                Some((client, spec.display_name()))
            }
            Err(e) => {
                warn!(
                    "Failed to create model client for role {}: {}, falling back to mock",
                    role, e
                );
                Some((Arc::new(MockClient::echo()), "mock".to_string()))
            }
        }
    }

    /// Register a pre-built agent. Delegation tools are stripped; the name
    /// is trimmed and de-duplicated (`coder`, `coder_2`, ...).
    pub fn add(&self, name: &str, core: Arc<CoreAgent>) -> Arc<Agent> {
        strip_delegation_tools(&core);

        let mut state = self.state.write();
        let clean = match name.trim() {
            "" => format!("agent_{}", state.agents.len() + 1),
            trimmed => trimmed.to_string(),
        };

        let mut assigned = clean.clone();
        let mut counter = 1;
        while state.agents_by_name.contains_key(&assigned) {
            counter += 1;
            assigned = format!("{}_{}", clean, counter);
        }

        let (role, metadata) = match state.roles.get(&clean) {
            Some(config) if !config.name.is_empty() => {
                (config.name.clone(), config.metadata.clone())
            }
            Some(config) => (clean.clone(), config.metadata.clone()),
            None => (clean.clone(), HashMap::new()),
        };

        let agent = Arc::new(
            Agent::new(
                uuid::Uuid::new_v4().to_string(),
                assigned.as_str(),
                role,
                core,
                AgentStatus::Ready,
            )
            .with_metadata(metadata),
        );
        state.insert_agent(Arc::clone(&agent));
        debug!("👥 Added agent {} ({}) to team", agent.name, agent.role);
        agent
    }

    pub fn add_existing_agent(&self, name: &str, core: Arc<CoreAgent>) -> Arc<Agent> {
        self.add(name, core)
    }

    /// Spawn `name` with role `name`; on failure register a plain child of
    /// the parent instead. Either way the result cannot delegate.
    pub async fn add_agent(&self, name: &str) -> Arc<Agent> {
        match self.spawn_agent(name, name).await {
            Ok(agent) => agent,
            Err(e) => {
                debug!("add_agent fallback for {}: {}", name, e);
                let mut tools = self.tool_pool.clone();
                for tool in DELEGATION_TOOLS {
                    tools.remove(tool);
                }
                let core = self.parent.spawn(None, tools, roles::default_prompt(name));
                self.add(name, Arc::new(core))
            }
        }
    }

    /// Mark stopping and remove from the team
    pub fn stop_agent(&self, id_or_name: &str) -> Result<()> {
        let mut state = self.state.write();
        let agent = state
            .agents
            .get(id_or_name)
            .or_else(|| state.agents_by_name.get(id_or_name))
            .cloned()
            .ok_or_else(|| Error::AgentNotFound(id_or_name.to_string()))?;

        agent.set_status(AgentStatus::Stopping);
        state.agents.remove(&agent.id);
        state.agents_by_name.remove(&agent.name);
        state.names.retain(|n| n != &agent.name);
        info!("Stopped agent {} ({})", agent.name, agent.id);
        Ok(())
    }

    // ========================================================================
    // Delegation
    // ========================================================================

    /// Delegate `input` to the agent named `agent`, spawning it if needed
    pub async fn call(&self, agent: &str, input: &str) -> Result<String> {
        self.call_with_cancel(agent, input, CancellationToken::new())
            .await
    }

    /// `call` that also stops when `cancel` fires
    pub async fn call_with_cancel(
        &self,
        agent: &str,
        input: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        DelegationSession::new(self, agent, input)
            .with_cancel(cancel)
            .run()
            .await
    }

    /// Alias of `call` for role-based delegation
    pub async fn delegate_task(&self, role: &str, task: &str) -> Result<String> {
        self.call(role, task).await
    }
}

/// Remove delegation tools and drop the cached schemas
fn strip_delegation_tools(core: &CoreAgent) {
    let mut removed = false;
    for tool in DELEGATION_TOOLS {
        removed |= core.remove_tool(tool);
    }
    core.invalidate_tool_cache();
    if removed {
        debug!("Stripped delegation tools from {}", core.model_name());
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles a `Team`
///
/// ```ignore
/// let team = Team::builder("session-1", parent)
///     .settings(CrewSettings::from_env())
///     .roles(load_roles(&includes, config_dir))
///     .work_dir(".")
///     .build()?;
/// ```
pub struct TeamBuilder {
    name: String,
    parent: Arc<CoreAgent>,
    settings: CrewSettings,
    store: Option<Option<Arc<dyn SharedStore>>>,
    roles: HashMap<String, RoleConfig>,
    runner: Option<Arc<dyn AgentRunner>>,
    models: Arc<dyn ModelFactory>,
    tools: Option<ToolRegistry>,
    work_dir: Option<PathBuf>,
    notifier: Option<Notifier>,
    summaries: Option<Arc<ProjectSummaryCache>>,
}

impl TeamBuilder {
    pub fn new(name: impl Into<String>, parent: Arc<CoreAgent>) -> Self {
        Self {
            name: name.into(),
            parent,
            settings: CrewSettings::default(),
            store: None,
            roles: HashMap::new(),
            runner: None,
            models: Arc::new(MockModelFactory),
            tools: None,
            work_dir: None,
            notifier: None,
            summaries: None,
        }
    }

    pub fn settings(mut self, settings: CrewSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Durable backing; defaults to the store named in the settings
    pub fn store(mut self, store: Arc<dyn SharedStore>) -> Self {
        self.store = Some(Some(store));
        self
    }

    /// Memory only
    pub fn without_store(mut self) -> Self {
        self.store = Some(None);
        self
    }

    pub fn roles(mut self, roles: HashMap<String, RoleConfig>) -> Self {
        self.roles.extend(roles);
        self
    }

    pub fn role(mut self, role: RoleConfig) -> Self {
        self.roles.insert(role.name.clone(), role);
        self
    }

    /// Defaults to a `ModelRunner` rooted at the work dir
    pub fn runner(mut self, runner: Arc<dyn AgentRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn model_factory(mut self, models: Arc<dyn ModelFactory>) -> Self {
        self.models = models;
        self
    }

    /// Tools spawned agents are curated from; defaults to the parent's
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Defaults to the current directory
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Defaults to stderr, or silence in quiet mode
    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn summary_cache(mut self, cache: Arc<ProjectSummaryCache>) -> Self {
        self.summaries = Some(cache);
        self
    }

    pub fn build(self) -> Result<Arc<Team>> {
        let work_dir = match self.work_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let store = match self.store {
            Some(store) => store,
            None => Some(store_from_settings(&self.settings)?),
        };
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ModelRunner::new(&work_dir)));
        let summaries = self
            .summaries
            .unwrap_or_else(|| Arc::new(ProjectSummaryCache::new(&work_dir)));
        let compressor = ContextCompressor::new(self.settings.context.clone(), summaries);
        let notifier = self
            .notifier
            .unwrap_or_else(|| Notifier::from_settings(&self.settings));
        let comm_log = CommLog::from_settings(&self.settings, &work_dir);
        let tool_pool = self.tools.unwrap_or_else(|| self.parent.tools());
        let state = TeamState {
            roles: self.roles,
            ..Default::default()
        };
        let gc_interval = self.settings.store.gc_interval;
        let gc = match (&store, tokio::runtime::Handle::try_current()) {
            (Some(store), Ok(_)) if !gc_interval.is_zero() => Some(spawn_gc(
                Arc::clone(store),
                gc_interval,
            )),
            _ => None,
        };

        let team = Arc::new_cyclic(|this| Team {
            name: self.name,
            settings: self.settings,
            work_check: WorkCheck::new(&work_dir),
            work_dir,
            parent: self.parent,
            tool_pool,
            runner,
            models: self.models,
            store,
            compressor,
            notifier,
            comm_log,
            state: RwLock::new(state),
            gc,
            this: this.clone(),
        });

        team.load_coordination_from_store();
        info!(
            "Team {} ready ({} roles, {} coordination events restored)",
            team.name,
            team.state.read().roles.len(),
            team.state.read().coordination.len()
        );
        Ok(team)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crew_core::ModelSpec;
    use crew_foundation::{Tool, ToolContext, ToolMeta, ToolResult};
    use serde_json::Value;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn meta(&self) -> ToolMeta {
            ToolMeta::new(self.0)
        }
        fn schema(&self) -> Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, _input: Value, _context: &dyn ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::success(self.0))
        }
    }

    fn pool() -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        for name in [
            "agent", "parallel_agents", "view", "read_lines", "edit_range", "create", "bash",
            "grep", "lsp_diagnostics", "web_search", "api", "ls", "find", "glob", "patch",
        ] {
            tools.register(Arc::new(Named(name)));
        }
        tools
    }

    fn team(settings: CrewSettings) -> Arc<Team> {
        let parent = Arc::new(CoreAgent::new(Arc::new(MockClient::echo()), "mock/parent", pool()));
        Team::builder("test", parent)
            .settings(settings)
            .without_store()
            .work_dir(std::env::temp_dir())
            .notifier(Notifier::Silent)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_spawn_curates_tools() {
        let team = team(CrewSettings::default());

        let coder = team.spawn_agent("coder", "coder").await.unwrap();
        let tools = coder.core().tool_names();
        assert!(tools.contains(&"edit_range".to_string()));
        assert!(tools.contains(&"patch".to_string()));
        assert!(!tools.contains(&"agent".to_string()));
        assert!(!tools.contains(&"parallel_agents".to_string()));
        assert_eq!(coder.core().prompt(), "You are a coder agent");
        assert_eq!(coder.core().model_name(), "mock/parent");

        let reviewer = team.spawn_agent("rev", "reviewer").await.unwrap();
        assert_eq!(
            reviewer.core().tool_names(),
            vec!["lsp_diagnostics", "read_lines", "view"]
        );
    }

    #[tokio::test]
    async fn test_spawn_caps_non_coder_roles() {
        let mut settings = CrewSettings::default();
        settings.max_tools = 1;
        let team = team(settings);

        let tester = team.spawn_agent("t", "tester").await.unwrap();
        assert_eq!(tester.core().tool_names(), vec!["view"]);

        let coder = team.spawn_agent("c", "coder").await.unwrap();
        assert!(coder.core().tool_names().len() > 1);
    }

    #[tokio::test]
    async fn test_role_config_applies() {
        let team = team(CrewSettings::default());
        team.add_role(
            RoleConfig::new("ops", "You run things")
                .with_tools(["bash", "ls", "grep", "agent"])
                .with_restricted_tools(["bash"])
                .with_model(ModelSpec::new("nope")),
        );

        let ops = team.spawn_agent("ops", "ops").await.unwrap();
        assert_eq!(ops.core().prompt(), "You run things");
        assert_eq!(ops.core().tool_names(), vec!["grep", "ls"]);
        // unknown provider falls back to the mock client
        assert_eq!(ops.core().model_name(), "mock");
    }

    #[tokio::test]
    async fn test_spawn_flips_to_ready() {
        let team = team(CrewSettings::default());
        let agent = team.spawn_agent("coder", "coder").await.unwrap();
        for _ in 0..50 {
            if agent.status() == AgentStatus::Ready {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(agent.status(), AgentStatus::Ready);
    }

    #[tokio::test]
    async fn test_add_strips_delegation_and_dedups() {
        let team = team(CrewSettings::default());
        let core = Arc::new(CoreAgent::new(Arc::new(MockClient::echo()), "mock", pool()));
        assert!(core.has_tool("agent"));

        let first = team.add("  helper ", Arc::clone(&core));
        assert_eq!(first.name, "helper");
        assert!(!first.core().has_tool("agent"));
        assert!(!first.core().has_tool("parallel_agents"));
        assert_eq!(first.status(), AgentStatus::Ready);

        let second = team.add("helper", Arc::new(CoreAgent::new(Arc::new(MockClient::echo()), "m", pool())));
        assert_eq!(second.name, "helper_2");

        let unnamed = team.add("", Arc::new(CoreAgent::new(Arc::new(MockClient::echo()), "m", pool())));
        assert_eq!(unnamed.name, "agent_3");
        assert_eq!(team.agent_names(), vec!["helper", "helper_2", "agent_3"]);
    }

    #[tokio::test]
    async fn test_add_agent_fallback_cannot_delegate() {
        let team = team(CrewSettings::default());

        let spawned = team.add_agent("coder").await;
        assert!(!spawned.core().has_tool("agent"));

        // empty name fails to spawn and falls back to `add`
        let fallback = team.add_agent("  ").await;
        assert_eq!(fallback.name, "agent_2");
        assert!(!fallback.core().has_tool("agent"));
        assert!(fallback.core().has_tool("view"));
    }

    #[tokio::test]
    async fn test_get_and_stop_agent() {
        let team = team(CrewSettings::default());
        let agent = team.spawn_agent("coder", "coder").await.unwrap();

        assert_eq!(team.get_agent(&agent.id).unwrap().name, "coder");
        assert_eq!(team.get_agent("coder").unwrap().id, agent.id);

        team.stop_agent(&agent.id).unwrap();
        assert_eq!(agent.status(), AgentStatus::Stopping);
        assert!(team.get_agent("coder").is_none());
        assert!(team.agent_names().is_empty());

        let err = team.stop_agent("ghost").unwrap_err();
        assert_eq!(err.to_string(), "agent ghost not found");
    }

    #[tokio::test]
    async fn test_ensure_agent_is_single_spawn() {
        let team = team(CrewSettings::default());
        let (first, created) = team.ensure_agent("coder").unwrap();
        assert!(created);
        let (second, created) = team.ensure_agent("coder").unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);
        assert_eq!(team.list_agents().len(), 1);
    }

    #[tokio::test]
    async fn test_role_listing() {
        let team = team(CrewSettings::default());
        team.add_role(RoleConfig::new("writer", "Write"));
        team.add_role(RoleConfig::new("coder", "Code"));
        assert_eq!(team.role_names(), vec!["coder", "writer"]);
        assert_eq!(team.role("coder").unwrap().prompt, "Code");
        assert_eq!(team.roles().len(), 2);

        let mut loaded = HashMap::new();
        loaded.insert("coder".to_string(), RoleConfig::new("coder", "Code harder"));
        loaded.insert("tester".to_string(), RoleConfig::new("tester", "Test"));
        team.with_roles(loaded);
        assert_eq!(team.role_names(), vec!["coder", "tester", "writer"]);
        assert_eq!(team.role("coder").unwrap().prompt, "Code harder");
    }
}
