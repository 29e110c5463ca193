//! Subcommand implementations

use anyhow::{bail, Context};
use crew_core::{CoreAgent, MockClient, ToolRegistry};
use crew_foundation::{CrewSettings, StoreKind};
use crew_team::{
    curated_tools, install_delegation_tools, load_roles, ParallelCall, SharedValue, Team,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const ORCHESTRATOR_PROMPT: &str = "You are agent 0, the orchestrator. Delegate work to team members with the agent and parallel_agents tools, then report back.";

/// What every command needs to build a team
pub struct CommandContext {
    pub team: String,
    pub settings: CrewSettings,
    pub roles: Vec<PathBuf>,
    pub work_dir: PathBuf,
}

fn build_team(ctx: &CommandContext) -> anyhow::Result<Arc<Team>> {
    let parent = Arc::new(
        CoreAgent::new(Arc::new(MockClient::echo()), "mock", ToolRegistry::new())
            .with_prompt(ORCHESTRATOR_PROMPT),
    );
    let base_dir = std::env::current_dir()?;
    let roles = load_roles(&ctx.roles[..], &base_dir);

    let team = Team::builder(ctx.team.as_str(), parent)
        .settings(ctx.settings.clone())
        .roles(roles)
        .work_dir(&ctx.work_dir)
        .build()
        .with_context(|| format!("failed to set up team '{}'", ctx.team))?;
    install_delegation_tools(&team);
    debug!("Team {} ready in {}", ctx.team, ctx.work_dir.display());
    Ok(team)
}

/// Commands that read back earlier runs are pointless over memory
fn warn_if_ephemeral(ctx: &CommandContext) {
    if ctx.settings.store.kind == StoreKind::Memory && !ctx.settings.quiet {
        eprintln!("note: using the memory store; nothing persists between runs (try --store file)");
    }
}

/// Token cancelled on Ctrl-C
fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

// ============================================================================
// Delegation
// ============================================================================

pub async fn delegate(ctx: &CommandContext, agent: &str, task: &str) -> anyhow::Result<()> {
    let team = build_team(ctx)?;
    let output = team
        .call_with_cancel(agent, task, interrupt_token())
        .await?;
    println!("{}", output);
    Ok(())
}

pub async fn parallel(ctx: &CommandContext, specs: &[String]) -> anyhow::Result<()> {
    let calls = specs
        .iter()
        .map(|spec| match spec.split_once('=') {
            Some((agent, task)) => Ok(ParallelCall::new(agent.trim(), task.trim())),
            None => bail!("expected agent=task, got '{}'", spec),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let team = build_team(ctx)?;
    println!("{}", team.call_parallel(&calls).await?);
    Ok(())
}

// ============================================================================
// Inspection
// ============================================================================

pub fn history(ctx: &CommandContext, limit: usize, summary: bool) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    let team = build_team(ctx)?;

    if summary {
        print!("{}", team.coordination_summary());
        return Ok(());
    }

    let lines = team.coordination_history(limit);
    if lines.is_empty() {
        println!("No coordination events recorded.");
    }
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

pub fn events(ctx: &CommandContext, limit: usize) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    let team = build_team(ctx)?;
    let events = team.workspace_events(limit);
    if events.is_empty() {
        println!("No workspace events recorded.");
        return Ok(());
    }
    for event in events {
        println!(
            "{} {:<12} {:<22} {}",
            event.timestamp.format("%H:%M:%S"),
            event.agent_id,
            event.event_type,
            event.description
        );
    }
    Ok(())
}

pub fn roles(ctx: &CommandContext) -> anyhow::Result<()> {
    let team = build_team(ctx)?;
    let names = team.role_names();

    if names.is_empty() {
        println!("No roles configured; agents use built-in defaults:\n");
        for role in ["coder", "reviewer", "researcher", "assistant"] {
            let (tools, capped) = curated_tools(role);
            let cap = if capped { ctx.settings.max_tools } else { 0 };
            let shown: Vec<&str> = match cap {
                0 => tools.to_vec(),
                n => tools.iter().take(n).copied().collect(),
            };
            println!("  {:<12} {}", role, shown.join(", "));
        }
        return Ok(());
    }

    println!("{:<16} {:<20} {}", "Role", "Model", "Tools");
    println!("{}", "-".repeat(72));
    for name in names {
        let Some(role) = team.role(&name) else {
            continue;
        };
        let model = role
            .model
            .as_ref()
            .map(|m| m.display_name())
            .unwrap_or_else(|| "inherited".to_string());
        let tools = if role.tools.is_empty() {
            curated_tools(&name).0.join(", ")
        } else {
            role.tools.join(", ")
        };
        println!("{:<16} {:<20} {}", name, model, tools);
    }
    Ok(())
}

// ============================================================================
// Shared memory
// ============================================================================

pub fn shared_get(ctx: &CommandContext, key: &str) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    let team = build_team(ctx)?;
    match team.get_shared_data(key) {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value.to_json())?),
        None => bail!("no shared value for '{}'", key),
    }
    Ok(())
}

pub fn shared_set(ctx: &CommandContext, key: &str, raw: &str) -> anyhow::Result<()> {
    let team = build_team(ctx)?;
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(json) => SharedValue::normalize(json),
        Err(_) => SharedValue::Text(raw.to_string()),
    };
    let kind = value.value_type();
    team.set_shared_data(key, value);
    println!("✓ {} = <{}>", key, kind);
    Ok(())
}

pub fn shared_list(ctx: &CommandContext) -> anyhow::Result<()> {
    warn_if_ephemeral(ctx);
    let team = build_team(ctx)?;
    let Some(store) = team.store() else {
        return Ok(());
    };
    let mut keys: Vec<String> = store
        .keys(team.name())?
        .into_iter()
        .filter(|k| !k.starts_with("coord-"))
        .collect();
    keys.sort();
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

pub fn gc(ctx: &CommandContext) -> anyhow::Result<()> {
    let team = build_team(ctx)?;
    let Some(store) = team.store() else {
        return Ok(());
    };
    let removed = store.cleanup_expired()?;
    println!("Removed {} expired entries", removed);
    Ok(())
}
