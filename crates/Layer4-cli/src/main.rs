//! Crew CLI - Main entry point

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use crew_foundation::{CrewSettings, StoreKind, CREW_CONFIG_FILE};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Crew - delegate work to a team of agents
#[derive(Parser, Debug)]
#[command(name = "crew")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Team name; shared memory and history are kept per team
    #[arg(short, long, default_value = "default", global = true)]
    team: String,

    /// Settings file (defaults to ./crew.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Role definition files (YAML), repeatable
    #[arg(short, long = "role", global = true)]
    roles: Vec<PathBuf>,

    /// Working directory agents operate in
    #[arg(short = 'C', long, global = true)]
    work_dir: Option<PathBuf>,

    /// Shared store backend
    #[arg(long, value_enum, global = true)]
    store: Option<StoreArg>,

    /// Directory for the file store
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Delegation timeout (e.g. 90s, 15m)
    #[arg(long, value_parser = humantime::parse_duration, global = true)]
    timeout: Option<Duration>,

    /// Suppress progress narration
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StoreArg {
    Memory,
    File,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delegate a task to one agent
    Delegate {
        /// Agent name (spawned from its role on first use)
        agent: String,
        /// Task text
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,
    },
    /// Delegate several tasks at once (`agent=task` pairs)
    Parallel {
        #[arg(required = true, num_args = 1..)]
        tasks: Vec<String>,
    },
    /// Show the coordination history
    History {
        /// Number of events to show (0 = all)
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Print the short summary instead
        #[arg(short, long)]
        summary: bool,
    },
    /// Show recent workspace events
    Events {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// List configured roles and the tools they receive
    Roles,
    /// Read or write shared memory
    Shared {
        #[command(subcommand)]
        action: SharedAction,
    },
    /// Remove expired entries from the shared store
    Gc,
}

#[derive(Subcommand, Debug)]
enum SharedAction {
    /// Print one value as JSON
    Get { key: String },
    /// Store a value (JSON when it parses, text otherwise)
    Set { key: String, value: String },
    /// List every key this team holds
    List,
}

impl Args {
    /// Settings file, then environment, then flags
    fn settings(&self) -> anyhow::Result<CrewSettings> {
        let default_file = PathBuf::from(CREW_CONFIG_FILE);
        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None if default_file.exists() => Some(default_file),
            None => None,
        };
        let mut settings = CrewSettings::load(path.as_deref())?;

        if let Some(timeout) = self.timeout {
            settings.delegation_timeout = timeout;
        }
        if self.quiet {
            settings.quiet = true;
        }
        if self.debug {
            settings.debug = true;
        }
        match self.store {
            Some(StoreArg::Memory) => settings.store.kind = StoreKind::Memory,
            Some(StoreArg::File) => settings.store.kind = StoreKind::File,
            None => {}
        }
        if let Some(path) = &self.store_path {
            settings.store.kind = StoreKind::File;
            settings.store.path = Some(path.clone());
        }
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let settings = args.settings()?;

    // Initialize logging
    let log_level = if settings.debug {
        "debug"
    } else {
        args.log_level.as_str()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let work_dir = match &args.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let ctx = commands::CommandContext {
        team: args.team.clone(),
        settings,
        roles: args.roles.clone(),
        work_dir,
    };

    match args.command {
        Command::Delegate { agent, task } => commands::delegate(&ctx, &agent, &task.join(" ")).await,
        Command::Parallel { tasks } => commands::parallel(&ctx, &tasks).await,
        Command::History { limit, summary } => commands::history(&ctx, limit, summary),
        Command::Events { limit } => commands::events(&ctx, limit),
        Command::Roles => commands::roles(&ctx),
        Command::Shared { action } => match action {
            SharedAction::Get { key } => commands::shared_get(&ctx, &key),
            SharedAction::Set { key, value } => commands::shared_set(&ctx, &key, &value),
            SharedAction::List => commands::shared_list(&ctx),
        },
        Command::Gc => commands::gc(&ctx),
    }
}
