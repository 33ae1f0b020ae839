//! deploydash: deployment correlation dashboard CLI.
//!
//! # Usage
//!
//! ```text
//! deploydash repo add <url> [--kind monorepo|kubernetes-resources] [--name ...]
//! deploydash repo list|show <id>|remove <id>
//! deploydash sync <repo-id> | --all [--json]
//! deploydash services [<repo-id>] [--json]
//! deploydash deployments [--service <id>] [--history] [--json]
//! deploydash actions [--repo <id>] [--service <id>] [--limit N] [--json]
//! deploydash stats [--json]
//! deploydash scan <checkout-dir> [--json]
//! deploydash project add|list|remove
//! deploydash task add|list|status|refresh-titles
//! deploydash config show|set <key> <value>
//! deploydash check github|tracker
//! deploydash daemon start [--log-json]|stop|status
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    actions::ActionsArgs, check::CheckCommand, config::ConfigCommand, daemon::DaemonCommand,
    deployments::DeploymentsArgs, project::ProjectCommand, repo::RepoCommand, scan::ScanArgs,
    services::ServicesArgs, stats::StatsArgs, sync::SyncArgs, task::TaskCommand,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "deploydash",
    version,
    about = "Track which commit of each service runs in every environment",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register and inspect tracked repositories.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Pull services, deployments, resources, and workflow runs from the VCS.
    Sync(SyncArgs),

    /// List discovered microservices.
    Services(ServicesArgs),

    /// Show what runs where, or the commit history of one service.
    Deployments(DeploymentsArgs),

    /// Show recent build and deployment workflow runs.
    Actions(ActionsArgs),

    /// Dashboard counters.
    Stats(StatsArgs),

    /// Read overlay tags from a local manifest checkout without touching the store.
    Scan(ScanArgs),

    /// Manage planner projects.
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage planner tasks.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Show or edit ~/.deploydash/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Verify credentials against the VCS platform or ticket tracker.
    Check {
        #[command(subcommand)]
        command: CheckCommand,
    },

    /// Run or control the background sync daemon.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !matches!(cli.command, Commands::Daemon { .. }) {
        init_logging();
    }

    match cli.command {
        Commands::Repo { command } => commands::repo::run(command),
        Commands::Sync(args) => args.run(),
        Commands::Services(args) => args.run(),
        Commands::Deployments(args) => args.run(),
        Commands::Actions(args) => args.run(),
        Commands::Stats(args) => args.run(),
        Commands::Scan(args) => args.run(),
        Commands::Project { command } => commands::project::run(command),
        Commands::Task { command } => commands::task::run(command),
        Commands::Config { command } => commands::config::run(command),
        Commands::Check { command } => commands::check::run(command),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}

/// Warnings and above on stderr, so `--json` output on stdout stays parseable.
/// The daemon installs its own subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
