//! `deploydash daemon`: background sync lifecycle over the control socket.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use deploydash_core::RepositoryId;
use deploydash_daemon::paths::socket_path;
use deploydash_daemon::{request_status, request_stop, request_sync, start_blocking, DaemonError};

#[derive(Subcommand, Debug)]
pub enum DaemonCommand {
    /// Run the daemon in the foreground (scheduler + socket server).
    Start {
        /// One JSON object per log line.
        #[arg(long)]
        log_json: bool,
    },
    /// Request graceful daemon shutdown over the Unix socket.
    Stop,
    /// Query daemon runtime status over the Unix socket.
    Status,
    /// Ask the running daemon for a pass now; waits for it to finish.
    Sync {
        /// Only this repository.
        repository: Option<i64>,
    },
}

pub fn run(command: DaemonCommand) -> Result<()> {
    let home = super::home()?;

    match command {
        DaemonCommand::Start { log_json } => {
            start_blocking(&home, log_json).context("daemon exited with error")?;
        }
        DaemonCommand::Stop => match request_stop(&home) {
            Ok(()) => println!("daemon stop requested"),
            Err(DaemonError::DaemonNotRunning { .. }) => {
                println!("daemon is not running");
            }
            Err(err) => return Err(err).context("failed to stop daemon"),
        },
        DaemonCommand::Status => match request_status(&home) {
            Ok(status) => {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let payload = serde_json::json!({
                    "running": false,
                    "socket": socket_path(&home).display().to_string(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&payload)
                        .context("failed to render daemon status JSON")?
                );
            }
            Err(err) => return Err(err).context("failed to query daemon status"),
        },
        DaemonCommand::Sync { repository } => {
            let summary = request_sync(&home, repository.map(RepositoryId))
                .context("daemon sync failed")?;
            println!(
                "{} daemon pass finished: {}/{} repositories synced",
                "✓".green(),
                summary.succeeded(),
                summary.outcomes.len()
            );
        }
    }

    Ok(())
}
