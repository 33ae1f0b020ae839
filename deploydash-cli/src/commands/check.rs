//! `deploydash check github|tracker`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use deploydash_core::settings;
use deploydash_gateway::{GitHubClient, TrackerClient, VcsGateway};

use super::home;

#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Authenticate against the configured VCS API.
    Github,
    /// Authenticate against the configured ticket tracker.
    Tracker,
}

pub fn run(cmd: CheckCommand) -> Result<()> {
    let settings = settings::load_at(&home()?).context("failed to load settings")?;
    match cmd {
        CheckCommand::Github => {
            if settings.resolved_token().is_none() {
                println!(
                    "{} no token configured; requests are anonymous and rate limited",
                    "!".yellow()
                );
            }
            let client = GitHubClient::from_settings(&settings);
            let login = client
                .check_connection()
                .with_context(|| format!("connection to {} failed", client.base_url()))?;
            println!("{} connected to {} as {}", "✓".green(), client.base_url(), login.bold());
        }
        CheckCommand::Tracker => {
            let tracker_settings = settings.tracker.as_ref().context(
                "no ticket tracker configured; run `deploydash config set tracker-url <url>`",
            )?;
            let client = TrackerClient::from_settings(
                tracker_settings,
                Duration::from_secs(settings.http_timeout_secs),
            )
            .context("invalid tracker settings")?;
            let user = client
                .check_connection()
                .with_context(|| format!("connection to {} failed", client.base_url()))?;
            println!("{} connected to {} as {}", "✓".green(), client.base_url(), user.bold());
        }
    }
    Ok(())
}
