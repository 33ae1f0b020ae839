//! `deploydash stats`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::{format_age, open_store, print_json, short_sha};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// How many recent actions to include.
    #[arg(long, default_value_t = 10)]
    pub recent: usize,

    #[arg(long)]
    pub json: bool,
}

impl StatsArgs {
    pub fn run(self) -> Result<()> {
        let store = open_store()?;
        let stats = store
            .dashboard_stats(self.recent)
            .context("failed to compute dashboard stats")?;
        if self.json {
            return print_json(&stats);
        }

        println!(
            "deploydash v{} | {} repositories ({} monorepos, {} kubernetes)",
            env!("CARGO_PKG_VERSION"),
            stats.repositories,
            stats.monorepos,
            stats.kubernetes_repositories,
        );
        println!(
            "{} services | {} resources | {} deployments | {} actions",
            stats.services.to_string().bold(),
            stats.resources.to_string().bold(),
            stats.deployments.to_string().bold(),
            stats.actions.to_string().bold(),
        );

        if !stats.recent_actions.is_empty() {
            println!();
            println!("{}", "RECENT ACTIONS".bold());
            for action in &stats.recent_actions {
                println!(
                    "  {:<10} {:<12} {} {} {}",
                    action.action_type.as_str(),
                    action.status,
                    short_sha(&action.commit_sha),
                    action.branch,
                    format_age(Some(action.started_at)).bright_black(),
                );
            }
        }
        Ok(())
    }
}
