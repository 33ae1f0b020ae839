//! `deploydash sync`: one pass over one or all repositories, in-process.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use deploydash_core::{settings, RepositoryId};
use deploydash_gateway::GitHubClient;
use deploydash_sync::{
    pipeline::{self, SyncScope},
    RepositoryOutcome, RepositorySyncReport,
};

use super::{home, open_store, print_json};

/// Arguments for `deploydash sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Repository id to sync (omit when using `--all`).
    pub repository: Option<i64>,

    /// Sync every tracked repository.
    #[arg(long, conflicts_with = "repository")]
    pub all: bool,

    /// Emit the pass summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let scope = match (self.all, self.repository) {
            (true, _) => SyncScope::All,
            (false, Some(id)) => SyncScope::Repository(RepositoryId(id)),
            (false, None) => bail!("provide a repository id or use --all"),
        };

        let settings = settings::load_at(&home()?).context("failed to load settings")?;
        let store = open_store()?;
        let gateway = GitHubClient::from_settings(&settings);

        let failure = match scope {
            SyncScope::Repository(id) => format!("sync failed for repository {id}"),
            SyncScope::All => "sync --all failed".to_string(),
        };
        let summary = pipeline::run(store, gateway, scope).context(failure)?;

        if self.json {
            return print_json(&summary);
        }

        if summary.outcomes.is_empty() {
            println!("No repositories tracked. Run `deploydash repo add <url>` first.");
            return Ok(());
        }
        for outcome in &summary.outcomes {
            print_outcome(outcome);
        }
        if summary.outcomes.len() > 1 {
            println!(
                "{} succeeded, {} failed in {} ms",
                summary.succeeded(),
                summary.failed(),
                summary.duration_ms
            );
        }
        if summary.failed() > 0 {
            bail!("{} repositories failed to sync", summary.failed());
        }
        Ok(())
    }
}

fn print_outcome(outcome: &RepositoryOutcome) {
    match (&outcome.report, &outcome.error) {
        (Some(report), _) => print_report(report),
        (None, Some(error)) => {
            println!("{} '{}' failed: {}", "✗".red(), outcome.name, error);
        }
        (None, None) => {}
    }
}

fn print_report(report: &RepositorySyncReport) {
    let mut parts = Vec::new();
    if let Some(services) = &report.services {
        parts.push(format!(
            "services +{} ~{} ={} -{}",
            services.inserted, services.updated, services.unchanged, services.deleted
        ));
    }
    if report.deployments > 0 || report.skipped_manifests > 0 {
        parts.push(format!(
            "{} deployments ({} overlays skipped)",
            report.deployments, report.skipped_manifests
        ));
    }
    if report.resources > 0 {
        parts.push(format!("{} resources", report.resources));
    }
    parts.push(format!("{} actions", report.actions));

    println!(
        "{} '{}' synced in {} ms: {}",
        "✓".green(),
        report.name,
        report.duration_ms,
        parts.join(", ")
    );
    for warning in &report.warnings {
        println!("  {} {}", "!".yellow(), warning);
    }
}
