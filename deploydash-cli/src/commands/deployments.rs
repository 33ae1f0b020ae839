//! `deploydash deployments`: current targets, or per-commit history of one service.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::{CommitSource, Deployment, ServiceId};
use deploydash_sync::{commit_deployments, CommitDeployments};

use super::{format_age, github_client, open_store, print_json, short_sha};

#[derive(Args, Debug)]
pub struct DeploymentsArgs {
    /// Only deployments of this service.
    #[arg(long)]
    pub service: Option<i64>,

    /// Join the service's recent commits against its deployments (queries the VCS).
    #[arg(long, requires = "service")]
    pub history: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct DeploymentRow {
    service: String,
    environment: String,
    region: String,
    namespace: String,
    tag: String,
    commit: String,
    source: String,
    updated: String,
}

impl DeploymentsArgs {
    pub fn run(self) -> Result<()> {
        let store = open_store()?;

        if self.history {
            let Some(id) = self.service.map(ServiceId) else {
                bail!("--history requires --service <id>");
            };
            let gateway = github_client()?;
            let history = commit_deployments(&store, &gateway, id)
                .with_context(|| format!("failed to load history of service {id}"))?;
            if self.json {
                return print_json(&history);
            }
            print_history(&history);
            return Ok(());
        }

        let deployments = match self.service.map(ServiceId) {
            Some(id) => store.deployments_for_service(id),
            None => store.list_deployments(),
        }
        .context("failed to load deployments")?;
        if self.json {
            return print_json(&deployments);
        }
        if deployments.is_empty() {
            println!("No deployments recorded. Sync a kubernetes-resources repository first.");
            return Ok(());
        }

        let names: HashMap<ServiceId, String> = store
            .list_services()
            .context("failed to load services")?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();
        let rows: Vec<DeploymentRow> = deployments
            .iter()
            .map(|d| deployment_row(d, &names))
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn deployment_row(d: &Deployment, names: &HashMap<ServiceId, String>) -> DeploymentRow {
    DeploymentRow {
        service: names
            .get(&d.service_id)
            .cloned()
            .unwrap_or_else(|| d.service_id.to_string()),
        environment: d.environment.clone(),
        region: d.region.clone(),
        namespace: d.namespace.clone(),
        tag: d.tag.clone(),
        commit: short_sha(&d.commit_sha),
        source: source_label(d.commit_source),
        updated: format_age(Some(d.updated_at)),
    }
}

fn source_label(source: CommitSource) -> String {
    match source {
        CommitSource::None => source.as_str().bright_black().to_string(),
        CommitSource::ManifestCommit => source.as_str().yellow().to_string(),
        _ => source.as_str().green().to_string(),
    }
}

fn print_history(history: &[CommitDeployments]) {
    if history.is_empty() {
        println!("No commits found for this service.");
        return;
    }
    for entry in history {
        let subject = entry.commit.message.lines().next().unwrap_or_default();
        println!(
            "{} {} {}",
            short_sha(&entry.commit.sha).bold(),
            subject,
            format!("({})", entry.commit.author).bright_black()
        );
        for target in &entry.targets {
            let marker = if target.deployed {
                "●".green().to_string()
            } else {
                "○".bright_black().to_string()
            };
            let tag = target.tag.as_deref().unwrap_or("");
            println!(
                "    {marker} {}/{}/{} {}",
                target.environment, target.region, target.namespace, tag
            );
        }
    }
}
