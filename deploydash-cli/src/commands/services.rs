//! `deploydash services [<repo-id>] [--prs <service-id>]`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::{RepositoryId, ServiceId};
use deploydash_gateway::{PullRequest, PullRequestState};
use deploydash_store::Store;
use deploydash_sync::service_pull_requests;

use super::{github_client, open_store, print_json};

#[derive(Args, Debug)]
pub struct ServicesArgs {
    /// Only services of this repository.
    #[arg(conflicts_with = "prs")]
    pub repository: Option<i64>,

    /// Recent pull requests that change files of this service.
    #[arg(long, value_name = "SERVICE_ID")]
    pub prs: Option<i64>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ServiceRow {
    id: i64,
    repo: i64,
    name: String,
    path: String,
    description: String,
}

#[derive(Tabled)]
struct PullRow {
    #[tabled(rename = "#")]
    number: i64,
    state: String,
    title: String,
    author: String,
    branch: String,
    created: String,
}

impl ServicesArgs {
    pub fn run(self) -> Result<()> {
        let store = open_store()?;
        if let Some(service) = self.prs {
            return pull_requests(&store, ServiceId(service), self.json);
        }

        let services = match self.repository.map(RepositoryId) {
            Some(id) => {
                store
                    .repository(id)
                    .with_context(|| format!("repository {id} not found"))?;
                store.services_for_repository(id)
            }
            None => store.list_services(),
        }
        .context("failed to load services")?;

        if self.json {
            return print_json(&services);
        }
        if services.is_empty() {
            println!("No services discovered yet. Run `deploydash sync --all`.");
            return Ok(());
        }

        let rows: Vec<ServiceRow> = services
            .into_iter()
            .map(|service| ServiceRow {
                id: service.id.0,
                repo: service.repository_id.0,
                name: service.name,
                path: service.path,
                description: truncate(&service.description, 60),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn pull_requests(store: &Store, id: ServiceId, json: bool) -> Result<()> {
    let service = store
        .service(id)
        .with_context(|| format!("service {id} not found"))?;
    let gateway = github_client()?;
    let pulls = service_pull_requests(store, &gateway, id)
        .with_context(|| format!("failed to load pull requests of service {id}"))?;
    if json {
        return print_json(&pulls);
    }
    if pulls.is_empty() {
        println!("No recent pull requests touch {}.", service.path);
        return Ok(());
    }

    let rows: Vec<PullRow> = pulls.into_iter().map(pull_row).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn pull_row(pull: PullRequest) -> PullRow {
    let state = match pull.state {
        PullRequestState::Open => pull.state.as_str().green().to_string(),
        PullRequestState::Merged => pull.state.as_str().magenta().to_string(),
        PullRequestState::Closed => pull.state.as_str().bright_black().to_string(),
    };
    PullRow {
        number: pull.number,
        state,
        title: truncate(&pull.title, 60),
        author: pull.author,
        branch: pull.branch,
        created: pull.created_at.format("%Y-%m-%d").to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
