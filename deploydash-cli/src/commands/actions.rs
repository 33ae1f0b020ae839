//! `deploydash actions`

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::{Action, RepositoryId, ServiceId};
use deploydash_store::ActionFilter;

use super::{format_age, open_store, print_json, short_sha};

#[derive(Args, Debug)]
pub struct ActionsArgs {
    #[arg(long = "repo")]
    pub repository: Option<i64>,

    #[arg(long)]
    pub service: Option<i64>,

    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ActionRow {
    run: i64,
    #[tabled(rename = "type")]
    action_type: String,
    status: String,
    branch: String,
    commit: String,
    started: String,
}

impl ActionsArgs {
    pub fn run(self) -> Result<()> {
        let store = open_store()?;
        let filter = ActionFilter {
            repository: self.repository.map(RepositoryId),
            service: self.service.map(ServiceId),
            resource: None,
        };
        let actions = store
            .recent_actions(filter, self.limit)
            .context("failed to load actions")?;

        if self.json {
            return print_json(&actions);
        }
        if actions.is_empty() {
            println!("No workflow runs recorded.");
            return Ok(());
        }

        let rows: Vec<ActionRow> = actions.iter().map(action_row).collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn action_row(action: &Action) -> ActionRow {
    ActionRow {
        run: action.workflow_run_id,
        action_type: action.action_type.to_string(),
        status: status_label(&action.status),
        branch: action.branch.clone(),
        commit: short_sha(&action.commit_sha),
        started: format_age(Some(action.started_at)),
    }
}

fn status_label(status: &str) -> String {
    match status {
        "completed" => status.green().to_string(),
        "in_progress" | "queued" | "pending" | "waiting" | "requested" => {
            status.yellow().to_string()
        }
        _ => status.to_string(),
    }
}
