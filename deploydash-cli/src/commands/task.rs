//! `deploydash task add|list|status|remove|refresh-titles`

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::{settings, NewTask, ProjectId, TaskId, TaskStatus};
use deploydash_gateway::TrackerClient;
use deploydash_sync::refresh_tracker_titles;

use super::{home, open_store, print_json};

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task in a project.
    Add(AddArgs),

    /// List tasks.
    List {
        /// Only tasks of this project.
        #[arg(long, conflicts_with = "from")]
        project: Option<i64>,

        /// Only tasks scheduled on or after this date (YYYY-MM-DD).
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Only tasks scheduled on or before this date (YYYY-MM-DD).
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        #[arg(long)]
        json: bool,
    },

    /// Move a task to pending | in_progress | completed.
    Status { id: i64, status: TaskStatus },

    /// Delete a task.
    Remove { id: i64 },

    /// Fetch ticket titles from the tracker for every task with a ticket id.
    RefreshTitles,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Project id.
    pub project: i64,

    pub title: String,

    #[arg(long, short = 'd', default_value = "")]
    pub description: String,

    /// Tracker ticket key, e.g. PAY-142.
    #[arg(long)]
    pub ticket: Option<String>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub scheduled: Option<NaiveDate>,

    /// YYYY-MM-DD
    #[arg(long)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Tabled)]
struct TaskRow {
    id: i64,
    project: i64,
    status: String,
    title: String,
    ticket: String,
    scheduled: String,
    deadline: String,
}

pub fn run(cmd: TaskCommand) -> Result<()> {
    match cmd {
        TaskCommand::Add(args) => add(args),
        TaskCommand::List {
            project,
            from,
            to,
            json,
        } => {
            let window = from.zip(to);
            list(project.map(ProjectId), window, json)
        }
        TaskCommand::Status { id, status } => set_status(TaskId(id), status),
        TaskCommand::Remove { id } => remove(TaskId(id)),
        TaskCommand::RefreshTitles => refresh_titles(),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let store = open_store()?;
    let project = ProjectId(args.project);
    store
        .project(project)
        .with_context(|| format!("project {project} not found"))?;
    let task = store
        .create_task(&NewTask {
            project_id: project,
            title: args.title,
            description: args.description,
            ticket_id: args.ticket.filter(|t| !t.trim().is_empty()),
            status: TaskStatus::Pending,
            scheduled_date: args.scheduled,
            deadline: args.deadline,
        })
        .context("failed to create task")?;
    println!("✓ Created task {} '{}'", task.id, task.title);
    Ok(())
}

fn list(
    project: Option<ProjectId>,
    window: Option<(NaiveDate, NaiveDate)>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let tasks = match window {
        Some((from, to)) => store
            .tasks_scheduled_between(from, to)
            .with_context(|| format!("failed to list tasks scheduled {from}..{to}"))?,
        None => store.list_tasks(project).context("failed to list tasks")?,
    };
    if json {
        return print_json(&tasks);
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let rows: Vec<TaskRow> = tasks
        .into_iter()
        .map(|task| TaskRow {
            id: task.id.0,
            project: task.project_id.0,
            status: status_label(task.status),
            title: task.title,
            ticket: match (task.ticket_id, task.tracker_title) {
                (Some(key), Some(title)) => format!("{key}: {title}"),
                (Some(key), None) => key,
                _ => String::new(),
            },
            scheduled: task.scheduled_date.map(|d| d.to_string()).unwrap_or_default(),
            deadline: task.deadline.map(|d| d.to_string()).unwrap_or_default(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn status_label(status: TaskStatus) -> String {
    match status {
        TaskStatus::Pending => status.as_str().bright_black().to_string(),
        TaskStatus::InProgress => status.as_str().yellow().to_string(),
        TaskStatus::Completed => status.as_str().green().to_string(),
    }
}

fn set_status(id: TaskId, status: TaskStatus) -> Result<()> {
    let store = open_store()?;
    let task = store
        .update_task_status(id, status)
        .with_context(|| format!("failed to update task {id}"))?;
    println!("✓ Task {} '{}' is now {}", task.id, task.title, task.status);
    Ok(())
}

fn remove(id: TaskId) -> Result<()> {
    let store = open_store()?;
    store
        .delete_task(id)
        .with_context(|| format!("failed to remove task {id}"))?;
    println!("✓ Removed task {id}");
    Ok(())
}

fn refresh_titles() -> Result<()> {
    let settings = settings::load_at(&home()?).context("failed to load settings")?;
    let tracker_settings = settings
        .tracker
        .as_ref()
        .context("no ticket tracker configured; run `deploydash config set tracker-url <url>`")?;
    let tracker = TrackerClient::from_settings(
        tracker_settings,
        Duration::from_secs(settings.http_timeout_secs),
    )
    .context("invalid tracker settings")?;

    let store = open_store()?;
    let outcome = refresh_tracker_titles(&store, &tracker).context("failed to refresh titles")?;
    println!("✓ Refreshed {} ticket titles", outcome.refreshed);
    for failure in &outcome.failures {
        println!(
            "  {} task {} ({}): {}",
            "!".yellow(),
            failure.task_id,
            failure.ticket_id,
            failure.error
        );
    }
    Ok(())
}
