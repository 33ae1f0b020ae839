//! `deploydash project add|list|remove`

use anyhow::{Context, Result};
use clap::Subcommand;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::ProjectId;

use super::{open_store, print_json};

/// Manage planner projects.
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Create a project.
    Add {
        name: String,
        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },

    /// List projects.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Delete a project and its tasks.
    Remove { id: i64 },
}

#[derive(Tabled)]
struct ProjectRow {
    id: i64,
    name: String,
    tasks: usize,
    description: String,
}

pub fn run(cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Add { name, description } => add(&name, &description),
        ProjectCommand::List { json } => list(json),
        ProjectCommand::Remove { id } => remove(ProjectId(id)),
    }
}

fn add(name: &str, description: &str) -> Result<()> {
    let store = open_store()?;
    let project = store
        .create_project(name, description)
        .with_context(|| format!("failed to create project '{name}'"))?;
    println!("✓ Created project {} '{}'", project.id, project.name);
    Ok(())
}

fn list(json: bool) -> Result<()> {
    let store = open_store()?;
    let projects = store.list_projects().context("failed to list projects")?;
    if json {
        return print_json(&projects);
    }
    if projects.is_empty() {
        println!("No projects.");
        println!("Run: deploydash project add <name>");
        return Ok(());
    }

    let tasks = store.list_tasks(None).context("failed to list tasks")?;
    let rows: Vec<ProjectRow> = projects
        .into_iter()
        .map(|project| ProjectRow {
            id: project.id.0,
            tasks: tasks.iter().filter(|t| t.project_id == project.id).count(),
            name: project.name,
            description: project.description,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn remove(id: ProjectId) -> Result<()> {
    let store = open_store()?;
    let project = store
        .project(id)
        .with_context(|| format!("project {id} not found"))?;
    store
        .delete_project(id)
        .with_context(|| format!("failed to remove project {id}"))?;
    println!("✓ Removed project {} '{}'", id, project.name);
    Ok(())
}
