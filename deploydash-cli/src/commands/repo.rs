//! `deploydash repo add|list|show|update|remove`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_core::{Lookup, NewRepository, Repository, RepositoryId, RepositoryKind};
use deploydash_gateway::{parse_repository_url, RepoCoordinates, VcsGateway};

use super::{format_age, github_client, open_store, print_json};

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Track a repository.
    Add(AddArgs),

    /// List tracked repositories.
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show one repository with its services or resources.
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },

    /// Change the name, description, scan root, or service override.
    Update(UpdateArgs),

    /// Stop tracking a repository and drop everything synced from it.
    Remove { id: i64 },
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: i64,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Empty string resets to the default scan root.
    #[arg(long)]
    pub scan_root: Option<String>,

    #[arg(long, requires = "service_location")]
    pub service_name: Option<String>,

    #[arg(long, requires = "service_name")]
    pub service_location: Option<String>,

    /// Drop the single-service override.
    #[arg(long, conflicts_with_all = ["service_name", "service_location"])]
    pub clear_override: bool,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Repository URL, e.g. https://github.com/acme/platform
    pub url: String,

    /// monorepo | kubernetes-resources
    #[arg(long, short = 'k', default_value = "monorepo")]
    pub kind: RepositoryKind,

    /// Display name. Defaults to the repository name from the URL.
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Directory to scan instead of the default (`services` for a monorepo).
    #[arg(long)]
    pub scan_root: Option<String>,

    /// Single service to record when discovery finds none.
    #[arg(long, requires = "service_location")]
    pub service_name: Option<String>,

    /// Path of the single service inside the repository.
    #[arg(long, requires = "service_name")]
    pub service_location: Option<String>,

    /// Add without checking that the repository is reachable.
    #[arg(long)]
    pub no_verify: bool,
}

pub fn run(cmd: RepoCommand) -> Result<()> {
    match cmd {
        RepoCommand::Add(args) => add(args),
        RepoCommand::List { json } => list(json),
        RepoCommand::Show { id, json } => show(RepositoryId(id), json),
        RepoCommand::Update(args) => update(args),
        RepoCommand::Remove { id } => remove(RepositoryId(id)),
    }
}

fn add(args: AddArgs) -> Result<()> {
    let coords = parse_repository_url(&args.url)
        .with_context(|| format!("'{}' is not a repository URL", args.url))?;
    let store = open_store()?;
    if let Some(existing) = store
        .repository_by_url(&args.url)
        .context("failed to look up repository")?
    {
        bail!(
            "'{}' is already tracked as repository {} ({})",
            args.url,
            existing.id,
            existing.name
        );
    }
    if !args.no_verify {
        verify_access(&coords)?;
    }

    let repo = store
        .create_repository(&NewRepository {
            name: args.name.unwrap_or_else(|| coords.name.clone()),
            url: args.url,
            kind: args.kind,
            description: args.description,
            scan_root: args.scan_root,
            service_name: args.service_name,
            service_location: args.service_location,
        })
        .context("failed to add repository")?;

    println!(
        "✓ Added {} repository {} '{}'",
        repo.kind, repo.id, repo.name
    );
    println!("Run: deploydash sync {}", repo.id);
    Ok(())
}

/// Fetch the repository with the configured token.
fn verify_access(coords: &RepoCoordinates) -> Result<()> {
    let gateway = github_client()?;
    match gateway.repository(coords) {
        Ok(Lookup::Found(info)) => {
            println!("✓ Verified access to {}", info.full_name);
            Ok(())
        }
        Ok(Lookup::NotApplicable { reason }) => {
            bail!("cannot access repository: {reason} (use --no-verify to add it anyway)")
        }
        Err(e) if e.is_unauthorized() => Err(e).context(
            "the configured GitHub token was rejected; run `deploydash config set github-token <token>`",
        ),
        Err(e) => Err(e).with_context(|| {
            format!("could not verify access to {coords} (use --no-verify to add it anyway)")
        }),
    }
}

#[derive(Tabled)]
struct RepoRow {
    id: i64,
    name: String,
    kind: String,
    url: String,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

fn list(json: bool) -> Result<()> {
    let store = open_store()?;
    let repos = store
        .list_repositories()
        .context("failed to list repositories")?;
    if json {
        return print_json(&repos);
    }

    if repos.is_empty() {
        println!("No repositories tracked.");
        println!("Run: deploydash repo add <url>");
        return Ok(());
    }

    let rows: Vec<RepoRow> = repos
        .into_iter()
        .map(|repo| RepoRow {
            id: repo.id.0,
            name: repo.name,
            kind: repo.kind.to_string(),
            url: repo.url,
            last_sync: format_age(repo.last_sync_at),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn show(id: RepositoryId, json: bool) -> Result<()> {
    let store = open_store()?;
    let repo = store
        .repository(id)
        .with_context(|| format!("repository {id} not found"))?;

    match repo.kind {
        RepositoryKind::Monorepo => {
            let services = store
                .services_for_repository(id)
                .context("failed to load services")?;
            if json {
                return print_json(&serde_json::json!({ "repository": repo, "services": services }));
            }
            print_header(&repo);
            println!("{} services", services.len());
            for service in services {
                println!("  {} {} ({})", service.id, service.name.bold(), service.path);
            }
        }
        RepositoryKind::KubernetesResources => {
            let resources = store
                .resources_for_repository(id)
                .context("failed to load resources")?;
            if json {
                return print_json(
                    &serde_json::json!({ "repository": repo, "resources": resources }),
                );
            }
            print_header(&repo);
            println!("{} resources", resources.len());
            for resource in resources {
                println!(
                    "  {} {} {} ({})",
                    resource.resource_kind.cyan(),
                    resource.name.bold(),
                    resource.namespace,
                    resource.path
                );
            }
        }
    }
    Ok(())
}

fn print_header(repo: &Repository) {
    println!("{} [{}]", repo.name.bold(), repo.kind);
    println!("  url:       {}", repo.url);
    if !repo.description.is_empty() {
        println!("  about:     {}", repo.description);
    }
    if let Some(root) = &repo.scan_root {
        println!("  scan root: {root}");
    }
    if let Some((name, location)) = repo.service_override() {
        println!("  override:  {name} at {location}");
    }
    println!("  last sync: {}", format_age(repo.last_sync_at));
}

fn update(args: UpdateArgs) -> Result<()> {
    let store = open_store()?;
    let id = RepositoryId(args.id);
    let mut repo = store
        .repository(id)
        .with_context(|| format!("repository {id} not found"))?;

    if let Some(name) = args.name {
        repo.name = name;
    }
    if let Some(description) = args.description {
        repo.description = description;
    }
    if let Some(root) = args.scan_root {
        repo.scan_root = Some(root).filter(|r| !r.trim().is_empty());
    }
    if args.clear_override {
        repo.service_name = None;
        repo.service_location = None;
    } else if args.service_name.is_some() {
        repo.service_name = args.service_name;
        repo.service_location = args.service_location;
    }

    let repo = store
        .update_repository(&repo)
        .with_context(|| format!("failed to update repository {id}"))?;
    println!("✓ Updated repository {} '{}'", repo.id, repo.name);
    Ok(())
}

fn remove(id: RepositoryId) -> Result<()> {
    let store = open_store()?;
    let repo = store
        .repository(id)
        .with_context(|| format!("repository {id} not found"))?;
    store
        .delete_repository(id)
        .with_context(|| format!("failed to remove repository {id}"))?;
    println!("✓ Removed repository {} '{}'", id, repo.name);
    Ok(())
}
