pub mod actions;
pub mod check;
pub mod config;
pub mod daemon;
pub mod deployments;
pub mod project;
pub mod repo;
pub mod scan;
pub mod services;
pub mod stats;
pub mod sync;
pub mod task;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use deploydash_core::settings;
use deploydash_gateway::GitHubClient;
use deploydash_store::Store;

/// `$HOME`, as every command resolves it.
pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Open the record store (`$DEPLOYDASH_DB` or `~/.deploydash/deploydash.db`).
pub fn open_store() -> Result<Arc<Store>> {
    let path = settings::database_path_at(&home()?);
    let store = Store::open(&path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;
    Ok(Arc::new(store))
}

/// GitHub client built from `~/.deploydash/config.yaml`.
pub fn github_client() -> Result<GitHubClient> {
    let settings = settings::load_at(&home()?).context("failed to load settings")?;
    Ok(GitHubClient::from_settings(&settings))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?
    );
    Ok(())
}

/// "3m ago", "2h ago", "5d ago", or "never".
pub fn format_age(at: Option<DateTime<Utc>>) -> String {
    let Some(at) = at else {
        return "never".to_string();
    };
    let secs = (Utc::now() - at).num_seconds().max(0);
    match secs {
        0..=59 => format!("{secs}s ago"),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

/// First seven characters of a commit SHA; `-` when empty.
pub fn short_sha(sha: &str) -> String {
    if sha.is_empty() {
        "-".to_string()
    } else {
        sha.chars().take(7).collect()
    }
}
