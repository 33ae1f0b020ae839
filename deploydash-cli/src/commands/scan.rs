//! `deploydash scan <dir>`: overlay tags of a local manifest checkout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use deploydash_manifest::scan_checkout;

use super::print_json;

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Root of the checkout (the directory containing `services/`).
    pub dir: PathBuf,

    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct OverlayRow {
    service: String,
    environment: String,
    region: String,
    namespace: String,
    tag: String,
}

impl ScanArgs {
    pub fn run(self) -> Result<()> {
        let scan = scan_checkout(&self.dir)
            .with_context(|| format!("failed to scan {}", self.dir.display()))?;
        if self.json {
            return print_json(&scan);
        }

        if scan.overlays.is_empty() && scan.skipped.is_empty() {
            println!("No overlays found under {}.", self.dir.join("services").display());
            return Ok(());
        }

        let rows: Vec<OverlayRow> = scan
            .overlays
            .iter()
            .map(|overlay| OverlayRow {
                service: overlay.coordinates.service.clone(),
                environment: overlay.coordinates.environment.clone(),
                region: overlay.coordinates.region.clone(),
                namespace: overlay.coordinates.namespace.clone(),
                tag: overlay.tag.clone().unwrap_or_else(|| "-".to_string()),
            })
            .collect();
        if !rows.is_empty() {
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        for (path, reason) in &scan.skipped {
            println!("{} skipped {}: {}", "!".yellow(), path, reason);
        }
        Ok(())
    }
}
