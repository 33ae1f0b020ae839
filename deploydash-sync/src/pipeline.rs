//! Shared sync pipeline entrypoint used by CLI and daemon.

use std::sync::Arc;

use deploydash_core::RepositoryId;
use deploydash_gateway::VcsGateway;
use deploydash_store::Store;

use crate::orchestrator::Orchestrator;
use crate::report::{RepositoryOutcome, SyncPassSummary};
use crate::SyncError;

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncScope {
    /// Sync every tracked repository.
    All,
    /// Sync one repository; its failure is returned as the error.
    Repository(RepositoryId),
}

/// Run the sync pipeline for a scope.
///
/// This is the canonical sync entrypoint for both `deploydash sync` and the
/// daemon's scheduled and socket-triggered passes.
pub fn run<G: VcsGateway>(
    store: Arc<Store>,
    gateway: G,
    scope: SyncScope,
) -> Result<SyncPassSummary, SyncError> {
    let orchestrator = Orchestrator::new(store, gateway);
    match scope {
        SyncScope::All => orchestrator.sync_all(),
        SyncScope::Repository(id) => {
            let started_at = chrono::Utc::now();
            let clock = std::time::Instant::now();
            let report = orchestrator.sync_repository(id)?;
            let name = report.name.clone();
            let outcome = RepositoryOutcome::from_result(id, &name, Ok(report));
            Ok(SyncPassSummary::new(started_at, clock.elapsed(), vec![outcome]))
        }
    }
}
