//! Per-repository sync state machine.
//!
//! ```text
//! Resolve ─► Dispatch ─┬─ monorepo:   discover services ─► reconcile ─┐
//!                      └─ kubernetes: overlays ─► deployments          │
//!                                     manifests ─► resources ──────────┤
//!                                                                      ▼
//!                                          workflow actions ─► record last sync
//! ```
//!
//! Every pass starts again from Resolve; nothing is carried between passes.
//! A failure aborts only the repository it happened in.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use deploydash_core::{
    ActionType, DiscoveredService, Lookup, Microservice, NewAction, NewDeployment, Repository,
    RepositoryId, RepositoryKind,
};
use deploydash_gateway::{parse_repository_url, RepoCoordinates, VcsGateway};
use deploydash_manifest::{
    is_manifest_file, parse_resource_manifests, read_overlay, SERVICES_DIR,
};
use deploydash_store::Store;

use crate::correlate::{resolve_commit, ApplicationPath, ManifestPath};
use crate::error::SyncError;
use crate::matching::{best_match, best_mention};
use crate::report::{RepositoryOutcome, RepositorySyncReport, SyncPassSummary};

/// Runs fetched per workflow.
pub const RUNS_PER_WORKFLOW: usize = 50;

/// Resource roots tried when a Kubernetes repository configures none.
pub const DEFAULT_RESOURCE_ROOTS: &[&str] =
    &["k8s", "kubernetes", "manifests", "deployment", "overlays"];

/// Drives syncs against one immutable gateway.
///
/// Reconfiguring (a new token, another API host) means building a new
/// orchestrator around a new gateway.
pub struct Orchestrator<G> {
    store: Arc<Store>,
    gateway: G,
}

impl<G: VcsGateway> Orchestrator<G> {
    pub fn new(store: Arc<Store>, gateway: G) -> Self {
        Self { store, gateway }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // -----------------------------------------------------------------------
    // 1. Entry points
    // -----------------------------------------------------------------------

    /// Sync every repository in id order, one at a time.
    pub fn sync_all(&self) -> Result<SyncPassSummary, SyncError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let repositories = self.store.list_repositories()?;

        let mut outcomes = Vec::with_capacity(repositories.len());
        for repo in &repositories {
            let result = self.sync_repository(repo.id);
            if let Err(e) = &result {
                if e.is_configuration() {
                    tracing::warn!(repository = %repo.name, error = %e, "skipping misconfigured repository");
                } else {
                    tracing::error!(repository = %repo.name, error = %e, "repository sync failed");
                }
            }
            outcomes.push(RepositoryOutcome::from_result(repo.id, &repo.name, result));
        }

        let summary = SyncPassSummary::new(started_at, clock.elapsed(), outcomes);
        tracing::info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            duration_ms = summary.duration_ms,
            "sync pass complete"
        );
        Ok(summary)
    }

    /// Run the full state machine for one repository.
    pub fn sync_repository(&self, id: RepositoryId) -> Result<RepositorySyncReport, SyncError> {
        let clock = Instant::now();

        // Resolve
        let repo = self.store.repository(id)?;
        let coords = parse_repository_url(&repo.url)?;
        let mut report = RepositorySyncReport::new(repo.id, &repo.name, repo.kind);
        tracing::info!(repository = %repo.name, kind = repo.kind.as_str(), "syncing");

        // Dispatch
        match repo.kind {
            RepositoryKind::Monorepo => self.sync_services(&repo, &coords, &mut report)?,
            RepositoryKind::KubernetesResources => {
                self.sync_deployments(&repo, &coords, &mut report)?;
                self.sync_resources(&repo, &coords, &mut report)?;
            }
        }

        self.sync_actions(&repo, &coords, &mut report)?;

        self.store.touch_last_sync(repo.id, Utc::now())?;
        report.duration_ms = clock.elapsed().as_millis() as u64;
        tracing::info!(
            repository = %repo.name,
            deployments = report.deployments,
            resources = report.resources,
            actions = report.actions,
            duration_ms = report.duration_ms,
            "repository synced"
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // 2. Monorepo: services
    // -----------------------------------------------------------------------

    fn sync_services(
        &self,
        repo: &Repository,
        coords: &RepoCoordinates,
        report: &mut RepositorySyncReport,
    ) -> Result<(), SyncError> {
        let base = services_root(repo);
        let mut discovered = match self.gateway.discover_services(coords, &base)? {
            Lookup::Found(services) => services,
            Lookup::NotApplicable { reason } => {
                tracing::info!(repository = %repo.name, %reason, "no services directory");
                Vec::new()
            }
        };

        if discovered.is_empty() {
            if let Some((name, location)) = repo.service_override() {
                tracing::info!(repository = %repo.name, service = name, "using configured single service");
                discovered.push(DiscoveredService {
                    name: name.to_string(),
                    path: location.to_string(),
                    description: format!("Service {name} located at {location}"),
                });
            }
        }

        let reconciliation = self
            .store
            .upsert_services_preserving_identity(repo.id, &discovered)?;
        tracing::debug!(repository = %repo.name, ?reconciliation, "services reconciled");
        report.services = Some(reconciliation);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 3. Kubernetes: deployments from overlays
    // -----------------------------------------------------------------------

    fn sync_deployments(
        &self,
        repo: &Repository,
        coords: &RepoCoordinates,
        report: &mut RepositorySyncReport,
    ) -> Result<(), SyncError> {
        let files = match self.gateway.find_manifest_files(coords, SERVICES_DIR) {
            Ok(files) => files,
            Err(e) => {
                report.warn(format!("overlay scan failed: {e}"));
                return Ok(());
            }
        };
        if files.is_empty() {
            return Ok(());
        }

        let services = self.store.list_services()?;
        let applications = self.application_repositories()?;

        for path in files {
            let content = match self.gateway.file_content(coords, &path) {
                Ok(Lookup::Found(content)) => content,
                Ok(Lookup::NotApplicable { reason }) => {
                    tracing::debug!(%path, %reason, "overlay vanished");
                    report.skipped_manifests += 1;
                    continue;
                }
                Err(e) => {
                    report.warn(format!("failed to read {path}: {e}"));
                    report.skipped_manifests += 1;
                    continue;
                }
            };

            let overlay = match read_overlay(&path, &content) {
                Ok(overlay) => overlay,
                Err(mismatch) => {
                    tracing::debug!(%path, %mismatch, "not an overlay path, skipping");
                    report.skipped_manifests += 1;
                    continue;
                }
            };
            let target = &overlay.coordinates;

            let Some(tag) = overlay.tag.as_deref() else {
                tracing::info!(%path, service = %target.service, "no image tag for service");
                report.skipped_manifests += 1;
                continue;
            };

            let Some(service) = best_match(&target.service, &services) else {
                tracing::info!(%path, service = %target.service, "no matching service, skipping");
                report.skipped_manifests += 1;
                continue;
            };

            let application = applications
                .get(&service.repository_id)
                .map(|repo| ApplicationPath {
                    repo,
                    path: &service.path,
                });
            let correlation = resolve_commit(
                &self.gateway,
                tag,
                application,
                ManifestPath {
                    repo: coords,
                    path: &path,
                },
            );

            let deployment = self.store.upsert_deployment(&NewDeployment {
                service_id: service.id,
                kubernetes_repo_id: repo.id,
                commit_sha: correlation.sha,
                commit_source: correlation.source,
                environment: target.environment.clone(),
                region: target.region.clone(),
                namespace: target.namespace.clone(),
                tag: tag.to_string(),
                path: path.clone(),
            })?;
            tracing::info!(
                service = %service.name,
                target = %target,
                tag,
                commit_source = deployment.commit_source.as_str(),
                "deployment recorded"
            );
            report.deployments += 1;
        }
        Ok(())
    }

    /// Coordinates of every monorepo whose URL parses, by id.
    fn application_repositories(&self) -> Result<HashMap<RepositoryId, RepoCoordinates>, SyncError> {
        let mut found = HashMap::new();
        for repo in self.store.list_repositories()? {
            if repo.kind != RepositoryKind::Monorepo {
                continue;
            }
            match parse_repository_url(&repo.url) {
                Ok(coords) => {
                    found.insert(repo.id, coords);
                }
                Err(e) => tracing::debug!(repository = %repo.name, error = %e, "not usable for correlation"),
            }
        }
        Ok(found)
    }

    // -----------------------------------------------------------------------
    // 4. Kubernetes: generic resources
    // -----------------------------------------------------------------------

    fn sync_resources(
        &self,
        repo: &Repository,
        coords: &RepoCoordinates,
        report: &mut RepositorySyncReport,
    ) -> Result<(), SyncError> {
        let mut manifests = Vec::new();
        for root in resource_roots(repo) {
            let files = match self.gateway.find_files(coords, &root, &is_manifest_file) {
                Ok(files) => files,
                Err(e) => {
                    // Stored resources are only replaced after a complete walk.
                    report.warn(format!("resource scan of {root} failed, keeping stored resources: {e}"));
                    return Ok(());
                }
            };
            for path in files {
                match self.gateway.file_content(coords, &path) {
                    Ok(Lookup::Found(content)) => {
                        manifests.extend(parse_resource_manifests(&content, &path))
                    }
                    Ok(Lookup::NotApplicable { reason }) => {
                        tracing::debug!(%path, %reason, "manifest unreadable");
                    }
                    Err(e) => {
                        report.warn(format!("failed to read {path}: {e}"));
                    }
                }
            }
        }

        report.resources = self.store.replace_resources(repo.id, &manifests)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // 5. Workflow actions
    // -----------------------------------------------------------------------

    fn sync_actions(
        &self,
        repo: &Repository,
        coords: &RepoCoordinates,
        report: &mut RepositorySyncReport,
    ) -> Result<(), SyncError> {
        let workflows = self.gateway.list_workflows(coords)?;

        let services: Vec<Microservice> = match repo.kind {
            RepositoryKind::Monorepo => self.store.services_for_repository(repo.id)?,
            RepositoryKind::KubernetesResources => Vec::new(),
        };
        let resources = match repo.kind {
            RepositoryKind::KubernetesResources => self.store.resources_for_repository(repo.id)?,
            RepositoryKind::Monorepo => Vec::new(),
        };

        let mut actions = Vec::new();
        for workflow in &workflows {
            let Some(action_type) = ActionType::classify(&workflow.name) else {
                tracing::trace!(workflow = %workflow.name, "not a build or deploy workflow");
                continue;
            };

            let runs = match self
                .gateway
                .list_workflow_runs(coords, workflow.id, RUNS_PER_WORKFLOW)
            {
                Ok(runs) => runs,
                Err(e) => {
                    report.warn(format!("runs of workflow '{}' unavailable: {e}", workflow.name));
                    continue;
                }
            };

            for run in runs {
                let branch = run.head_branch.clone().unwrap_or_default();
                let (service_id, resource_id) = match repo.kind {
                    RepositoryKind::Monorepo => {
                        let texts = [workflow.name.as_str(), branch.as_str()];
                        (best_mention(&texts, &services).map(|s| s.id), None)
                    }
                    RepositoryKind::KubernetesResources => {
                        let texts = [workflow.name.as_str()];
                        (None, best_mention(&texts, &resources).map(|r| r.id))
                    }
                };
                actions.push(NewAction {
                    repository_id: repo.id,
                    service_id,
                    resource_id,
                    action_type,
                    completed_at: run.is_completed().then_some(run.updated_at),
                    status: run.status,
                    workflow_run_id: run.id,
                    commit_sha: run.head_sha,
                    branch,
                    build_hash: None,
                    started_at: run.created_at,
                });
            }
        }

        if !actions.is_empty() {
            report.actions = self.store.upsert_actions(&actions)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scan roots
// ---------------------------------------------------------------------------

/// Services directory of a monorepo: the configured root, or `services`.
pub fn services_root(repo: &Repository) -> String {
    normalize_root(repo.scan_root.as_deref()).unwrap_or_else(|| SERVICES_DIR.to_string())
}

/// Directories searched for plain Kubernetes manifests.
pub fn resource_roots(repo: &Repository) -> Vec<String> {
    match normalize_root(repo.scan_root.as_deref()) {
        Some(root) => vec![root],
        None => DEFAULT_RESOURCE_ROOTS.iter().map(|r| r.to_string()).collect(),
    }
}

fn normalize_root(root: Option<&str>) -> Option<String> {
    let root = root?.trim();
    let root = root.strip_prefix("./").unwrap_or(root);
    let root = root.trim_matches('/');
    if root.is_empty() || root == "." {
        None
    } else {
        Some(root.to_string())
    }
}
