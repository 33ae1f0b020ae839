//! End-to-end sync passes against an in-memory store and a scripted gateway.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use deploydash_core::{
    ActionType, CommitSource, Lookup, NewRepository, NewTask, Repository, RepositoryKind,
};
use deploydash_gateway::{
    Commit, ContentEntry, EntryKind, GatewayError, PullRequest, PullRequestState, RepoCoordinates,
    RepositoryInfo, TagRef, VcsGateway, Workflow, WorkflowRun,
};
use deploydash_store::{ActionFilter, Store};
use deploydash_sync::pipeline::{self, SyncScope};
use deploydash_sync::{
    commit_deployments, refresh_tracker_titles, service_pull_requests, Orchestrator,
    TicketTitles,
};

const SHOP: &str = "https://github.com/acme/shop";
const K8S: &str = "https://github.com/acme/k8s-manifests";

// ---------------------------------------------------------------------------
// Scripted gateway
// ---------------------------------------------------------------------------

/// Keys are `owner/name:path`.
#[derive(Default)]
struct FakeGateway {
    dirs: HashMap<String, Vec<ContentEntry>>,
    files: HashMap<String, String>,
    commits: HashMap<String, Vec<Commit>>,
    tags: HashMap<String, Vec<TagRef>>,
    workflows: HashMap<String, Vec<Workflow>>,
    runs: HashMap<i64, Vec<WorkflowRun>>,
    pulls: Vec<PullRequest>,
    /// Changed files per pull request number; absent numbers answer 502.
    pull_files: HashMap<i64, Vec<String>>,
    /// Paths whose listing or content read answers 502.
    failing_paths: HashSet<String>,
    failing_commit_search: bool,
    commit_calls: AtomicUsize,
    tag_calls: AtomicUsize,
}

fn key(repo: &RepoCoordinates, path: &str) -> String {
    format!("{repo}:{}", path.trim_matches('/'))
}

fn coords(url: &str) -> RepoCoordinates {
    deploydash_gateway::parse_repository_url(url).expect("url")
}

impl FakeGateway {
    fn dir(mut self, url: &str, path: &str, entries: &[(&str, EntryKind)]) -> Self {
        let listing = entries
            .iter()
            .map(|(name, kind)| ContentEntry {
                name: name.to_string(),
                path: format!("{path}/{name}"),
                kind: *kind,
            })
            .collect();
        self.dirs.insert(key(&coords(url), path), listing);
        self
    }

    fn file(mut self, url: &str, path: &str, content: &str) -> Self {
        self.files.insert(key(&coords(url), path), content.to_string());
        self
    }

    fn failing(mut self, url: &str, path: &str) -> Self {
        self.failing_paths.insert(key(&coords(url), path));
        self
    }

    fn fail_if_broken(&self, repo: &RepoCoordinates, path: &str) -> Result<(), GatewayError> {
        if self.failing_paths.contains(&key(repo, path)) {
            return Err(GatewayError::Status {
                url: path.to_string(),
                status: 502,
                message: "bad gateway".into(),
            });
        }
        Ok(())
    }

    fn commits(mut self, url: &str, path: &str, commits: Vec<Commit>) -> Self {
        self.commits.insert(key(&coords(url), path), commits);
        self
    }

    fn tags(mut self, url: &str, tags: &[(&str, &str)]) -> Self {
        let tags = tags
            .iter()
            .map(|(name, sha)| TagRef {
                name: name.to_string(),
                commit_sha: sha.to_string(),
            })
            .collect();
        self.tags.insert(coords(url).to_string(), tags);
        self
    }

    fn workflow(mut self, url: &str, id: i64, name: &str, runs: Vec<WorkflowRun>) -> Self {
        self.workflows
            .entry(coords(url).to_string())
            .or_default()
            .push(Workflow {
                id,
                name: name.to_string(),
                path: String::new(),
                state: "active".into(),
            });
        self.runs.insert(id, runs);
        self
    }

    fn pull(mut self, number: i64, state: PullRequestState, files: &[&str]) -> Self {
        self.pulls.push(PullRequest {
            number,
            title: format!("change {number}"),
            state,
            author: "dev".into(),
            branch: format!("topic-{number}"),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single().expect("time"),
            url: String::new(),
        });
        if !files.is_empty() {
            self.pull_files
                .insert(number, files.iter().map(|f| f.to_string()).collect());
        }
        self
    }

    fn network_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst) + self.tag_calls.load(Ordering::SeqCst)
    }
}

impl VcsGateway for FakeGateway {
    fn list_directory(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<Vec<ContentEntry>>, GatewayError> {
        self.fail_if_broken(repo, path)?;
        Ok(match self.dirs.get(&key(repo, path)) {
            Some(entries) => Lookup::Found(entries.clone()),
            None => Lookup::not_applicable(format!("{path} not found")),
        })
    }

    fn file_content(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<String>, GatewayError> {
        self.fail_if_broken(repo, path)?;
        Ok(match self.files.get(&key(repo, path)) {
            Some(content) => Lookup::Found(content.clone()),
            None => Lookup::not_applicable(format!("{path} not found")),
        })
    }

    fn list_commits(
        &self,
        repo: &RepoCoordinates,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, GatewayError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_commit_search && limit > 1 {
            return Err(GatewayError::Status {
                url: "commits".into(),
                status: 502,
                message: "bad gateway".into(),
            });
        }
        let mut commits = self.commits.get(&key(repo, path)).cloned().unwrap_or_default();
        commits.truncate(limit);
        Ok(commits)
    }

    fn list_tags(&self, repo: &RepoCoordinates) -> Result<Vec<TagRef>, GatewayError> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.tags.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    fn list_workflows(&self, repo: &RepoCoordinates) -> Result<Vec<Workflow>, GatewayError> {
        Ok(self.workflows.get(&repo.to_string()).cloned().unwrap_or_default())
    }

    fn list_workflow_runs(
        &self,
        _repo: &RepoCoordinates,
        workflow_id: i64,
        limit: usize,
    ) -> Result<Vec<WorkflowRun>, GatewayError> {
        let mut runs = self.runs.get(&workflow_id).cloned().unwrap_or_default();
        runs.truncate(limit);
        Ok(runs)
    }

    fn repository(&self, repo: &RepoCoordinates) -> Result<Lookup<RepositoryInfo>, GatewayError> {
        Ok(Lookup::Found(RepositoryInfo {
            full_name: repo.to_string(),
            default_branch: "main".into(),
            private: false,
            html_url: String::new(),
        }))
    }

    fn list_pull_requests(
        &self,
        _repo: &RepoCoordinates,
        limit: usize,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        Ok(self.pulls.iter().take(limit).cloned().collect())
    }

    fn pull_request_files(
        &self,
        _repo: &RepoCoordinates,
        number: i64,
    ) -> Result<Vec<String>, GatewayError> {
        self.pull_files
            .get(&number)
            .cloned()
            .ok_or_else(|| GatewayError::Status {
                url: format!("pulls/{number}/files"),
                status: 502,
                message: "bad gateway".into(),
            })
    }

    fn check_connection(&self) -> Result<String, GatewayError> {
        Ok("fake".into())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn store() -> Arc<Store> {
    Arc::new(Store::open_in_memory().expect("store"))
}

fn add_repo(store: &Store, url: &str, kind: RepositoryKind) -> Repository {
    store
        .create_repository(&NewRepository {
            name: url.rsplit('/').next().unwrap_or("repo").to_string(),
            url: url.to_string(),
            kind,
            ..NewRepository::default()
        })
        .expect("create repository")
}

fn commit(sha: &str, message: &str) -> Commit {
    Commit {
        sha: sha.to_string(),
        message: message.to_string(),
        author: "dev".into(),
        date: None,
    }
}

fn run(id: i64, status: &str, branch: &str) -> WorkflowRun {
    WorkflowRun {
        id,
        status: status.to_string(),
        conclusion: None,
        head_sha: format!("sha{id}"),
        head_branch: Some(branch.to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).single().expect("time"),
        updated_at: Utc.with_ymd_and_hms(2024, 3, 1, 10, 5, 0).single().expect("time"),
    }
}

const OVERLAY: &str = "services/payment-api/overlays/prod/us-west-2/billing";

fn overlay(tag: &str) -> String {
    format!(
        "resources:\n- ../../../../base\nimages:\n- name: payment-api\n  newName: registry/payment-api\n  newTag: \"{tag}\"\n"
    )
}

/// Monorepo with `payment-api` and `cart`; k8s repo with one prod overlay.
fn shop_gateway(tag: &str) -> FakeGateway {
    FakeGateway::default()
        .dir(SHOP, "services", &[("payment-api", EntryKind::Dir), ("cart", EntryKind::Dir)])
        .file(SHOP, "services/payment-api/README.md", "# Payment API\nCharges cards.\n")
        .dir(K8S, "services", &[("payment-api", EntryKind::Dir)])
        .dir(K8S, "services/payment-api", &[("overlays", EntryKind::Dir)])
        .dir(K8S, "services/payment-api/overlays", &[("prod", EntryKind::Dir)])
        .dir(K8S, "services/payment-api/overlays/prod", &[("us-west-2", EntryKind::Dir)])
        .dir(K8S, "services/payment-api/overlays/prod/us-west-2", &[("billing", EntryKind::Dir)])
        .dir(K8S, OVERLAY, &[("kustomization.yaml", EntryKind::File)])
        .file(K8S, &format!("{OVERLAY}/kustomization.yaml"), &overlay(tag))
        .commits(K8S, &format!("{OVERLAY}/kustomization.yaml"), vec![commit("k8s-file-sha", "bump prod")])
}

fn synced(store: &Arc<Store>, gateway: FakeGateway) -> Orchestrator<FakeGateway> {
    let orchestrator = Orchestrator::new(Arc::clone(store), gateway);
    let summary = orchestrator.sync_all().expect("pass");
    assert_eq!(summary.failed(), 0, "{:?}", summary.first_error());
    orchestrator
}

// ---------------------------------------------------------------------------
// Monorepo
// ---------------------------------------------------------------------------

#[test]
fn monorepo_sync_discovers_and_is_idempotent() {
    let store = store();
    let shop = add_repo(&store, SHOP, RepositoryKind::Monorepo);
    let orchestrator = synced(&store, shop_gateway("v1"));

    let first = store.services_for_repository(shop.id).expect("services");
    assert_eq!(first.len(), 2);
    let payment = first.iter().find(|s| s.name == "payment-api").expect("payment-api");
    assert_eq!(payment.description, "Charges cards.");
    assert!(store.repository(shop.id).expect("repo").last_sync_at.is_some());

    let report = orchestrator.sync_repository(shop.id).expect("second sync");
    let reconciliation = report.services.expect("services");
    assert_eq!(reconciliation.inserted, 0);
    assert_eq!(reconciliation.deleted, 0);
    assert_eq!(reconciliation.unchanged, 2);

    let second = store.services_for_repository(shop.id).expect("services");
    let ids = |s: &[deploydash_core::Microservice]| s.iter().map(|m| m.id).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn empty_monorepo_uses_configured_single_service() {
    let store = store();
    let repo = store
        .create_repository(&NewRepository {
            name: "billing-worker".into(),
            url: "https://github.com/acme/billing-worker".into(),
            kind: RepositoryKind::Monorepo,
            service_name: Some("billing-worker".into()),
            service_location: Some("src".into()),
            ..NewRepository::default()
        })
        .expect("repo");

    synced(&store, FakeGateway::default());

    let services = store.services_for_repository(repo.id).expect("services");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].name, "billing-worker");
    assert_eq!(services[0].path, "src");
    assert_eq!(services[0].description, "Service billing-worker located at src");
}

// ---------------------------------------------------------------------------
// Deployments and correlation
// ---------------------------------------------------------------------------

#[test]
fn release_tag_correlates_through_version_in_commit_message() {
    let store = store();
    add_repo(&store, SHOP, RepositoryKind::Monorepo);
    add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let gateway = shop_gateway("release-2.4.0").commits(
        SHOP,
        "services/payment-api",
        vec![
            commit("c3", "Fix flaky test"),
            commit("c2", "Bump payment-api to 2.4.0"),
            commit("c1", "Initial import"),
        ],
    );
    synced(&store, gateway);

    let deployments = store.list_deployments().expect("deployments");
    assert_eq!(deployments.len(), 1);
    let d = &deployments[0];
    assert_eq!(d.tag, "release-2.4.0");
    assert_eq!(d.commit_sha, "c2");
    assert_eq!(d.commit_source, CommitSource::ReleaseVersion);
    assert_eq!((d.environment.as_str(), d.region.as_str(), d.namespace.as_str()), ("prod", "us-west-2", "billing"));
}

#[test]
fn sha_tag_is_used_without_network_calls() {
    let store = store();
    add_repo(&store, SHOP, RepositoryKind::Monorepo);
    let k8s = add_repo(&store, K8S, RepositoryKind::KubernetesResources);
    let sha = "0123456789abcdef0123456789abcdef01234567";

    let orchestrator = Orchestrator::new(Arc::clone(&store), shop_gateway(sha));
    orchestrator.sync_all().expect("pass");
    let calls_before = orchestrator.gateway().network_calls();
    orchestrator.sync_repository(k8s.id).expect("k8s sync");
    // No commit search, no tag listing.
    assert_eq!(orchestrator.gateway().network_calls(), calls_before);

    let d = &store.list_deployments().expect("deployments")[0];
    assert_eq!(d.commit_sha, sha);
    assert_eq!(d.commit_source, CommitSource::Direct);
}

#[test]
fn vcs_tag_is_tried_after_commit_messages() {
    let store = store();
    add_repo(&store, SHOP, RepositoryKind::Monorepo);
    add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let gateway = shop_gateway("V1.9.0")
        .commits(SHOP, "services/payment-api", vec![commit("c1", "unrelated")])
        .tags(SHOP, &[("v1.8.0", "t8"), ("v1.9.0", "t9")]);
    synced(&store, gateway);

    let d = &store.list_deployments().expect("deployments")[0];
    assert_eq!(d.commit_sha, "t9");
    assert_eq!(d.commit_source, CommitSource::VcsTag);
}

#[test]
fn commit_search_failure_falls_through_to_manifest_commit() {
    let store = store();
    add_repo(&store, SHOP, RepositoryKind::Monorepo);
    add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let mut gateway = shop_gateway("v7");
    gateway.failing_commit_search = true;
    synced(&store, gateway);

    let d = &store.list_deployments().expect("deployments")[0];
    assert_eq!(d.commit_sha, "k8s-file-sha");
    assert_eq!(d.commit_source, CommitSource::ManifestCommit);
}

#[test]
fn overlay_for_unknown_service_is_skipped() {
    let store = store();
    let k8s = add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let orchestrator = Orchestrator::new(Arc::clone(&store), shop_gateway("v1"));
    let report = orchestrator.sync_repository(k8s.id).expect("sync");
    assert_eq!(report.deployments, 0);
    assert_eq!(report.skipped_manifests, 1);
    assert!(store.list_deployments().expect("deployments").is_empty());
}

#[test]
fn redeploy_overwrites_the_same_target() {
    let store = store();
    add_repo(&store, SHOP, RepositoryKind::Monorepo);
    add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    synced(&store, shop_gateway("v1"));
    synced(&store, shop_gateway("v2"));

    let deployments = store.list_deployments().expect("deployments");
    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].tag, "v2");
}

#[test]
fn generic_resources_are_discovered_under_default_roots() {
    let store = store();
    let k8s = add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let gateway = FakeGateway::default()
        .dir(K8S, "k8s", &[("ingress.yaml", EntryKind::File), ("notes.txt", EntryKind::File)])
        .file(
            K8S,
            "k8s/ingress.yaml",
            "apiVersion: networking.k8s.io/v1\nkind: Ingress\nmetadata:\n  name: shop\n  namespace: web\n---\napiVersion: v1\nkind: Service\nmetadata:\n  name: shop\n",
        );
    synced(&store, gateway);

    let resources = store.resources_for_repository(k8s.id).expect("resources");
    assert_eq!(resources.len(), 2);
    assert!(resources.iter().any(|r| r.resource_kind == "Ingress" && r.namespace == "web"));
}

const WEB_SERVICE: &str = "apiVersion: v1\nkind: Service\nmetadata:\n  name: web\n  namespace: shop\n";

#[test]
fn unreadable_resource_file_is_skipped_and_the_sync_completes() {
    let store = store();
    let k8s = add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let gateway = FakeGateway::default()
        .dir(K8S, "k8s", &[("broken.yaml", EntryKind::File), ("web.yaml", EntryKind::File)])
        .file(K8S, "k8s/web.yaml", WEB_SERVICE)
        .failing(K8S, "k8s/broken.yaml")
        .workflow(K8S, 7, "deploy-prod", vec![run(700, "completed", "main")]);
    let orchestrator = Orchestrator::new(Arc::clone(&store), gateway);

    let report = orchestrator.sync_repository(k8s.id).expect("sync");
    assert_eq!(report.resources, 1);
    assert_eq!(report.actions, 1);
    assert!(report.warnings.iter().any(|w| w.contains("k8s/broken.yaml")));

    let resources = store.resources_for_repository(k8s.id).expect("resources");
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].name, "web");
    assert!(store.repository(k8s.id).expect("repo").last_sync_at.is_some());
}

#[test]
fn failed_resource_walk_keeps_stored_resources() {
    let store = store();
    let k8s = add_repo(&store, K8S, RepositoryKind::KubernetesResources);
    let healthy = FakeGateway::default()
        .dir(K8S, "k8s", &[("web.yaml", EntryKind::File)])
        .file(K8S, "k8s/web.yaml", WEB_SERVICE);
    synced(&store, healthy);

    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        FakeGateway::default().failing(K8S, "k8s"),
    );
    let report = orchestrator.sync_repository(k8s.id).expect("sync");
    assert!(report.warnings.iter().any(|w| w.contains("keeping stored resources")));
    assert_eq!(store.resources_for_repository(k8s.id).expect("resources").len(), 1);
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[test]
fn workflow_runs_become_classified_actions() {
    let store = store();
    let shop = add_repo(&store, SHOP, RepositoryKind::Monorepo);

    let gateway = shop_gateway("v1")
        .workflow(SHOP, 1, "ci-build-payment-api", vec![run(100, "completed", "main"), run(101, "in_progress", "main")])
        .workflow(SHOP, 2, "deploy-prod", vec![run(200, "completed", "feature/cart-totals")])
        .workflow(SHOP, 3, "lint", vec![run(300, "completed", "main")]);
    synced(&store, gateway);

    let actions = store
        .recent_actions(ActionFilter { repository: Some(shop.id), ..ActionFilter::default() }, 50)
        .expect("actions");
    assert_eq!(actions.len(), 3);
    assert!(actions.iter().all(|a| a.workflow_run_id != 300));

    let services = store.services_for_repository(shop.id).expect("services");
    let id_of = |name: &str| services.iter().find(|s| s.name == name).map(|s| s.id);

    let build = actions.iter().find(|a| a.workflow_run_id == 100).expect("run 100");
    assert_eq!(build.action_type, ActionType::Build);
    assert_eq!(build.service_id, id_of("payment-api"));
    assert!(build.completed_at.is_some());

    let running = actions.iter().find(|a| a.workflow_run_id == 101).expect("run 101");
    assert!(running.completed_at.is_none());

    let deploy = actions.iter().find(|a| a.workflow_run_id == 200).expect("run 200");
    assert_eq!(deploy.action_type, ActionType::Deployment);
    assert_eq!(deploy.service_id, id_of("cart"));
}

// ---------------------------------------------------------------------------
// Isolation and pipeline
// ---------------------------------------------------------------------------

#[test]
fn one_bad_repository_does_not_stop_the_pass() {
    let store = store();
    let broken = add_repo(&store, "git@github.com:acme/broken.git", RepositoryKind::Monorepo);
    let shop = add_repo(&store, SHOP, RepositoryKind::Monorepo);

    let summary = pipeline::run(Arc::clone(&store), shop_gateway("v1"), SyncScope::All).expect("pass");
    assert_eq!(summary.succeeded(), 1);
    assert_eq!(summary.failed(), 1);
    assert!(summary.first_error().expect("error").contains("invalid repository URL"));

    assert!(store.repository(broken.id).expect("repo").last_sync_at.is_none());
    assert!(store.repository(shop.id).expect("repo").last_sync_at.is_some());
}

#[test]
fn manual_sync_surfaces_the_failure() {
    let store = store();
    let broken = add_repo(&store, "http://github.com/acme/broken", RepositoryKind::Monorepo);

    let err = pipeline::run(Arc::clone(&store), FakeGateway::default(), SyncScope::Repository(broken.id))
        .expect_err("configuration error");
    assert!(err.is_configuration());
}

// ---------------------------------------------------------------------------
// History and ticket titles
// ---------------------------------------------------------------------------

#[test]
fn commit_history_marks_deployed_commits() {
    let store = store();
    let shop = add_repo(&store, SHOP, RepositoryKind::Monorepo);
    add_repo(&store, K8S, RepositoryKind::KubernetesResources);

    let gateway = shop_gateway("release-2.4.0").commits(
        SHOP,
        "services/payment-api",
        vec![commit("c3", "next"), commit("c2", "2.4.0")],
    );
    let orchestrator = synced(&store, gateway);

    let payment = store
        .services_for_repository(shop.id)
        .expect("services")
        .into_iter()
        .find(|s| s.name == "payment-api")
        .expect("payment-api");
    let history = commit_deployments(&store, orchestrator.gateway(), payment.id).expect("history");

    assert_eq!(history.len(), 2);
    assert!(!history[0].targets[0].deployed);
    assert!(history[1].targets[0].deployed);
    assert_eq!(history[1].targets[0].tag.as_deref(), Some("release-2.4.0"));
}

struct Titles;

impl TicketTitles for Titles {
    fn issue_title(&self, key: &str) -> Result<String, GatewayError> {
        match key {
            "SHOP-1" => Ok("Refund flow".into()),
            _ => Err(GatewayError::Status {
                url: format!("issue/{key}"),
                status: 404,
                message: "Issue does not exist".into(),
            }),
        }
    }
}

#[test]
fn service_pull_requests_keep_only_those_touching_the_service() {
    let store = store();
    let shop = add_repo(&store, SHOP, RepositoryKind::Monorepo);
    let gateway = shop_gateway("v1")
        .pull(3, PullRequestState::Open, &["services/payment-api/src/refund.rs"])
        .pull(2, PullRequestState::Merged, &["services/cart/src/lib.rs", "README.md"])
        .pull(1, PullRequestState::Closed, &[])
        .pull(0, PullRequestState::Merged, &["README.md", "services/payment-api/Dockerfile"]);
    let orchestrator = synced(&store, gateway);

    let payment = store
        .services_for_repository(shop.id)
        .expect("services")
        .into_iter()
        .find(|s| s.name == "payment-api")
        .expect("payment-api");
    let pulls = service_pull_requests(&store, orchestrator.gateway(), payment.id).expect("pulls");

    let numbers: Vec<i64> = pulls.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![3, 0]);
    assert_eq!(pulls[1].state, PullRequestState::Merged);
}

#[test]
fn ticket_titles_refresh_per_task() {
    let store = store();
    let project = store.create_project("Checkout", "").expect("project");
    for (title, ticket) in [("refunds", Some("SHOP-1")), ("ghost", Some("SHOP-404")), ("plain", None)] {
        store
            .create_task(&NewTask {
                project_id: project.id,
                title: title.into(),
                ticket_id: ticket.map(str::to_string),
                ..NewTask::default()
            })
            .expect("task");
    }

    let outcome = refresh_tracker_titles(&store, &Titles).expect("refresh");
    assert_eq!(outcome.refreshed, 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].ticket_id, "SHOP-404");

    let tasks = store.list_tasks(Some(project.id)).expect("tasks");
    let refunds = tasks.iter().find(|t| t.title == "refunds").expect("task");
    assert_eq!(refunds.tracker_title.as_deref(), Some("Refund flow"));
}
