use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use deploydash_core::{Lookup, NewRepository, RepositoryId, RepositoryKind};
use deploydash_daemon::{
    request_status, request_stop, request_sync, run, wait_until_running, DaemonContext,
    DaemonError, GatewayFactory,
};
use deploydash_gateway::{
    Commit, ContentEntry, GatewayError, PullRequest, RepoCoordinates, RepositoryInfo, TagRef,
    VcsGateway, Workflow, WorkflowRun,
};
use deploydash_store::Store;
use tempfile::TempDir;

/// A platform where every repository is empty.
struct EmptyPlatform;

impl VcsGateway for EmptyPlatform {
    fn list_directory(
        &self,
        _repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<Vec<ContentEntry>>, GatewayError> {
        Ok(Lookup::not_applicable(format!("{path} not found")))
    }

    fn file_content(&self, _repo: &RepoCoordinates, path: &str) -> Result<Lookup<String>, GatewayError> {
        Ok(Lookup::not_applicable(format!("{path} not found")))
    }

    fn list_commits(
        &self,
        _repo: &RepoCoordinates,
        _path: &str,
        _limit: usize,
    ) -> Result<Vec<Commit>, GatewayError> {
        Ok(Vec::new())
    }

    fn list_tags(&self, _repo: &RepoCoordinates) -> Result<Vec<TagRef>, GatewayError> {
        Ok(Vec::new())
    }

    fn list_workflows(&self, _repo: &RepoCoordinates) -> Result<Vec<Workflow>, GatewayError> {
        Ok(Vec::new())
    }

    fn list_workflow_runs(
        &self,
        _repo: &RepoCoordinates,
        _workflow_id: i64,
        _limit: usize,
    ) -> Result<Vec<WorkflowRun>, GatewayError> {
        Ok(Vec::new())
    }

    fn repository(&self, repo: &RepoCoordinates) -> Result<Lookup<RepositoryInfo>, GatewayError> {
        Ok(Lookup::not_applicable(format!("{repo} not found")))
    }

    fn list_pull_requests(
        &self,
        _repo: &RepoCoordinates,
        _limit: usize,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        Ok(Vec::new())
    }

    fn pull_request_files(
        &self,
        _repo: &RepoCoordinates,
        _number: i64,
    ) -> Result<Vec<String>, GatewayError> {
        Ok(Vec::new())
    }

    fn check_connection(&self) -> Result<String, GatewayError> {
        Ok("tester".into())
    }
}

fn seeded_store() -> Arc<Store> {
    let store = Store::open_in_memory().expect("store");
    store
        .create_repository(&NewRepository {
            name: "platform".into(),
            url: "https://github.com/acme/platform".into(),
            kind: RepositoryKind::Monorepo,
            description: String::new(),
            scan_root: None,
            service_name: None,
            service_location: None,
        })
        .expect("repository");
    Arc::new(store)
}

fn counting_factory(builds: Arc<AtomicUsize>) -> GatewayFactory {
    Arc::new(move || {
        builds.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(EmptyPlatform) as Box<dyn VcsGateway>)
    })
}

async fn blocking<T, F>(home: PathBuf, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce(PathBuf) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(home))
        .await
        .expect("blocking join")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn status_sync_and_stop_over_the_socket() {
    let home = TempDir::new().expect("home");
    let builds = Arc::new(AtomicUsize::new(0));
    let context = DaemonContext {
        home: home.path().to_path_buf(),
        store: seeded_store(),
        gateway: counting_factory(builds.clone()),
        interval: Duration::from_secs(3600),
    };
    let daemon = tokio::spawn(run(context));

    let status = blocking(home.path().to_path_buf(), |h| {
        wait_until_running(&h, Duration::from_secs(10))
    })
    .await
    .expect("status");
    assert!(status.running);
    assert_eq!(status.interval_secs, 3600);
    assert_eq!(status.repositories[0].name, "platform");
    assert_eq!(status.repositories[0].kind, RepositoryKind::Monorepo);

    let summary = blocking(home.path().to_path_buf(), |h| request_sync(&h, None))
        .await
        .expect("sync all");
    assert_eq!(summary.outcomes.len(), 1);
    assert!(summary.outcomes[0].error.is_none());

    let status = blocking(home.path().to_path_buf(), |h| request_status(&h))
        .await
        .expect("status after sync");
    assert!(status.repositories[0].last_sync_at.is_some());
    assert!(status.passes >= 1);
    assert!(status.last_pass.is_some());

    // One gateway per pass: the startup tick plus the socket request.
    assert!(builds.load(Ordering::SeqCst) >= 2);

    blocking(home.path().to_path_buf(), |h| request_stop(&h))
        .await
        .expect("stop");
    tokio::time::timeout(Duration::from_secs(10), daemon)
        .await
        .expect("daemon exits")
        .expect("join")
        .expect("clean shutdown");
    assert!(!home.path().join(".deploydash/daemon.sock").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sync_of_unknown_repository_reports_an_error() {
    let home = TempDir::new().expect("home");
    let context = DaemonContext {
        home: home.path().to_path_buf(),
        store: seeded_store(),
        gateway: counting_factory(Arc::new(AtomicUsize::new(0))),
        interval: Duration::from_secs(3600),
    };
    let daemon = tokio::spawn(run(context));

    blocking(home.path().to_path_buf(), |h| {
        wait_until_running(&h, Duration::from_secs(10))
    })
    .await
    .expect("daemon up");
    let err = blocking(home.path().to_path_buf(), |h| {
        request_sync(&h, Some(RepositoryId(999)))
    })
    .await
    .expect_err("unknown repository");
    assert!(matches!(err, DaemonError::Rejected(_)), "got {err:?}");

    blocking(home.path().to_path_buf(), |h| request_stop(&h))
        .await
        .expect("stop");
    tokio::time::timeout(Duration::from_secs(10), daemon)
        .await
        .expect("daemon exits")
        .expect("join")
        .expect("clean shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_construction_failure_fails_the_pass_not_the_daemon() {
    let home = TempDir::new().expect("home");
    let factory: GatewayFactory = Arc::new(|| {
        Err(DaemonError::Protocol("no credentials".into()))
    });
    let context = DaemonContext {
        home: home.path().to_path_buf(),
        store: seeded_store(),
        gateway: factory,
        interval: Duration::from_secs(3600),
    };
    let daemon = tokio::spawn(run(context));

    let err = blocking(home.path().to_path_buf(), |h| {
        wait_until_running(&h, Duration::from_secs(10))?;
        request_sync(&h, None)
    })
    .await
    .expect_err("pass fails");
    assert!(err.to_string().contains("no credentials"), "got {err}");

    let status = blocking(home.path().to_path_buf(), |h| request_status(&h))
        .await
        .expect("still serving");
    let last_pass = status.last_pass.expect("recorded pass");
    assert_eq!(last_pass.failed, 1);
    assert!(last_pass
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("no credentials"));

    blocking(home.path().to_path_buf(), |h| request_stop(&h))
        .await
        .expect("stop");
    tokio::time::timeout(Duration::from_secs(10), daemon)
        .await
        .expect("daemon exits")
        .expect("join")
        .expect("clean shutdown");
}
