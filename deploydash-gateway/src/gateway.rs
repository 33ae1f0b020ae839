//! The `VcsGateway` trait.
//!
//! Implementors provide the primitive remote calls. Directory traversal,
//! service discovery, and manifest search are default methods built on
//! those primitives so every implementation walks a tree the same way.

use deploydash_core::{DiscoveredService, Lookup};
use deploydash_manifest::{describe_service, KUSTOMIZATION_FILE};

use crate::error::GatewayError;
use crate::types::{
    Commit, ContentEntry, EntryKind, PullRequest, RepoCoordinates, RepositoryInfo, TagRef, Workflow,
    WorkflowRun,
};

/// Remote operations against the VCS hosting platform.
///
/// Errors are surfaced verbatim; no method retries.
pub trait VcsGateway: Send + Sync {
    // -----------------------------------------------------------------------
    // 1. Primitives
    // -----------------------------------------------------------------------

    /// Entries directly under `path`. A missing directory, or a path that
    /// names a file, is `NotApplicable`.
    fn list_directory(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<Vec<ContentEntry>>, GatewayError>;

    /// Decoded text of the file at `path`. A missing file is `NotApplicable`.
    fn file_content(&self, repo: &RepoCoordinates, path: &str)
        -> Result<Lookup<String>, GatewayError>;

    /// Most recent commits touching `path`, newest first, at most `limit`.
    fn list_commits(
        &self,
        repo: &RepoCoordinates,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, GatewayError>;

    fn list_tags(&self, repo: &RepoCoordinates) -> Result<Vec<TagRef>, GatewayError>;

    fn list_workflows(&self, repo: &RepoCoordinates) -> Result<Vec<Workflow>, GatewayError>;

    /// Most recent runs of one workflow, newest first, at most `limit`.
    fn list_workflow_runs(
        &self,
        repo: &RepoCoordinates,
        workflow_id: i64,
        limit: usize,
    ) -> Result<Vec<WorkflowRun>, GatewayError>;

    /// Repository metadata. A repository that does not exist, or that the
    /// credentials cannot see, is `NotApplicable`.
    fn repository(&self, repo: &RepoCoordinates) -> Result<Lookup<RepositoryInfo>, GatewayError>;

    /// Most recent pull requests in any state, newest first, at most `limit`.
    fn list_pull_requests(
        &self,
        repo: &RepoCoordinates,
        limit: usize,
    ) -> Result<Vec<PullRequest>, GatewayError>;

    /// Paths changed by one pull request.
    fn pull_request_files(
        &self,
        repo: &RepoCoordinates,
        number: i64,
    ) -> Result<Vec<String>, GatewayError>;

    /// Verify credentials; returns the authenticated account name.
    fn check_connection(&self) -> Result<String, GatewayError>;

    // -----------------------------------------------------------------------
    // 2. Traversal
    // -----------------------------------------------------------------------

    /// Immediate subdirectories of `base_path`, each described from its
    /// README or package descriptor.
    fn discover_services(
        &self,
        repo: &RepoCoordinates,
        base_path: &str,
    ) -> Result<Lookup<Vec<DiscoveredService>>, GatewayError> {
        let entries = match self.list_directory(repo, base_path)? {
            Lookup::Found(entries) => entries,
            Lookup::NotApplicable { reason } => return Ok(Lookup::NotApplicable { reason }),
        };

        let mut services = Vec::new();
        for entry in entries.into_iter().filter(|e| e.kind == EntryKind::Dir) {
            let readme = read_optional(self, repo, &join_path(&entry.path, "README.md"));
            let package = read_optional(self, repo, &join_path(&entry.path, "package.json"));
            services.push(DiscoveredService {
                description: describe_service(readme.as_deref(), package.as_deref()),
                name: entry.name,
                path: entry.path,
            });
        }
        Ok(Lookup::Found(services))
    }

    /// Every file named exactly `kustomization.yaml` under `root`.
    fn find_manifest_files(
        &self,
        repo: &RepoCoordinates,
        root: &str,
    ) -> Result<Vec<String>, GatewayError> {
        self.find_files(repo, root, &|name| name == KUSTOMIZATION_FILE)
    }

    /// Depth-first search for files whose name satisfies `matches`.
    ///
    /// Directories that are missing or forbidden are skipped; any other
    /// failure aborts the walk.
    fn find_files(
        &self,
        repo: &RepoCoordinates,
        root: &str,
        matches: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<String>, GatewayError> {
        let mut found = Vec::new();
        let mut pending = vec![root.trim_matches('/').to_string()];

        while let Some(dir) = pending.pop() {
            let entries = match self.list_directory(repo, &dir) {
                Ok(Lookup::Found(entries)) => entries,
                Ok(Lookup::NotApplicable { reason }) => {
                    tracing::debug!(repo = %repo, dir = %dir, %reason, "skipping directory");
                    continue;
                }
                Err(e) if e.status() == Some(403) => {
                    tracing::debug!(repo = %repo, dir = %dir, "skipping forbidden directory");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut subdirs = Vec::new();
            for entry in entries {
                match entry.kind {
                    EntryKind::File if matches(&entry.name) => found.push(entry.path),
                    EntryKind::Dir => subdirs.push(entry.path),
                    _ => {}
                }
            }
            // Reverse so the stack pops subdirectories in listing order.
            pending.extend(subdirs.into_iter().rev());
        }
        Ok(found)
    }

    /// The newest commit touching `path`, if any.
    fn latest_commit_for_path(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Option<Commit>, GatewayError> {
        Ok(self.list_commits(repo, path, 1)?.into_iter().next())
    }
}

impl<T: VcsGateway + ?Sized> VcsGateway for Box<T> {
    fn list_directory(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<Vec<ContentEntry>>, GatewayError> {
        (**self).list_directory(repo, path)
    }

    fn file_content(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<String>, GatewayError> {
        (**self).file_content(repo, path)
    }

    fn list_commits(
        &self,
        repo: &RepoCoordinates,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, GatewayError> {
        (**self).list_commits(repo, path, limit)
    }

    fn list_tags(&self, repo: &RepoCoordinates) -> Result<Vec<TagRef>, GatewayError> {
        (**self).list_tags(repo)
    }

    fn list_workflows(&self, repo: &RepoCoordinates) -> Result<Vec<Workflow>, GatewayError> {
        (**self).list_workflows(repo)
    }

    fn list_workflow_runs(
        &self,
        repo: &RepoCoordinates,
        workflow_id: i64,
        limit: usize,
    ) -> Result<Vec<WorkflowRun>, GatewayError> {
        (**self).list_workflow_runs(repo, workflow_id, limit)
    }

    fn repository(&self, repo: &RepoCoordinates) -> Result<Lookup<RepositoryInfo>, GatewayError> {
        (**self).repository(repo)
    }

    fn list_pull_requests(
        &self,
        repo: &RepoCoordinates,
        limit: usize,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        (**self).list_pull_requests(repo, limit)
    }

    fn pull_request_files(
        &self,
        repo: &RepoCoordinates,
        number: i64,
    ) -> Result<Vec<String>, GatewayError> {
        (**self).pull_request_files(repo, number)
    }

    fn check_connection(&self) -> Result<String, GatewayError> {
        (**self).check_connection()
    }

    fn discover_services(
        &self,
        repo: &RepoCoordinates,
        base_path: &str,
    ) -> Result<Lookup<Vec<DiscoveredService>>, GatewayError> {
        (**self).discover_services(repo, base_path)
    }

    fn find_files(
        &self,
        repo: &RepoCoordinates,
        root: &str,
        matches: &dyn Fn(&str) -> bool,
    ) -> Result<Vec<String>, GatewayError> {
        (**self).find_files(repo, root, matches)
    }
}

/// `base/name`, treating an empty base as the repository root.
pub fn join_path(base: &str, name: &str) -> String {
    let base = base.trim_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

fn read_optional<G: VcsGateway + ?Sized>(
    gateway: &G,
    repo: &RepoCoordinates,
    path: &str,
) -> Option<String> {
    match gateway.file_content(repo, path) {
        Ok(lookup) => lookup.found(),
        Err(e) => {
            tracing::debug!(repo = %repo, path, error = %e, "description source unreadable");
            None
        }
    }
}
