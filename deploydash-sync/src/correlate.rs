//! Commit correlation for deployed image tags.
//!
//! Strategies, first success wins:
//!
//! 1. the tag is a 40-hex commit SHA (no network)
//! 2. a recent commit message on the service path mentions the tag
//! 3. for `release-<version>`, a recent commit message mentions the version
//! 4. a VCS tag of the same name (case-insensitive) in the application repository
//! 5. the manifest file's own latest commit in the Kubernetes repository
//!
//! Correlation is best-effort: gateway failures are logged and the next
//! strategy is tried. It never fails the deployment upsert.

use deploydash_core::CommitSource;
use deploydash_gateway::{Commit, RepoCoordinates, VcsGateway};

/// Recent commits searched for strategies 2 and 3.
pub const COMMIT_SEARCH_LIMIT: usize = 50;

const RELEASE_PREFIX: &str = "release-";

/// The commit a deployment is attributed to, and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub sha: String,
    pub source: CommitSource,
}

impl Correlation {
    fn new(sha: impl Into<String>, source: CommitSource) -> Self {
        Self {
            sha: sha.into(),
            source,
        }
    }

    fn none() -> Self {
        Self::new(String::new(), CommitSource::None)
    }
}

/// Where the service's application code lives.
#[derive(Debug, Clone, Copy)]
pub struct ApplicationPath<'a> {
    pub repo: &'a RepoCoordinates,
    pub path: &'a str,
}

/// Where the overlay manifest lives.
#[derive(Debug, Clone, Copy)]
pub struct ManifestPath<'a> {
    pub repo: &'a RepoCoordinates,
    pub path: &'a str,
}

/// Exactly 40 hexadecimal characters.
pub fn is_commit_sha(tag: &str) -> bool {
    tag.len() == 40 && tag.bytes().all(|b| b.is_ascii_hexdigit())
}

/// `<version>` of a `release-<version>` tag.
pub fn release_version(tag: &str) -> Option<&str> {
    let prefix = tag.get(..RELEASE_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(RELEASE_PREFIX) {
        return None;
    }
    Some(&tag[RELEASE_PREFIX.len()..]).filter(|v| !v.is_empty())
}

/// Run every strategy in order.
///
/// `application` is `None` when the service's repository URL could not be
/// resolved; strategies 2 to 4 are skipped then.
pub fn resolve_commit<G: VcsGateway + ?Sized>(
    gateway: &G,
    tag: &str,
    application: Option<ApplicationPath<'_>>,
    manifest: ManifestPath<'_>,
) -> Correlation {
    if is_commit_sha(tag) {
        return Correlation::new(tag, CommitSource::Direct);
    }

    if let Some(app) = application {
        if let Some(found) = correlate_in_application(gateway, tag, app) {
            return found;
        }
    }

    tracing::warn!(
        tag,
        manifest = manifest.path,
        "no application commit correlated, falling back to manifest commit"
    );
    match gateway.latest_commit_for_path(manifest.repo, manifest.path) {
        Ok(Some(commit)) => Correlation::new(commit.sha, CommitSource::ManifestCommit),
        Ok(None) => Correlation::none(),
        Err(e) => {
            tracing::warn!(manifest = manifest.path, error = %e, "manifest commit lookup failed");
            Correlation::none()
        }
    }
}

/// Strategies 2 to 4.
pub fn correlate_in_application<G: VcsGateway + ?Sized>(
    gateway: &G,
    tag: &str,
    app: ApplicationPath<'_>,
) -> Option<Correlation> {
    match gateway.list_commits(app.repo, app.path, COMMIT_SEARCH_LIMIT) {
        Ok(commits) => {
            if let Some(commit) = mentioning(&commits, tag) {
                tracing::debug!(tag, sha = %commit.sha, "tag found in commit message");
                return Some(Correlation::new(&commit.sha, CommitSource::CommitMessage));
            }
            if let Some(version) = release_version(tag) {
                if let Some(commit) = mentioning(&commits, version) {
                    tracing::debug!(tag, version, sha = %commit.sha, "release version found in commit message");
                    return Some(Correlation::new(&commit.sha, CommitSource::ReleaseVersion));
                }
            }
        }
        Err(e) => {
            tracing::warn!(repo = %app.repo, path = app.path, error = %e, "commit search failed");
        }
    }

    match gateway.list_tags(app.repo) {
        Ok(tags) => {
            let wanted = tag.to_lowercase();
            if let Some(found) = tags.iter().find(|t| t.name.to_lowercase() == wanted) {
                tracing::debug!(tag, sha = %found.commit_sha, "matching VCS tag");
                return Some(Correlation::new(&found.commit_sha, CommitSource::VcsTag));
            }
        }
        Err(e) => {
            tracing::warn!(repo = %app.repo, error = %e, "tag listing failed");
        }
    }
    None
}

fn mentioning<'a>(commits: &'a [Commit], needle: &str) -> Option<&'a Commit> {
    let needle = needle.to_lowercase();
    if needle.is_empty() {
        return None;
    }
    commits
        .iter()
        .find(|c| c.message.to_lowercase().contains(&needle))
}
