//! `VcsGateway` over the GitHub REST API (public or enterprise).

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use deploydash_core::{Lookup, Settings};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::GatewayError;
use crate::gateway::VcsGateway;
use crate::types::{
    Commit, ContentEntry, PullRequest, PullRequestState, RepoCoordinates, RepositoryInfo, TagRef,
    Workflow, WorkflowRun,
};

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const MAX_PER_PAGE: usize = 100;

/// Immutable client: reconfiguring means building a new one.
#[derive(Clone)]
pub struct GitHubClient {
    agent: ureq::Agent,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl GitHubClient {
    /// Client against `base_url` exactly as given.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("deploydash/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Client from local settings: enterprise hosts get `/api/v3` appended
    /// when the configured URL lacks it.
    pub fn from_settings(settings: &Settings) -> Self {
        let base = if settings.is_enterprise() {
            enterprise_api_base(&settings.api_base_url())
        } else {
            settings.api_base_url()
        };
        Self::new(
            &base,
            settings.resolved_token(),
            Duration::from_secs(settings.http_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn repo_url(&self, repo: &RepoCoordinates, suffix: &str) -> String {
        let root = format!("{}/repos/{}/{}", self.base_url, repo.owner, repo.name);
        if suffix.is_empty() {
            root
        } else {
            format!("{root}/{suffix}")
        }
    }

    fn get(&self, url: &str, query: &[(&str, String)]) -> Result<ureq::Response, GatewayError> {
        let mut request = self
            .agent
            .get(url)
            .set("Accept", ACCEPT)
            .set("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        for (key, value) in query {
            request = request.query(key, value);
        }
        tracing::trace!(url, "GET");
        request.call().map_err(|e| GatewayError::from_ureq(url, e))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        decode(url, self.get(url, query)?)
    }

    /// Like `get_json`, with 404 mapped to `NotApplicable`.
    fn get_optional<T: DeserializeOwned>(&self, url: &str) -> Result<Lookup<T>, GatewayError> {
        match self.get(url, &[]) {
            Ok(response) => decode(url, response).map(Lookup::Found),
            Err(e) if e.status() == Some(404) => Ok(Lookup::not_applicable(format!(
                "{} not found",
                url.rsplit_once("/contents").map(|(_, p)| p).unwrap_or(url)
            ))),
            Err(e) => Err(e),
        }
    }
}

/// `https://host` → `https://host/api/v3`; URLs already ending in it are kept.
pub fn enterprise_api_base(url: &str) -> String {
    let url = url.trim_end_matches('/');
    if url.ends_with("/api/v3") {
        url.to_string()
    } else {
        format!("{url}/api/v3")
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, GatewayError> {
    response.into_json::<T>().map_err(|e| GatewayError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

fn contents_path(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        "contents".to_string()
    } else {
        format!("contents/{path}")
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// The contents endpoint returns an array for directories and an object for files.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Directory(Vec<ContentEntry>),
    File(FileBody),
}

#[derive(Deserialize)]
struct FileBody {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct CommitBody {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    name: String,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct TagBody {
    name: String,
    commit: TagCommit,
}

#[derive(Deserialize)]
struct TagCommit {
    sha: String,
}

#[derive(Deserialize)]
struct WorkflowList {
    workflows: Vec<Workflow>,
}

#[derive(Deserialize)]
struct RunList {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct UserBody {
    login: String,
}

#[derive(Deserialize)]
struct PullBody {
    number: i64,
    #[serde(default)]
    title: String,
    state: String,
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user: Option<UserBody>,
    head: PullHead,
    created_at: DateTime<Utc>,
    #[serde(default)]
    html_url: String,
}

#[derive(Deserialize)]
struct PullHead {
    #[serde(rename = "ref")]
    branch: String,
}

impl From<PullBody> for PullRequest {
    fn from(body: PullBody) -> Self {
        // The list endpoint has no `merged` flag; a merge time implies it.
        let state = match (body.merged_at, body.state.as_str()) {
            (Some(_), _) => PullRequestState::Merged,
            (None, "closed") => PullRequestState::Closed,
            _ => PullRequestState::Open,
        };
        PullRequest {
            number: body.number,
            title: body.title,
            state,
            author: body.user.map(|u| u.login).unwrap_or_default(),
            branch: body.head.branch,
            created_at: body.created_at,
            url: body.html_url,
        }
    }
}

#[derive(Deserialize)]
struct PullFile {
    filename: String,
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

impl VcsGateway for GitHubClient {
    fn list_directory(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<Vec<ContentEntry>>, GatewayError> {
        let url = self.repo_url(repo, &contents_path(path));
        Ok(match self.get_optional::<ContentsResponse>(&url)? {
            Lookup::Found(ContentsResponse::Directory(entries)) => Lookup::Found(entries),
            Lookup::Found(ContentsResponse::File(_)) => {
                Lookup::not_applicable(format!("{path} is a file"))
            }
            Lookup::NotApplicable { reason } => Lookup::NotApplicable { reason },
        })
    }

    fn file_content(
        &self,
        repo: &RepoCoordinates,
        path: &str,
    ) -> Result<Lookup<String>, GatewayError> {
        let url = self.repo_url(repo, &contents_path(path));
        let body = match self.get_optional::<ContentsResponse>(&url)? {
            Lookup::Found(ContentsResponse::File(body)) if body.kind == "file" => body,
            Lookup::Found(_) => return Ok(Lookup::not_applicable(format!("{path} is not a file"))),
            Lookup::NotApplicable { reason } => return Ok(Lookup::NotApplicable { reason }),
        };

        let content = body.content.unwrap_or_default();
        match body.encoding.as_deref() {
            Some("base64") => {
                let compact: String = content.split_whitespace().collect();
                let bytes = STANDARD.decode(compact).map_err(|e| GatewayError::Decode {
                    url: url.clone(),
                    message: e.to_string(),
                })?;
                Ok(Lookup::Found(String::from_utf8_lossy(&bytes).into_owned()))
            }
            // Files over the inline size limit come back with encoding "none".
            Some("none") => Ok(Lookup::not_applicable(format!("{path} is too large to inline"))),
            _ => Ok(Lookup::Found(content)),
        }
    }

    fn list_commits(
        &self,
        repo: &RepoCoordinates,
        path: &str,
        limit: usize,
    ) -> Result<Vec<Commit>, GatewayError> {
        let url = self.repo_url(repo, "commits");
        let mut query = vec![("per_page", limit.clamp(1, MAX_PER_PAGE).to_string())];
        let path = path.trim_matches('/');
        if !path.is_empty() {
            query.push(("path", path.to_string()));
        }
        let bodies: Vec<CommitBody> = match self.get_json(&url, &query) {
            Ok(bodies) => bodies,
            // An empty repository answers 409.
            Err(e) if e.status() == Some(409) => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(bodies
            .into_iter()
            .take(limit)
            .map(|body| {
                let (author, date) = match body.commit.author {
                    Some(a) => (a.name, a.date),
                    None => (String::new(), None),
                };
                Commit {
                    sha: body.sha,
                    message: body.commit.message,
                    author,
                    date,
                }
            })
            .collect())
    }

    fn list_tags(&self, repo: &RepoCoordinates) -> Result<Vec<TagRef>, GatewayError> {
        let url = self.repo_url(repo, "tags");
        let bodies: Vec<TagBody> =
            self.get_json(&url, &[("per_page", MAX_PER_PAGE.to_string())])?;
        Ok(bodies
            .into_iter()
            .map(|t| TagRef {
                name: t.name,
                commit_sha: t.commit.sha,
            })
            .collect())
    }

    fn list_workflows(&self, repo: &RepoCoordinates) -> Result<Vec<Workflow>, GatewayError> {
        let url = self.repo_url(repo, "actions/workflows");
        let list: WorkflowList = self.get_json(&url, &[("per_page", MAX_PER_PAGE.to_string())])?;
        Ok(list.workflows)
    }

    fn list_workflow_runs(
        &self,
        repo: &RepoCoordinates,
        workflow_id: i64,
        limit: usize,
    ) -> Result<Vec<WorkflowRun>, GatewayError> {
        let url = self.repo_url(repo, &format!("actions/workflows/{workflow_id}/runs"));
        let list: RunList = self.get_json(
            &url,
            &[("per_page", limit.clamp(1, MAX_PER_PAGE).to_string())],
        )?;
        Ok(list.workflow_runs.into_iter().take(limit).collect())
    }

    fn repository(&self, repo: &RepoCoordinates) -> Result<Lookup<RepositoryInfo>, GatewayError> {
        let url = self.repo_url(repo, "");
        match self.get(&url, &[]) {
            Ok(response) => decode(&url, response).map(Lookup::Found),
            Err(e) if e.status() == Some(404) => Ok(Lookup::not_applicable(format!(
                "{repo} does not exist or is not visible with the configured token"
            ))),
            Err(e) => Err(e),
        }
    }

    fn list_pull_requests(
        &self,
        repo: &RepoCoordinates,
        limit: usize,
    ) -> Result<Vec<PullRequest>, GatewayError> {
        let url = self.repo_url(repo, "pulls");
        let bodies: Vec<PullBody> = self.get_json(
            &url,
            &[
                ("state", "all".to_string()),
                ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
            ],
        )?;
        Ok(bodies.into_iter().take(limit).map(PullRequest::from).collect())
    }

    fn pull_request_files(
        &self,
        repo: &RepoCoordinates,
        number: i64,
    ) -> Result<Vec<String>, GatewayError> {
        let url = self.repo_url(repo, &format!("pulls/{number}/files"));
        let files: Vec<PullFile> = self.get_json(&url, &[("per_page", MAX_PER_PAGE.to_string())])?;
        Ok(files.into_iter().map(|f| f.filename).collect())
    }

    fn check_connection(&self) -> Result<String, GatewayError> {
        let url = format!("{}/user", self.base_url);
        let user: UserBody = self.get_json(&url, &[])?;
        Ok(user.login)
    }
}
