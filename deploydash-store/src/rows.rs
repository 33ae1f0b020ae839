//! Row-to-record mapping helpers.

use std::str::FromStr;

use deploydash_core::{
    Action, Deployment, KubernetesResource, Microservice, Project, Repository, Task,
};
use rusqlite::types::Type;
use rusqlite::Row;

/// Read a TEXT column and parse it into one of the core enums.
pub(crate) fn parse_column<T>(row: &Row<'_>, column: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|err| {
        let index = row.as_ref().column_index(column).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
    })
}

pub(crate) const REPOSITORY_COLUMNS: &str = "id, name, url, kind, description, scan_root, \
     service_name, service_location, last_sync_at, created_at, updated_at";

pub(crate) fn repository(row: &Row<'_>) -> rusqlite::Result<Repository> {
    Ok(Repository {
        id: row.get::<_, i64>("id")?.into(),
        name: row.get("name")?,
        url: row.get("url")?,
        kind: parse_column(row, "kind")?,
        description: row.get("description")?,
        scan_root: row.get("scan_root")?,
        service_name: row.get("service_name")?,
        service_location: row.get("service_location")?,
        last_sync_at: row.get("last_sync_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const SERVICE_COLUMNS: &str =
    "id, repository_id, name, path, description, created_at, updated_at";

pub(crate) fn microservice(row: &Row<'_>) -> rusqlite::Result<Microservice> {
    Ok(Microservice {
        id: row.get::<_, i64>("id")?.into(),
        repository_id: row.get::<_, i64>("repository_id")?.into(),
        name: row.get("name")?,
        path: row.get("path")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const RESOURCE_COLUMNS: &str =
    "id, repository_id, name, path, resource_kind, namespace, created_at, updated_at";

pub(crate) fn resource(row: &Row<'_>) -> rusqlite::Result<KubernetesResource> {
    Ok(KubernetesResource {
        id: row.get::<_, i64>("id")?.into(),
        repository_id: row.get::<_, i64>("repository_id")?.into(),
        name: row.get("name")?,
        path: row.get("path")?,
        resource_kind: row.get("resource_kind")?,
        namespace: row.get("namespace")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const ACTION_COLUMNS: &str = "id, repository_id, service_id, resource_id, action_type, \
     status, workflow_run_id, commit_sha, branch, build_hash, started_at, completed_at, \
     created_at, updated_at";

pub(crate) fn action(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: row.get::<_, i64>("id")?.into(),
        repository_id: row.get::<_, i64>("repository_id")?.into(),
        service_id: row.get::<_, Option<i64>>("service_id")?.map(Into::into),
        resource_id: row.get::<_, Option<i64>>("resource_id")?.map(Into::into),
        action_type: parse_column(row, "action_type")?,
        status: row.get("status")?,
        workflow_run_id: row.get("workflow_run_id")?,
        commit_sha: row.get("commit_sha")?,
        branch: row.get("branch")?,
        build_hash: row.get("build_hash")?,
        started_at: row.get("started_at")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const DEPLOYMENT_COLUMNS: &str = "id, service_id, kubernetes_repo_id, commit_sha, \
     commit_source, environment, region, namespace, tag, path, discovered_at, updated_at";

pub(crate) fn deployment(row: &Row<'_>) -> rusqlite::Result<Deployment> {
    Ok(Deployment {
        id: row.get::<_, i64>("id")?.into(),
        service_id: row.get::<_, i64>("service_id")?.into(),
        kubernetes_repo_id: row.get::<_, i64>("kubernetes_repo_id")?.into(),
        commit_sha: row.get("commit_sha")?,
        commit_source: parse_column(row, "commit_source")?,
        environment: row.get("environment")?,
        region: row.get("region")?,
        namespace: row.get("namespace")?,
        tag: row.get("tag")?,
        path: row.get("path")?,
        discovered_at: row.get("discovered_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const PROJECT_COLUMNS: &str = "id, name, description, created_at, updated_at";

pub(crate) fn project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get::<_, i64>("id")?.into(),
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) const TASK_COLUMNS: &str = "id, project_id, title, description, ticket_id, \
     tracker_title, status, scheduled_date, deadline, created_at, updated_at";

pub(crate) fn task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get::<_, i64>("id")?.into(),
        project_id: row.get::<_, i64>("project_id")?.into(),
        title: row.get("title")?,
        description: row.get("description")?,
        ticket_id: row.get("ticket_id")?,
        tracker_title: row.get("tracker_title")?,
        status: parse_column(row, "status")?,
        scheduled_date: row.get("scheduled_date")?,
        deadline: row.get("deadline")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
