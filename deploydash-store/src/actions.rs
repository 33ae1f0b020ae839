//! Action records, keyed on the platform's workflow run id.

use chrono::Utc;
use deploydash_core::{Action, NewAction, RepositoryId, ResourceId, ServiceId};
use rusqlite::{params, ToSql, TransactionBehavior};

use crate::error::StoreError;
use crate::rows::{self, ACTION_COLUMNS};
use crate::transactions::execute_in_transaction;
use crate::Store;

/// Narrows [`Store::recent_actions`]; all fields `None` means every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionFilter {
    pub repository: Option<RepositoryId>,
    pub service: Option<ServiceId>,
    pub resource: Option<ResourceId>,
}

impl Store {
    /// Insert or overwrite a batch of actions in one transaction.
    ///
    /// A run already stored keeps its row id and creation time; everything
    /// else takes the new values, so a run's latest status always wins.
    pub fn upsert_actions(&self, actions: &[NewAction]) -> Result<usize, StoreError> {
        if actions.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let mut conn = self.conn()?;
        execute_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
            let mut upsert = tx.prepare(
                "INSERT INTO actions
                    (repository_id, service_id, resource_id, action_type, status,
                     workflow_run_id, commit_sha, branch, build_hash, started_at, completed_at,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                 ON CONFLICT (workflow_run_id) DO UPDATE SET
                    repository_id = excluded.repository_id,
                    service_id = excluded.service_id,
                    resource_id = excluded.resource_id,
                    action_type = excluded.action_type,
                    status = excluded.status,
                    commit_sha = excluded.commit_sha,
                    branch = excluded.branch,
                    build_hash = excluded.build_hash,
                    started_at = excluded.started_at,
                    completed_at = excluded.completed_at,
                    updated_at = excluded.updated_at",
            )?;
            for action in actions {
                upsert.execute(params![
                    action.repository_id.0,
                    action.service_id.map(|id| id.0),
                    action.resource_id.map(|id| id.0),
                    action.action_type.as_str(),
                    action.status,
                    action.workflow_run_id,
                    action.commit_sha,
                    action.branch,
                    action.build_hash,
                    action.started_at,
                    action.completed_at,
                    now,
                ])?;
            }
            Ok(actions.len())
        })
    }

    /// Most recent actions first, by start time.
    pub fn recent_actions(&self, filter: ActionFilter, limit: usize) -> Result<Vec<Action>, StoreError> {
        let mut clauses = Vec::new();
        let mut values: Vec<i64> = Vec::new();
        if let Some(repository) = filter.repository {
            values.push(repository.0);
            clauses.push(format!("repository_id = ?{}", values.len()));
        }
        if let Some(service) = filter.service {
            values.push(service.0);
            clauses.push(format!("service_id = ?{}", values.len()));
        }
        if let Some(resource) = filter.resource {
            values.push(resource.0);
            clauses.push(format!("resource_id = ?{}", values.len()));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        values.push(limit);
        let sql = format!(
            "SELECT {ACTION_COLUMNS} FROM actions {where_clause}
             ORDER BY started_at DESC, id DESC LIMIT ?{}",
            values.len()
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
        let actions = stmt
            .query_map(params.as_slice(), rows::action)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(actions)
    }
}
