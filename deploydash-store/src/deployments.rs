//! Deployment records: one row per (service, environment, region, namespace).

use chrono::Utc;
use deploydash_core::{Deployment, NewDeployment, ServiceId};
use rusqlite::params;

use crate::error::StoreError;
use crate::rows::{self, DEPLOYMENT_COLUMNS};
use crate::Store;

impl Store {
    /// Record what is currently deployed to a target.
    ///
    /// An existing row for the same target keeps its id and discovery time;
    /// commit, tag, path, and source repository are overwritten.
    pub fn upsert_deployment(&self, new: &NewDeployment) -> Result<Deployment, StoreError> {
        let now = Utc::now();
        let conn = self.conn()?;
        let deployment = conn.query_row(
            &format!(
                "INSERT INTO deployments
                    (service_id, kubernetes_repo_id, commit_sha, commit_source, environment,
                     region, namespace, tag, path, discovered_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
                 ON CONFLICT (service_id, environment, region, namespace) DO UPDATE SET
                    kubernetes_repo_id = excluded.kubernetes_repo_id,
                    commit_sha = excluded.commit_sha,
                    commit_source = excluded.commit_source,
                    tag = excluded.tag,
                    path = excluded.path,
                    updated_at = excluded.updated_at
                 RETURNING {DEPLOYMENT_COLUMNS}"
            ),
            params![
                new.service_id.0,
                new.kubernetes_repo_id.0,
                new.commit_sha,
                new.commit_source.as_str(),
                new.environment,
                new.region,
                new.namespace,
                new.tag,
                new.path,
                now,
            ],
            rows::deployment,
        )?;
        Ok(deployment)
    }

    pub fn deployments_for_service(&self, service: ServiceId) -> Result<Vec<Deployment>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments WHERE service_id = ?1
             ORDER BY environment, region, namespace"
        ))?;
        let deployments = stmt
            .query_map([service.0], rows::deployment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deployments)
    }

    pub fn list_deployments(&self) -> Result<Vec<Deployment>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {DEPLOYMENT_COLUMNS} FROM deployments
             ORDER BY service_id, environment, region, namespace"
        ))?;
        let deployments = stmt
            .query_map([], rows::deployment)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(deployments)
    }
}
