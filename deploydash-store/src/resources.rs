//! Kubernetes resource records, replaced wholesale on every sync.

use chrono::Utc;
use deploydash_core::{KubernetesResource, RepositoryId, ResourceManifest};
use rusqlite::{params, TransactionBehavior};

use crate::error::StoreError;
use crate::rows::{self, RESOURCE_COLUMNS};
use crate::transactions::execute_in_transaction;
use crate::Store;

impl Store {
    /// Delete every resource of the repository and insert `resources`, in one transaction.
    ///
    /// Entries repeating a (name, namespace) pair collapse to the last one.
    /// Actions linked to the old rows lose their link until the next action sync.
    pub fn replace_resources(
        &self,
        repository: RepositoryId,
        resources: &[ResourceManifest],
    ) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut conn = self.conn()?;
        execute_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
            tx.execute(
                "DELETE FROM kubernetes_resources WHERE repository_id = ?1",
                [repository.0],
            )?;
            let mut insert = tx.prepare(
                "INSERT INTO kubernetes_resources
                    (repository_id, name, path, resource_kind, namespace, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT (repository_id, name, namespace) DO UPDATE SET
                    path = excluded.path,
                    resource_kind = excluded.resource_kind,
                    updated_at = excluded.updated_at",
            )?;
            for resource in resources {
                insert.execute(params![
                    repository.0,
                    resource.name,
                    resource.path,
                    resource.resource_kind,
                    resource.namespace,
                    now,
                ])?;
            }
            Ok(())
        })?;
        drop(conn);

        let stored = self.resources_for_repository(repository)?.len();
        tracing::debug!(repository = %repository, stored, "resources replaced");
        Ok(stored)
    }

    pub fn resources_for_repository(
        &self,
        repository: RepositoryId,
    ) -> Result<Vec<KubernetesResource>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {RESOURCE_COLUMNS} FROM kubernetes_resources
             WHERE repository_id = ?1 ORDER BY name, namespace, id"
        ))?;
        let resources = stmt
            .query_map([repository.0], rows::resource)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(resources)
    }
}
