//! Repository records. Deleting a repository cascades to everything discovered in it.

use chrono::{DateTime, Utc};
use deploydash_core::{NewRepository, Repository, RepositoryId};
use rusqlite::{params, OptionalExtension};

use crate::error::{conflict_or, StoreError};
use crate::rows::{self, REPOSITORY_COLUMNS};
use crate::Store;

impl Store {
    /// Register a repository. A second repository with the same URL is a [`StoreError::Conflict`].
    pub fn create_repository(&self, new: &NewRepository) -> Result<Repository, StoreError> {
        let now = Utc::now();
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO repositories
                    (name, url, kind, description, scan_root, service_name, service_location,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.name,
                    new.url,
                    new.kind.as_str(),
                    new.description,
                    new.scan_root,
                    new.service_name,
                    new.service_location,
                    now,
                ],
            )
            .map_err(|e| conflict_or(e, || format!("repository URL already registered: {}", new.url)))?;
            conn.last_insert_rowid()
        };
        tracing::debug!(repository = %new.name, id, "repository created");
        self.repository(RepositoryId(id))
    }

    pub fn repository(&self, id: RepositoryId) -> Result<Repository, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE id = ?1"),
            [id.0],
            rows::repository,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "repository",
            id: id.0,
        })
    }

    pub fn repository_by_url(&self, url: &str) -> Result<Option<Repository>, StoreError> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                &format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE url = ?1"),
                [url],
                rows::repository,
            )
            .optional()?)
    }

    /// All repositories ordered by id, the order sync passes visit them in.
    pub fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REPOSITORY_COLUMNS} FROM repositories ORDER BY id"
        ))?;
        let repos = stmt
            .query_map([], rows::repository)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(repos)
    }

    /// Overwrite the user-editable fields of a repository.
    pub fn update_repository(&self, repo: &Repository) -> Result<Repository, StoreError> {
        let changed = {
            let conn = self.conn()?;
            conn.execute(
                "UPDATE repositories
                 SET name = ?2, url = ?3, kind = ?4, description = ?5, scan_root = ?6,
                     service_name = ?7, service_location = ?8, updated_at = ?9
                 WHERE id = ?1",
                params![
                    repo.id.0,
                    repo.name,
                    repo.url,
                    repo.kind.as_str(),
                    repo.description,
                    repo.scan_root,
                    repo.service_name,
                    repo.service_location,
                    Utc::now(),
                ],
            )
            .map_err(|e| conflict_or(e, || format!("repository URL already registered: {}", repo.url)))?
        };
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "repository",
                id: repo.id.0,
            });
        }
        self.repository(repo.id)
    }

    /// Delete a repository and, by cascade, its services, resources, actions, and deployments.
    pub fn delete_repository(&self, id: RepositoryId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute("DELETE FROM repositories WHERE id = ?1", [id.0])?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "repository",
                id: id.0,
            });
        }
        Ok(())
    }

    /// Record a successful sync.
    pub fn touch_last_sync(&self, id: RepositoryId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE repositories SET last_sync_at = ?2 WHERE id = ?1",
            params![id.0, at],
        )?;
        Ok(())
    }
}
