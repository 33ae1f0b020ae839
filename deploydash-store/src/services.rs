//! Microservice records and the identity-preserving reconciliation.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use deploydash_core::{DiscoveredService, Microservice, RepositoryId, ServiceId};
use rusqlite::{params, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::rows::{self, SERVICE_COLUMNS};
use crate::transactions::execute_in_transaction;
use crate::Store;

/// Row counts from one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceReconciliation {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl Store {
    /// Make the repository's services match `discovered`, keyed on (name, path).
    ///
    /// Matching rows keep their id, so deployments and actions pointing at them
    /// survive; only the description is refreshed. Rows whose key is no longer
    /// discovered are deleted (cascading to their deployments) and new keys are
    /// inserted. When two discovered entries share a name, the first one wins.
    /// Runs in one transaction.
    pub fn upsert_services_preserving_identity(
        &self,
        repository: RepositoryId,
        discovered: &[DiscoveredService],
    ) -> Result<ServiceReconciliation, StoreError> {
        let incoming = dedupe_by_name(discovered);
        let now = Utc::now();

        let mut conn = self.conn()?;
        let outcome = execute_in_transaction(&mut conn, TransactionBehavior::Immediate, |tx| {
            let existing: HashMap<(String, String), (i64, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, name, path, description FROM microservices WHERE repository_id = ?1",
                )?;
                let rows = stmt.query_map([repository.0], |row| {
                    Ok((
                        (row.get::<_, String>(1)?, row.get::<_, String>(2)?),
                        (row.get::<_, i64>(0)?, row.get::<_, String>(3)?),
                    ))
                })?;
                rows.collect::<Result<_, _>>()?
            };

            let wanted: HashSet<(&str, &str)> = incoming
                .iter()
                .map(|s| (s.name.as_str(), s.path.as_str()))
                .collect();

            let mut outcome = ServiceReconciliation::default();

            // Deletes first: a service that moved keeps its name, and the
            // (repository, name) constraint would reject the insert otherwise.
            for ((name, path), (id, _)) in &existing {
                if !wanted.contains(&(name.as_str(), path.as_str())) {
                    tx.execute("DELETE FROM microservices WHERE id = ?1", [id])?;
                    outcome.deleted += 1;
                }
            }

            for service in &incoming {
                let key = (service.name.clone(), service.path.clone());
                match existing.get(&key) {
                    Some((_, description)) if *description == service.description => {
                        outcome.unchanged += 1;
                    }
                    Some((id, _)) => {
                        tx.execute(
                            "UPDATE microservices SET description = ?2, updated_at = ?3 WHERE id = ?1",
                            params![id, service.description, now],
                        )?;
                        outcome.updated += 1;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO microservices
                                (repository_id, name, path, description, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                            params![repository.0, service.name, service.path, service.description, now],
                        )?;
                        outcome.inserted += 1;
                    }
                }
            }
            Ok(outcome)
        })?;

        tracing::debug!(
            repository = %repository,
            inserted = outcome.inserted,
            updated = outcome.updated,
            deleted = outcome.deleted,
            "services reconciled"
        );
        Ok(outcome)
    }

    pub fn service(&self, id: ServiceId) -> Result<Microservice, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {SERVICE_COLUMNS} FROM microservices WHERE id = ?1"),
            [id.0],
            rows::microservice,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "service",
            id: id.0,
        })
    }

    pub fn services_for_repository(
        &self,
        repository: RepositoryId,
    ) -> Result<Vec<Microservice>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM microservices WHERE repository_id = ?1 ORDER BY name, id"
        ))?;
        let services = stmt
            .query_map([repository.0], rows::microservice)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(services)
    }

    /// Every service in every repository, ordered by name then id.
    pub fn list_services(&self) -> Result<Vec<Microservice>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {SERVICE_COLUMNS} FROM microservices ORDER BY name, id"
        ))?;
        let services = stmt
            .query_map([], rows::microservice)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(services)
    }
}

fn dedupe_by_name(discovered: &[DiscoveredService]) -> Vec<&DiscoveredService> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(discovered.len());
    for service in discovered {
        if seen.insert(service.name.as_str()) {
            unique.push(service);
        } else {
            tracing::warn!(
                service = %service.name,
                path = %service.path,
                "duplicate service name in discovery; keeping first occurrence"
            );
        }
    }
    unique
}
