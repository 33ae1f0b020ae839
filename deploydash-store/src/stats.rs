//! Dashboard counters.

use deploydash_core::Action;
use serde::Serialize;

use crate::actions::ActionFilter;
use crate::error::StoreError;
use crate::Store;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub repositories: i64,
    pub monorepos: i64,
    pub kubernetes_repositories: i64,
    pub services: i64,
    pub resources: i64,
    pub deployments: i64,
    pub actions: i64,
    pub recent_actions: Vec<Action>,
}

impl Store {
    pub fn dashboard_stats(&self, recent: usize) -> Result<DashboardStats, StoreError> {
        let (repositories, monorepos, services, resources, deployments, actions) = {
            let conn = self.conn()?;
            let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, i64>(0));
            (
                count("SELECT COUNT(*) FROM repositories")?,
                count("SELECT COUNT(*) FROM repositories WHERE kind = 'monorepo'")?,
                count("SELECT COUNT(*) FROM microservices")?,
                count("SELECT COUNT(*) FROM kubernetes_resources")?,
                count("SELECT COUNT(*) FROM deployments")?,
                count("SELECT COUNT(*) FROM actions")?,
            )
        };
        Ok(DashboardStats {
            repositories,
            monorepos,
            kubernetes_repositories: repositories - monorepos,
            services,
            resources,
            deployments,
            actions,
            recent_actions: self.recent_actions(ActionFilter::default(), recent)?,
        })
    }
}
