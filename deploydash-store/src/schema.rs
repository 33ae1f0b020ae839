//! Schema creation and additive migrations.
//!
//! Tables are created with `IF NOT EXISTS`; columns introduced after the
//! first release are added by [`migrate`] when `PRAGMA table_info` shows
//! them missing. Nothing is ever dropped or renamed.

use rusqlite::Connection;

use crate::error::StoreError;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS repositories (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    name             TEXT NOT NULL,
    url              TEXT NOT NULL UNIQUE,
    kind             TEXT NOT NULL,
    description      TEXT NOT NULL DEFAULT '',
    scan_root        TEXT,
    service_name     TEXT,
    service_location TEXT,
    last_sync_at     TEXT,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS microservices (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    path          TEXT NOT NULL,
    description   TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (repository_id, name)
);

CREATE TABLE IF NOT EXISTS kubernetes_resources (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    name          TEXT NOT NULL,
    path          TEXT NOT NULL,
    resource_kind TEXT NOT NULL,
    namespace     TEXT NOT NULL DEFAULT '',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    UNIQUE (repository_id, name, namespace)
);

CREATE TABLE IF NOT EXISTS actions (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    repository_id   INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    service_id      INTEGER REFERENCES microservices(id) ON DELETE SET NULL,
    resource_id     INTEGER REFERENCES kubernetes_resources(id) ON DELETE SET NULL,
    action_type     TEXT NOT NULL,
    status          TEXT NOT NULL,
    workflow_run_id INTEGER NOT NULL UNIQUE,
    commit_sha      TEXT NOT NULL DEFAULT '',
    branch          TEXT NOT NULL DEFAULT '',
    build_hash      TEXT,
    started_at      TEXT NOT NULL,
    completed_at    TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS deployments (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    service_id         INTEGER NOT NULL REFERENCES microservices(id) ON DELETE CASCADE,
    kubernetes_repo_id INTEGER NOT NULL REFERENCES repositories(id) ON DELETE CASCADE,
    commit_sha         TEXT NOT NULL DEFAULT '',
    environment        TEXT NOT NULL,
    region             TEXT NOT NULL,
    namespace          TEXT NOT NULL DEFAULT '',
    tag                TEXT NOT NULL,
    path               TEXT NOT NULL,
    discovered_at      TEXT NOT NULL,
    updated_at         TEXT NOT NULL,
    UNIQUE (service_id, environment, region, namespace)
);

CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id     INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    ticket_id      TEXT,
    status         TEXT NOT NULL DEFAULT 'pending',
    scheduled_date TEXT,
    deadline       TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_actions_repository ON actions(repository_id, started_at);
CREATE INDEX IF NOT EXISTS idx_deployments_service ON deployments(service_id);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
"#;

/// Columns added after the base schema: (table, column, definition).
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    (
        "deployments",
        "commit_source",
        "TEXT NOT NULL DEFAULT 'none'",
    ),
    ("tasks", "tracker_title", "TEXT"),
];

/// Create missing tables, then add missing columns.
pub(crate) fn apply(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(SCHEMA_SQL)?;
    migrate(conn)
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    for (table, column, definition) in ADDED_COLUMNS {
        if has_column(conn, table, column)? {
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE {table} ADD COLUMN {column} {definition};"
        ))?;
        tracing::info!(table, column, "added column");
    }
    Ok(())
}

pub(crate) fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt.query_map([], |row| row.get::<_, String>("name"))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}
