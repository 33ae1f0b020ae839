//! Projects and tasks for the planner.

use chrono::{NaiveDate, Utc};
use deploydash_core::{NewTask, Project, ProjectId, Task, TaskId, TaskStatus};
use rusqlite::{params, OptionalExtension};

use crate::error::StoreError;
use crate::rows::{self, PROJECT_COLUMNS, TASK_COLUMNS};
use crate::Store;

impl Store {
    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(&self, name: &str, description: &str) -> Result<Project, StoreError> {
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO projects (name, description, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![name, description, Utc::now()],
            )?;
            conn.last_insert_rowid()
        };
        self.project(ProjectId(id))
    }

    pub fn project(&self, id: ProjectId) -> Result<Project, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            [id.0],
            rows::project,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "project",
            id: id.0,
        })
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY name, id"
        ))?;
        let projects = stmt
            .query_map([], rows::project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// Delete a project and its tasks.
    pub fn delete_project(&self, id: ProjectId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if conn.execute("DELETE FROM projects WHERE id = ?1", [id.0])? == 0 {
            return Err(StoreError::NotFound {
                entity: "project",
                id: id.0,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn create_task(&self, new: &NewTask) -> Result<Task, StoreError> {
        let id = {
            let conn = self.conn()?;
            conn.execute(
                "INSERT INTO tasks
                    (project_id, title, description, ticket_id, status, scheduled_date,
                     deadline, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.project_id.0,
                    new.title,
                    new.description,
                    new.ticket_id,
                    new.status.as_str(),
                    new.scheduled_date,
                    new.deadline,
                    Utc::now(),
                ],
            )?;
            conn.last_insert_rowid()
        };
        self.task(TaskId(id))
    }

    pub fn task(&self, id: TaskId) -> Result<Task, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            [id.0],
            rows::task,
        )
        .optional()?
        .ok_or(StoreError::NotFound {
            entity: "task",
            id: id.0,
        })
    }

    /// Tasks of one project, or of all projects, soonest scheduled first.
    pub fn list_tasks(&self, project: Option<ProjectId>) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let order = "ORDER BY scheduled_date IS NULL, scheduled_date, id";
        let tasks = match project {
            Some(project) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 {order}"
                ))?;
                let mapped = stmt.query_map([project.0], rows::task)?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks {order}"))?;
                let mapped = stmt.query_map([], rows::task)?;
                mapped.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(tasks)
    }

    /// Tasks scheduled within `[start, end]`, inclusive.
    pub fn tasks_scheduled_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE scheduled_date IS NOT NULL AND scheduled_date BETWEEN ?1 AND ?2
             ORDER BY scheduled_date, id"
        ))?;
        let tasks = stmt
            .query_map(params![start, end], rows::task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Tasks that reference a tracker ticket.
    pub fn tasks_with_tickets(&self) -> Result<Vec<Task>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE ticket_id IS NOT NULL AND ticket_id != '' ORDER BY id"
        ))?;
        let tasks = stmt
            .query_map([], rows::task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    pub fn update_task_status(&self, id: TaskId, status: TaskStatus) -> Result<Task, StoreError> {
        self.update_task_column(id, "status", status.as_str())?;
        self.task(id)
    }

    pub fn set_tracker_title(&self, id: TaskId, title: &str) -> Result<(), StoreError> {
        self.update_task_column(id, "tracker_title", title)
    }

    pub fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let conn = self.conn()?;
        if conn.execute("DELETE FROM tasks WHERE id = ?1", [id.0])? == 0 {
            return Err(StoreError::NotFound {
                entity: "task",
                id: id.0,
            });
        }
        Ok(())
    }

    fn update_task_column(&self, id: TaskId, column: &'static str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!("UPDATE tasks SET {column} = ?2, updated_at = ?3 WHERE id = ?1"),
            params![id.0, value, Utc::now()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "task",
                id: id.0,
            });
        }
        Ok(())
    }
}
