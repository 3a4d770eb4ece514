use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use crate::deadline;
use crate::error::TaskError;
use crate::models::{normalize_tag, Task, TaskId, SUGGESTED_TAGS};
use crate::storage::StorageError;

const SELECT_TASKS: &str = "SELECT id, text, deadline, tag, completed FROM tasks";

/// Durable task records in a single SQLite table.
#[derive(Debug)]
pub struct TaskStore {
    conn: Connection,
}

impl TaskStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        install_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn create(
        &self,
        text: &str,
        tag: Option<&str>,
        deadline: NaiveDateTime,
    ) -> Result<TaskId, TaskError> {
        let text = validate_text(text)?;
        let tag = normalize_tag(tag);
        let deadline = deadline::to_storage(&deadline::truncate_to_seconds(deadline));

        self.conn.execute(
            "INSERT INTO tasks(text, deadline, tag, completed) VALUES (?1, ?2, ?3, 0)",
            params![text, deadline, tag],
        )?;
        let id = self.conn.last_insert_rowid();
        log::debug!("task created id={id} tag={tag:?} deadline={deadline}");
        Ok(id)
    }

    pub fn read(&self, id: TaskId) -> Result<Task, TaskError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SELECT_TASKS} WHERE id=?1"),
                params![id],
                RawTask::from_row,
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(raw.into_task()?),
            None => Err(TaskError::NotFound(id)),
        }
    }

    /// Every stored task, ascending by id.
    pub fn list_all(&self) -> Result<Vec<Task>, TaskError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_TASKS} ORDER BY id ASC"))?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(RawTask::from_row(row)?.into_task()?);
        }
        Ok(out)
    }

    /// Tags present on stored tasks plus the suggested ones.
    pub fn list_tags(&self) -> Result<BTreeSet<String>, TaskError> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT tag FROM tasks WHERE tag IS NOT NULL AND tag <> ''")?;
        let mut rows = stmt.query([])?;
        let mut tags: BTreeSet<String> = SUGGESTED_TAGS.iter().map(|tag| tag.to_string()).collect();
        while let Some(row) = rows.next()? {
            let raw = row.get::<_, String>(0)?;
            if let Some(tag) = normalize_tag(Some(&raw)) {
                tags.insert(tag);
            }
        }
        Ok(tags)
    }

    /// Replaces text, tag and deadline. The completion flag is left alone.
    pub fn update(
        &self,
        id: TaskId,
        text: &str,
        tag: Option<&str>,
        deadline: NaiveDateTime,
    ) -> Result<(), TaskError> {
        let text = validate_text(text)?;
        let tag = normalize_tag(tag);
        let deadline = deadline::to_storage(&deadline::truncate_to_seconds(deadline));

        let changed = self.conn.execute(
            "UPDATE tasks SET text=?1, tag=?2, deadline=?3 WHERE id=?4",
            params![text, tag, deadline, id],
        )?;
        if changed == 0 {
            return Err(TaskError::NotFound(id));
        }
        log::debug!("task updated id={id}");
        Ok(())
    }

    pub fn delete(&self, id: TaskId) -> Result<(), TaskError> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id=?1", params![id])?;
        if changed == 0 {
            return Err(TaskError::NotFound(id));
        }
        log::debug!("task deleted id={id}");
        Ok(())
    }

    /// Deletes all of `ids` or none of them. Repeated ids count once.
    pub fn delete_many(&mut self, ids: &[TaskId]) -> Result<(), TaskError> {
        let ids: BTreeSet<TaskId> = ids.iter().copied().collect();
        let tx = self.conn.transaction()?;
        for &id in &ids {
            let changed = tx.execute("DELETE FROM tasks WHERE id=?1", params![id])?;
            if changed == 0 {
                // Dropping the transaction rolls back the deletes done so far.
                return Err(TaskError::NotFound(id));
            }
        }
        tx.commit()?;
        log::debug!("tasks deleted count={}", ids.len());
        Ok(())
    }

    pub fn set_completed(&self, id: TaskId, value: bool) -> Result<(), TaskError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed=?1 WHERE id=?2",
            params![value, id],
        )?;
        if changed == 0 {
            return Err(TaskError::NotFound(id));
        }
        log::debug!("task completion set id={id} completed={value}");
        Ok(())
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle_completed(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let tx = self.conn.transaction()?;
        let current = tx
            .query_row(
                "SELECT completed FROM tasks WHERE id=?1",
                params![id],
                |row| row.get::<_, Option<bool>>(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(TaskError::NotFound(id));
        };
        let next = !current.unwrap_or(false);
        tx.execute(
            "UPDATE tasks SET completed=?1 WHERE id=?2",
            params![next, id],
        )?;
        tx.commit()?;
        log::debug!("task completion toggled id={id} completed={next}");
        Ok(next)
    }
}

fn validate_text(text: &str) -> Result<&str, TaskError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TaskError::Validation("task text must not be empty"));
    }
    Ok(text)
}

fn install_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          text TEXT NOT NULL,
          deadline TEXT,
          tag TEXT,
          completed INTEGER DEFAULT 0
        );
        "#,
    )?;
    Ok(())
}

/// A row as SQLite hands it back, before the deadline is decoded.
struct RawTask {
    id: TaskId,
    text: String,
    deadline: Option<String>,
    tag: Option<String>,
    completed: Option<bool>,
}

impl RawTask {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            text: row.get(1)?,
            deadline: row.get(2)?,
            tag: row.get(3)?,
            completed: row.get(4)?,
        })
    }

    fn into_task(self) -> Result<Task, StorageError> {
        let deadline = self
            .deadline
            .as_deref()
            .and_then(deadline::parse)
            .ok_or_else(|| StorageError::InvalidDeadline {
                id: self.id,
                value: self.deadline.clone(),
            })?;
        Ok(Task {
            id: self.id,
            text: self.text,
            tag: normalize_tag(self.tag.as_deref()),
            deadline,
            completed: self.completed.unwrap_or(false),
        })
    }
}
