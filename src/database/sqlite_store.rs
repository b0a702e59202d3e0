//! SQLite-backed reminder store
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! Single-table layout: timestamps as RFC3339 strings, repeat rules as a
//! JSON column. The connection is serialized behind a mutex; calls are short
//! and never held across awaits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::StoreError;
use crate::database::model::{Reminder, RepeatRule};
use crate::database::store::ReminderStore;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS reminders (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    fire_at TEXT NOT NULL,
    repeat_rule TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    parent_id TEXT
);
";

#[derive(Clone)]
pub struct SqliteStore {
    connection: Arc<Mutex<Connection>>,
}

/// Row shape before the fallible chrono/JSON conversion
struct RawRow {
    id: String,
    title: String,
    fire_at: String,
    repeat_rule: String,
    is_completed: bool,
    parent_id: Option<String>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and run schema migration.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let connection = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        connection.execute_batch(SCHEMA)?;
        Ok(SqliteStore {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// A throwaway store that lives only as long as the process.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.connection.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            title: row.get(1)?,
            fire_at: row.get(2)?,
            repeat_rule: row.get(3)?,
            is_completed: row.get(4)?,
            parent_id: row.get(5)?,
        })
    }

    fn into_reminder(raw: RawRow) -> Result<Reminder, StoreError> {
        let fire_at = DateTime::parse_from_rfc3339(&raw.fire_at)
            .map_err(|e| StoreError::Backend(format!("bad fire_at for {}: {e}", raw.id)))?
            .with_timezone(&Utc);
        let repeat_rule: RepeatRule = serde_json::from_str(&raw.repeat_rule)?;
        Ok(Reminder {
            id: raw.id,
            title: raw.title,
            fire_at,
            repeat_rule,
            is_completed: raw.is_completed,
            parent_id: raw.parent_id,
        })
    }
}

#[async_trait]
impl ReminderStore for SqliteStore {
    async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let connection = self.lock();
        connection.execute(
            "INSERT INTO reminders (id, title, fire_at, repeat_rule, is_completed, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reminder.id,
                reminder.title,
                reminder.fire_at.to_rfc3339(),
                serde_json::to_string(&reminder.repeat_rule)?,
                reminder.is_completed,
                reminder.parent_id,
            ],
        )?;
        Ok(())
    }

    async fn update(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let connection = self.lock();
        let changed = connection.execute(
            "UPDATE reminders
             SET title = ?2, fire_at = ?3, repeat_rule = ?4, is_completed = ?5, parent_id = ?6
             WHERE id = ?1",
            params![
                reminder.id,
                reminder.title,
                reminder.fire_at.to_rfc3339(),
                serde_json::to_string(&reminder.repeat_rule)?,
                reminder.is_completed,
                reminder.parent_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(reminder.id.clone()));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let connection = self.lock();
        connection.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Reminder>, StoreError> {
        let connection = self.lock();
        let mut statement = connection.prepare(
            "SELECT id, title, fire_at, repeat_rule, is_completed, parent_id
             FROM reminders ORDER BY fire_at, id",
        )?;
        let raw: Vec<RawRow> = statement
            .query_map([], Self::raw_row)?
            .collect::<rusqlite::Result<_>>()?;
        raw.into_iter().map(Self::into_reminder).collect()
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<Reminder>, StoreError> {
        let connection = self.lock();
        let raw = connection
            .query_row(
                "SELECT id, title, fire_at, repeat_rule, is_completed, parent_id
                 FROM reminders WHERE id = ?1",
                params![id],
                Self::raw_row,
            )
            .optional()?;
        raw.map(Self::into_reminder).transpose()
    }
}
