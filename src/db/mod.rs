use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::entry::{ClipboardEntry, NewEntry, DEFAULT_SESSION_LABEL};

const MIGRATIONS: &str = include_str!("migrations/001_clipboard_entries.sql");

const ENTRY_COLUMNS: &str = "id, content, source_url, captured_at, session_label";

/// Live clipboard entries, keyed by a monotonically assigned id.
///
/// Every mutation goes through the single connection mutex, so reads that
/// feed a later write (current label on create, label snapshot on archive)
/// never observe a half-applied change.
pub struct EntryStore {
    conn: Mutex<Connection>,
}

impl EntryStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "opened entry store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(MIGRATIONS)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("entry store mutex poisoned".to_string()))
    }

    /// Insert a new entry. Without an explicit label the entry joins whatever
    /// session is currently open.
    pub fn create(&self, new: NewEntry) -> AppResult<ClipboardEntry> {
        if new.content.is_empty() {
            return Err(AppError::Validation("content must not be empty".to_string()));
        }

        let conn = self.lock()?;
        let session_label = match new.session_label {
            Some(label) if !label.trim().is_empty() => label.trim().to_string(),
            _ => current_label(&conn)?,
        };
        let source_url = new.source_url.filter(|url| !url.is_empty());
        // Stored as millis; keep the returned value at the same precision a later read sees.
        let millis = Utc::now().timestamp_millis();
        let captured_at = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| AppError::Internal(format!("clock reading {millis}ms out of range")))?;

        conn.execute(
            "INSERT INTO clipboard_entries (content, source_url, captured_at, session_label)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                new.content,
                source_url,
                millis,
                session_label,
            ],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(id, session = %session_label, "captured clipboard entry");

        Ok(ClipboardEntry {
            id,
            content: new.content,
            source_url,
            captured_at,
            session_label,
        })
    }

    /// All live entries, newest first.
    pub fn list(&self) -> AppResult<Vec<ClipboardEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM clipboard_entries
             ORDER BY captured_at DESC, id DESC"
        ))?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn get(&self, id: i64) -> AppResult<Option<ClipboardEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM clipboard_entries WHERE id = ?1"),
                params![id],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM clipboard_entries WHERE id = ?1", params![id])?;
        if rows == 0 {
            return Err(AppError::NotFound(format!("clipboard entry {id}")));
        }
        tracing::debug!(id, "deleted clipboard entry");
        Ok(())
    }

    /// Move every live entry under `new_label`, whatever session it was in.
    pub fn relabel(&self, new_label: &str) -> AppResult<usize> {
        let new_label = new_label.trim();
        if new_label.is_empty() {
            return Err(AppError::Validation("session label must not be empty".to_string()));
        }
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE clipboard_entries SET session_label = ?1",
            params![new_label],
        )?;
        Ok(rows)
    }

    /// Entries carrying exactly `label`, oldest first.
    pub fn entries_with_label(&self, label: &str) -> AppResult<Vec<ClipboardEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM clipboard_entries
             WHERE session_label = ?1
             ORDER BY captured_at ASC, id ASC"
        ))?;
        let entries = stmt
            .query_map(params![label], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Label of the most recently created live entry, or the default label
    /// when the store is empty.
    pub fn current_label(&self) -> AppResult<String> {
        let conn = self.lock()?;
        current_label(&conn)
    }

    /// Remove exactly the given ids in one transaction. Ids that are already
    /// gone are skipped; the return value counts rows actually removed.
    pub fn delete_ids(&self, ids: &[i64]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut removed = 0;
        // SQLite caps bound parameters per statement.
        for chunk in ids.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            removed += tx.execute(
                &format!("DELETE FROM clipboard_entries WHERE id IN ({placeholders})"),
                params_from_iter(chunk.iter()),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    pub fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM clipboard_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn current_label(conn: &Connection) -> AppResult<String> {
    let label: Option<String> = conn
        .query_row(
            "SELECT session_label FROM clipboard_entries ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(label.unwrap_or_else(|| DEFAULT_SESSION_LABEL.to_string()))
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<ClipboardEntry> {
    Ok(ClipboardEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        source_url: row.get(2)?,
        captured_at: from_millis(row.get(3)?)?,
        session_label: row.get(4)?,
    })
}

fn from_millis(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Integer,
            format!("captured_at {millis}ms is out of range").into(),
        )
    })
}
