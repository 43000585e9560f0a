use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::locks::SessionLocks;
use super::transcript::{artifact_file_name, render, sanitize_label};
use super::ArchiveRoot;
use crate::db::EntryStore;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// `<session dir>/<file name>`, relative to the archive root
    pub relative_path: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndSessionOutcome {
    Archived(ArtifactRef),
    /// Nothing was captured under the label; no file written.
    NoOp,
}

/// Flushes a session's live entries into a transcript and then drops them
/// from the store.
#[derive(Clone)]
pub struct ArchiveWriter {
    store: Arc<EntryStore>,
    root: ArchiveRoot,
    locks: SessionLocks,
}

impl ArchiveWriter {
    pub fn new(store: Arc<EntryStore>, root: ArchiveRoot, locks: SessionLocks) -> Self {
        Self { store, root, locks }
    }

    /// Archive every entry labeled `label`.
    ///
    /// The artifact is fully on disk before any entry is deleted, and only the
    /// entries that went into it are deleted. Entries captured while this runs
    /// stay live. Any failure leaves the store untouched and no artifact at
    /// its final path, so the call can simply be retried.
    pub fn end_session(&self, label: &str) -> AppResult<EndSessionOutcome> {
        let label = label.trim();
        if label.is_empty() {
            return Err(AppError::Validation("session label must not be empty".to_string()));
        }

        let dir_name = sanitize_label(label);
        self.locks
            .with_session(&dir_name, || self.archive_locked(label, &dir_name))
    }

    fn archive_locked(&self, label: &str, dir_name: &str) -> AppResult<EndSessionOutcome> {
        let entries = self.store.entries_with_label(label)?;
        if entries.is_empty() {
            tracing::info!(session = %label, "end session: nothing captured");
            return Ok(EndSessionOutcome::NoOp);
        }

        let written_at = Utc::now();
        let body = render(label, written_at, &entries);

        let dir = self.root.session_dir(dir_name);
        let new_dir = !dir.is_dir();
        fs::create_dir_all(&dir).map_err(|err| {
            tracing::warn!(session = %label, error = %err, "could not create session directory");
            AppError::from(err)
        })?;

        let final_path = persist_transcript(&dir, dir_name, written_at, body.as_bytes())
            .map_err(|err| {
                tracing::warn!(session = %label, error = %err, "failed to write transcript");
                AppError::from(err)
            })?;

        // The rename is only durable once the directories recording it are synced.
        let synced = sync_dir(&dir).and_then(|()| {
            if new_dir {
                sync_dir(self.root.path())
            } else {
                Ok(())
            }
        });
        if let Err(err) = synced {
            tracing::warn!(session = %label, error = %err, "failed to sync session directory");
            discard(&final_path);
            return Err(err.into());
        }

        let ids: Vec<i64> = entries.iter().map(|entry| entry.id).collect();
        let removed = match self.store.delete_ids(&ids) {
            Ok(removed) => removed,
            Err(err) => {
                // The entries are still live, so the file would be a duplicate.
                discard(&final_path);
                return Err(err);
            }
        };
        if removed != ids.len() {
            tracing::warn!(
                session = %label,
                archived = ids.len(),
                removed,
                "some archived entries were deleted individually mid-archive"
            );
        }

        let relative_path = self.root.relative_path(&final_path).ok_or_else(|| {
            AppError::Internal(format!("{} is outside the archive root", final_path.display()))
        })?;
        tracing::info!(
            session = %label,
            path = %relative_path,
            entries = entries.len(),
            "session archived"
        );

        Ok(EndSessionOutcome::Archived(ArtifactRef {
            relative_path,
            entry_count: entries.len(),
        }))
    }
}

/// Write `bytes` to a hidden temp file in `dir`, sync it, and link it under
/// the first free `<name>_<stamp>[_n].txt`. Existing files are never
/// replaced. The temp file is removed on drop if anything fails.
fn persist_transcript(
    dir: &Path,
    dir_name: &str,
    written_at: DateTime<Utc>,
    bytes: &[u8],
) -> io::Result<PathBuf> {
    let mut temp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;

    let mut attempt = 0;
    loop {
        let candidate = dir.join(artifact_file_name(dir_name, written_at, attempt));
        match temp.persist_noclobber(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(err) if err.error.kind() == ErrorKind::AlreadyExists => {
                temp = err.file;
                attempt += 1;
            }
            Err(err) => return Err(err.error),
        }
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        tracing::error!(
            path = %path.display(),
            error = %err,
            "failed to remove transcript after a later step failed"
        );
    }
}
