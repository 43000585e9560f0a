use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::locks::SessionLocks;
use super::transcript::{self, Transcript};
use super::ArchiveRoot;
use crate::error::{AppError, AppResult};
use crate::models::session::{ArtifactContent, ArtifactInfo, SessionSummary};

/// Read side of the archive: browse, read and delete transcripts by the
/// relative path clients got from a listing.
#[derive(Clone)]
pub struct ArchiveCatalog {
    root: ArchiveRoot,
    locks: SessionLocks,
}

impl ArchiveCatalog {
    pub fn new(root: ArchiveRoot, locks: SessionLocks) -> Self {
        Self { root, locks }
    }

    /// Sessions newest first by their latest transcript. Directories without
    /// any transcript are left out.
    pub fn list_sessions(&self) -> AppResult<Vec<SessionSummary>> {
        let mut sessions = Vec::new();

        for dir_entry in fs::read_dir(self.root.path())? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }
            let label = dir_entry.file_name().to_string_lossy().into_owned();

            let mut artifacts = match self.list_artifacts(&dir_entry.path(), &label) {
                Ok(artifacts) => artifacts,
                // Deleted between the two directory reads.
                Err(AppError::NotFound(_)) => continue,
                Err(err) => return Err(err),
            };
            if artifacts.is_empty() {
                continue;
            }
            artifacts.sort_by(|a, b| {
                b.modified_at
                    .cmp(&a.modified_at)
                    .then_with(|| b.name.cmp(&a.name))
            });
            sessions.push(SessionSummary { label, artifacts });
        }

        sessions.sort_by(|a, b| {
            b.artifacts[0]
                .modified_at
                .cmp(&a.artifacts[0].modified_at)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(sessions)
    }

    fn list_artifacts(&self, dir: &Path, label: &str) -> AppResult<Vec<ArtifactInfo>> {
        let read_dir = match fs::read_dir(dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(AppError::NotFound(label.to_string()))
            }
            Err(err) => return Err(err.into()),
        };

        let mut artifacts = Vec::new();
        for file in read_dir {
            let file = file?;
            let name = file.file_name().to_string_lossy().into_owned();
            if !is_artifact_name(&name) {
                continue;
            }
            let metadata = match file.metadata() {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            if !metadata.is_file() {
                continue;
            }
            let modified_at: DateTime<Utc> = metadata.modified()?.into();
            artifacts.push(ArtifactInfo {
                relative_path: format!("{label}/{name}"),
                name,
                size: metadata.len(),
                modified_at,
            });
        }
        Ok(artifacts)
    }

    pub fn read_artifact(&self, relative: &str) -> AppResult<ArtifactContent> {
        let path = self.root.resolve(relative)?;
        if path.is_dir() {
            return Err(AppError::Validation(format!("'{relative}' is a session directory")));
        }
        let content = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => AppError::NotFound(format!("archive path '{relative}'")),
            _ => AppError::from(err),
        })?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ArtifactContent { content, filename })
    }

    pub fn read_transcript(&self, relative: &str) -> AppResult<Transcript> {
        let artifact = self.read_artifact(relative)?;
        transcript::parse(&artifact.content)
    }

    /// Remove one transcript, or a whole session directory.
    pub fn delete_artifact(&self, relative: &str) -> AppResult<()> {
        let path = self.root.resolve(relative)?;
        let session_dir = self
            .root
            .relative_path(&path)
            .and_then(|rel| rel.split('/').next().map(str::to_string))
            .ok_or_else(|| AppError::InvalidPath(format!("'{relative}'")))?;

        self.locks.with_session(&session_dir, || {
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|err| match err.kind() {
                ErrorKind::NotFound => AppError::NotFound(format!("archive path '{relative}'")),
                _ => AppError::from(err),
            })
        })?;

        tracing::info!(path = %relative, "deleted archive path");
        Ok(())
    }
}

fn is_artifact_name(name: &str) -> bool {
    name.ends_with(".txt") && !name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn setup() -> (tempfile::TempDir, ArchiveRoot, ArchiveCatalog) {
        let dir = tempfile::tempdir().unwrap();
        let root = ArchiveRoot::open(&dir.path().join("sessions")).unwrap();
        let catalog = ArchiveCatalog::new(root.clone(), SessionLocks::new());
        (dir, root, catalog)
    }

    fn write_artifact(root: &ArchiveRoot, rel: &str, body: &str, age_secs: u64) {
        let path = root.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, body).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_list_orders_sessions_and_artifacts_by_recency() {
        let (_dir, root, catalog) = setup();
        write_artifact(&root, "Old/Old_1.txt", "a", 300);
        write_artifact(&root, "New/New_1.txt", "bb", 200);
        write_artifact(&root, "New/New_2.txt", "ccc", 10);
        write_artifact(&root, "Old/Old_2.txt", "d", 100);

        let sessions = catalog.list_sessions().unwrap();
        let labels: Vec<&str> = sessions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["New", "Old"]);

        let new_paths: Vec<&str> = sessions[0]
            .artifacts
            .iter()
            .map(|a| a.relative_path.as_str())
            .collect();
        assert_eq!(new_paths, vec!["New/New_2.txt", "New/New_1.txt"]);
        assert_eq!(sessions[0].artifacts[0].size, 3);
        assert_eq!(sessions[0].artifacts[0].name, "New_2.txt");
    }

    #[test]
    fn test_list_skips_empty_dirs_and_stray_files() {
        let (_dir, root, catalog) = setup();
        fs::create_dir_all(root.path().join("Empty")).unwrap();
        write_artifact(&root, "Temp/.Temp_1.txt.abc.tmp", "x", 0);
        write_artifact(&root, "Temp/notes.md", "x", 0);
        fs::write(root.path().join("loose.txt"), "x").unwrap();

        assert!(catalog.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_read_artifact() {
        let (_dir, root, catalog) = setup();
        write_artifact(&root, "A/A_1.txt", "Session: A\n", 0);

        let artifact = catalog.read_artifact("A/A_1.txt").unwrap();
        assert_eq!(artifact.filename, "A_1.txt");
        assert_eq!(artifact.content, "Session: A\n");

        assert!(matches!(catalog.read_artifact("A/nope.txt"), Err(AppError::NotFound(_))));
        assert!(matches!(catalog.read_artifact("A"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_traversal_rejected_for_read_and_delete() {
        let (dir, root, catalog) = setup();
        write_artifact(&root, "A/A_1.txt", "x", 0);
        fs::write(dir.path().join("outside.txt"), "secret").unwrap();

        for path in ["../outside.txt", "A/../../outside.txt", "../missing.txt"] {
            assert!(matches!(catalog.read_artifact(path), Err(AppError::InvalidPath(_))));
            assert!(matches!(catalog.delete_artifact(path), Err(AppError::InvalidPath(_))));
        }
        assert!(dir.path().join("outside.txt").exists());
    }

    #[test]
    fn test_delete_file_then_directory() {
        let (_dir, root, catalog) = setup();
        write_artifact(&root, "A/A_1.txt", "x", 0);
        write_artifact(&root, "A/A_2.txt", "y", 0);

        catalog.delete_artifact("A/A_1.txt").unwrap();
        assert!(!root.path().join("A/A_1.txt").exists());
        assert!(root.path().join("A/A_2.txt").exists());
        assert!(matches!(catalog.delete_artifact("A/A_1.txt"), Err(AppError::NotFound(_))));

        catalog.delete_artifact("A").unwrap();
        assert!(!root.path().join("A").exists());
        assert!(root.path().exists());
        assert!(catalog.list_sessions().unwrap().is_empty());
    }

    #[test]
    fn test_read_transcript_parses_file() {
        let (_dir, root, catalog) = setup();
        write_artifact(
            &root,
            "A/A_1.txt",
            "Session: A\nDate: 2024-01-02 03:04:05\n\n\
             --- Entry from 2024-01-02 03:00:00 ---\nSource: \nContent:\nhi\n\n",
            0,
        );

        let transcript = catalog.read_transcript("A/A_1.txt").unwrap();
        assert_eq!(transcript.label, "A");
        assert_eq!(transcript.entries.len(), 1);
        assert_eq!(transcript.entries[0].content, "hi");
        assert_eq!(transcript.entries[0].source_url, None);
    }
}
