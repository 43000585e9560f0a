pub mod catalog;
pub mod locks;
pub mod transcript;
pub mod writer;

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Canonical base directory every artifact must resolve under.
#[derive(Debug, Clone)]
pub struct ArchiveRoot {
    root: PathBuf,
}

impl ArchiveRoot {
    pub fn open(path: &Path) -> AppResult<Self> {
        std::fs::create_dir_all(path)?;
        let root = path.canonicalize()?;
        tracing::info!(root = %root.display(), "archive root ready");
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn session_dir(&self, dir_name: &str) -> PathBuf {
        self.root.join(dir_name)
    }

    /// Resolve a client-supplied relative path to an existing file or
    /// directory strictly inside the root.
    ///
    /// Lexically unsafe input (absolute paths, `..`) is rejected before the
    /// filesystem is consulted, so the answer never depends on what exists at
    /// the traversed location. Symlinks are followed and the final location
    /// checked component-wise, which keeps `/data/sessions-evil` out of
    /// `/data/sessions`.
    pub fn resolve(&self, relative: &str) -> AppResult<PathBuf> {
        if relative.is_empty() || relative.contains('\0') {
            return Err(AppError::InvalidPath(format!("'{relative}'")));
        }

        let mut has_name = false;
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(_) => has_name = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(AppError::InvalidPath(format!(
                        "'{relative}' escapes the archive root"
                    )));
                }
            }
        }
        if !has_name {
            return Err(AppError::InvalidPath(format!("'{relative}'")));
        }

        let canonical = self
            .root
            .join(relative)
            .canonicalize()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => AppError::NotFound(format!("archive path '{relative}'")),
                _ => AppError::from(err),
            })?;

        if canonical == self.root || !canonical.starts_with(&self.root) {
            tracing::warn!(path = %relative, "rejected archive path outside root");
            return Err(AppError::InvalidPath(format!(
                "'{relative}' resolves outside the archive root"
            )));
        }
        Ok(canonical)
    }

    /// `/`-separated path of `path` relative to the root.
    pub fn relative_path(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}
