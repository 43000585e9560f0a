pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod session;

use std::path::Path;
use std::sync::Arc;

use archive::catalog::ArchiveCatalog;
use archive::locks::SessionLocks;
use archive::writer::ArchiveWriter;
use archive::ArchiveRoot;
use db::EntryStore;
use error::AppResult;
use session::SessionTracker;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<EntryStore>,
    pub sessions: SessionTracker,
    pub archive: ArchiveWriter,
    pub catalog: ArchiveCatalog,
}

impl AppState {
    pub fn open(database_path: &Path, archive_dir: &Path) -> AppResult<Self> {
        let store = Arc::new(EntryStore::open(database_path)?);
        let root = ArchiveRoot::open(archive_dir)?;
        Ok(Self::new(store, root))
    }

    /// Wire the core together. Writer and catalog share one lock registry so
    /// archiving and deleting the same session directory never interleave.
    pub fn new(store: Arc<EntryStore>, root: ArchiveRoot) -> Self {
        let locks = SessionLocks::new();
        Self {
            sessions: SessionTracker::new(store.clone()),
            archive: ArchiveWriter::new(store.clone(), root.clone(), locks.clone()),
            catalog: ArchiveCatalog::new(root, locks),
            store,
        }
    }
}
