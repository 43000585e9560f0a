use std::sync::Arc;

use crate::db::EntryStore;
use crate::error::{AppError, AppResult};

/// The client only ever sees one open session. Its label is read off the
/// store on demand and never cached here.
#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<EntryStore>,
}

impl SessionTracker {
    pub fn new(store: Arc<EntryStore>) -> Self {
        Self { store }
    }

    pub fn current_label(&self) -> AppResult<String> {
        self.store.current_label()
    }

    /// Rename the open session. Every live entry is relabeled, including
    /// entries still sitting under some other, unarchived label, so two
    /// coexisting sessions are merged by this call.
    pub fn rename_current_session(&self, new_label: &str) -> AppResult<usize> {
        let label = new_label.trim();
        if label.is_empty() {
            return Err(AppError::Validation("session label must not be empty".to_string()));
        }
        let relabeled = self.store.relabel(label)?;
        tracing::info!(session = %label, relabeled, "renamed current session");
        Ok(relabeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entry::{NewEntry, DEFAULT_SESSION_LABEL};

    fn tracker() -> (Arc<EntryStore>, SessionTracker) {
        let store = Arc::new(EntryStore::open_in_memory().unwrap());
        (store.clone(), SessionTracker::new(store))
    }

    fn capture(store: &EntryStore, content: &str) -> i64 {
        store
            .create(NewEntry {
                content: content.to_string(),
                ..Default::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_rename_on_empty_store_touches_nothing() {
        let (_store, tracker) = tracker();
        assert_eq!(tracker.rename_current_session("Research").unwrap(), 0);
        assert_eq!(tracker.current_label().unwrap(), DEFAULT_SESSION_LABEL);
    }

    #[test]
    fn test_rename_applies_to_existing_and_following_entries() {
        let (store, tracker) = tracker();
        capture(&store, "seed");
        tracker.rename_current_session("Research").unwrap();

        let id = capture(&store, "x");
        assert_eq!(store.get(id).unwrap().unwrap().session_label, "Research");

        tracker.rename_current_session("Notes").unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().session_label, "Notes");
        assert_eq!(tracker.current_label().unwrap(), "Notes");
    }

    #[test]
    fn test_rename_merges_coexisting_sessions() {
        let (store, tracker) = tracker();
        store
            .create(NewEntry {
                content: "a".to_string(),
                session_label: Some("A".to_string()),
                ..Default::default()
            })
            .unwrap();
        store
            .create(NewEntry {
                content: "b".to_string(),
                session_label: Some("B".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(tracker.rename_current_session("Merged").unwrap(), 2);
        assert_eq!(store.entries_with_label("Merged").unwrap().len(), 2);
    }

    #[test]
    fn test_rename_rejects_blank_label() {
        let (store, tracker) = tracker();
        capture(&store, "x");
        assert!(matches!(
            tracker.rename_current_session("  \t"),
            Err(AppError::Validation(_))
        ));
        assert_eq!(tracker.current_label().unwrap(), DEFAULT_SESSION_LABEL);
    }
}
