use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::{AppError, AppResult};

/// One mutex per session directory. Whoever archives into, or deletes from,
/// a session directory holds its lock for the whole operation.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `dir_name`. Keyed by the sanitized
    /// label, so labels that share a directory share a lock.
    ///
    /// The registry entry is dropped again once nobody else is holding or
    /// waiting on it.
    pub fn with_session<T>(
        &self,
        dir_name: &str,
        f: impl FnOnce() -> AppResult<T>,
    ) -> AppResult<T> {
        let lock = self
            .inner
            .entry(dir_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(AppError::Internal(format!(
                "session lock for '{dir_name}' poisoned"
            ))),
        };

        // Two owners left means the map and us; clones are only handed out
        // under the shard lock that `remove_if` holds.
        self.inner
            .remove_if(dir_name, |_, held| Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2);
        result
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.inner.len()
    }
}
