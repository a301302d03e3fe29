//! Per-key mutual exclusion.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::error::StoreError;

/// A lazily populated map of per-key mutexes.
///
/// Keys are CIDs in the object store and `(owner, slug)` pairs in the
/// pointer store. Callers holding different keys never contend; callers
/// holding the same key are serialized. The arena itself is only locked long enough to look up or
/// insert a key's mutex. Entries are never evicted, so the arena grows with
/// the number of distinct keys touched by the process.
#[derive(Debug)]
pub struct LockArena<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> LockArena<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The mutex guarding `key`, created on first access.
    pub fn handle(&self, key: &K) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T, E>(&self, key: &K, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let handle = self.handle(key)?;
        let _guard = handle
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f()
    }

    /// Number of keys that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for LockArena<K> {
    fn default() -> Self {
        Self::new()
    }
}
