//! In-memory pointer store for testing and ephemeral use.

use std::collections::BTreeMap;
use std::sync::RwLock;

use ldcas_types::{Cid, Owner, Slug};

use crate::error::{RefError, RefResult};
use crate::history::History;
use crate::traits::PointerStore;
use crate::types::{HistoryEntry, PointerKey};

/// An in-memory implementation of [`PointerStore`].
///
/// Each key's history lives in a `Vec` behind one `RwLock`; the newest entry
/// is the pointer's current value. Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryPointerStore {
    histories: RwLock<BTreeMap<PointerKey, Vec<HistoryEntry>>>,
}

impl InMemoryPointerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(owner: &Owner, slug: &Slug) -> PointerKey {
    PointerKey::new(owner.clone(), slug.clone())
}

fn poisoned<E: std::fmt::Display>(e: E) -> RefError {
    RefError::LockPoisoned(e.to_string())
}

impl PointerStore for InMemoryPointerStore {
    fn set_named_pointer(&self, owner: &Owner, slug: &Slug, cid: &Cid) -> RefResult<HistoryEntry> {
        let entry = HistoryEntry::now(cid.clone());
        let mut histories = self.histories.write().map_err(poisoned)?;
        histories
            .entry(key(owner, slug))
            .or_default()
            .push(entry.clone());
        Ok(entry)
    }

    fn resolve_named_pointer(&self, owner: &Owner, slug: &Slug) -> RefResult<Cid> {
        let key = key(owner, slug);
        let histories = self.histories.read().map_err(poisoned)?;
        histories
            .get(&key)
            .and_then(|entries| entries.last())
            .map(|entry| entry.cid.clone())
            .ok_or_else(|| RefError::NotFound { key: key.to_string() })
    }

    fn read_history(&self, owner: &Owner, slug: &Slug) -> RefResult<History> {
        let key = key(owner, slug);
        let histories = self.histories.read().map_err(poisoned)?;
        let entries = histories
            .get(&key)
            .ok_or_else(|| RefError::NotFound { key: key.to_string() })?;
        Ok(History::from_entries(entries.clone()))
    }

    fn list_slugs(&self, owner: &Owner) -> RefResult<Vec<Slug>> {
        let histories = self.histories.read().map_err(poisoned)?;
        Ok(histories
            .keys()
            .filter(|key| key.owner == *owner)
            .map(|key| key.slug.clone())
            .collect())
    }
}
