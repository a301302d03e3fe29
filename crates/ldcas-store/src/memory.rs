use std::collections::HashMap;
use std::sync::RwLock;

use ldcas_types::{Cid, Owner, Timestamp};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectRecord, SaveOutcome, SignatureRecord};
use crate::traits::ObjectStore;

struct Entry {
    record: ObjectRecord,
    signature: Option<SignatureRecord>,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. All objects are held behind a `RwLock`;
/// records are cloned on read.
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<Cid, Entry>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total raw and canonical bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|entry| entry.record.size())
            .sum()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn save_object(&self, cid: &Cid, raw: &[u8], canonical: &[u8]) -> StoreResult<SaveOutcome> {
        let mut map = self.objects.write().expect("lock poisoned");
        if let Some(existing) = map.get(cid) {
            if existing.record.canonical != canonical {
                return Err(StoreError::IntegrityConflict { cid: cid.clone() });
            }
            return Ok(SaveOutcome::AlreadyPresent);
        }
        map.insert(
            cid.clone(),
            Entry {
                record: ObjectRecord::new(cid.clone(), raw, canonical),
                signature: None,
            },
        );
        debug!(cid = %cid, "object stored in memory");
        Ok(SaveOutcome::Created)
    }

    fn read_object(&self, cid: &Cid) -> StoreResult<ObjectRecord> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(cid)
            .map(|entry| entry.record.clone())
            .ok_or_else(|| StoreError::NotFound(cid.clone()))
    }

    fn delete_object(&self, cid: &Cid, requester: &Owner) -> StoreResult<()> {
        let mut map = self.objects.write().expect("lock poisoned");
        match map.remove(cid) {
            Some(_) => {
                debug!(cid = %cid, requester = %requester, "object deleted from memory");
                Ok(())
            }
            None => Err(StoreError::NotFound(cid.clone())),
        }
    }

    fn save_signature(
        &self,
        cid: &Cid,
        signature: &[u8],
        signer: &str,
        valid: bool,
    ) -> StoreResult<SignatureRecord> {
        let mut map = self.objects.write().expect("lock poisoned");
        let entry = map
            .get_mut(cid)
            .ok_or_else(|| StoreError::NotFound(cid.clone()))?;
        let record = SignatureRecord {
            cid: cid.clone(),
            signer: signer.to_string(),
            signature: signature.to_vec(),
            valid,
            recorded_at: Timestamp::now(),
        };
        entry.signature = Some(record.clone());
        Ok(record)
    }

    fn read_signature(&self, cid: &Cid) -> StoreResult<Option<SignatureRecord>> {
        let map = self.objects.read().expect("lock poisoned");
        map.get(cid)
            .map(|entry| entry.signature.clone())
            .ok_or_else(|| StoreError::NotFound(cid.clone()))
    }

    fn exists(&self, cid: &Cid) -> StoreResult<bool> {
        let map = self.objects.read().expect("lock poisoned");
        Ok(map.contains_key(cid))
    }

    fn list_objects(&self) -> StoreResult<Vec<Cid>> {
        let map = self.objects.read().expect("lock poisoned");
        let mut cids: Vec<Cid> = map.keys().cloned().collect();
        cids.sort();
        Ok(cids)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
