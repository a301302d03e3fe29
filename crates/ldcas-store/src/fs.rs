//! Filesystem object store.
//!
//! Layout under the store root:
//!
//! ```text
//! o/{cid}.json            original bytes (the object's presence marker)
//! o/{cid}.canonical.json  canonical bytes
//! o/{cid}.sig.json        detached signature sidecar
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ldcas_types::{Cid, Owner, Timestamp};
use tracing::{debug, info, warn};

use crate::atomic;
use crate::error::{StoreError, StoreResult};
use crate::lock::LockArena;
use crate::object::{ObjectRecord, SaveOutcome, SignatureRecord};
use crate::paths::confined_join;
use crate::traits::ObjectStore;

/// Directory holding all objects, relative to the store root.
pub const OBJECTS_DIR: &str = "o";

const RAW_SUFFIX: &str = ".json";
const CANONICAL_SUFFIX: &str = ".canonical.json";
const SIGNATURE_SUFFIX: &str = ".sig.json";

/// Object store rooted at a directory on disk.
///
/// Saves, deletes and signature writes for one CID are serialized through a
/// [`LockArena`] shared by clones of this value.
#[derive(Clone, Debug)]
pub struct FsObjectStore {
    root: PathBuf,
    objects: PathBuf,
    locks: Arc<LockArena<Cid>>,
}

impl FsObjectStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let objects = confined_join(&root, &[OBJECTS_DIR])?;
        fs::create_dir_all(&objects)?;
        debug!(root = %root.display(), "object store opened");
        Ok(Self {
            root,
            objects,
            locks: Arc::new(LockArena::new()),
        })
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding an object's original bytes.
    pub fn object_path(&self, cid: &Cid) -> StoreResult<PathBuf> {
        self.file(cid, RAW_SUFFIX)
    }

    fn file(&self, cid: &Cid, suffix: &str) -> StoreResult<PathBuf> {
        confined_join(&self.objects, &[&format!("{cid}{suffix}")])
    }

    /// Check that the canonical bytes on disk match `canonical`.
    fn confirm_canonical(&self, cid: &Cid, path: &Path, canonical: &[u8]) -> StoreResult<()> {
        match fs::read(path) {
            Ok(existing) if existing == canonical => Ok(()),
            Ok(_) => {
                warn!(cid = %cid, "stored canonical bytes differ from new canonical bytes");
                Err(StoreError::IntegrityConflict { cid: cid.clone() })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StoreError::CorruptObject {
                cid: cid.clone(),
                reason: "canonical bytes missing".into(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn require_object(&self, cid: &Cid) -> StoreResult<()> {
        if self.exists(cid)? {
            Ok(())
        } else {
            Err(StoreError::NotFound(cid.clone()))
        }
    }
}

impl ObjectStore for FsObjectStore {
    fn save_object(&self, cid: &Cid, raw: &[u8], canonical: &[u8]) -> StoreResult<SaveOutcome> {
        let primary = self.file(cid, RAW_SUFFIX)?;
        let canonical_path = self.file(cid, CANONICAL_SUFFIX)?;

        self.locks.with_lock(cid, || -> StoreResult<SaveOutcome> {
            if self.exists(cid)? {
                self.confirm_canonical(cid, &canonical_path, canonical)?;
                return Ok(SaveOutcome::AlreadyPresent);
            }

            // Canonical bytes land first; the primary file is what makes the
            // object visible. A canonical file without a primary is left over
            // from an interrupted save and must match.
            if !atomic::write_new(&canonical_path, canonical)? {
                self.confirm_canonical(cid, &canonical_path, canonical)?;
            }
            if atomic::write_new(&primary, raw)? {
                info!(cid = %cid, bytes = raw.len(), "object stored");
                Ok(SaveOutcome::Created)
            } else {
                debug!(cid = %cid, "object already present");
                Ok(SaveOutcome::AlreadyPresent)
            }
        })
    }

    fn read_object(&self, cid: &Cid) -> StoreResult<ObjectRecord> {
        let raw = match fs::read(self.file(cid, RAW_SUFFIX)?) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(cid.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        let canonical = match fs::read(self.file(cid, CANONICAL_SUFFIX)?) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::CorruptObject {
                    cid: cid.clone(),
                    reason: "canonical bytes missing".into(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        Ok(ObjectRecord::new(cid.clone(), raw, canonical))
    }

    fn delete_object(&self, cid: &Cid, requester: &Owner) -> StoreResult<()> {
        let primary = self.file(cid, RAW_SUFFIX)?;
        self.locks.with_lock(cid, || -> StoreResult<()> {
            // Retiring the primary file hides the object in a single rename;
            // the sidecars are cleaned up behind it.
            let retired =
                atomic::retire(&primary)?.ok_or_else(|| StoreError::NotFound(cid.clone()))?;
            atomic::remove_if_present(&self.file(cid, CANONICAL_SUFFIX)?)?;
            atomic::remove_if_present(&self.file(cid, SIGNATURE_SUFFIX)?)?;
            retired.close()?;
            info!(cid = %cid, requester = %requester, "object deleted");
            Ok(())
        })
    }

    fn save_signature(
        &self,
        cid: &Cid,
        signature: &[u8],
        signer: &str,
        valid: bool,
    ) -> StoreResult<SignatureRecord> {
        let record = SignatureRecord {
            cid: cid.clone(),
            signer: signer.to_string(),
            signature: signature.to_vec(),
            valid,
            recorded_at: Timestamp::now(),
        };
        let bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let path = self.file(cid, SIGNATURE_SUFFIX)?;
        self.locks.with_lock(cid, || -> StoreResult<SignatureRecord> {
            self.require_object(cid)?;
            atomic::write_replace(&path, &bytes)?;
            info!(cid = %cid, signer, valid, "signature stored");
            Ok(record)
        })
    }

    fn read_signature(&self, cid: &Cid) -> StoreResult<Option<SignatureRecord>> {
        self.require_object(cid)?;
        let bytes = match fs::read(self.file(cid, SIGNATURE_SUFFIX)?) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Serialization(format!("signature for {cid}: {e}")))?;
        Ok(Some(record))
    }

    fn exists(&self, cid: &Cid) -> StoreResult<bool> {
        match fs::metadata(self.file(cid, RAW_SUFFIX)?) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list_objects(&self) -> StoreResult<Vec<Cid>> {
        let mut cids = Vec::new();
        for entry in fs::read_dir(&self.objects)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if atomic::is_scratch_name(name)
                || name.ends_with(CANONICAL_SUFFIX)
                || name.ends_with(SIGNATURE_SUFFIX)
            {
                continue;
            }
            let Some(stem) = name.strip_suffix(RAW_SUFFIX) else {
                continue;
            };
            match Cid::parse(stem) {
                Ok(cid) => cids.push(cid),
                Err(e) => warn!(file = name, error = %e, "skipping unrecognized object file"),
            }
        }
        cids.sort();
        Ok(cids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldcas_crypto::CidHasher;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn cid_of(canonical: &[u8]) -> Cid {
        CidHasher::default().cid(canonical)
    }

    fn owner() -> Owner {
        Owner::parse("alice").unwrap()
    }

    fn names_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn save_and_read_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let raw = b"{ \"name\": \"Test\",\n  \"@context\": \"https://schema.org\" }\n";
        let canonical = br#"{"@context":"https://schema.org","name":"Test"}"#;
        let cid = cid_of(canonical);

        assert!(store.save_object(&cid, raw, canonical).unwrap().is_created());
        let record = store.read_object(&cid).unwrap();
        assert_eq!(record.raw, raw);
        assert_eq!(record.canonical, canonical);
    }

    #[test]
    fn on_disk_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"{}");
        store.save_object(&cid, b"{ }", b"{}").unwrap();
        store.save_signature(&cid, &[1, 2], "signer", true).unwrap();

        let objects = dir.path().join("o");
        assert_eq!(fs::read(objects.join(format!("{cid}.json"))).unwrap(), b"{ }");
        assert_eq!(fs::read(objects.join(format!("{cid}.canonical.json"))).unwrap(), b"{}");
        let sidecar: serde_json::Value =
            serde_json::from_slice(&fs::read(objects.join(format!("{cid}.sig.json"))).unwrap())
                .unwrap();
        assert_eq!(sidecar["signature"], "0102");
        assert_eq!(store.object_path(&cid).unwrap(), objects.join(format!("{cid}.json")));
        assert!(names_in(&objects).iter().all(|n| !atomic::is_scratch_name(n)));
    }

    #[test]
    fn second_save_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let canonical = br#"{"a":1}"#;
        let cid = cid_of(canonical);
        store.save_object(&cid, b"{\"a\":1}", canonical).unwrap();
        let outcome = store.save_object(&cid, b"{ \"a\": 1.0 }", canonical).unwrap();
        assert_eq!(outcome, SaveOutcome::AlreadyPresent);
        assert_eq!(store.read_object(&cid).unwrap().raw, b"{\"a\":1}");
    }

    #[test]
    fn conflicting_canonical_bytes_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"one");
        store.save_object(&cid, b"one", b"one").unwrap();
        let err = store.save_object(&cid, b"two", b"two").unwrap_err();
        assert!(matches!(err, StoreError::IntegrityConflict { .. }));
        assert_eq!(store.read_object(&cid).unwrap().canonical, b"one");
    }

    #[test]
    fn missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"absent");
        assert!(store.read_object(&cid).unwrap_err().is_not_found());
        assert!(!store.exists(&cid).unwrap());
        assert!(store.read_signature(&cid).unwrap_err().is_not_found());
        assert!(store
            .save_signature(&cid, b"s", "x", true)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn missing_canonical_file_is_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"{}");
        store.save_object(&cid, b"{}", b"{}").unwrap();
        fs::remove_file(dir.path().join("o").join(format!("{cid}.canonical.json"))).unwrap();
        assert!(matches!(
            store.read_object(&cid),
            Err(StoreError::CorruptObject { .. })
        ));
    }

    #[test]
    fn signature_round_trip_and_replace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"{}");
        store.save_object(&cid, b"{}", b"{}").unwrap();
        assert_eq!(store.read_signature(&cid).unwrap(), None);

        let first = store.save_signature(&cid, b"aaaa", "k1", false).unwrap();
        assert_eq!(store.read_signature(&cid).unwrap(), Some(first));
        let second = store.save_signature(&cid, b"bbbb", "k2", true).unwrap();
        assert_eq!(store.read_signature(&cid).unwrap(), Some(second));
    }

    #[test]
    fn delete_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"{}");
        store.save_object(&cid, b"{}", b"{}").unwrap();
        store.save_signature(&cid, b"sig", "k", true).unwrap();

        store.delete_object(&cid, &owner()).unwrap();
        assert!(names_in(&dir.path().join("o")).is_empty());
        assert!(!store.exists(&cid).unwrap());
        assert!(store.delete_object(&cid, &owner()).unwrap_err().is_not_found());
    }

    #[test]
    fn deleted_object_can_be_saved_again() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let cid = cid_of(b"{}");
        store.save_object(&cid, b"{}", b"{}").unwrap();
        store.delete_object(&cid, &owner()).unwrap();
        assert!(store.save_object(&cid, b"{}", b"{}").unwrap().is_created());
    }

    #[test]
    fn list_skips_sidecars_and_scratch_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let a = cid_of(b"[1]");
        let b = cid_of(b"[2]");
        store.save_object(&a, b"[1]", b"[1]").unwrap();
        store.save_object(&b, b"[2]", b"[2]").unwrap();
        store.save_signature(&a, b"s", "k", true).unwrap();
        let objects = dir.path().join("o");
        fs::write(objects.join(".tmp-leftover"), b"x").unwrap();
        fs::write(objects.join("notes.json"), b"x").unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.list_objects().unwrap(), expected);
    }

    #[test]
    fn reopen_sees_existing_objects() {
        let dir = tempfile::tempdir().unwrap();
        let cid = cid_of(b"{}");
        FsObjectStore::open(dir.path())
            .unwrap()
            .save_object(&cid, b"{}", b"{}")
            .unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        assert!(store.exists(&cid).unwrap());
    }

    #[test]
    fn concurrent_saves_of_one_cid_create_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::open(dir.path()).unwrap());
        let canonical = br#"{"@context":null,"n":1}"#;
        let cid = cid_of(canonical);
        let writers = 8;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                let cid = cid.clone();
                thread::spawn(move || {
                    let raw = format!("{{ \"n\": 1, \"@context\": null, \"pad\": \"{}\" }}", " ".repeat(i));
                    barrier.wait();
                    store.save_object(&cid, raw.as_bytes(), canonical).unwrap()
                })
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| o.is_created())
            .count();
        assert_eq!(created, 1);
        assert_eq!(store.read_object(&cid).unwrap().canonical, canonical);
        assert_eq!(names_in(&dir.path().join("o")).len(), 2);
    }

    #[test]
    fn concurrent_save_and_delete_keep_objects_whole() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsObjectStore::open(dir.path()).unwrap());
        let canonical = br#"{"@context":null,"n":2}"#;
        let cid = cid_of(canonical);
        store.save_object(&cid, canonical, canonical).unwrap();

        for _ in 0..100 {
            let barrier = Arc::new(Barrier::new(2));
            let saver = {
                let (store, barrier, cid) = (Arc::clone(&store), Arc::clone(&barrier), cid.clone());
                thread::spawn(move || {
                    barrier.wait();
                    store.save_object(&cid, canonical, canonical).unwrap();
                })
            };
            let deleter = {
                let (store, barrier, cid) = (Arc::clone(&store), Arc::clone(&barrier), cid.clone());
                thread::spawn(move || {
                    barrier.wait();
                    match store.delete_object(&cid, &owner()) {
                        Ok(()) => {}
                        Err(e) => assert!(e.is_not_found()),
                    }
                })
            };
            saver.join().unwrap();
            deleter.join().unwrap();

            if store.exists(&cid).unwrap() {
                assert_eq!(store.read_object(&cid).unwrap().canonical, canonical);
            } else {
                store.save_object(&cid, canonical, canonical).unwrap();
            }
        }
    }

    #[test]
    fn clones_share_per_object_locks() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::open(dir.path()).unwrap();
        let clone = store.clone();
        let cid = cid_of(b"[]");
        let held = store.locks.handle(&cid).unwrap();
        let _guard = held.lock().unwrap();
        assert!(clone.locks.handle(&cid).unwrap().try_lock().is_err());
    }
}
