//! Filesystem pointer store.
//!
//! Layout under the store root:
//!
//! ```text
//! u/{owner}/g/{slug}/latest          current CID, no trailing newline
//! u/{owner}/g/{slug}/_history.jsonl  one {"cid","timestamp"} record per line
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ldcas_store::{atomic, confined_join, LockArena};
use ldcas_types::{Cid, Owner, Slug};
use tracing::{debug, info, warn};

use crate::error::{RefError, RefResult};
use crate::history::{self, History, HISTORY_FILE};
use crate::traits::PointerStore;
use crate::types::{HistoryEntry, PointerKey};

/// Directory holding all owners, relative to the store root.
pub const USERS_DIR: &str = "u";
/// Directory holding an owner's slugs, relative to the owner directory.
pub const SLUGS_DIR: &str = "g";
/// File holding a pointer's current CID.
pub const LATEST_FILE: &str = "latest";

/// Pointer store rooted at a directory on disk.
///
/// Updates are serialized per key through a [`LockArena`] owned by this
/// value, so all writers to one root must share a single `FsPointerStore`.
#[derive(Debug)]
pub struct FsPointerStore {
    root: PathBuf,
    locks: LockArena<PointerKey>,
}

impl FsPointerStore {
    /// Open (creating if needed) a pointer store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> RefResult<Self> {
        let root = root.into();
        fs::create_dir_all(confined_join(&root, &[USERS_DIR])?)?;
        Ok(Self {
            root,
            locks: LockArena::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn owner_dir(&self, owner: &Owner) -> RefResult<PathBuf> {
        Ok(confined_join(&self.root, &[USERS_DIR, owner.as_str(), SLUGS_DIR])?)
    }

    fn slug_dir(&self, owner: &Owner, slug: &Slug) -> RefResult<PathBuf> {
        Ok(confined_join(
            &self.root,
            &[USERS_DIR, owner.as_str(), SLUGS_DIR, slug.as_str()],
        )?)
    }

    fn not_found(owner: &Owner, slug: &Slug) -> RefError {
        RefError::NotFound {
            key: format!("{owner}/{slug}"),
        }
    }
}

impl PointerStore for FsPointerStore {
    fn set_named_pointer(&self, owner: &Owner, slug: &Slug, cid: &Cid) -> RefResult<HistoryEntry> {
        let key = PointerKey::new(owner.clone(), slug.clone());
        let dir = self.slug_dir(owner, slug)?;
        self.locks.with_lock(&key, || -> RefResult<HistoryEntry> {
            fs::create_dir_all(&dir)?;
            let entry = HistoryEntry::now(cid.clone());
            let history_path = dir.join(HISTORY_FILE);
            let start = history::append(&history_path, &entry)?;
            // History and latest move together: a failed pointer write takes
            // its history line back out before the lock is released.
            if let Err(e) = atomic::write_replace(&dir.join(LATEST_FILE), cid.as_str().as_bytes()) {
                warn!(owner = %owner, slug = %slug, error = %e, "pointer write failed, rolling back history");
                history::truncate(&history_path, start)?;
                return Err(e.into());
            }
            info!(owner = %owner, slug = %slug, cid = %cid, "named pointer updated");
            Ok(entry)
        })
    }

    fn resolve_named_pointer(&self, owner: &Owner, slug: &Slug) -> RefResult<Cid> {
        let path = self.slug_dir(owner, slug)?.join(LATEST_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Self::not_found(owner, slug))
            }
            Err(e) => return Err(e.into()),
        };
        Cid::parse(&text).map_err(|e| RefError::CorruptPointer {
            key: format!("{owner}/{slug}"),
            reason: e.to_string(),
        })
    }

    fn read_history(&self, owner: &Owner, slug: &Slug) -> RefResult<History> {
        let dir = self.slug_dir(owner, slug)?;
        if !dir.is_dir() {
            return Err(Self::not_found(owner, slug));
        }
        debug!(owner = %owner, slug = %slug, "reading history");
        Ok(History::from_file(dir.join(HISTORY_FILE)))
    }

    fn list_slugs(&self, owner: &Owner) -> RefResult<Vec<Slug>> {
        let dir = self.owner_dir(owner)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            match Slug::parse(name.as_str()) {
                Ok(slug) => slugs.push(slug),
                Err(e) => warn!(owner = %owner, dir = %name, error = %e, "skipping invalid slug directory"),
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldcas_crypto::CidHasher;
    use std::collections::HashSet;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn owner(name: &str) -> Owner {
        Owner::parse(name).unwrap()
    }

    fn slug(name: &str) -> Slug {
        Slug::parse(name).unwrap()
    }

    fn cid(n: usize) -> Cid {
        CidHasher::default().cid(format!("[{n}]").as_bytes())
    }

    #[test]
    fn on_disk_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        let entry = store
            .set_named_pointer(&owner("alice"), &slug("post"), &cid(1))
            .unwrap();

        let slug_dir = dir.path().join("u/alice/g/post");
        assert_eq!(fs::read_to_string(slug_dir.join("latest")).unwrap(), cid(1).as_str());
        let history = fs::read_to_string(slug_dir.join("_history.jsonl")).unwrap();
        assert_eq!(history, format!("{}\n", serde_json::to_string(&entry).unwrap()));
        assert!(history.starts_with(&format!("{{\"cid\":\"{}\",\"timestamp\":\"", cid(1))));
    }

    #[test]
    fn failed_pointer_write_leaves_history_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        let (alice, post) = (owner("alice"), slug("post"));
        store.set_named_pointer(&alice, &post, &cid(1)).unwrap();

        // A directory where `latest` belongs makes the rename fail.
        let slug_dir = dir.path().join("u/alice/g/post");
        fs::remove_file(slug_dir.join("latest")).unwrap();
        fs::create_dir(slug_dir.join("latest")).unwrap();
        let before = fs::read(slug_dir.join("_history.jsonl")).unwrap();

        assert!(store.set_named_pointer(&alice, &post, &cid(2)).is_err());
        assert_eq!(fs::read(slug_dir.join("_history.jsonl")).unwrap(), before);
        let cids: Vec<Cid> = store
            .read_history(&alice, &post)
            .unwrap()
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.cid)
            .collect();
        assert_eq!(cids, vec![cid(1)]);
    }

    #[test]
    fn resolve_follows_latest_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        let (alice, post) = (owner("alice"), slug("post"));
        for n in 0..3 {
            store.set_named_pointer(&alice, &post, &cid(n)).unwrap();
        }
        assert_eq!(store.resolve_named_pointer(&alice, &post).unwrap(), cid(2));

        let cids: Vec<Cid> = store
            .read_history(&alice, &post)
            .unwrap()
            .entries()
            .unwrap()
            .into_iter()
            .map(|e| e.cid)
            .collect();
        assert_eq!(cids, vec![cid(0), cid(1), cid(2)]);
    }

    #[test]
    fn unknown_pointer_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        assert!(store
            .resolve_named_pointer(&owner("alice"), &slug("missing"))
            .unwrap_err()
            .is_not_found());
        assert!(store
            .read_history(&owner("alice"), &slug("missing"))
            .unwrap_err()
            .is_not_found());
        assert!(store.list_slugs(&owner("nobody")).unwrap().is_empty());
    }

    #[test]
    fn corrupt_latest_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        let slug_dir = dir.path().join("u/alice/g/post");
        fs::create_dir_all(&slug_dir).unwrap();
        fs::write(slug_dir.join("latest"), "not-a-cid").unwrap();
        assert!(matches!(
            store.resolve_named_pointer(&owner("alice"), &slug("post")),
            Err(RefError::CorruptPointer { .. })
        ));
    }

    #[test]
    fn list_slugs_and_owns() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        let alice = owner("alice");
        store.set_named_pointer(&alice, &slug("zeta"), &cid(1)).unwrap();
        store.set_named_pointer(&alice, &slug("alpha"), &cid(2)).unwrap();
        store.set_named_pointer(&alice, &slug("alpha"), &cid(3)).unwrap();
        store.set_named_pointer(&owner("bob"), &slug("x"), &cid(4)).unwrap();
        fs::create_dir_all(dir.path().join("u/alice/g/_junk")).unwrap();

        assert_eq!(store.list_slugs(&alice).unwrap(), vec![slug("alpha"), slug("zeta")]);
        assert!(store.owns(&alice, &cid(2)).unwrap());
        assert!(store.owns(&alice, &cid(1)).unwrap());
        assert!(!store.owns(&alice, &cid(4)).unwrap());
    }

    #[test]
    fn pointers_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FsPointerStore::open(dir.path())
            .unwrap()
            .set_named_pointer(&owner("alice"), &slug("post"), &cid(7))
            .unwrap();
        let store = FsPointerStore::open(dir.path()).unwrap();
        assert_eq!(
            store.resolve_named_pointer(&owner("alice"), &slug("post")).unwrap(),
            cid(7)
        );
    }

    #[test]
    fn concurrent_updates_to_one_slug_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsPointerStore::open(dir.path()).unwrap());
        let writers = 16;
        let barrier = Arc::new(Barrier::new(writers));

        let handles: Vec<_> = (0..writers)
            .map(|n| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .set_named_pointer(&owner("alice"), &slug("post"), &cid(n))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entries = store
            .read_history(&owner("alice"), &slug("post"))
            .unwrap()
            .entries()
            .unwrap();
        assert_eq!(entries.len(), writers);
        let seen: HashSet<Cid> = entries.iter().map(|e| e.cid.clone()).collect();
        let expected: HashSet<Cid> = (0..writers).map(cid).collect();
        assert_eq!(seen, expected);
        assert!(entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        let latest = store.resolve_named_pointer(&owner("alice"), &slug("post")).unwrap();
        assert_eq!(Some(&latest), entries.last().map(|e| &e.cid));
    }

    #[test]
    fn different_slugs_update_independently() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FsPointerStore::open(dir.path()).unwrap());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let slug = slug(&format!("post-{n}"));
                    for round in 0..5 {
                        store
                            .set_named_pointer(&owner("alice"), &slug, &cid(n * 10 + round))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for n in 0..8 {
            let slug = slug(&format!("post-{n}"));
            let history = store.read_history(&owner("alice"), &slug).unwrap();
            assert_eq!(history.entries().unwrap().len(), 5);
            assert_eq!(
                store.resolve_named_pointer(&owner("alice"), &slug).unwrap(),
                cid(n * 10 + 4)
            );
        }
    }
}
