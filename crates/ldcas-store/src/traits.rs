use ldcas_types::{Cid, Owner};

use crate::error::StoreResult;
use crate::object::{ObjectRecord, SaveOutcome, SignatureRecord};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. Saving an existing CID returns
///   [`SaveOutcome::AlreadyPresent`] and keeps the first raw bytes.
/// - Saving an existing CID with different canonical bytes fails with
///   [`StoreError::IntegrityConflict`](crate::StoreError::IntegrityConflict).
/// - Readers never observe a partially written or partially deleted object.
/// - Concurrent calls for different CIDs never block each other.
pub trait ObjectStore: Send + Sync {
    /// Store an object under `cid`.
    fn save_object(&self, cid: &Cid, raw: &[u8], canonical: &[u8]) -> StoreResult<SaveOutcome>;

    /// Read an object. Missing objects are [`StoreError::NotFound`](crate::StoreError::NotFound).
    fn read_object(&self, cid: &Cid) -> StoreResult<ObjectRecord>;

    /// Remove an object together with its canonical bytes and signature.
    ///
    /// The caller has already decided that `requester` may do this; the
    /// store only records who asked.
    fn delete_object(&self, cid: &Cid, requester: &Owner) -> StoreResult<()>;

    /// Attach (or replace) the detached signature of an existing object.
    fn save_signature(
        &self,
        cid: &Cid,
        signature: &[u8],
        signer: &str,
        valid: bool,
    ) -> StoreResult<SignatureRecord>;

    /// The object's signature, if one was saved.
    fn read_signature(&self, cid: &Cid) -> StoreResult<Option<SignatureRecord>>;

    /// Check whether an object exists.
    fn exists(&self, cid: &Cid) -> StoreResult<bool>;

    /// All stored CIDs, sorted.
    fn list_objects(&self) -> StoreResult<Vec<Cid>>;
}
