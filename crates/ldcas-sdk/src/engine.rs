use std::sync::Arc;

use tracing::{debug, info, warn};

use ldcas_canon::{FormKind, GraphCanonicalizer, Sealed, Sealer};
use ldcas_crypto::{CidHasher, Signature, SigningKey, VerifyingKey};
use ldcas_refs::{FsPointerStore, History, HistoryEntry, InMemoryPointerStore, PointerStore};
use ldcas_store::{
    FsObjectStore, InMemoryObjectStore, ObjectRecord, ObjectStore, SaveOutcome, SignatureRecord,
    StoreError,
};
use ldcas_types::{Cid, Owner, Slug};

use crate::config::EngineConfig;
use crate::error::{SdkError, SdkResult};

/// Result of [`Engine::save_document`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedDocument {
    pub cid: Cid,
    pub form: FormKind,
    /// Whether the object was new to the store.
    pub outcome: SaveOutcome,
    /// The history line recorded for the named pointer.
    pub entry: HistoryEntry,
}

/// Outcome of re-checking one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrityReport {
    pub cid: Cid,
    /// The stored canonical bytes hash to the CID.
    pub canonical_matches: bool,
    /// Re-sealing the stored raw bytes yields the CID.
    pub reseal_matches: bool,
    /// Whether the stored signature verifies, if one exists.
    pub signature_valid: Option<bool>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.canonical_matches && self.reseal_matches && self.signature_valid != Some(false)
    }
}

/// The document engine: sealing, object storage and named pointers.
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    sealer: Sealer,
    objects: Arc<dyn ObjectStore>,
    pointers: Arc<dyn PointerStore>,
}

impl Engine {
    /// Open a filesystem-backed engine at `config.root`.
    pub fn open(config: EngineConfig) -> SdkResult<Self> {
        config.validate()?;
        let sealer = Sealer::new(config.seal_config());
        Self::open_with_sealer(config, sealer)
    }

    /// Open a filesystem-backed engine with an RDF dataset canonicalizer.
    pub fn open_with_graph_canonicalizer(
        config: EngineConfig,
        graph: Arc<dyn GraphCanonicalizer>,
    ) -> SdkResult<Self> {
        config.validate()?;
        let sealer = Sealer::with_graph_canonicalizer(config.seal_config(), graph);
        Self::open_with_sealer(config, sealer)
    }

    fn open_with_sealer(config: EngineConfig, sealer: Sealer) -> SdkResult<Self> {
        let objects = FsObjectStore::open(&config.root)?;
        let pointers = FsPointerStore::open(&config.root)?;
        info!(root = %config.root.display(), hash = %config.hash, "engine opened");
        Ok(Self::from_parts(config, sealer, Arc::new(objects), Arc::new(pointers)))
    }

    /// An engine whose state lives only in memory.
    pub fn in_memory(config: EngineConfig) -> Self {
        let sealer = Sealer::new(config.seal_config());
        Self::from_parts(
            config,
            sealer,
            Arc::new(InMemoryObjectStore::new()),
            Arc::new(InMemoryPointerStore::new()),
        )
    }

    /// Assemble an engine from explicit components.
    pub fn from_parts(
        config: EngineConfig,
        sealer: Sealer,
        objects: Arc<dyn ObjectStore>,
        pointers: Arc<dyn PointerStore>,
    ) -> Self {
        Self {
            config,
            sealer,
            objects,
            pointers,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sealer(&self) -> &Sealer {
        &self.sealer
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn pointers(&self) -> &dyn PointerStore {
        self.pointers.as_ref()
    }

    // ---- Documents ----

    /// Seal without storing.
    pub fn seal(&self, raw: &[u8]) -> SdkResult<Sealed> {
        Ok(self.sealer.seal(raw)?)
    }

    /// Seal and store a document without naming it.
    pub fn put_document(&self, raw: &[u8]) -> SdkResult<(Sealed, SaveOutcome)> {
        let sealed = self.sealer.seal(raw)?;
        let outcome = self.objects.save_object(&sealed.cid, raw, &sealed.canonical)?;
        Ok((sealed, outcome))
    }

    /// Seal, store, and point `owner/slug` at the result.
    ///
    /// A document that fails sealing never reaches the store.
    pub fn save_document(&self, owner: &Owner, slug: &Slug, raw: &[u8]) -> SdkResult<SavedDocument> {
        let (sealed, outcome) = self.put_document(raw)?;
        let entry = self.pointers.set_named_pointer(owner, slug, &sealed.cid)?;
        info!(owner = %owner, slug = %slug, cid = %sealed.cid, "document saved");
        Ok(SavedDocument {
            cid: sealed.cid,
            form: sealed.form,
            outcome,
            entry,
        })
    }

    pub fn read_document(&self, cid: &Cid) -> SdkResult<ObjectRecord> {
        Ok(self.objects.read_object(cid)?)
    }

    pub fn resolve_cid(&self, owner: &Owner, slug: &Slug) -> SdkResult<Cid> {
        Ok(self.pointers.resolve_named_pointer(owner, slug)?)
    }

    /// The document `owner/slug` currently points at.
    pub fn resolve(&self, owner: &Owner, slug: &Slug) -> SdkResult<ObjectRecord> {
        let cid = self.resolve_cid(owner, slug)?;
        self.read_document(&cid)
    }

    pub fn history(&self, owner: &Owner, slug: &Slug) -> SdkResult<History> {
        Ok(self.pointers.read_history(owner, slug)?)
    }

    pub fn list_slugs(&self, owner: &Owner) -> SdkResult<Vec<Slug>> {
        Ok(self.pointers.list_slugs(owner)?)
    }

    pub fn list_objects(&self) -> SdkResult<Vec<Cid>> {
        Ok(self.objects.list_objects()?)
    }

    /// Delete an object on behalf of `requester`.
    ///
    /// Only an owner whose pointer history includes the CID may delete it.
    /// Pointers and their history are left untouched.
    pub fn delete_object(&self, cid: &Cid, requester: &Owner) -> SdkResult<()> {
        if !self.objects.exists(cid)? {
            return Err(SdkError::Store(StoreError::NotFound(cid.clone())));
        }
        if !self.pointers.owns(requester, cid)? {
            warn!(cid = %cid, requester = %requester, "delete refused");
            return Err(SdkError::Forbidden {
                requester: requester.clone(),
                cid: cid.clone(),
            });
        }
        self.objects.delete_object(cid, requester)?;
        Ok(())
    }

    // ---- Signatures ----

    /// Sign an object's CID and store the signature.
    pub fn sign_object(&self, cid: &Cid, key: &SigningKey) -> SdkResult<SignatureRecord> {
        let signature = key.sign_cid(cid);
        let verifying = key.verifying_key();
        let valid = verifying.verify_cid(cid, &signature).is_ok();
        Ok(self
            .objects
            .save_signature(cid, &signature.to_bytes(), &verifying.address(), valid)?)
    }

    /// Store a signature produced elsewhere, recording whether it verifies.
    pub fn attach_signature(
        &self,
        cid: &Cid,
        signature: &[u8],
        signer_address: &str,
    ) -> SdkResult<SignatureRecord> {
        let valid = signature_verifies(cid, signature, signer_address);
        if !valid {
            warn!(cid = %cid, signer = signer_address, "attaching signature that does not verify");
        }
        Ok(self
            .objects
            .save_signature(cid, signature, signer_address, valid)?)
    }

    // ---- Integrity ----

    /// Re-derive a stored object's CID from both its canonical and raw bytes,
    /// and re-check its signature.
    pub fn verify_object(&self, cid: &Cid) -> SdkResult<IntegrityReport> {
        let record = self.objects.read_object(cid)?;
        let canonical_matches = CidHasher::verify(&record.canonical, cid);
        let reseal_matches = match self.sealer.verify(cid, &record.raw) {
            Ok(matches) => matches,
            Err(e) => {
                debug!(cid = %cid, error = %e, "stored raw bytes no longer seal");
                false
            }
        };
        let signature_valid = self
            .objects
            .read_signature(cid)?
            .map(|sig| signature_verifies(cid, &sig.signature, &sig.signer));
        Ok(IntegrityReport {
            cid: cid.clone(),
            canonical_matches,
            reseal_matches,
            signature_valid,
        })
    }

    /// [`verify_object`](Self::verify_object) for every stored object.
    pub fn verify_all(&self) -> SdkResult<Vec<IntegrityReport>> {
        self.objects
            .list_objects()?
            .iter()
            .map(|cid| self.verify_object(cid))
            .collect()
    }
}

fn signature_verifies(cid: &Cid, signature: &[u8], signer_address: &str) -> bool {
    let Ok(key) = VerifyingKey::from_address(signer_address) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify_cid(cid, &signature).is_ok()
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("sealer", &self.sealer)
            .finish_non_exhaustive()
    }
}
