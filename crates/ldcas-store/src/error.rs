use std::path::PathBuf;

use ldcas_types::Cid;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(Cid),

    /// An object with this CID exists but its canonical bytes differ.
    #[error("integrity conflict for {cid}: stored canonical bytes differ")]
    IntegrityConflict { cid: Cid },

    /// Part of an object is missing or unreadable.
    #[error("corrupt object {cid}: {reason}")]
    CorruptObject { cid: Cid, reason: String },

    /// A path component was rejected before touching the filesystem.
    #[error("invalid path component {component:?} under {}: {reason}", .root.display())]
    InvalidPath {
        root: PathBuf,
        component: String,
        reason: &'static str,
    },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A thread panicked while holding a per-key lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Whether this is a plain miss rather than a storage failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
