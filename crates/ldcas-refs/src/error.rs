//! Error types for named pointer operations.

use std::path::PathBuf;

use ldcas_store::StoreError;
use ldcas_types::TypeError;
use thiserror::Error;

/// Errors that can occur during named pointer operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// No pointer exists for this owner and slug.
    #[error("named pointer not found: {key}")]
    NotFound { key: String },

    /// An owner or slug failed validation.
    #[error(transparent)]
    InvalidName(#[from] TypeError),

    /// The `latest` file does not hold a valid CID.
    #[error("corrupt pointer {key}: {reason}")]
    CorruptPointer { key: String, reason: String },

    /// A complete history line could not be decoded.
    #[error("corrupt history {}:{line}: {reason}", .path.display())]
    CorruptHistory {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Path construction or another store-level failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A thread panicked while holding a pointer lock.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// I/O error during file-based pointer operations.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RefError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Convenience type alias for pointer operations.
pub type RefResult<T> = std::result::Result<T, RefError>;
