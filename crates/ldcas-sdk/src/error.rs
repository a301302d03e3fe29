use std::fmt;

use ldcas_canon::SealError;
use ldcas_crypto::SignatureError;
use ldcas_refs::RefError;
use ldcas_store::StoreError;
use ldcas_types::{Cid, Owner, TypeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("seal error: {0}")]
    Seal(#[from] SealError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("invalid name: {0}")]
    InvalidName(#[from] TypeError),

    #[error("{requester} may not delete {cid}")]
    Forbidden { requester: Owner, cid: Cid },

    #[error("signature error: {0}")]
    Signature(#[from] SignatureError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of an [`SdkError`], for mapping onto a transport's
/// status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request itself was wrong: bad document, bad name, bad signature.
    BadInput,
    NotFound,
    Forbidden,
    /// The request contradicts what is already stored.
    Conflict,
    /// Storage or environment failure.
    Internal,
}

impl ErrorKind {
    /// Whether the caller, rather than the environment, is at fault.
    pub fn is_client_error(self) -> bool {
        !matches!(self, Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadInput => "bad input",
            Self::NotFound => "not found",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

impl SdkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Seal(e) if e.is_client_error() => ErrorKind::BadInput,
            Self::Seal(_) => ErrorKind::Internal,
            Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::Store(StoreError::IntegrityConflict { .. }) => ErrorKind::Conflict,
            Self::Store(StoreError::InvalidPath { .. }) => ErrorKind::BadInput,
            Self::Store(_) => ErrorKind::Internal,
            Self::Ref(RefError::NotFound { .. }) => ErrorKind::NotFound,
            Self::Ref(RefError::InvalidName(_)) => ErrorKind::BadInput,
            Self::Ref(RefError::Store(StoreError::InvalidPath { .. })) => ErrorKind::BadInput,
            Self::Ref(_) => ErrorKind::Internal,
            Self::InvalidName(_) | Self::Signature(_) => ErrorKind::BadInput,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
