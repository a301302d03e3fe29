use thiserror::Error;

use crate::graph::GraphError;

/// Errors from the canonical encoder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value has no JSON representation (e.g. a map with non-string keys).
    #[error("value is not representable as JSON: {0}")]
    Unrepresentable(String),

    /// The canonical serializer refused the value.
    #[error("canonical serialization failed: {0}")]
    Canonical(String),

    /// Bytes handed to [`decode`](crate::decode) are not JSON.
    #[error("cannot decode canonical bytes: {0}")]
    Decode(String),
}

/// A structural rule the document violates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("document root must be a JSON object")]
    RootNotObject,

    #[error("missing @context at document root")]
    MissingContext,

    #[error("@context must be a string, object, array or null, found {found}")]
    InvalidContext { found: &'static str },

    #[error("nesting depth exceeds {max} at {path}")]
    TooDeep { max: usize, path: String },

    #[error("key at {path} contains control character 0x{byte:02x}")]
    ControlCharacterInKey { path: String, byte: u8 },
}

/// Errors from the sealing pipeline.
#[derive(Debug, Error)]
pub enum SealError {
    /// Input exceeds the configured size limit; nothing was parsed.
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },

    /// Input is not parseable JSON.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Input parsed but failed validation.
    #[error("invalid document: {0}")]
    Invalid(#[from] ValidationError),

    /// The graph canonicalizer failed (e.g. an unresolvable remote context).
    #[error("canonicalization failed: {0}")]
    CanonicalizationFailed(#[from] GraphError),

    /// The chosen canonical form could not be serialized.
    #[error("canonical encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

impl SealError {
    /// Whether the failure was caused by the submitted document itself.
    ///
    /// Canonicalization failures may stem from upstream context resolution,
    /// so they are not attributed to the client.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::CanonicalizationFailed(_) | Self::Encode(_))
    }
}
