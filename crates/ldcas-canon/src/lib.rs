//! Canonicalization and sealing for ldcas.
//!
//! Turns raw document bytes into a `(Cid, canonical bytes)` pair:
//!
//! ```text
//! raw bytes ──parse──▶ Value ──Validator──▶ CanonicalForm ──encoder──▶ bytes ──CidHasher──▶ Cid
//! ```
//!
//! # Modules
//!
//! - [`encoder`]: deterministic canonical JSON bytes
//! - [`validator`]: structural checks on `@context`, depth and keys
//! - [`graph`]: the RDF dataset canonicalization seam (URDNA2015)
//! - [`jsonld`]: JSON-LD contexts and conversion to an RDF dataset
//! - [`seal`]: the [`Sealer`] pipeline
//! - [`config`]: [`SealConfig`] and [`CanonicalMode`]
//!
//! # Design Rules
//!
//! 1. Sealing is a pure function of the input bytes and the configuration.
//! 2. The validator rejects; it never repairs.
//! 3. Graph vs plain canonicalization is an explicit [`CanonicalForm`] choice.
//! 4. Failures are returned to the caller; nothing is retried here.

pub mod config;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod jsonld;
pub mod seal;
pub mod validator;

pub use config::{CanonicalMode, SealConfig, DEFAULT_MAX_DOCUMENT_BYTES};
pub use encoder::{decode, encode, encode_serializable, encode_str};
pub use error::{EncodeError, SealError, ValidationError};
pub use graph::{GraphCanonicalizer, GraphError, GraphForm, PlainJsonOnly, Urdna2015};
pub use jsonld::{BundledContexts, ContextLoader};
pub use seal::{CanonicalForm, FormKind, Sealed, Sealer};
pub use validator::{validate, Validator, CONTEXT_KEY, DEFAULT_MAX_DEPTH};
