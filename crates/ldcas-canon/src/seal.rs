//! The sealing pipeline: raw bytes in, `(Cid, canonical bytes)` out.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use ldcas_crypto::CidHasher;
use ldcas_types::Cid;

use crate::config::{CanonicalMode, SealConfig};
use crate::encoder::{encode, encode_str};
use crate::error::{EncodeError, SealError};
use crate::graph::{GraphCanonicalizer, GraphError, GraphForm, Urdna2015};
use crate::validator::Validator;

/// The canonical representation chosen for a document.
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalForm {
    /// Canonical N-Quads of the document's RDF dataset.
    Graph(String),
    /// The parsed document itself, to be encoded as canonical JSON.
    Plain(Value),
}

impl CanonicalForm {
    /// Canonical bytes for this form.
    ///
    /// Quads are wrapped as a single canonical JSON string so that every
    /// sealed object is a JSON document.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        match self {
            Self::Graph(quads) => encode_str(quads),
            Self::Plain(value) => encode(value),
        }
    }

    pub fn kind(&self) -> FormKind {
        match self {
            Self::Graph(_) => FormKind::Graph,
            Self::Plain(_) => FormKind::Plain,
        }
    }
}

/// Which canonical form a sealed document used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormKind {
    Graph,
    Plain,
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph => f.write_str("graph"),
            Self::Plain => f.write_str("plain"),
        }
    }
}

/// A sealed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    pub cid: Cid,
    pub canonical: Vec<u8>,
    pub form: FormKind,
}

/// Validates, canonicalizes and hashes documents.
///
/// A `Sealer` is immutable after construction and safe to share across
/// threads; sealing is a pure function of the input and the configuration.
#[derive(Clone)]
pub struct Sealer {
    config: SealConfig,
    validator: Validator,
    hasher: CidHasher,
    graph: Arc<dyn GraphCanonicalizer>,
}

impl Sealer {
    /// Create a sealer backed by [`Urdna2015`] with the bundled contexts.
    pub fn new(config: SealConfig) -> Self {
        Self::with_graph_canonicalizer(config, Arc::new(Urdna2015::new()))
    }

    /// Create a sealer backed by an RDF dataset canonicalizer.
    pub fn with_graph_canonicalizer(
        config: SealConfig,
        graph: Arc<dyn GraphCanonicalizer>,
    ) -> Self {
        Self {
            validator: Validator::new(config.max_depth),
            hasher: CidHasher::from(config.hash),
            config,
            graph,
        }
    }

    pub fn config(&self) -> &SealConfig {
        &self.config
    }

    pub fn hasher(&self) -> CidHasher {
        self.hasher
    }

    /// Seal raw document bytes.
    pub fn seal(&self, raw: &[u8]) -> Result<Sealed, SealError> {
        if raw.len() > self.config.max_document_bytes {
            return Err(SealError::TooLarge {
                size: raw.len(),
                limit: self.config.max_document_bytes,
            });
        }
        let doc: Value = match serde_json::from_slice(raw) {
            Ok(doc) => doc,
            Err(e) => {
                // The parser's own recursion limit would otherwise turn deep
                // documents into syntax errors.
                self.validator.check_raw_depth(raw)?;
                return Err(SealError::Malformed(e.to_string()));
            }
        };
        self.seal_value(&doc)
    }

    /// Seal an already-parsed document. The size limit does not apply.
    pub fn seal_value(&self, doc: &Value) -> Result<Sealed, SealError> {
        self.validator.validate(doc)?;
        let form = self.canonical_form(doc)?;
        let canonical = form.to_bytes()?;
        let cid = self.hasher.cid(&canonical);
        debug!(cid = %cid, form = %form.kind(), bytes = canonical.len(), "sealed document");
        Ok(Sealed {
            cid,
            canonical,
            form: form.kind(),
        })
    }

    /// Choose the canonical form for a validated document.
    pub fn canonical_form(&self, doc: &Value) -> Result<CanonicalForm, SealError> {
        match self.config.canonical_mode {
            CanonicalMode::Plain => Ok(CanonicalForm::Plain(doc.clone())),
            CanonicalMode::Auto => match self.graph.canonicalize(doc)? {
                GraphForm::Quads(quads) if !quads.is_empty() => Ok(CanonicalForm::Graph(quads)),
                GraphForm::Quads(_) | GraphForm::Empty | GraphForm::Inapplicable => {
                    Ok(CanonicalForm::Plain(doc.clone()))
                }
            },
            CanonicalMode::Graph => match self.graph.canonicalize(doc)? {
                GraphForm::Quads(quads) if !quads.is_empty() => Ok(CanonicalForm::Graph(quads)),
                _ => Err(SealError::CanonicalizationFailed(GraphError::NoGraphForm)),
            },
        }
    }

    /// Re-seal `raw` and check that it yields `expected`.
    ///
    /// The expected CID's own hash function is used, so objects sealed under
    /// another hash configuration still verify.
    pub fn verify(&self, expected: &Cid, raw: &[u8]) -> Result<bool, SealError> {
        let sealed = self.seal(raw)?;
        Ok(CidHasher::verify(&sealed.canonical, expected))
    }
}

impl Default for Sealer {
    fn default() -> Self {
        Self::new(SealConfig::default())
    }
}

impl fmt::Debug for Sealer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sealer")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}
