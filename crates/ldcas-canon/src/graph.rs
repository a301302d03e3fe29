//! The RDF dataset canonicalization seam.
//!
//! A document with a JSON-LD `@context` describes an RDF graph. Two documents
//! that describe the same graph should seal to the same CID even when their
//! blank-node labels differ, which needs URDNA2015: expand, convert to
//! N-Quads, relabel blank nodes deterministically and sort.
//!
//! That algorithm lives behind [`GraphCanonicalizer`]. The sealer asks it for
//! a [`GraphForm`] and falls back to plain canonical JSON when the graph is
//! empty or the document is not graph-shaped. [`Urdna2015`] is the default
//! implementation: [`jsonld`](crate::jsonld) builds the dataset and
//! `rdf-canon` labels and sorts it.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::jsonld::{to_dataset, BundledContexts, ContextLoader};

/// Outcome of graph canonicalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphForm {
    /// Canonical N-Quads, one quad per line, sorted.
    Quads(String),
    /// The document expanded to an empty dataset.
    Empty,
    /// The document cannot be read as a graph (e.g. it has no usable context).
    Inapplicable,
}

impl GraphForm {
    /// The quads, if any were produced.
    pub fn quads(&self) -> Option<&str> {
        match self {
            Self::Quads(q) if !q.is_empty() => Some(q),
            _ => None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A referenced context could not be loaded or was malformed.
    #[error("context resolution failed: {0}")]
    Context(String),

    /// The canonicalization algorithm itself failed.
    #[error("graph canonicalization failed: {0}")]
    Algorithm(String),

    /// Graph mode was forced but the document has no graph form.
    #[error("document has no graph form")]
    NoGraphForm,
}

/// RDF dataset canonicalization (URDNA2015) over a parsed document.
///
/// Implementations must be deterministic: the same document always yields the
/// same [`GraphForm`].
pub trait GraphCanonicalizer: Send + Sync {
    fn canonicalize(&self, doc: &Value) -> Result<GraphForm, GraphError>;
}

impl<F> GraphCanonicalizer for F
where
    F: Fn(&Value) -> Result<GraphForm, GraphError> + Send + Sync,
{
    fn canonicalize(&self, doc: &Value) -> Result<GraphForm, GraphError> {
        self(doc)
    }
}

/// Canonicalizer that never produces a graph form.
///
/// Every document is sealed as plain canonical JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainJsonOnly;

impl GraphCanonicalizer for PlainJsonOnly {
    fn canonicalize(&self, _doc: &Value) -> Result<GraphForm, GraphError> {
        Ok(GraphForm::Inapplicable)
    }
}

/// URDNA2015 (RDFC-1.0) over the document's JSON-LD reading.
#[derive(Clone)]
pub struct Urdna2015 {
    loader: Arc<dyn ContextLoader>,
}

impl Urdna2015 {
    /// Canonicalizer resolving remote contexts from [`BundledContexts::new`].
    pub fn new() -> Self {
        Self::with_loader(Arc::new(BundledContexts::new()))
    }

    pub fn with_loader(loader: Arc<dyn ContextLoader>) -> Self {
        Self { loader }
    }
}

impl Default for Urdna2015 {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Urdna2015 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Urdna2015").finish_non_exhaustive()
    }
}

impl GraphCanonicalizer for Urdna2015 {
    fn canonicalize(&self, doc: &Value) -> Result<GraphForm, GraphError> {
        let Some(dataset) = to_dataset(doc, self.loader.as_ref())? else {
            return Ok(GraphForm::Inapplicable);
        };
        if dataset.is_empty() {
            return Ok(GraphForm::Empty);
        }
        let quads = rdf_canon::canonicalize(&dataset)
            .map_err(|e| GraphError::Algorithm(e.to_string()))?;
        Ok(GraphForm::Quads(quads))
    }
}
