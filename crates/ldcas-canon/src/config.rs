use serde::{Deserialize, Serialize};

use ldcas_types::HashCode;

use crate::validator::DEFAULT_MAX_DEPTH;

/// Default upper bound on raw document size: 16 MiB.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 16 * 1024 * 1024;

/// Which canonical form the sealer produces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalMode {
    /// Graph form when the graph canonicalizer yields quads, plain otherwise.
    #[default]
    Auto,
    /// Always plain canonical JSON; the graph canonicalizer is never called.
    Plain,
    /// Always graph form; documents without one are rejected.
    Graph,
}

/// Configuration for the sealing pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SealConfig {
    /// Maximum container nesting depth accepted by the validator.
    pub max_depth: usize,
    /// Raw inputs larger than this are rejected before parsing.
    pub max_document_bytes: usize,
    pub canonical_mode: CanonicalMode,
    /// Multihash function used for new CIDs.
    pub hash: HashCode,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            canonical_mode: CanonicalMode::Auto,
            hash: HashCode::Sha2_256,
        }
    }
}

impl SealConfig {
    /// A configuration that never consults a graph canonicalizer.
    pub fn plain() -> Self {
        Self {
            canonical_mode: CanonicalMode::Plain,
            ..Default::default()
        }
    }
}
