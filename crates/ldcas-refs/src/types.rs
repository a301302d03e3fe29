//! Core named pointer types.

use std::fmt;

use serde::{Deserialize, Serialize};

use ldcas_types::{Cid, Owner, Slug, Timestamp};

/// Identifies one named pointer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerKey {
    pub owner: Owner,
    pub slug: Slug,
}

impl PointerKey {
    pub fn new(owner: Owner, slug: Slug) -> Self {
        Self { owner, slug }
    }
}

impl fmt::Display for PointerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.slug)
    }
}

/// One line of a pointer's history: which CID it was set to, and when.
///
/// Serialized as `{"cid":"…","timestamp":"…"}`, one record per line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub cid: Cid,
    pub timestamp: Timestamp,
}

impl HistoryEntry {
    pub fn new(cid: Cid, timestamp: Timestamp) -> Self {
        Self { cid, timestamp }
    }

    /// Record `cid` at the current time.
    pub fn now(cid: Cid) -> Self {
        Self::new(cid, Timestamp::now())
    }
}
