use serde::{Deserialize, Serialize};

use ldcas_types::{Cid, Timestamp};

/// A stored object: the bytes as submitted and their canonical form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRecord {
    pub cid: Cid,
    /// The document exactly as it was first saved.
    pub raw: Vec<u8>,
    /// The canonical bytes the CID was derived from.
    pub canonical: Vec<u8>,
}

impl ObjectRecord {
    pub fn new(cid: Cid, raw: impl Into<Vec<u8>>, canonical: impl Into<Vec<u8>>) -> Self {
        Self {
            cid,
            raw: raw.into(),
            canonical: canonical.into(),
        }
    }

    /// Total bytes held for this object.
    pub fn size(&self) -> u64 {
        (self.raw.len() + self.canonical.len()) as u64
    }
}

/// Whether a save wrote new data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    /// The object was already stored; nothing was written.
    AlreadyPresent,
}

impl SaveOutcome {
    pub fn is_created(self) -> bool {
        matches!(self, Self::Created)
    }
}

/// A detached signature over an object's CID string.
///
/// Serialized as the `{cid}.sig.json` sidecar.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub cid: Cid,
    /// Address of the signing key.
    pub signer: String,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    /// Whether the signature verified when it was recorded.
    pub valid: bool,
    pub recorded_at: Timestamp,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
