use ldcas_types::{Cid, Codec, HashCode};
use sha2::{Digest, Sha256};

/// Derives content identifiers from canonical bytes.
///
/// A hasher pins both the multihash function and the multicodec tag, so a
/// store configured with one `CidHasher` always produces one CID per canonical
/// byte sequence. Unlike domain-separated object hashes, the digest covers the
/// canonical bytes alone: the CID must be reproducible by any tool that
/// understands CIDv1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CidHasher {
    codec: Codec,
    hash: HashCode,
}

impl CidHasher {
    /// JSON codec with SHA2-256, the default for new stores.
    pub const SHA2_256: Self = Self {
        codec: Codec::Json,
        hash: HashCode::Sha2_256,
    };
    /// JSON codec with BLAKE3.
    pub const BLAKE3: Self = Self {
        codec: Codec::Json,
        hash: HashCode::Blake3,
    };

    /// Create a hasher for the given codec and hash function.
    pub const fn new(codec: Codec, hash: HashCode) -> Self {
        Self { codec, hash }
    }

    /// Hash canonical bytes into a CID.
    pub fn cid(&self, canonical: &[u8]) -> Cid {
        let digest = Self::digest(self.hash, canonical);
        match Cid::from_digest(self.codec, self.hash, &digest) {
            Ok(cid) => cid,
            // Both digests are fixed at 32 bytes, matching HashCode::digest_len.
            Err(e) => unreachable!("digest framing failed: {e}"),
        }
    }

    /// Verify that canonical bytes produce the expected CID.
    ///
    /// The expected CID's own hash function is used, so identifiers produced
    /// under a different configuration still verify.
    pub fn verify(canonical: &[u8], expected: &Cid) -> bool {
        let hasher = Self::new(expected.codec(), expected.hash_code());
        hasher.cid(canonical) == *expected
    }

    /// Raw digest without CID framing.
    pub fn digest(hash: HashCode, data: &[u8]) -> [u8; 32] {
        match hash {
            HashCode::Sha2_256 => Sha256::digest(data).into(),
            HashCode::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }

    /// The multihash function this hasher uses.
    pub fn hash_code(&self) -> HashCode {
        self.hash
    }

    /// The multicodec tag this hasher uses.
    pub fn codec(&self) -> Codec {
        self.codec
    }
}

impl Default for CidHasher {
    fn default() -> Self {
        Self::SHA2_256
    }
}

impl From<HashCode> for CidHasher {
    fn from(hash: HashCode) -> Self {
        Self::new(Codec::Json, hash)
    }
}
