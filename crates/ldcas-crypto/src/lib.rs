//! Cryptographic primitives for ldcas.
//!
//! Provides CID derivation over canonical bytes (SHA2-256 or BLAKE3 digests
//! framed as multihash + multicodec + multibase) and Ed25519 signing and
//! verification of CID strings.
//!
//! All crypto operations wrap established libraries; there is no custom cryptography.

pub mod hasher;
pub mod signer;

pub use hasher::CidHasher;
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
