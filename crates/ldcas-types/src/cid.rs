use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Multibase prefix for RFC 4648 base32, lowercase, unpadded.
const MULTIBASE_BASE32: char = 'b';

/// CID version carried in every identifier we produce.
const CID_VERSION: u64 = 1;

/// RFC 4648 base32 alphabet, lowercase.
const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Multicodec tag describing how the addressed bytes are encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Codec {
    /// Canonical JSON bytes (multicodec `json`, 0x0200).
    Json,
}

impl Codec {
    /// The multicodec table code.
    pub const fn code(self) -> u64 {
        match self {
            Self::Json => 0x0200,
        }
    }

    /// Look up a codec by its multicodec table code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0x0200 => Some(Self::Json),
            _ => None,
        }
    }
}

/// Multihash function code for the digest inside a CID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashCode {
    /// SHA2-256 (multihash 0x12).
    #[default]
    #[serde(rename = "sha2-256")]
    Sha2_256,
    /// BLAKE3 with a 32-byte output (multihash 0x1e).
    #[serde(rename = "blake3")]
    Blake3,
}

impl HashCode {
    /// The multihash table code.
    pub const fn code(self) -> u64 {
        match self {
            Self::Sha2_256 => 0x12,
            Self::Blake3 => 0x1e,
        }
    }

    /// Digest length in bytes.
    pub const fn digest_len(self) -> usize {
        32
    }

    /// Look up a hash function by its multihash table code.
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0x12 => Some(Self::Sha2_256),
            0x1e => Some(Self::Blake3),
            _ => None,
        }
    }
}

impl fmt::Display for HashCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha2_256 => write!(f, "sha2-256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Content identifier for a sealed document.
///
/// A `Cid` is the printable form `b` + base32lower(version ‖ codec ‖
/// multihash code ‖ digest length ‖ digest), with every header field encoded
/// as an unsigned varint. Identical canonical bytes always produce the same
/// `Cid`. The textual form doubles as the on-disk file stem, so a `Cid` can
/// only be built through [`Cid::from_digest`] or [`Cid::parse`], both of which
/// guarantee it contains nothing but the base32 alphabet.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cid(String);

impl Cid {
    /// Frame a digest into a CIDv1 string.
    pub fn from_digest(codec: Codec, hash: HashCode, digest: &[u8]) -> Result<Self, TypeError> {
        if digest.len() != hash.digest_len() {
            return Err(TypeError::InvalidLength {
                expected: hash.digest_len(),
                actual: digest.len(),
            });
        }
        let mut bytes = Vec::with_capacity(digest.len() + 8);
        write_varint(CID_VERSION, &mut bytes);
        write_varint(codec.code(), &mut bytes);
        write_varint(hash.code(), &mut bytes);
        write_varint(digest.len() as u64, &mut bytes);
        bytes.extend_from_slice(digest);

        let mut text = String::with_capacity(1 + (bytes.len() * 8).div_ceil(5));
        text.push(MULTIBASE_BASE32);
        text.push_str(&base32_encode(&bytes));
        Ok(Self(text))
    }

    /// Parse and validate a CID string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        decode_header(s)?;
        Ok(Self(s.to_string()))
    }

    /// The printable CID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The multicodec tag.
    pub fn codec(&self) -> Codec {
        // Invariant: self.0 was validated at construction.
        self.header().0
    }

    /// The multihash function.
    pub fn hash_code(&self) -> HashCode {
        self.header().1
    }

    /// The raw digest bytes.
    pub fn digest(&self) -> Vec<u8> {
        self.header().2
    }

    /// Short form for log lines (first 16 characters).
    pub fn short(&self) -> &str {
        let end = self.0.len().min(16);
        &self.0[..end]
    }

    fn header(&self) -> (Codec, HashCode, Vec<u8>) {
        match decode_header(&self.0) {
            Ok(parts) => parts,
            Err(_) => unreachable!("Cid invariant violated: {}", self.0),
        }
    }
}

fn decode_header(s: &str) -> Result<(Codec, HashCode, Vec<u8>), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidCid {
        cid: s.to_string(),
        reason: reason.to_string(),
    };

    let body = s
        .strip_prefix(MULTIBASE_BASE32)
        .ok_or_else(|| invalid("expected multibase prefix 'b'"))?;
    let bytes = base32_decode(body).ok_or_else(|| invalid("not lowercase base32"))?;

    let mut rest = bytes.as_slice();
    let mut next = |field: &str| -> Result<u64, TypeError> {
        let (value, used) = read_varint(rest).ok_or_else(|| invalid(&format!("truncated {field}")))?;
        rest = &rest[used..];
        Ok(value)
    };

    let version = next("version")?;
    if version != CID_VERSION {
        return Err(invalid(&format!("unsupported version {version}")));
    }
    let codec = next("codec")?;
    let codec = Codec::from_code(codec).ok_or_else(|| invalid(&format!("unknown codec 0x{codec:x}")))?;
    let hash = next("multihash code")?;
    let hash =
        HashCode::from_code(hash).ok_or_else(|| invalid(&format!("unknown multihash 0x{hash:x}")))?;
    let len = next("digest length")? as usize;
    if len != hash.digest_len() || rest.len() != len {
        return Err(invalid("digest length mismatch"));
    }
    Ok((codec, hash, rest.to_vec()))
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({})", self.short())
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cid {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        decode_header(&value)?;
        Ok(Self(value))
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

impl AsRef<str> for Cid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(bytes: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    for (i, &byte) in bytes.iter().enumerate().take(9) {
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Some((value, i + 1));
        }
    }
    None
}

// RFC 4648 base32 (lowercase, no padding)
fn base32_encode(data: &[u8]) -> String {
    let mut result = String::new();
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for &byte in data {
        buffer = (buffer << 8) | u64::from(byte);
        bits_in_buffer += 8;

        while bits_in_buffer >= 5 {
            bits_in_buffer -= 5;
            let index = ((buffer >> bits_in_buffer) & 0x1f) as usize;
            result.push(BASE32_ALPHABET[index] as char);
        }
    }

    if bits_in_buffer > 0 {
        let index = ((buffer << (5 - bits_in_buffer)) & 0x1f) as usize;
        result.push(BASE32_ALPHABET[index] as char);
    }

    result
}

fn base32_decode(text: &str) -> Option<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits_in_buffer = 0;

    for ch in text.bytes() {
        let value = BASE32_ALPHABET.iter().position(|&c| c == ch)? as u64;
        buffer = (buffer << 5) | value;
        bits_in_buffer += 5;
        if bits_in_buffer >= 8 {
            bits_in_buffer -= 8;
            result.push((buffer >> bits_in_buffer) as u8);
        }
    }

    // Leftover bits must be zero padding from the encoder.
    if bits_in_buffer >= 5 || buffer & ((1 << bits_in_buffer) - 1) != 0 {
        return None;
    }
    Some(result)
}
