//! Foundation types for ldcas.
//!
//! This crate provides the identifier, naming, and temporal types shared by
//! every other ldcas crate.
//!
//! # Key Types
//!
//! - [`Cid`]: Content identifier (multibase + multicodec + multihash framing)
//! - [`Codec`] / [`HashCode`]: The multicodec and multihash tags a CID carries
//! - [`Owner`] / [`Slug`]: Validated path-safe names for named pointers
//! - [`Timestamp`]: UTC wall-clock instant recorded in pointer history

pub mod cid;
pub mod error;
pub mod names;
pub mod time;

pub use cid::{Cid, Codec, HashCode};
pub use error::TypeError;
pub use names::{validate_owner, validate_slug, Owner, Slug};
pub use time::Timestamp;
