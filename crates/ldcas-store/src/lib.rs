//! Content-addressed object storage for ldcas.
//!
//! Every sealed document is stored as an immutable object keyed by its
//! [`Cid`](ldcas_types::Cid): the original bytes, the canonical bytes, and an
//! optional detached signature.
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`FsObjectStore`]: files under `{root}/o/`
//! - [`InMemoryObjectStore`]: `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written. A second save of the same CID is a
//!    no-op, and never overwrites the first.
//! 2. Same CID with different canonical bytes is an integrity error.
//! 3. Every file lands through [`atomic`]: readers never see partial files.
//! 4. Every path is built through [`paths::confined_join`] and cannot leave
//!    the store root.
//! 5. The store never interprets document contents and never checks ownership.

pub mod atomic;
pub mod error;
pub mod fs;
pub mod lock;
pub mod memory;
pub mod object;
pub mod paths;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsObjectStore;
pub use lock::LockArena;
pub use memory::InMemoryObjectStore;
pub use object::{ObjectRecord, SaveOutcome, SignatureRecord};
pub use paths::confined_join;
pub use traits::ObjectStore;
