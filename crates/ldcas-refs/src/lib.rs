//! Named pointers for ldcas.
//!
//! A named pointer maps `(owner, slug)` to the CID of the document most
//! recently saved under that slug. Pointers are the only mutable state in the
//! engine; the objects they point at never change. Every update appends the
//! new CID to the slug's history, analogous to a git reflog.
//!
//! # Modules
//!
//! - [`error`]: error types for pointer operations
//! - [`types`]: [`PointerKey`] and [`HistoryEntry`]
//! - [`traits`]: the [`PointerStore`] trait
//! - [`history`]: the lazy, restartable [`History`] reader
//! - [`fs`]: [`FsPointerStore`] under `{root}/u/`
//! - [`memory`]: [`InMemoryPointerStore`] for tests

pub mod error;
pub mod fs;
pub mod history;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::{RefError, RefResult};
pub use fs::FsPointerStore;
pub use history::{History, HistoryIter};
pub use memory::InMemoryPointerStore;
pub use traits::PointerStore;
pub use types::{HistoryEntry, PointerKey};
