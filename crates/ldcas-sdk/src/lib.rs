//! High-level API for ldcas.
//!
//! [`Engine`] composes the sealing pipeline, an object store and a pointer
//! store behind one explicitly configured value:
//!
//! ```no_run
//! use ldcas_sdk::{Engine, EngineConfig};
//! use ldcas_types::{Owner, Slug};
//!
//! let engine = Engine::open(EngineConfig::with_root("/var/lib/ldcas"))?;
//! let owner = Owner::parse("alice")?;
//! let slug = Slug::parse("hello")?;
//! let saved = engine.save_document(
//!     &owner,
//!     &slug,
//!     br#"{"@context":"https://schema.org","name":"Hello"}"#,
//! )?;
//! assert_eq!(engine.resolve_cid(&owner, &slug)?, saved.cid);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::{Engine, IntegrityReport, SavedDocument};
pub use error::{ErrorKind, SdkError, SdkResult};
