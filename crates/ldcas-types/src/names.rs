//! Owner and slug names for named pointers.
//!
//! Both names become single path components under the store root
//! (`u/{owner}/g/{slug}`), so they follow the same conservative rules:
//! - Must be non-empty and at most 128 bytes
//! - Must not contain `/`, `\`, whitespace, control characters, `:`, `*`, `?`
//! - Must not be `.` or `..` and must not start with `.`
//! - Must not end with `.lock`
//!
//! Slugs additionally must not start with `_`, which is reserved for
//! bookkeeping files such as `_history.jsonl`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Maximum length of an owner or slug, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

fn validate_component(kind: &'static str, name: &str) -> Result<(), TypeError> {
    let reject = |reason: String| {
        Err(TypeError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("must not be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return reject(format!("longer than {MAX_NAME_LEN} bytes"));
    }
    if let Some(ch) = name.chars().find(|c| c.is_control() || c.is_whitespace()) {
        return reject(format!("contains whitespace or control character {ch:?}"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return reject(format!("contains forbidden character {ch:?}"));
    }
    if name.starts_with('.') {
        return reject("must not start with '.'".into());
    }
    if name.ends_with(".lock") {
        return reject("must not end with '.lock'".into());
    }
    Ok(())
}

/// Validate an owner name.
///
/// ```
/// use ldcas_types::validate_owner;
///
/// assert!(validate_owner("alice").is_ok());
/// assert!(validate_owner("..").is_err());
/// assert!(validate_owner("a/b").is_err());
/// ```
pub fn validate_owner(name: &str) -> Result<(), TypeError> {
    validate_component("owner", name)
}

/// Validate a slug. Same rules as owners, and must not start with `_`.
pub fn validate_slug(name: &str) -> Result<(), TypeError> {
    validate_component("slug", name)?;
    if name.starts_with('_') {
        return Err(TypeError::InvalidName {
            kind: "slug",
            name: name.to_string(),
            reason: "must not start with '_'".into(),
        });
    }
    Ok(())
}

macro_rules! name_type {
    ($name:ident, $validate:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse a validated name.
            pub fn parse(value: impl Into<String>) -> Result<Self, TypeError> {
                let value = value.into();
                $validate(&value)?;
                Ok(Self(value))
            }

            /// The name as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type!(Owner, validate_owner, "The user that owns a set of named pointers.");
name_type!(Slug, validate_slug, "The per-owner name of a mutable document pointer.");
