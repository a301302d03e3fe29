use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ldcas_canon::{CanonicalMode, SealConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_DOCUMENT_BYTES};
use ldcas_types::HashCode;

use crate::error::{SdkError, SdkResult};

/// Everything an [`Engine`](crate::Engine) needs, fixed at construction.
///
/// Loadable from TOML; every key is optional:
///
/// ```toml
/// root = "/var/lib/ldcas"
/// max-depth = 50
/// max-document-bytes = 16777216
/// canonical-mode = "auto"   # auto | plain | graph
/// hash = "sha2-256"         # sha2-256 | blake3
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Store root; objects live under `o/`, pointers under `u/`.
    pub root: PathBuf,
    pub max_depth: usize,
    pub max_document_bytes: usize,
    pub canonical_mode: CanonicalMode,
    /// Multihash for new CIDs. Changing it does not invalidate stored objects.
    pub hash: HashCode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".ldcas"),
            max_depth: DEFAULT_MAX_DEPTH,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            canonical_mode: CanonicalMode::Auto,
            hash: HashCode::Sha2_256,
        }
    }
}

impl EngineConfig {
    /// Defaults with the given store root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// The configuration as TOML.
    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Reject values no engine can run with.
    pub fn validate(&self) -> SdkResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(SdkError::Config("root must not be empty".into()));
        }
        if self.max_document_bytes == 0 {
            return Err(SdkError::Config("max-document-bytes must be positive".into()));
        }
        Ok(())
    }

    /// The sealing part of this configuration.
    pub fn seal_config(&self) -> SealConfig {
        SealConfig {
            max_depth: self.max_depth,
            max_document_bytes: self.max_document_bytes,
            canonical_mode: self.canonical_mode,
            hash: self.hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.root, PathBuf::from(".ldcas"));
        assert_eq!(c.max_depth, 50);
        assert_eq!(c.max_document_bytes, 16 * 1024 * 1024);
        assert_eq!(c.canonical_mode, CanonicalMode::Auto);
        assert_eq!(c.hash, HashCode::Sha2_256);
        assert_eq!(c.seal_config(), SealConfig::default());
    }

    #[test]
    fn parse_full_toml() {
        let c = EngineConfig::from_toml_str(
            r#"
            root = "/srv/ldcas"
            max-depth = 20
            max-document-bytes = 1024
            canonical-mode = "plain"
            hash = "blake3"
            "#,
        )
        .unwrap();
        assert_eq!(c.root, PathBuf::from("/srv/ldcas"));
        assert_eq!(c.max_depth, 20);
        assert_eq!(c.max_document_bytes, 1024);
        assert_eq!(c.canonical_mode, CanonicalMode::Plain);
        assert_eq!(c.hash, HashCode::Blake3);
    }

    #[test]
    fn missing_keys_take_defaults() {
        let c = EngineConfig::from_toml_str("root = \"data\"").unwrap();
        assert_eq!(c, EngineConfig::with_root("data"));
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(EngineConfig::from_toml_str("hash = \"md5\"").is_err());
        assert!(EngineConfig::from_toml_str("max-document-bytes = 0").is_err());
        assert!(EngineConfig::from_toml_str("root = \"\"").is_err());
        assert!(EngineConfig::from_toml_str("max-depth = \"deep\"").is_err());
    }

    #[test]
    fn toml_round_trip() {
        let c = EngineConfig {
            hash: HashCode::Blake3,
            canonical_mode: CanonicalMode::Graph,
            ..EngineConfig::with_root("/tmp/x")
        };
        let text = c.to_toml_string().unwrap();
        assert!(text.contains("canonical-mode = \"graph\""));
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ldcas.toml");
        fs::write(&path, "max-depth = 7\n").unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap().max_depth, 7);
        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(SdkError::Config(_))
        ));
    }
}
