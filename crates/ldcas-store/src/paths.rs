//! Path construction confined to a storage root.
//!
//! Names reaching this module have usually been validated already (CIDs by
//! [`Cid::parse`](ldcas_types::Cid::parse), owners and slugs by
//! [`validate_owner`](ldcas_types::validate_owner)). The checks here hold
//! independently of that.

use std::path::{Component, Path, PathBuf};

use crate::error::{StoreError, StoreResult};

/// Join single-component names onto `root`, refusing anything that could
/// resolve outside it.
///
/// Each component must be non-empty, must not be `.` or `..`, and must not
/// contain a path separator or control character.
pub fn confined_join(root: &Path, components: &[&str]) -> StoreResult<PathBuf> {
    let mut path = root.to_path_buf();
    for component in components {
        check_component(root, component)?;
        path.push(component);
    }
    if !path.starts_with(root) {
        return Err(invalid(root, &path.to_string_lossy(), "escapes the store root"));
    }
    Ok(path)
}

fn check_component(root: &Path, component: &str) -> StoreResult<()> {
    if component.is_empty() {
        return Err(invalid(root, component, "empty"));
    }
    if component.contains(['/', '\\']) {
        return Err(invalid(root, component, "contains a path separator"));
    }
    if component.chars().any(char::is_control) {
        return Err(invalid(root, component, "contains a control character"));
    }
    let mut parts = Path::new(component).components();
    match (parts.next(), parts.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid(root, component, "not a plain file name")),
    }
}

fn invalid(root: &Path, component: &str, reason: &'static str) -> StoreError {
    StoreError::InvalidPath {
        root: root.to_path_buf(),
        component: component.to_string(),
        reason,
    }
}
