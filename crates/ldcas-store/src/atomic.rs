//! Atomic file placement.
//!
//! Every write goes to a hidden temporary file in the destination directory
//! and is renamed into place only after the data is flushed to disk. The
//! temporary file is a [`tempfile::NamedTempFile`], so it is removed on every
//! early return or failed rename. Readers see either the old file, the new
//! file, or nothing.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

const TEMP_PREFIX: &str = ".tmp-";
const RETIRED_PREFIX: &str = ".retired-";

/// Write `bytes` to `path`, replacing any existing file.
pub fn write_replace(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = stage(path, bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write `bytes` to `path` only if nothing is there yet.
///
/// Returns `Ok(false)` and leaves the existing file untouched if `path`
/// already exists. Concurrent callers racing on the same path see exactly one
/// `Ok(true)`.
pub fn write_new(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    let tmp = stage(path, bytes)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

/// Move `path` out of sight in one rename.
///
/// Returns `None` if `path` does not exist. Otherwise the file now lives at a
/// hidden temporary name and is deleted when the returned handle is closed or
/// dropped.
pub fn retire(path: &Path) -> io::Result<Option<NamedTempFile>> {
    let dir = parent_of(path)?;
    let slot = Builder::new().prefix(RETIRED_PREFIX).tempfile_in(dir)?;
    match fs::rename(path, slot.path()) {
        Ok(()) => Ok(Some(slot)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Remove `path`, treating a missing file as success.
pub fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Whether a directory entry name belongs to an in-flight write or delete.
pub fn is_scratch_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) || name.starts_with(RETIRED_PREFIX)
}

fn stage(path: &Path, bytes: &[u8]) -> io::Result<NamedTempFile> {
    let dir = parent_of(path)?;
    fs::create_dir_all(dir)?;
    let mut tmp = Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn parent_of(path: &Path) -> io::Result<&Path> {
    path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })
}
