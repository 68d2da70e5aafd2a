//! Atomic file output
//!
//! Every file is written to a temporary file in the destination directory
//! and renamed over the target only once fully written. A failed write drops
//! the temporary file and leaves the target untouched.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Write `bytes` to `path` via a temporary file and rename.
///
/// # Errors
/// IO errors, wrapped with the target path.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let wrap = |e: std::io::Error| Error::from(e).in_file(path);

    let mut file = NamedTempFile::new_in(dir).map_err(wrap)?;
    file.write_all(bytes).map_err(wrap)?;
    file.as_file().sync_all().map_err(wrap)?;
    file.persist(path).map_err(|e| wrap(e.error))?;

    tracing::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// `<file>.json` next to `path`, for the intermediate textual form.
#[must_use]
pub fn intermediate_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".json");
    PathBuf::from(name)
}

/// A fully encoded file waiting to be written.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

impl PendingFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Self {
        Self { path: path.into(), bytes }
    }

    /// Pretty JSON of `value`, placed at the intermediate path of `beside`.
    ///
    /// # Errors
    /// JSON serialization errors.
    pub fn json<T: Serialize + ?Sized>(beside: &Path, value: &T) -> Result<Self> {
        let json = serde_json::to_string_pretty(value)?;
        Ok(Self::new(intermediate_path(beside), json.into_bytes()))
    }
}

/// Write each pending file atomically, in order.
///
/// # Errors
/// The first IO error; files written before it stay in place.
pub fn write_pending(files: &[PendingFile]) -> Result<()> {
    for file in files {
        write_atomic(&file.path, &file.bytes)?;
    }
    Ok(())
}
