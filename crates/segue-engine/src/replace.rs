//! Atomic in-place replacement of an existing source.
//!
//! Edits that rewrite a file the user already has (cut, gain, normalize)
//! must never leave a half-written file behind: the job writes into a
//! sibling temporary file and an atomic rename swaps it in only on success.
//! The destination's peak cache entry is invalidated so the next waveform
//! request re-extracts.

use crate::error::{EngineError, Result};
use segue_peaks::PeakStore;
use std::path::Path;

/// Run `job` against a temporary path in `path`'s directory, then atomically
/// rename the result over `path`.
///
/// On any error the temporary file is removed and the original is left
/// untouched. On success the peak cache entry for `path` is invalidated.
pub fn write_replacing<F>(path: &Path, store: &PeakStore, job: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or_else(|| Path::new(".")))?;

    job(tmp.path())?;

    tmp.persist(path).map_err(|e| EngineError::Io(e.error))?;
    store.invalidate(path);
    log::debug!("replaced {} atomically", path.display());
    Ok(())
}
