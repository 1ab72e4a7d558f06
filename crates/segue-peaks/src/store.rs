//! The peak cache store: in-memory entries keyed by source identity plus
//! optional sidecar files next to the audio.

use crate::sequence::PeakSequence;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// Sidecar path for a source file: the full file name with `.peaks`
/// appended, in the same directory.
pub fn sidecar_path(source: &Path) -> PathBuf {
    let mut name = OsString::from(source.as_os_str());
    name.push(".peaks");
    PathBuf::from(name)
}

/// Keyed store of extracted peak sequences.
///
/// An explicit object owned by whoever composes the engine, never a hidden
/// global; tests instantiate a fresh store per test. A lookup is a hit only
/// when the source's current modification time matches the entry exactly
/// (memory layer) or the sidecar is at least as new as the source (disk
/// layer). Sidecars that fail to parse are deleted and treated as misses.
pub struct PeakStore {
    memory: Mutex<HashMap<PathBuf, (SystemTime, PeakSequence)>>,
    sidecars: bool,
    in_flight: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PeakStore {
    /// Memory-only store, for tests and throwaway sessions.
    pub fn in_memory() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            sidecars: false,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Store that persists sequences to sidecar files next to each source.
    pub fn with_sidecars() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            sidecars: true,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a valid cached sequence for the source's current identity.
    pub fn lookup(&self, source: &Path) -> Option<PeakSequence> {
        let modified = fs::metadata(source).ok()?.modified().ok()?;

        if let Some((stored_time, sequence)) = self.memory.lock().get(source) {
            if *stored_time == modified {
                return Some(sequence.clone());
            }
        }

        if self.sidecars {
            if let Some(sequence) = self.load_sidecar(source, modified) {
                self.memory
                    .lock()
                    .insert(source.to_path_buf(), (modified, sequence.clone()));
                return Some(sequence);
            }
        }
        None
    }

    /// Record a freshly extracted sequence. Persistence failures are logged
    /// and swallowed: a missing cache entry only costs a re-extraction.
    pub fn store(&self, source: &Path, sequence: &PeakSequence) {
        let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) else {
            return;
        };

        if self.sidecars {
            if let Err(e) = self.write_sidecar(source, sequence) {
                log::warn!("failed to persist peak sidecar for {}: {e}", source.display());
            }
        }

        self.memory
            .lock()
            .insert(source.to_path_buf(), (modified, sequence.clone()));
    }

    /// Drop any cached entry for the source, both layers. Called by every
    /// in-place edit around its atomic rename.
    pub fn invalidate(&self, source: &Path) {
        self.memory.lock().remove(source);
        if self.sidecars {
            let _ = fs::remove_file(sidecar_path(source));
        }
    }

    /// Per-source lock serializing extraction: a second request for a
    /// source already being extracted blocks until the first finishes and
    /// then sees its cached result.
    ///
    /// Guards no extraction still holds are pruned here, so the map only
    /// ever tracks sources with an extraction in flight.
    pub(crate) fn extraction_guard(&self, source: &Path) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|_, guard| Arc::strong_count(guard) > 1);
        in_flight.entry(source.to_path_buf()).or_default().clone()
    }

    fn load_sidecar(&self, source: &Path, source_modified: SystemTime) -> Option<PeakSequence> {
        let path = sidecar_path(source);
        let meta = fs::metadata(&path).ok()?;
        let sidecar_modified = meta.modified().ok()?;
        if sidecar_modified < source_modified {
            // Source changed since extraction: the sidecar is stale.
            return None;
        }
        let data = fs::read(&path).ok()?;
        match PeakSequence::from_le_bytes(&data) {
            Some(sequence) => Some(sequence),
            None => {
                log::warn!("deleting corrupt peak sidecar {}", path.display());
                let _ = fs::remove_file(&path);
                None
            }
        }
    }

    fn write_sidecar(&self, source: &Path, sequence: &PeakSequence) -> std::io::Result<()> {
        let path = sidecar_path(source);
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&sequence.to_le_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}
