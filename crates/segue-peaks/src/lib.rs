//! Waveform peak extraction and its persistent cache.
//!
//! A peak sequence summarizes a source as one normalized maximum per
//! fixed-duration window, suitable for drawing a waveform without decoding
//! the audio again. [`PeakExtractor`] streams a source through the codec
//! layer once, delivering peaks in throttled chunks; [`PeakStore`] caches
//! the result in memory and optionally in `.peaks` sidecar files validated
//! against the source's modification time; [`ExtractHandle`] runs an
//! extraction on a background thread for polling consumers.

mod error;
mod extract;
mod handle;
mod sequence;
mod store;

pub use error::{PeakError, Result};
pub use extract::{ExtractorConfig, PeakExtractor};
pub use handle::{ExtractHandle, ExtractStatus};
pub use sequence::PeakSequence;
pub use store::{sidecar_path, PeakStore};
