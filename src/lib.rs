//! # Segue - Streaming Audio Edit Engine
//!
//! Bounded-memory audio editing: decode, transform, encode and mux in one
//! streaming pass, with waveform peak extraction on the side.
//!
//! ## Architecture
//!
//! Segue is an umbrella crate that coordinates:
//! - **segue-core** - Edit primitives (cut sets, gain, mono mix, resampling, cancellation)
//! - **segue-codec** - The codec seam (probe, symphonia decode, FLAC/WAV encode and mux)
//! - **segue-peaks** - Waveform peak extraction and the sidecar peak cache
//! - **segue-engine** - Transcode, merge and normalization drivers, atomic write-back
//!
//! ## Quick Start
//!
//! ```ignore
//! use segue::prelude::*;
//!
//! // Cut the first second out of a 44.1 kHz take and lower it 6 dB.
//! let edit = EditParams::identity()
//!     .with_cuts(CutSet::single(0, 44_100)?)
//!     .with_gain(0.5);
//!
//! let cancel = CancelToken::new();
//! let stats = transcode(&source, &dest, &edit, OutputFormat::Flac, &cancel)?;
//! println!("wrote {} samples", stats.samples_out);
//! ```

/// Re-export of segue-core for direct access
pub use segue_core as core;

/// Re-export of segue-codec for direct access
pub use segue_codec as codec;

/// Re-export of segue-peaks for direct access
pub use segue_peaks as peaks;

/// Re-export of segue-engine for direct access
pub use segue_engine as engine;

// Edit primitives
pub use segue_core::{CancelToken, CutSet, EditRange, TrackFormat};

// Source inspection
pub use segue_codec::probe;

// Waveform peaks
pub use segue_peaks::{
    ExtractHandle, ExtractStatus, ExtractorConfig, PeakExtractor, PeakSequence, PeakStore,
};

// Drivers
pub use segue_engine::{
    measure_peak, merge, normalize, transcode, write_replacing, EditParams, EngineError,
    OutputFormat, TranscodeStats,
};

/// Commonly used types, in one import.
pub mod prelude {
    pub use segue_core::{CancelToken, CutSet, EditRange, TrackFormat};
    pub use segue_engine::{
        merge, normalize, transcode, write_replacing, EditParams, EngineError, OutputFormat,
        TranscodeStats,
    };
    pub use segue_peaks::{ExtractHandle, ExtractStatus, PeakExtractor, PeakSequence, PeakStore};
}
