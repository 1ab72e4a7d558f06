//! Edit parameters, output formats and pass statistics.

use crate::error::Result;
use segue_codec::{Encoder, FlacEncoder, FlacMuxer, Muxer, PcmEncoder, WavMuxer};
use segue_core::CutSet;
use std::path::Path;
use std::time::Duration;

/// Bounded wait per codec queue poll. Software codecs resolve immediately;
/// a stalled codec makes the loop spin at this interval instead of
/// blocking, so cancellation stays responsive.
pub(crate) const POLL_TIMEOUT: Duration = Duration::from_millis(2);

/// Transformed samples per encoder submission.
pub(crate) const BATCH_CAPACITY: usize = 4096;

/// The edit to apply during a transcode pass.
///
/// Cut ranges are expressed in original (uncut) mono sample indices; use
/// [`CutSet::compound`] to fold a selection made against an already-cut
/// timeline into original indices. Gain is a linear factor applied after
/// cutting.
#[derive(Debug, Clone)]
pub struct EditParams {
    pub cuts: CutSet,
    pub gain: f32,
}

impl Default for EditParams {
    fn default() -> Self {
        Self {
            cuts: CutSet::empty(),
            gain: 1.0,
        }
    }
}

impl EditParams {
    /// The identity edit: no cuts, unity gain.
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_cuts(mut self, cuts: CutSet) -> Self {
        self.cuts = cuts;
        self
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }
}

/// Destination encoding for a transcode or merge pass.
///
/// Output is always mono 16-bit at the source sample rate; FLAC uses the
/// encoder's default compression with 4096-sample blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Flac,
    Wav,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Flac => "flac",
            OutputFormat::Wav => "wav",
        }
    }

    /// Build the encoder and muxer pair for this format.
    pub(crate) fn build(
        &self,
        sample_rate: u32,
        dest: &Path,
    ) -> Result<(Box<dyn Encoder>, Box<dyn Muxer>)> {
        Ok(match self {
            OutputFormat::Flac => (
                Box::new(FlacEncoder::new(sample_rate, 1)),
                Box::new(FlacMuxer::new(dest)),
            ),
            OutputFormat::Wav => (
                Box::new(PcmEncoder::new(sample_rate, 1)),
                Box::new(WavMuxer::new(dest)),
            ),
        })
    }
}

/// What a completed pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscodeStats {
    /// Mono samples decoded from the source(s), post channel mix.
    pub samples_in: u64,
    /// Mono samples submitted to the encoder after the transform pipeline.
    pub samples_out: u64,
    /// Encoded packets written to the destination container.
    pub packets_written: u64,
}
