//! Source track format metadata.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Format of the audio track selected from a source container.
///
/// Derived once when a source is opened and immutable for the lifetime of a
/// transcode or extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Track duration in milliseconds (0 when the container does not declare it)
    pub duration_ms: u64,
    /// Short codec identifier as reported by the container (e.g. "flac", "mp3")
    pub codec: String,
}

impl TrackFormat {
    pub fn new(sample_rate: u32, channels: u16, duration_ms: u64, codec: String) -> Result<Self> {
        let format = Self {
            sample_rate,
            channels,
            duration_ms,
            codec,
        };
        format.validate()?;
        Ok(format)
    }

    /// Check the invariants every engine operation relies on.
    ///
    /// Sample rate must be positive and only mono and stereo sources are
    /// supported.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(CoreError::InvalidFormat("sample rate is zero".into()));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(CoreError::InvalidFormat(format!(
                "unsupported channel count {} (mono or stereo only)",
                self.channels
            )));
        }
        Ok(())
    }

    /// Duration in whole seconds, rounded down.
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}
