//! Error types for segue-peaks

use thiserror::Error;

/// Peak extraction error type
#[derive(Error, Debug)]
pub enum PeakError {
    /// Probe or decode failure from the codec layer
    #[error(transparent)]
    Codec(#[from] segue_codec::CodecError),

    /// I/O error on the source or sidecar
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation observed
    #[error("extraction cancelled")]
    Cancelled,
}

/// Result type for peak operations
pub type Result<T> = std::result::Result<T, PeakError>;
