//! Error types for segue-engine

use segue_peaks::PeakError;
use thiserror::Error;

/// Engine operation error type
#[derive(Error, Debug)]
pub enum EngineError {
    /// Probe, decode, encode or mux failure from the codec layer
    #[error(transparent)]
    Codec(#[from] segue_codec::CodecError),

    /// Invalid edit parameters (ranges, gain)
    #[error(transparent)]
    InvalidEdit(#[from] segue_core::CoreError),

    /// I/O error on the source or destination
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Cooperative cancellation observed. A normal outcome, not a failure.
    #[error("operation cancelled")]
    Cancelled,

    /// A merge had no source it could open.
    #[error("no valid sources to merge")]
    NoValidSources,

    /// Mid-pass failure that is not attributable to one codec call
    #[error("transcode failed: {0}")]
    Transcode(String),
}

impl From<PeakError> for EngineError {
    fn from(e: PeakError) -> Self {
        match e {
            PeakError::Cancelled => EngineError::Cancelled,
            PeakError::Codec(codec) => EngineError::Codec(codec),
            PeakError::Io(io) => EngineError::Io(io),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
