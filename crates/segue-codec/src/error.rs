//! Error types for segue-codec

use std::io;
use thiserror::Error;

/// Codec and container error type
#[derive(Error, Debug)]
pub enum CodecError {
    /// Source has no track whose media type is audio
    #[error("no audio track in source")]
    NoAudioTrack,

    /// Source container cannot be opened or parsed
    #[error("source cannot be opened or parsed: {0}")]
    UnreadableSource(String),

    /// Decoder cannot be instantiated for the detected format
    #[error("decoder configuration failed: {0}")]
    DecoderConfig(String),

    /// Encoder cannot be instantiated for the target format
    #[error("encoder configuration failed: {0}")]
    EncoderConfig(String),

    /// Mid-stream decode failure
    #[error("decode error: {0}")]
    Decode(String),

    /// Mid-stream encode failure
    #[error("encode error: {0}")]
    Encode(String),

    /// I/O error during container operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Data-model invariant violation surfaced at the codec boundary
    #[error(transparent)]
    Format(#[from] segue_core::CoreError),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

// Convert hound's error at the API boundary, as with other external codecs.
impl From<hound::Error> for CodecError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::IoError(io) => CodecError::Io(io),
            other => CodecError::Encode(other.to_string()),
        }
    }
}
