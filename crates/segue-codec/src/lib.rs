//! # segue-codec
//!
//! The codec seam of the Segue audio edit engine: a read-only container
//! probe, plus decoder/encoder/muxer adapters behind narrow queue-shaped
//! traits so the transcode driver never depends on a concrete codec API.
//!
//! Concrete adapters:
//! - [`SymphoniaDecoder`] - arbitrary container/codec input via symphonia
//! - [`PcmEncoder`] + [`WavMuxer`] - streaming uncompressed output (hound)
//! - [`FlacEncoder`] + [`FlacMuxer`] - compressed output (flacenc)

mod decode;
mod error;
mod flac;
mod pcm;
mod probe;
mod traits;

pub use decode::SymphoniaDecoder;
pub use error::{CodecError, Result};
pub use flac::{FlacEncoder, FlacMuxer};
pub use pcm::{PcmEncoder, WavMuxer};
pub use probe::probe;
pub use traits::{
    Decoder, DecoderEvent, Encoder, EncoderEvent, InputStatus, Muxer, PcmChunk, StreamConfig,
};
