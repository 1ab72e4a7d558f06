//! The codec seam: decoders, encoders and muxers as host-controlled queue
//! state machines.
//!
//! Platform codec objects are opaque queues owned by a runtime the engine
//! does not control, so every adapter exposes the same narrow shape:
//! submit input, poll output with a bounded timeout, signal end-of-input
//! exactly once, release. The transcode driver depends only on these
//! traits; tests substitute in-memory fakes that delay or batch outputs to
//! exercise the end-of-stream ordering invariants.
//!
//! Software codecs resolve polls immediately; the timeout exists for
//! adapters that wrap asynchronous hardware queues, and bounds how long one
//! loop iteration may block on a stalled codec.

use crate::error::Result;
use segue_core::TrackFormat;
use std::time::Duration;

/// Output stream configuration, reported by an encoder once its output
/// format is known and consumed by the muxer when registering the track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

/// Result of offering input to a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputStatus {
    /// The decoder accepted (or internally skipped) one unit of input.
    Accepted,
    /// The source has no more input to offer.
    Exhausted,
}

/// A chunk of decoded PCM, interleaved when multi-channel.
#[derive(Debug, Clone)]
pub struct PcmChunk {
    pub samples: Vec<i16>,
    pub channels: u16,
}

/// One poll result from a decoder's output queue.
#[derive(Debug)]
pub enum DecoderEvent {
    Pcm(PcmChunk),
    /// Nothing ready within the poll timeout.
    Pending,
    /// All input has been decoded and drained. Reported once.
    EndOfStream,
}

/// One poll result from an encoder's output queue.
#[derive(Debug)]
pub enum EncoderEvent {
    /// Output format is known; the muxer can be started. Reported once,
    /// before any packet, and carries no payload to write.
    FormatReady(StreamConfig),
    /// An encoded packet to hand to the muxer verbatim.
    Packet(Vec<u8>),
    /// Nothing ready within the poll timeout.
    Pending,
    /// All submitted input has been encoded and drained. Reported once.
    EndOfStream,
}

/// Streaming audio decoder bound to one source track.
pub trait Decoder: Send {
    /// Format of the selected track, fixed at open time.
    fn format(&self) -> &TrackFormat;

    /// Offer the next unit of source input to the decoder.
    fn submit_input(&mut self) -> Result<InputStatus>;

    /// Tell the decoder no further input will arrive. Idempotent; the
    /// driver calls it exactly once.
    fn signal_end_of_input(&mut self);

    /// Poll the output queue, waiting at most `timeout`.
    fn poll_output(&mut self, timeout: Duration) -> Result<DecoderEvent>;

    /// Release underlying codec resources. Called on every exit path.
    fn release(&mut self) {}
}

/// Streaming audio encoder producing container-ready packets.
pub trait Encoder: Send {
    /// Submit a batch of mono samples for encoding.
    fn submit_input(&mut self, samples: &[i16]) -> Result<()>;

    /// Tell the encoder no further input will arrive. Must only be called
    /// after every transformed sample has been submitted.
    fn signal_end_of_input(&mut self);

    /// Poll the output queue, waiting at most `timeout`.
    fn poll_output(&mut self, timeout: Duration) -> Result<EncoderEvent>;

    /// Release underlying codec resources. Called on every exit path.
    fn release(&mut self) {}
}

/// Destination container writer.
pub trait Muxer: Send {
    /// Open the destination and register the track. Called once, when the
    /// encoder first reports its output format.
    fn start(&mut self, config: &StreamConfig) -> Result<()>;

    /// Append one encoded packet verbatim.
    fn write(&mut self, packet: &[u8]) -> Result<()>;

    /// Finalize the container. Called once after the encoder's
    /// end-of-stream.
    fn finish(&mut self) -> Result<()>;
}
