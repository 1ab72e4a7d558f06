//! Symphonia-backed decoder adapter.

use crate::error::{CodecError, Result};
use crate::probe::{open_format, select_track};
use crate::traits::{Decoder, DecoderEvent, InputStatus, PcmChunk};
use segue_core::TrackFormat;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatReader, Packet};

/// Decoder for any container/codec symphonia can read, exposed through the
/// queue-shaped [`Decoder`] trait.
///
/// `submit_input` pulls the next packet of the selected track from the
/// container into the input queue; `poll_output` decodes queued packets
/// into interleaved 16-bit PCM. Corrupt packets are skipped with a warning,
/// matching symphonia's recoverable-error contract.
pub struct SymphoniaDecoder {
    format: TrackFormat,
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn symphonia::core::codecs::Decoder>,
    track_id: u32,
    pending: VecDeque<Packet>,
    input_exhausted: bool,
    eos_signaled: bool,
}

impl SymphoniaDecoder {
    /// Open a source, select its first audio track and configure a decoder
    /// for the track's codec.
    pub fn open(path: &Path) -> Result<Self> {
        let reader = open_format(path)?;
        let (track_id, format) = select_track(reader.as_ref())?;

        let params = reader
            .tracks()
            .iter()
            .find(|t| t.id == track_id)
            .map(|t| t.codec_params.clone())
            .ok_or(CodecError::NoAudioTrack)?;

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecoderConfig(e.to_string()))?;

        Ok(Self {
            format,
            reader,
            decoder,
            track_id,
            pending: VecDeque::new(),
            input_exhausted: false,
            eos_signaled: false,
        })
    }
}

impl Decoder for SymphoniaDecoder {
    fn format(&self) -> &TrackFormat {
        &self.format
    }

    fn submit_input(&mut self) -> Result<InputStatus> {
        if self.input_exhausted {
            return Ok(InputStatus::Exhausted);
        }
        loop {
            match self.reader.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == self.track_id {
                        self.pending.push_back(packet);
                        return Ok(InputStatus::Accepted);
                    }
                    // Packets of other tracks are discarded; keep pulling.
                }
                // Symphonia reports a clean end of the container as an I/O
                // error; a chained-stream reset also means this track is
                // done.
                Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::ResetRequired) => {
                    self.input_exhausted = true;
                    return Ok(InputStatus::Exhausted);
                }
                Err(e) => return Err(CodecError::Decode(e.to_string())),
            }
        }
    }

    fn signal_end_of_input(&mut self) {
        self.eos_signaled = true;
    }

    fn poll_output(&mut self, _timeout: Duration) -> Result<DecoderEvent> {
        while let Some(packet) = self.pending.pop_front() {
            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    return Ok(DecoderEvent::Pcm(PcmChunk {
                        samples: buf.samples().to_vec(),
                        channels: spec.channels.count() as u16,
                    }));
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("skipping undecodable packet: {e}");
                    continue;
                }
                Err(e) => return Err(CodecError::Decode(e.to_string())),
            }
        }
        if self.eos_signaled {
            Ok(DecoderEvent::EndOfStream)
        } else {
            Ok(DecoderEvent::Pending)
        }
    }

    fn release(&mut self) {
        self.pending.clear();
    }
}
