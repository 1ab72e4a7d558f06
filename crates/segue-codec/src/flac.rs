//! FLAC encoder and file muxer using flacenc.
//!
//! The compressed output path. flacenc encodes a complete stream in one
//! call, so this adapter accumulates submitted samples and emits the
//! encoded stream as packets once end-of-input is signaled; the driver in
//! front of it stays streaming and codec-agnostic either way.

use crate::error::{CodecError, Result};
use crate::traits::{Encoder, EncoderEvent, Muxer, StreamConfig};
use flacenc::bitsink::ByteSink;
use flacenc::component::BitRepr;
use flacenc::config::Encoder as EncoderConfig;
use flacenc::encode_with_fixed_block_size;
use flacenc::error::Verify;
use flacenc::source::MemSource;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Samples per FLAC block.
const BLOCK_SIZE: usize = 4096;

/// Size of the packets the encoded stream is sliced into.
const PACKET_BYTES: usize = 64 * 1024;

/// Mono 16-bit FLAC encoder behind the queue-shaped [`Encoder`] trait.
///
/// Input accumulates at its native 16-bit width; the widening flacenc
/// needs happens once, at encode time.
pub struct FlacEncoder {
    config: StreamConfig,
    samples: Vec<i16>,
    queue: VecDeque<Vec<u8>>,
    format_sent: bool,
    eos: bool,
    encoded: bool,
}

impl FlacEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            config: StreamConfig {
                sample_rate,
                channels,
                bits_per_sample: 16,
            },
            samples: Vec::new(),
            queue: VecDeque::new(),
            format_sent: false,
            eos: false,
            encoded: false,
        }
    }

    fn encode_stream(&mut self) -> Result<()> {
        let config = EncoderConfig::default()
            .into_verified()
            .map_err(|e| CodecError::EncoderConfig(format!("{e:?}")))?;

        let widened: Vec<i32> = std::mem::take(&mut self.samples)
            .into_iter()
            .map(i32::from)
            .collect();
        let source = MemSource::from_samples(
            &widened,
            self.config.channels as usize,
            16,
            self.config.sample_rate as usize,
        );

        let mut stream = encode_with_fixed_block_size(&config, source, BLOCK_SIZE)
            .map_err(|e| CodecError::Encode(format!("{e:?}")))?;

        // flacenc records a short final frame in STREAMINFO's min block
        // size, but the FLAC spec excludes the last block from that field;
        // strict decoders (symphonia) then treat the stream as
        // variable-blocksize and reject its fixed-blocksize frames.
        stream
            .stream_info_mut()
            .set_block_sizes(BLOCK_SIZE, BLOCK_SIZE)
            .map_err(|e| CodecError::Encode(format!("{e:?}")))?;

        let mut sink = ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|e| CodecError::Encode(format!("{e:?}")))?;

        let bytes = sink.into_inner();
        log::debug!(
            "flac: encoded {} samples into {} bytes",
            widened.len(),
            bytes.len()
        );
        for chunk in bytes.chunks(PACKET_BYTES) {
            self.queue.push_back(chunk.to_vec());
        }
        Ok(())
    }
}

impl Encoder for FlacEncoder {
    fn submit_input(&mut self, samples: &[i16]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn signal_end_of_input(&mut self) {
        self.eos = true;
    }

    fn poll_output(&mut self, _timeout: Duration) -> Result<EncoderEvent> {
        if !self.format_sent {
            self.format_sent = true;
            return Ok(EncoderEvent::FormatReady(self.config.clone()));
        }
        if self.eos && !self.encoded {
            self.encoded = true;
            self.encode_stream()?;
        }
        if let Some(packet) = self.queue.pop_front() {
            return Ok(EncoderEvent::Packet(packet));
        }
        if self.eos {
            Ok(EncoderEvent::EndOfStream)
        } else {
            Ok(EncoderEvent::Pending)
        }
    }

    fn release(&mut self) {
        self.samples.clear();
        self.queue.clear();
    }
}

/// FLAC destination writer. The encoder's packets already carry the
/// complete container framing, so this is a plain ordered file sink.
pub struct FlacMuxer {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FlacMuxer {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: None,
        }
    }
}

impl Muxer for FlacMuxer {
    fn start(&mut self, _config: &StreamConfig) -> Result<()> {
        self.writer = Some(BufWriter::new(File::create(&self.path)?));
        Ok(())
    }

    fn write(&mut self, packet: &[u8]) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(packet)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
