//! PCM passthrough encoder and WAV container muxer.
//!
//! The streaming, uncompressed output path. The encoder turns submitted
//! sample batches into little-endian byte packets immediately, so the whole
//! pipeline stays bounded; the muxer owns the WAV container framing via
//! hound.

use crate::error::Result;
use crate::traits::{Encoder, EncoderEvent, Muxer, StreamConfig};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Identity "codec": 16-bit PCM samples become little-endian bytes.
pub struct PcmEncoder {
    config: StreamConfig,
    queue: VecDeque<Vec<u8>>,
    format_sent: bool,
    eos: bool,
}

impl PcmEncoder {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            config: StreamConfig {
                sample_rate,
                channels,
                bits_per_sample: 16,
            },
            queue: VecDeque::new(),
            format_sent: false,
            eos: false,
        }
    }
}

impl Encoder for PcmEncoder {
    fn submit_input(&mut self, samples: &[i16]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut packet = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            packet.extend_from_slice(&sample.to_le_bytes());
        }
        self.queue.push_back(packet);
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
        self.queue.clear();
    }
}

/// WAV destination writer. Packets are the PCM byte stream produced by
/// [`PcmEncoder`]; the muxer reassembles samples and lets hound handle the
/// header and finalization.
pub struct WavMuxer {
    path: PathBuf,
    writer: Option<hound::WavWriter<BufWriter<File>>>,
}

impl WavMuxer {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            writer: None,
        }
    }
}

impl Muxer for WavMuxer {
    fn start(&mut self, config: &StreamConfig) -> Result<()> {
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        self.writer = Some(hound::WavWriter::create(&self.path, spec)?);
        Ok(())
    }

    fn write(&mut self, packet: &[u8]) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            for bytes in packet.chunks_exact(2) {
                let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
                writer.write_sample(sample)?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}
