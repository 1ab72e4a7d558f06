//! The merge driver: concatenate several sources into one destination.
//!
//! One encoder+muxer session spans every source, so the output is a single
//! continuous stream; the encoder's end-of-input is deferred until the last
//! source has drained. The first source that opens fixes the output sample
//! rate and later sources are resampled onto it.

use crate::error::{EngineError, Result};
use crate::params::{OutputFormat, TranscodeStats, BATCH_CAPACITY, POLL_TIMEOUT};
use segue_codec::{
    Decoder, DecoderEvent, Encoder, EncoderEvent, InputStatus, Muxer, SymphoniaDecoder,
};
use segue_core::{CancelToken, LinearResampler, MonoMix};
use std::path::Path;

/// Merge `sources` in order into `dest`.
///
/// Sources that fail to open are skipped with a warning rather than
/// aborting the merge; if no source contributes,
/// [`EngineError::NoValidSources`] is returned and the destination is not
/// created.
pub fn merge<P: AsRef<Path>>(
    sources: &[P],
    dest: &Path,
    output: OutputFormat,
    cancel: &CancelToken,
) -> Result<TranscodeStats> {
    let mut session: Option<EncodeSession> = None;
    let mut target_rate = 0u32;

    for source in sources {
        let source = source.as_ref();
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let mut decoder = match SymphoniaDecoder::open(source) {
            Ok(decoder) => decoder,
            Err(e) => {
                log::warn!("skipping unreadable merge source {}: {e}", source.display());
                continue;
            }
        };

        if session.is_none() {
            target_rate = decoder.format().sample_rate;
            match EncodeSession::new(output, target_rate, dest) {
                Ok(s) => session = Some(s),
                Err(e) => {
                    decoder.release();
                    return Err(e);
                }
            }
            log::info!(
                "merging {} sources into {} at {} Hz",
                sources.len(),
                dest.display(),
                target_rate
            );
        }

        // First source sees an identity resampler.
        let mut resampler = LinearResampler::new(decoder.format().sample_rate, target_rate);
        let drained = drain_source(
            &mut decoder,
            &mut resampler,
            session.as_mut().expect("BUG: session created above"),
            cancel,
        );
        decoder.release();
        drained?;
    }

    match session {
        Some(mut session) => session.finish(cancel),
        None => Err(EngineError::NoValidSources),
    }
}

/// Decode one source to completion, feeding mixed (and resampled) samples
/// into the shared session. Does not touch the encoder's end-of-input.
fn drain_source(
    decoder: &mut dyn Decoder,
    resampler: &mut LinearResampler,
    session: &mut EncodeSession,
    cancel: &CancelToken,
) -> Result<()> {
    let mut mix = MonoMix::new(decoder.format().channels);
    let mut resampled = Vec::new();
    let mut input_done = false;

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if !input_done && matches!(decoder.submit_input()?, InputStatus::Exhausted) {
            decoder.signal_end_of_input();
            input_done = true;
        }
        match decoder.poll_output(POLL_TIMEOUT)? {
            DecoderEvent::Pcm(chunk) => {
                for &raw in &chunk.samples {
                    let Some(mono) = mix.push(raw) else { continue };
                    session.stats.samples_in += 1;
                    resampled.clear();
                    resampler.push(mono, &mut resampled);
                    for &sample in &resampled {
                        session.push(sample)?;
                    }
                }
            }
            DecoderEvent::Pending => {}
            DecoderEvent::EndOfStream => return Ok(()),
        }
        // Keep the encoder queue drained while decoding.
        session.pump()?;
    }
}

/// The shared encoder+muxer half of a merge.
struct EncodeSession {
    encoder: Box<dyn Encoder>,
    muxer: Box<dyn Muxer>,
    batch: Vec<i16>,
    muxer_started: bool,
    stats: TranscodeStats,
}

impl EncodeSession {
    fn new(output: OutputFormat, sample_rate: u32, dest: &Path) -> Result<Self> {
        let (encoder, muxer) = output.build(sample_rate, dest)?;
        Ok(Self {
            encoder,
            muxer,
            batch: Vec::with_capacity(BATCH_CAPACITY),
            muxer_started: false,
            stats: TranscodeStats::default(),
        })
    }

    fn push(&mut self, sample: i16) -> Result<()> {
        self.batch.push(sample);
        self.stats.samples_out += 1;
        if self.batch.len() == BATCH_CAPACITY {
            self.encoder.submit_input(&self.batch)?;
            self.batch.clear();
        }
        Ok(())
    }

    /// Poll the encoder once; returns true on its end-of-stream.
    fn pump(&mut self) -> Result<bool> {
        match self.encoder.poll_output(POLL_TIMEOUT)? {
            EncoderEvent::FormatReady(config) => {
                self.muxer.start(&config)?;
                self.muxer_started = true;
                Ok(false)
            }
            EncoderEvent::Packet(packet) => {
                if !self.muxer_started {
                    return Err(EngineError::Transcode(
                        "encoder produced a packet before reporting its format".into(),
                    ));
                }
                self.muxer.write(&packet)?;
                self.stats.packets_written += 1;
                Ok(false)
            }
            EncoderEvent::Pending => Ok(false),
            EncoderEvent::EndOfStream => Ok(true),
        }
    }

    /// Flush the tail batch, signal end-of-input and drain to completion.
    fn finish(&mut self, cancel: &CancelToken) -> Result<TranscodeStats> {
        if !self.batch.is_empty() {
            self.encoder.submit_input(&self.batch)?;
            self.batch.clear();
        }
        self.encoder.signal_end_of_input();
        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            if self.pump()? {
                self.muxer.finish()?;
                return Ok(self.stats.clone());
            }
        }
    }
}

impl Drop for EncodeSession {
    fn drop(&mut self) {
        self.encoder.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_wav(dir: &tempfile::TempDir, name: &str, sample_rate: u32, samples: &[i16]) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn read_wav(path: &Path) -> (u32, Vec<i16>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let rate = reader.spec().sample_rate;
        let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        (rate, samples)
    }

    #[test]
    fn concatenates_sources_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_wav(&dir, "a.wav", 8_000, &vec![100i16; 1_000]);
        let b = write_wav(&dir, "b.wav", 8_000, &vec![-200i16; 500]);
        let dest = dir.path().join("merged.wav");

        let stats = merge(&[&a, &b], &dest, OutputFormat::Wav, &CancelToken::new()).unwrap();
        assert_eq!(stats.samples_out, 1_500);

        let (rate, samples) = read_wav(&dest);
        assert_eq!(rate, 8_000);
        assert_eq!(samples.len(), 1_500);
        assert!(samples[..1_000].iter().all(|&s| s == 100));
        assert!(samples[1_000..].iter().all(|&s| s == -200));
    }

    #[test]
    fn later_sources_resample_to_the_first_rate() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_wav(&dir, "a.wav", 8_000, &vec![0i16; 800]);
        // One second at 16 kHz becomes roughly one second at 8 kHz.
        let b = write_wav(&dir, "b.wav", 16_000, &vec![50i16; 16_000]);
        let dest = dir.path().join("merged.wav");

        merge(&[&a, &b], &dest, OutputFormat::Wav, &CancelToken::new()).unwrap();

        let (rate, samples) = read_wav(&dest);
        assert_eq!(rate, 8_000);
        let second = samples.len() - 800;
        assert!((second as i64 - 8_000).unsigned_abs() < 4, "got {second}");
    }

    #[test]
    fn unreadable_sources_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_wav(&dir, "good.wav", 8_000, &vec![1i16; 100]);
        let bad = dir.path().join("bad.wav");
        std::fs::write(&bad, b"not audio").unwrap();
        let dest = dir.path().join("merged.wav");

        let stats = merge(&[&bad, &good], &dest, OutputFormat::Wav, &CancelToken::new()).unwrap();
        assert_eq!(stats.samples_out, 100);
    }

    #[test]
    fn all_sources_invalid_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.wav");
        std::fs::write(&bad, b"junk").unwrap();
        let dest = dir.path().join("merged.wav");

        let result = merge(&[&bad], &dest, OutputFormat::Wav, &CancelToken::new());
        assert!(matches!(result, Err(EngineError::NoValidSources)));
        assert!(!dest.exists());
    }
}
