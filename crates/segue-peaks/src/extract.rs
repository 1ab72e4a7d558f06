//! Streaming waveform peak extraction.

use crate::error::{PeakError, Result};
use crate::sequence::PeakSequence;
use crate::store::PeakStore;
use segue_codec::{Decoder, DecoderEvent, InputStatus, SymphoniaDecoder};
use segue_core::{CancelToken, MonoMix};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Bounded wait per codec queue poll.
const POLL_TIMEOUT: Duration = Duration::from_millis(2);

/// Tuning for extraction resolution and chunk delivery.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Peak windows per second of audio. The window length is
    /// `sample_rate / points_per_second` raw (pre-mix) samples.
    pub points_per_second: u32,
    /// Deliver a chunk once this many undelivered peaks have accumulated.
    pub chunk_threshold: usize,
    /// Deliver a chunk after this much wall-clock time even if the
    /// threshold has not been reached.
    pub flush_interval: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            points_per_second: 100,
            chunk_threshold: 512,
            flush_interval: Duration::from_millis(100),
        }
    }
}

impl ExtractorConfig {
    pub fn with_points_per_second(mut self, points: u32) -> Self {
        self.points_per_second = points.max(1);
        self
    }

    pub fn with_chunk_threshold(mut self, peaks: usize) -> Self {
        self.chunk_threshold = peaks.max(1);
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

/// Decodes a source once, reducing each fixed-size sample window to one
/// peak, delivering the sequence incrementally and persisting it through
/// the [`PeakStore`].
///
/// The cache is consulted before any decoder is instantiated, so reopening
/// an unmodified source is instantaneous. Chunk delivery is throttled by a
/// size threshold or a wall-clock interval, whichever is reached first,
/// decoupling extraction speed from consumer redraw cost without unbounded
/// buffering.
pub struct PeakExtractor {
    store: Arc<PeakStore>,
    config: ExtractorConfig,
}

impl PeakExtractor {
    pub fn new(store: Arc<PeakStore>) -> Self {
        Self {
            store,
            config: ExtractorConfig::default(),
        }
    }

    pub fn with_config(store: Arc<PeakStore>, config: ExtractorConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<PeakStore> {
        &self.store
    }

    /// Extract peaks for `source`, delivering chunks to `on_chunk` as they
    /// accumulate. Returns the complete sequence.
    ///
    /// A valid cache entry short-circuits the decode entirely: the cached
    /// sequence arrives as a single chunk. A decode error mid-stream leaves
    /// already-delivered chunks delivered, writes nothing to the cache and
    /// returns the error.
    pub fn extract<F>(&self, source: &Path, cancel: &CancelToken, on_chunk: F) -> Result<PeakSequence>
    where
        F: FnMut(&[f32]),
    {
        self.extract_with(
            source,
            |path| SymphoniaDecoder::open(path).map(|d| Box::new(d) as Box<dyn Decoder>),
            cancel,
            on_chunk,
        )
    }

    /// As [`extract`](Self::extract), with an injectable decoder factory.
    /// Tests use this to count decoder instantiations and to substitute
    /// deterministic fakes.
    pub fn extract_with<O, F>(
        &self,
        source: &Path,
        open: O,
        cancel: &CancelToken,
        mut on_chunk: F,
    ) -> Result<PeakSequence>
    where
        O: FnOnce(&Path) -> segue_codec::Result<Box<dyn Decoder>>,
        F: FnMut(&[f32]),
    {
        // Serialize concurrent requests for the same source: the loser of
        // the race waits here and then hits the winner's cache entry.
        let guard = self.store.extraction_guard(source);
        let _serialized = guard.lock();

        if let Some(sequence) = self.store.lookup(source) {
            log::debug!("peak cache hit for {}", source.display());
            if !sequence.is_empty() {
                on_chunk(sequence.values());
            }
            return Ok(sequence);
        }

        let mut decoder = open(source)?;
        let result = self.run(decoder.as_mut(), cancel, &mut on_chunk);
        decoder.release();

        let sequence = result?;
        self.store.store(source, &sequence);
        Ok(sequence)
    }

    fn run(
        &self,
        decoder: &mut dyn Decoder,
        cancel: &CancelToken,
        on_chunk: &mut dyn FnMut(&[f32]),
    ) -> Result<PeakSequence> {
        let format = decoder.format().clone();
        let window_len =
            u64::from((format.sample_rate / self.config.points_per_second.max(1)).max(1));

        let mut mix = MonoMix::new(format.channels);
        let mut sequence = PeakSequence::new();
        let mut window_max = 0.0f32;
        let mut window_filled = 0u64;
        let mut delivered = 0usize;
        let mut last_flush = Instant::now();
        let mut input_done = false;

        loop {
            if cancel.is_cancelled() {
                return Err(PeakError::Cancelled);
            }
            if !input_done && matches!(decoder.submit_input()?, InputStatus::Exhausted) {
                decoder.signal_end_of_input();
                input_done = true;
            }
            match decoder.poll_output(POLL_TIMEOUT)? {
                DecoderEvent::Pcm(chunk) => {
                    for &raw in &chunk.samples {
                        if let Some(mono) = mix.push(raw) {
                            let magnitude = (f32::from(mono) / 32768.0).abs();
                            window_max = window_max.max(magnitude);
                        }
                        // Windows are measured in raw pre-mix samples.
                        window_filled += 1;
                        if window_filled >= window_len {
                            sequence.push(window_max);
                            window_max = 0.0;
                            window_filled = 0;

                            let pending = sequence.len() - delivered;
                            if pending >= self.config.chunk_threshold
                                || last_flush.elapsed() >= self.config.flush_interval
                            {
                                on_chunk(&sequence.values()[delivered..]);
                                delivered = sequence.len();
                                last_flush = Instant::now();
                            }
                        }
                    }
                }
                DecoderEvent::Pending => continue,
                DecoderEvent::EndOfStream => break,
            }
        }

        if window_filled > 0 {
            sequence.push(window_max);
        }
        if delivered < sequence.len() {
            on_chunk(&sequence.values()[delivered..]);
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use segue_codec::{CodecError, PcmChunk};
    use segue_core::TrackFormat;
    use std::collections::VecDeque;
    use std::fs::File;

    /// Deterministic in-memory decoder emitting pre-baked chunks.
    struct FakeDecoder {
        format: TrackFormat,
        chunks: VecDeque<Vec<i16>>,
        fail_after: Option<usize>,
        emitted: usize,
        eos: bool,
    }

    impl FakeDecoder {
        fn boxed(channels: u16, sample_rate: u32, chunks: Vec<Vec<i16>>) -> Box<dyn Decoder> {
            Box::new(Self {
                format: TrackFormat::new(sample_rate, channels, 0, "fake".into()).unwrap(),
                chunks: chunks.into(),
                fail_after: None,
                emitted: 0,
                eos: false,
            })
        }
    }

    impl Decoder for FakeDecoder {
        fn format(&self) -> &TrackFormat {
            &self.format
        }

        fn submit_input(&mut self) -> segue_codec::Result<InputStatus> {
            if self.chunks.is_empty() {
                Ok(InputStatus::Exhausted)
            } else {
                Ok(InputStatus::Accepted)
            }
        }

        fn signal_end_of_input(&mut self) {
            self.eos = true;
        }

        fn poll_output(&mut self, _timeout: Duration) -> segue_codec::Result<DecoderEvent> {
            if let Some(limit) = self.fail_after {
                if self.emitted >= limit {
                    return Err(CodecError::Decode("synthetic mid-stream failure".into()));
                }
            }
            if let Some(samples) = self.chunks.pop_front() {
                self.emitted += 1;
                return Ok(DecoderEvent::Pcm(PcmChunk {
                    samples,
                    channels: self.format.channels,
                }));
            }
            if self.eos {
                Ok(DecoderEvent::EndOfStream)
            } else {
                Ok(DecoderEvent::Pending)
            }
        }
    }

    fn extractor(points_per_second: u32) -> PeakExtractor {
        PeakExtractor::with_config(
            Arc::new(PeakStore::in_memory()),
            ExtractorConfig::default().with_points_per_second(points_per_second),
        )
    }

    fn touch(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path
    }

    #[test]
    fn windows_reduce_to_running_max() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        // 1000 Hz at 100 pps: window of 10 samples.
        let ex = extractor(100);
        let mut samples = vec![0i16; 10];
        samples[3] = 16_384; // 0.5 full scale
        let mut second = vec![0i16; 10];
        second[9] = -32_768; // |min| is full scale

        let seq = ex
            .extract_with(
                &source,
                |_| Ok(FakeDecoder::boxed(1, 1_000, vec![samples, second])),
                &CancelToken::new(),
                |_| {},
            )
            .unwrap();

        assert_eq!(seq.len(), 2);
        assert_abs_diff_eq!(seq.values()[0], 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(seq.values()[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn partial_tail_window_still_emits() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        let ex = extractor(100); // window of 10 at 1 kHz

        let seq = ex
            .extract_with(
                &source,
                |_| Ok(FakeDecoder::boxed(1, 1_000, vec![vec![8_192; 15]])),
                &CancelToken::new(),
                |_| {},
            )
            .unwrap();

        assert_eq!(seq.len(), 2);
    }

    #[test]
    fn second_extraction_is_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        let ex = extractor(100);

        let mut opens = 0usize;
        let first = ex
            .extract_with(
                &source,
                |_| {
                    opens += 1;
                    Ok(FakeDecoder::boxed(1, 1_000, vec![vec![1_000i16; 30]]))
                },
                &CancelToken::new(),
                |_| {},
            )
            .unwrap();

        let mut chunk_peaks = Vec::new();
        let second = ex
            .extract_with(
                &source,
                |_| {
                    opens += 1;
                    Ok(FakeDecoder::boxed(1, 1_000, vec![]))
                },
                &CancelToken::new(),
                |chunk| chunk_peaks.extend_from_slice(chunk),
            )
            .unwrap();

        // No decoder was built for the hit, and the sequences are
        // bit-identical.
        assert_eq!(opens, 1);
        assert_eq!(first, second);
        assert_eq!(chunk_peaks, second.values());
    }

    #[test]
    fn decode_error_delivers_partial_chunks_and_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        let store = Arc::new(PeakStore::in_memory());
        let ex = PeakExtractor::with_config(
            Arc::clone(&store),
            ExtractorConfig::default()
                .with_points_per_second(100)
                .with_chunk_threshold(1),
        );

        let mut delivered = 0usize;
        let result = ex.extract_with(
            &source,
            |_| {
                Ok(Box::new(FakeDecoder {
                    format: TrackFormat::new(1_000, 1, 0, "fake".into()).unwrap(),
                    chunks: vec![vec![100i16; 10], vec![100i16; 10]].into(),
                    fail_after: Some(1),
                    emitted: 0,
                    eos: false,
                }) as Box<dyn Decoder>)
            },
            &CancelToken::new(),
            |chunk| delivered += chunk.len(),
        );

        assert!(matches!(result, Err(PeakError::Codec(_))));
        assert_eq!(delivered, 1);
        assert_eq!(store.lookup(&source), None);
    }

    #[test]
    fn cancellation_stops_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        let ex = extractor(100);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = ex.extract_with(
            &source,
            |_| Ok(FakeDecoder::boxed(1, 1_000, vec![vec![0i16; 10]])),
            &cancel,
            |_| {},
        );
        assert!(matches!(result, Err(PeakError::Cancelled)));
    }

    #[test]
    fn stereo_peaks_use_channel_mean() {
        let dir = tempfile::tempdir().unwrap();
        let source = touch(&dir, "a.wav");
        // Stereo at 1 kHz, 100 pps: window of 10 raw samples = 5 frames.
        let ex = extractor(100);

        // L = 2000, R = 0 everywhere: mixed mono is 1000.
        let chunk: Vec<i16> = (0..20).map(|i| if i % 2 == 0 { 2_000 } else { 0 }).collect();
        let seq = ex
            .extract_with(
                &source,
                |_| Ok(FakeDecoder::boxed(2, 1_000, vec![chunk])),
                &CancelToken::new(),
                |_| {},
            )
            .unwrap();

        assert_eq!(seq.len(), 2);
        for &peak in seq.values() {
            assert_abs_diff_eq!(peak, 1_000.0 / 32_768.0, epsilon = 1e-4);
        }
    }
}
