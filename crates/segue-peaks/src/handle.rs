//! Background extraction with polled progress.

use crate::error::PeakError;
use crate::extract::PeakExtractor;
use crate::sequence::PeakSequence;
use crossbeam_channel::{bounded, Receiver};
use segue_core::CancelToken;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

/// One poll result from a running extraction.
#[derive(Debug)]
pub enum ExtractStatus {
    /// A chunk of newly computed peaks, in order.
    Chunk(Vec<f32>),
    /// Extraction finished; all chunks have been drained.
    Complete(PeakSequence),
    /// Extraction was cancelled before completing.
    Cancelled,
    Failed(String),
    /// Still running, nothing new since the last poll.
    Pending,
}

/// Handle to a peak extraction running on its own thread.
///
/// Consumers poll it from their own loop; chunks arrive over a bounded
/// channel so a slow consumer backpressures delivery instead of growing an
/// unbounded queue. Dropping the handle cancels the extraction.
pub struct ExtractHandle {
    chunks: Receiver<Vec<f32>>,
    worker: Option<JoinHandle<crate::error::Result<PeakSequence>>>,
    cancel: CancelToken,
}

impl ExtractHandle {
    /// Spawn an extraction for `source` on a background thread.
    pub fn spawn(extractor: Arc<PeakExtractor>, source: impl AsRef<Path>) -> Self {
        let source = source.as_ref().to_path_buf();
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let (tx, rx) = bounded::<Vec<f32>>(64);

        let worker = std::thread::Builder::new()
            .name("segue-peaks".into())
            .spawn(move || {
                extractor.extract(&source, &token, |chunk| {
                    // A disconnected receiver means the handle is gone; the
                    // token will stop the loop on its next iteration.
                    let _ = tx.send(chunk.to_vec());
                })
            })
            .expect("BUG: failed to spawn peak extraction thread");

        Self {
            chunks: rx,
            worker: Some(worker),
            cancel,
        }
    }

    /// Request cancellation. The worker notices at its next iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking progress check. Pending chunks are always drained
    /// before the terminal status is reported.
    pub fn poll(&mut self) -> ExtractStatus {
        if let Ok(chunk) = self.chunks.try_recv() {
            return ExtractStatus::Chunk(chunk);
        }
        match self.worker.take() {
            Some(worker) if worker.is_finished() => match worker.join() {
                Ok(Ok(sequence)) => ExtractStatus::Complete(sequence),
                Ok(Err(PeakError::Cancelled)) => ExtractStatus::Cancelled,
                Ok(Err(e)) => ExtractStatus::Failed(e.to_string()),
                Err(_) => ExtractStatus::Failed("peak extraction thread panicked".into()),
            },
            Some(worker) => {
                self.worker = Some(worker);
                ExtractStatus::Pending
            }
            None => ExtractStatus::Failed("extraction result already consumed".into()),
        }
    }

    /// Block until the extraction finishes and return its result.
    pub fn wait(mut self) -> crate::error::Result<PeakSequence> {
        let Some(worker) = self.worker.take() else {
            return Err(PeakError::Cancelled);
        };
        // Keep draining chunk deliveries so the worker can never block on
        // a full queue; the iterator ends when the worker drops its
        // sender.
        for _ in self.chunks.iter() {}
        worker.join().expect("BUG: peak extraction thread panicked")
    }
}

impl Drop for ExtractHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PeakStore;
    use std::fs::File;
    use std::io::Write;
    use std::time::{Duration, Instant};

    fn tone_wav(dir: &tempfile::TempDir, name: &str, seconds: u32) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..(8_000 * seconds) {
            let t = (i % 8_000) as f32 / 8_000.0;
            let sample = (t * 440.0 * std::f32::consts::TAU).sin();
            writer.write_sample((sample * 12_000.0) as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn polling_drains_chunks_then_completes() {
        let dir = tempfile::tempdir().unwrap();
        let source = tone_wav(&dir, "tone.wav", 2);
        let extractor = Arc::new(PeakExtractor::new(Arc::new(PeakStore::in_memory())));

        let mut handle = ExtractHandle::spawn(extractor, &source);
        let mut streamed = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        let complete = loop {
            assert!(Instant::now() < deadline, "extraction did not finish");
            match handle.poll() {
                ExtractStatus::Chunk(chunk) => streamed.extend_from_slice(&chunk),
                ExtractStatus::Complete(sequence) => break sequence,
                ExtractStatus::Pending => std::thread::sleep(Duration::from_millis(5)),
                other => panic!("unexpected status: {other:?}"),
            }
        };

        // 2 s at 100 points per second.
        assert_eq!(complete.len(), 200);
        assert_eq!(streamed, complete.values());
    }

    #[test]
    fn wait_returns_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let source = tone_wav(&dir, "tone.wav", 1);
        let extractor = Arc::new(PeakExtractor::new(Arc::new(PeakStore::in_memory())));

        let sequence = ExtractHandle::spawn(extractor, &source).wait().unwrap();
        assert_eq!(sequence.len(), 100);
        assert!(sequence.max() > 0.3);
    }

    #[test]
    fn wait_drains_a_chunk_heavy_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let source = tone_wav(&dir, "tone.wav", 2);
        // One peak per chunk: 200 deliveries, well past the channel bound.
        // An undrained receiver would leave the worker stuck mid-send.
        let extractor = Arc::new(PeakExtractor::with_config(
            Arc::new(PeakStore::in_memory()),
            crate::extract::ExtractorConfig::default().with_chunk_threshold(1),
        ));

        let sequence = ExtractHandle::spawn(extractor, &source).wait().unwrap();
        assert_eq!(sequence.len(), 200);
    }

    #[test]
    fn unreadable_source_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("garbage.mp3");
        File::create(&source)
            .unwrap()
            .write_all(b"not audio at all")
            .unwrap();
        let extractor = Arc::new(PeakExtractor::new(Arc::new(PeakStore::in_memory())));

        let mut handle = ExtractHandle::spawn(extractor, &source);
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            assert!(Instant::now() < deadline, "extraction did not finish");
            match handle.poll() {
                ExtractStatus::Failed(_) => break,
                ExtractStatus::Pending => std::thread::sleep(Duration::from_millis(5)),
                other => panic!("unexpected status: {other:?}"),
            }
        }
    }
}
