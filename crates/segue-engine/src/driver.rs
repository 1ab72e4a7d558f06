//! The streaming transcode driver.
//!
//! One cooperative pull loop carries a source through decode, channel mix,
//! the cut/gain pipeline, encode and mux without ever holding more than a
//! batch of samples and the codec queues in memory. The loop never blocks
//! longer than one poll timeout, so cancellation is observed promptly even
//! against a stalled codec.

use crate::error::{EngineError, Result};
use crate::params::{EditParams, OutputFormat, TranscodeStats, BATCH_CAPACITY, POLL_TIMEOUT};
use segue_codec::{
    Decoder, DecoderEvent, Encoder, EncoderEvent, InputStatus, Muxer, SymphoniaDecoder,
};
use segue_core::{CancelToken, MonoMix, Pipeline, Stage};

use std::path::Path;

/// Transcode `source` into `dest`, applying the edit along the way.
///
/// The destination is written in place; callers that replace an existing
/// file wrap this in [`write_replacing`](crate::write_replacing). Returns
/// [`EngineError::Cancelled`] if the token fires mid-pass; the partially
/// written destination is left for the caller's temp-file handling to
/// discard.
pub fn transcode(
    source: &Path,
    dest: &Path,
    params: &EditParams,
    output: OutputFormat,
    cancel: &CancelToken,
) -> Result<TranscodeStats> {
    let mut pipeline = Pipeline::for_edit(&params.cuts, params.gain)?;

    let mut decoder = SymphoniaDecoder::open(source)?;
    let build = output.build(decoder.format().sample_rate, dest);
    let (mut encoder, mut muxer) = match build {
        Ok(pair) => pair,
        Err(e) => {
            decoder.release();
            return Err(e);
        }
    };

    log::info!(
        "transcoding {} -> {} ({} Hz, {} ch, cuts remove {} samples, gain {})",
        source.display(),
        dest.display(),
        decoder.format().sample_rate,
        decoder.format().channels,
        params.cuts.removed_samples(),
        params.gain
    );

    let result = run(
        &mut decoder,
        encoder.as_mut(),
        muxer.as_mut(),
        &mut pipeline,
        cancel,
    );
    decoder.release();
    encoder.release();
    result
}

pub(crate) fn run(
    decoder: &mut dyn Decoder,
    encoder: &mut dyn Encoder,
    muxer: &mut dyn Muxer,
    pipeline: &mut Pipeline,
    cancel: &CancelToken,
) -> Result<TranscodeStats> {
    let mut stats = TranscodeStats::default();
    let mut mix = MonoMix::new(decoder.format().channels);
    let mut batch: Vec<i16> = Vec::with_capacity(BATCH_CAPACITY);
    let mut index = 0u64;
    let mut input_done = false;
    let mut decoder_done = false;
    let mut muxer_started = false;

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if !input_done && matches!(decoder.submit_input()?, InputStatus::Exhausted) {
            decoder.signal_end_of_input();
            input_done = true;
        }

        if !decoder_done {
            match decoder.poll_output(POLL_TIMEOUT)? {
                DecoderEvent::Pcm(chunk) => {
                    for &raw in &chunk.samples {
                        let Some(mono) = mix.push(raw) else { continue };
                        stats.samples_in += 1;
                        let transformed = pipeline.apply(index, mono);
                        index += 1;
                        if let Some(sample) = transformed {
                            batch.push(sample);
                            stats.samples_out += 1;
                            if batch.len() == BATCH_CAPACITY {
                                encoder.submit_input(&batch)?;
                                batch.clear();
                            }
                        }
                    }
                }
                DecoderEvent::Pending => {}
                DecoderEvent::EndOfStream => {
                    decoder_done = true;
                    // The final partial batch must reach the encoder before
                    // its end-of-input signal.
                    if !batch.is_empty() {
                        encoder.submit_input(&batch)?;
                        batch.clear();
                    }
                    encoder.signal_end_of_input();
                }
            }
        }

        match encoder.poll_output(POLL_TIMEOUT)? {
            EncoderEvent::FormatReady(config) => {
                muxer.start(&config)?;
                muxer_started = true;
            }
            EncoderEvent::Packet(packet) => {
                if !muxer_started {
                    return Err(EngineError::Transcode(
                        "encoder produced a packet before reporting its format".into(),
                    ));
                }
                muxer.write(&packet)?;
                stats.packets_written += 1;
            }
            EncoderEvent::Pending => {}
            EncoderEvent::EndOfStream => {
                muxer.finish()?;
                log::debug!(
                    "transcode finished: {} in, {} out, {} packets",
                    stats.samples_in,
                    stats.samples_out,
                    stats.packets_written
                );
                return Ok(stats);
            }
        }
    }
}
