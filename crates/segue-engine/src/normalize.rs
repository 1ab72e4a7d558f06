//! Target-peak normalization.
//!
//! Two-pass: establish the source's true peak, then run a plain gain
//! transcode that scales it to the target. A cached waveform peak (from the
//! peak extractor) can stand in for the measuring pass when it is plausible,
//! turning normalization into a single pass.

use crate::driver::transcode;
use crate::error::{EngineError, Result};
use crate::params::{EditParams, OutputFormat, TranscodeStats, POLL_TIMEOUT};
use segue_codec::{Decoder, DecoderEvent, InputStatus, SymphoniaDecoder};
use segue_core::{CancelToken, CutSet, CutStage, MonoMix, Stage};
use std::path::Path;

/// Cached peaks below this fraction of full scale are treated as
/// implausible (likely a stale or truncated extraction) and re-measured.
const PLAUSIBLE_PEAK_FLOOR: f32 = 0.03;

/// Measure the true peak of a source: the maximum absolute mixed-mono
/// sample, normalized to `[0, 1]`. Decode-only pass, no encoder.
///
/// Samples inside `cuts` are excluded, so the measurement covers exactly
/// the material a cut transcode would keep.
pub fn measure_peak(source: &Path, cuts: &CutSet, cancel: &CancelToken) -> Result<f32> {
    let mut decoder = SymphoniaDecoder::open(source)?;
    let result = measure(&mut decoder, cuts, cancel);
    decoder.release();
    result
}

fn measure(decoder: &mut dyn Decoder, cuts: &CutSet, cancel: &CancelToken) -> Result<f32> {
    let mut mix = MonoMix::new(decoder.format().channels);
    let mut cut = CutStage::new(cuts);
    let mut index = 0u64;
    let mut peak = 0.0f32;
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
                    let kept = cut.apply(index, mono);
                    index += 1;
                    if let Some(sample) = kept {
                        peak = peak.max((f32::from(sample) / 32_768.0).abs());
                    }
                }
            }
            DecoderEvent::Pending => {}
            DecoderEvent::EndOfStream => return Ok(peak),
        }
    }
}

/// Transcode `source` into `dest` with the gain that brings the peak of
/// the kept samples to `target_peak` (a fraction of full scale, e.g.
/// 0.95), applying `cuts` in the same pass.
///
/// `cached_peak` short-circuits the measuring pass when it is at least
/// [`PLAUSIBLE_PEAK_FLOOR`]; anything lower falls back to a precise
/// measurement rather than risking a wildly wrong gain. A cached peak
/// describes the whole source, so it is only trusted when there are no
/// cuts; otherwise the measuring pass runs over the kept samples.
pub fn normalize(
    source: &Path,
    dest: &Path,
    target_peak: f32,
    cached_peak: Option<f32>,
    cuts: &CutSet,
    output: OutputFormat,
    cancel: &CancelToken,
) -> Result<TranscodeStats> {
    if !(target_peak > 0.0 && target_peak <= 1.0) {
        return Err(EngineError::Transcode(format!(
            "normalization target {target_peak} outside (0, 1]"
        )));
    }

    let peak = match cached_peak {
        Some(cached) if cuts.is_empty() && cached >= PLAUSIBLE_PEAK_FLOOR => {
            log::debug!("normalizing from cached peak {cached}");
            cached
        }
        _ => measure_peak(source, cuts, cancel)?,
    };
    if peak <= 0.0 {
        return Err(EngineError::Transcode(
            "source is silent, nothing to normalize".into(),
        ));
    }

    let gain = target_peak / peak;
    log::info!(
        "normalizing {} to peak {target_peak} (measured {peak}, gain {gain})",
        source.display()
    );
    transcode(
        source,
        dest,
        &EditParams::identity().with_cuts(cuts.clone()).with_gain(gain),
        output,
        cancel,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn write_wav(dir: &tempfile::TempDir, name: &str, samples: &[i16]) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
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

    #[test]
    fn measures_the_true_peak() {
        let dir = tempfile::tempdir().unwrap();
        let mut samples = vec![0i16; 4_000];
        samples[1_234] = 16_384; // half scale
        let source = write_wav(&dir, "a.wav", &samples);

        let peak = measure_peak(&source, &CutSet::empty(), &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(peak, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn cut_samples_are_excluded_from_the_measurement() {
        let dir = tempfile::tempdir().unwrap();
        let mut samples = vec![8_192i16; 4_000]; // quarter scale
        samples[2_000] = 32_000; // loudest sample sits inside the cut
        let source = write_wav(&dir, "a.wav", &samples);

        let cuts = CutSet::single(1_500, 2_500).unwrap();
        let peak = measure_peak(&source, &cuts, &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(peak, 0.25, epsilon = 1e-3);
    }

    #[test]
    fn half_scale_source_normalizes_to_target() {
        let dir = tempfile::tempdir().unwrap();
        let samples: Vec<i16> = (0..8_000)
            .map(|i| {
                let t = i as f32 / 8_000.0;
                (f32::sin(t * 440.0 * std::f32::consts::TAU) * 16_384.0) as i16
            })
            .collect();
        let source = write_wav(&dir, "half.wav", &samples);
        let dest = dir.path().join("normalized.wav");

        normalize(
            &source,
            &dest,
            0.95,
            None,
            &CutSet::empty(),
            OutputFormat::Wav,
            &CancelToken::new(),
        )
        .unwrap();

        let out_peak = measure_peak(&dest, &CutSet::empty(), &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(out_peak, 0.95, epsilon = 0.01);
    }

    #[test]
    fn gain_derives_from_the_kept_samples_only() {
        let dir = tempfile::tempdir().unwrap();
        // Half-scale body with a near-full-scale burst in the middle.
        let mut samples: Vec<i16> = (0..8_000)
            .map(|i| {
                let t = i as f32 / 8_000.0;
                (f32::sin(t * 440.0 * std::f32::consts::TAU) * 16_384.0) as i16
            })
            .collect();
        for s in &mut samples[3_000..3_100] {
            *s = 32_000;
        }
        let source = write_wav(&dir, "burst.wav", &samples);
        let dest = dir.path().join("out.wav");

        // Cutting the burst: the gain must target the half-scale body, not
        // the removed material.
        let cuts = CutSet::single(3_000, 3_100).unwrap();
        normalize(
            &source,
            &dest,
            0.95,
            None,
            &cuts,
            OutputFormat::Wav,
            &CancelToken::new(),
        )
        .unwrap();

        let out_peak = measure_peak(&dest, &CutSet::empty(), &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(out_peak, 0.95, epsilon = 0.01);
    }

    #[test]
    fn cached_peak_is_ignored_when_cutting() {
        let dir = tempfile::tempdir().unwrap();
        let mut samples = vec![8_192i16; 4_000];
        samples[100] = 32_000;
        let source = write_wav(&dir, "a.wav", &samples);
        let dest = dir.path().join("out.wav");

        // The cached whole-source peak (the burst) no longer exists once
        // the cut removes it; trusting it would under-normalize.
        let cuts = CutSet::single(0, 200).unwrap();
        normalize(
            &source,
            &dest,
            0.9,
            Some(32_000.0 / 32_768.0),
            &cuts,
            OutputFormat::Wav,
            &CancelToken::new(),
        )
        .unwrap();

        let out_peak = measure_peak(&dest, &CutSet::empty(), &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(out_peak, 0.9, epsilon = 0.01);
    }

    #[test]
    fn implausible_cached_peak_is_remeasured() {
        let dir = tempfile::tempdir().unwrap();
        let mut samples = vec![0i16; 4_000];
        samples[0] = 16_384;
        let source = write_wav(&dir, "a.wav", &samples);
        let dest = dir.path().join("out.wav");

        // A bogus tiny cached peak would imply a gain near 100x; the
        // fallback measurement keeps the output at the target instead.
        normalize(
            &source,
            &dest,
            0.9,
            Some(0.001),
            &CutSet::empty(),
            OutputFormat::Wav,
            &CancelToken::new(),
        )
        .unwrap();
        let out_peak = measure_peak(&dest, &CutSet::empty(), &CancelToken::new()).unwrap();
        assert_abs_diff_eq!(out_peak, 0.9, epsilon = 0.01);
    }

    #[test]
    fn silent_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_wav(&dir, "silence.wav", &vec![0i16; 1_000]);
        let dest = dir.path().join("out.wav");

        let result = normalize(
            &source,
            &dest,
            0.95,
            None,
            &CutSet::empty(),
            OutputFormat::Wav,
            &CancelToken::new(),
        );
        assert!(matches!(result, Err(EngineError::Transcode(_))));
    }

    #[test]
    fn rejects_out_of_range_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = write_wav(&dir, "a.wav", &[1_000i16; 100]);
        let dest = dir.path().join("out.wav");

        for target in [0.0, -0.5, 1.5] {
            let result = normalize(
                &source,
                &dest,
                target,
                None,
                &CutSet::empty(),
                OutputFormat::Wav,
                &CancelToken::new(),
            );
            assert!(result.is_err());
        }
    }
}
