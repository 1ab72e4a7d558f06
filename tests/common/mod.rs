#![allow(dead_code)]

use std::path::Path;

pub fn write_wav(path: &Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

pub fn read_wav(path: &Path) -> (u32, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let rate = reader.spec().sample_rate;
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (rate, samples)
}

/// A mono sine tone at the given amplitude (fraction of full scale).
pub fn tone(len: usize, sample_rate: u32, freq: f32, amplitude: f32) -> Vec<i16> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (f32::sin(t * freq * std::f32::consts::TAU) * amplitude * 32_767.0) as i16
        })
        .collect()
}
