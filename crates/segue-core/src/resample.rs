//! Streaming linear-interpolation resampler.
//!
//! Used by the merge driver to bring later sources onto the sample rate
//! established by the first source. Linear interpolation is all the merge
//! contract asks for; anti-aliased offline resampling is out of scope.

/// Streaming mono resampler using linear interpolation between adjacent
/// input samples.
pub struct LinearResampler {
    /// Source samples advanced per output sample.
    step: f64,
    /// Position of the next output, in source-sample units.
    pos: f64,
    prev: i16,
    consumed: u64,
}

impl LinearResampler {
    pub fn new(src_rate: u32, dst_rate: u32) -> Self {
        Self {
            step: f64::from(src_rate.max(1)) / f64::from(dst_rate.max(1)),
            pos: 0.0,
            prev: 0,
            consumed: 0,
        }
    }

    /// True when source and destination rates match and `push` is a
    /// straight copy.
    pub fn is_identity(&self) -> bool {
        self.step == 1.0
    }

    /// Feed one input sample, appending any due output samples to `out`.
    pub fn push(&mut self, sample: i16, out: &mut Vec<i16>) {
        let cur = self.consumed as f64;
        while self.pos <= cur {
            let value = if self.consumed == 0 {
                f64::from(sample)
            } else {
                let frac = (self.pos - (cur - 1.0)).clamp(0.0, 1.0);
                f64::from(self.prev) + (f64::from(sample) - f64::from(self.prev)) * frac
            };
            out.push(value.round() as i16);
            self.pos += self.step;
        }
        self.prev = sample;
        self.consumed += 1;
    }
}
