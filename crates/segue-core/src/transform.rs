//! Composable per-sample transform stages.
//!
//! A stage sees every mono sample of the source stream together with its
//! original stream index and either passes it on (possibly modified) or
//! drops it. Stages compose left-to-right in a fixed pipeline order:
//! cut first, then gain, so gain statistics only ever cover kept samples.
//! Source indices are never renumbered mid-pass.

use crate::edit::{CutSet, EditRange};
use crate::error::{CoreError, Result};

/// One stage of the sample transform pipeline.
///
/// `apply` is called with a monotonically increasing `index` (original
/// mono-stream position, post channel mix). Returning `None` drops the
/// sample. State an implementation needs across calls lives in the stage
/// struct itself, visible at the call boundary.
pub trait Stage: Send {
    fn apply(&mut self, index: u64, sample: i16) -> Option<i16>;
}

/// Drops samples that fall inside a sorted cut set.
///
/// Exploits the sortedness invariant with a forward cursor: ranges already
/// passed are never rescanned, so a full pass is O(samples + ranges).
pub struct CutStage {
    ranges: Vec<EditRange>,
    cursor: usize,
}

impl CutStage {
    pub fn new(cuts: &CutSet) -> Self {
        Self {
            ranges: cuts.ranges().to_vec(),
            cursor: 0,
        }
    }
}

impl Stage for CutStage {
    fn apply(&mut self, index: u64, sample: i16) -> Option<i16> {
        while self.cursor < self.ranges.len() && index >= self.ranges[self.cursor].end {
            self.cursor += 1;
        }
        match self.ranges.get(self.cursor) {
            Some(range) if range.contains(index) => None,
            _ => Some(sample),
        }
    }
}

/// Scale a sample by a linear gain factor, rounded and clamped to the i16
/// domain. A full-scale sample with gain > 1.0 saturates instead of
/// wrapping.
#[inline]
pub fn apply_gain(sample: i16, factor: f32) -> i16 {
    let scaled = (f32::from(sample) * factor).round();
    scaled.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// Applies a fixed linear gain to every sample it sees.
pub struct GainStage {
    factor: f32,
}

impl GainStage {
    pub fn new(factor: f32) -> Result<Self> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(CoreError::InvalidGain(factor));
        }
        Ok(Self { factor })
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl Stage for GainStage {
    fn apply(&mut self, _index: u64, sample: i16) -> Option<i16> {
        Some(apply_gain(sample, self.factor))
    }
}

/// A left-to-right composition of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    /// The standard edit pipeline: cut, then gain.
    ///
    /// A no-op cut set and gain of exactly 1.0 produce an empty pipeline so
    /// the identity transcode pays nothing per sample.
    pub fn for_edit(cuts: &CutSet, gain: f32) -> Result<Self> {
        let mut pipeline = Self::new();
        if !cuts.is_empty() {
            pipeline.push(Box::new(CutStage::new(cuts)));
        }
        if gain != 1.0 {
            pipeline.push(Box::new(GainStage::new(gain)?));
        }
        Ok(pipeline)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Stage for Pipeline {
    fn apply(&mut self, index: u64, sample: i16) -> Option<i16> {
        let mut current = sample;
        for stage in &mut self.stages {
            current = stage.apply(index, current)?;
        }
        Some(current)
    }
}
