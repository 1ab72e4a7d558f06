//! The peak sequence and its sidecar wire form.

/// Ordered sequence of waveform peaks, one per fixed-duration window.
///
/// Each value is the maximum absolute sample magnitude within its window,
/// normalized to `[0, 1]`. The sidecar wire form is the flat little-endian
/// f32 encoding of exactly these values, no header: the count is
/// `file_size / 4`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PeakSequence {
    values: Vec<f32>,
}

impl PeakSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn push(&mut self, peak: f32) {
        self.values.push(peak.clamp(0.0, 1.0));
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Overall peak across the whole sequence.
    pub fn max(&self) -> f32 {
        self.values.iter().copied().fold(0.0f32, f32::max)
    }

    /// Serialize to the sidecar wire form.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.values.len() * 4);
        for value in &self.values {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }

    /// Parse the sidecar wire form. `None` when the byte count is not a
    /// multiple of four (a truncated or corrupt sidecar).
    pub fn from_le_bytes(data: &[u8]) -> Option<Self> {
        if data.len() % 4 != 0 {
            return None;
        }
        let values = data
            .chunks_exact(4)
            .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect();
        Some(Self { values })
    }
}
