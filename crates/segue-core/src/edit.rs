//! Edit primitives: half-open sample ranges and sorted cut sets.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Half-open range of mono sample indices `[start, end)`.
///
/// Indices are always expressed against the original (uncut) source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditRange {
    pub start: u64,
    pub end: u64,
}

impl EditRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start >= end {
            return Err(CoreError::InvalidRange(format!(
                "start {start} must be < end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of samples the range covers.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, index: u64) -> bool {
        index >= self.start && index < self.end
    }
}

/// A set of cut ranges, kept sorted ascending by start and pairwise
/// non-overlapping.
///
/// The transform stage relies on this ordering to test membership with a
/// single forward scan, so the invariant is enforced at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CutSet {
    ranges: Vec<EditRange>,
}

impl CutSet {
    /// The empty cut set (transcode no-op).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a cut set from arbitrary ranges.
    ///
    /// Ranges are sorted; overlapping ranges are rejected, adjacent ranges
    /// are coalesced.
    pub fn new(mut ranges: Vec<EditRange>) -> Result<Self> {
        ranges.sort_by_key(|r| r.start);
        let mut merged: Vec<EditRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(prev) if range.start < prev.end => {
                    return Err(CoreError::InvalidRange(format!(
                        "range [{}, {}) overlaps [{}, {})",
                        range.start, range.end, prev.start, prev.end
                    )));
                }
                Some(prev) if range.start == prev.end => {
                    prev.end = range.end;
                }
                _ => merged.push(range),
            }
        }
        Ok(Self { ranges: merged })
    }

    /// Single-range convenience constructor.
    pub fn single(start: u64, end: u64) -> Result<Self> {
        Ok(Self {
            ranges: vec![EditRange::new(start, end)?],
        })
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn ranges(&self) -> &[EditRange] {
        &self.ranges
    }

    /// Total number of samples the cuts remove.
    pub fn removed_samples(&self) -> u64 {
        self.ranges.iter().map(EditRange::len).sum()
    }

    /// Map a post-cut sample index back to the original stream index.
    fn to_original(&self, post_index: u64) -> u64 {
        let mut removed = 0u64;
        for range in &self.ranges {
            let kept_before = range.start - removed;
            if post_index < kept_before {
                break;
            }
            removed += range.len();
        }
        post_index + removed
    }

    /// Remap a cut set whose ranges are expressed against the shortened
    /// timeline produced by applying `self`, back into original-stream
    /// indices, and return the union of both sets.
    ///
    /// This is how sequential edits compound: each new selection the caller
    /// makes is in the timeline it currently sees, while the transform stage
    /// only ever works in original indices. A remapped range that spans an
    /// earlier cut simply swallows it; the union coalesces the overlap.
    pub fn compound(&self, later: &CutSet) -> Result<CutSet> {
        let mut ranges = self.ranges.clone();
        for range in &later.ranges {
            let start = self.to_original(range.start);
            let end = self.to_original(range.end);
            ranges.push(EditRange::new(start, end)?);
        }
        // Union with merge: remapped ranges may fully contain earlier cuts.
        ranges.sort_by_key(|r| r.start);
        let mut merged: Vec<EditRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(prev) if range.start <= prev.end => {
                    prev.end = prev.end.max(range.end);
                }
                _ => merged.push(range),
            }
        }
        Ok(CutSet { ranges: merged })
    }
}
