//! Regime segmentation of a series.
//!
//! Boundaries are produced by an external change-point collaborator and
//! consumed here as either an explicit index list or the `new_cp`
//! indicator column. Every per-segment statistic in the crate is scoped to
//! exactly one [`Segment`].

use crate::error::{AnomalyError, Result};

/// A contiguous half-open range `[start, end)` of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub start: usize,
    pub end: usize,
}

impl Segment {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Ordered set of segment start indices partitioning a series.
///
/// Invariants: starts are strictly increasing, the first start is 0, and
/// every start is below the series length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentBoundaries {
    starts: Vec<usize>,
    len: usize,
}

impl SegmentBoundaries {
    /// One segment spanning the whole series.
    pub fn single(len: usize) -> Self {
        Self {
            starts: if len == 0 { Vec::new() } else { vec![0] },
            len,
        }
    }

    /// Build from explicit start indices.
    ///
    /// A missing leading 0 is an error rather than silently inserted, so a
    /// collaborator that drops the first segment is caught early.
    pub fn from_indices(starts: Vec<usize>, len: usize) -> Result<Self> {
        if len == 0 {
            return if starts.is_empty() {
                Ok(Self::single(0))
            } else {
                Err(AnomalyError::InvalidParameter(
                    "boundaries given for an empty series".to_string(),
                ))
            };
        }
        if starts.first() != Some(&0) {
            return Err(AnomalyError::InvalidParameter(
                "first segment must start at index 0".to_string(),
            ));
        }
        if let Some(w) = starts.windows(2).find(|w| w[1] <= w[0]) {
            return Err(AnomalyError::InvalidParameter(format!(
                "boundaries must be strictly increasing ({} then {})",
                w[0], w[1]
            )));
        }
        if let Some(&last) = starts.last() {
            if last >= len {
                return Err(AnomalyError::IndexOutOfBounds {
                    index: last,
                    size: len,
                });
            }
        }
        Ok(Self { starts, len })
    }

    /// Build from a boundary indicator column.
    ///
    /// A non-zero, finite flag at index `i > 0` starts a new segment at `i`.
    /// The flag at index 0 is ignored because the first segment always
    /// starts there.
    pub fn from_indicator(flags: &[f64]) -> Self {
        let mut starts = Vec::new();
        if !flags.is_empty() {
            starts.push(0);
        }
        starts.extend(
            flags
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, &f)| f.is_finite() && f != 0.0)
                .map(|(i, _)| i),
        );
        Self {
            starts,
            len: flags.len(),
        }
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn series_len(&self) -> usize {
        self.len
    }

    pub fn n_segments(&self) -> usize {
        self.starts.len()
    }

    /// All segments in order.
    pub fn segments(&self) -> Vec<Segment> {
        self.starts
            .iter()
            .enumerate()
            .map(|(k, &start)| {
                let end = self.starts.get(k + 1).copied().unwrap_or(self.len);
                Segment::new(start, end)
            })
            .collect()
    }

    /// Segment containing `index`, if any.
    pub fn segment_of(&self, index: usize) -> Option<Segment> {
        if index >= self.len {
            return None;
        }
        let k = self.starts.partition_point(|&s| s <= index);
        let start = self.starts[k - 1];
        let end = self.starts.get(k).copied().unwrap_or(self.len);
        Some(Segment::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_covers_series() {
        let b = SegmentBoundaries::single(10);
        assert_eq!(b.segments(), vec![Segment::new(0, 10)]);
        assert_eq!(SegmentBoundaries::single(0).n_segments(), 0);
    }

    #[test]
    fn from_indices_partitions() {
        let b = SegmentBoundaries::from_indices(vec![0, 4, 7], 10).unwrap();
        assert_eq!(
            b.segments(),
            vec![Segment::new(0, 4), Segment::new(4, 7), Segment::new(7, 10)]
        );
        let total: usize = b.segments().iter().map(|s| s.len()).sum();
        assert_eq!(total, 10);
    }

    #[test]
    fn from_indices_rejects_bad_input() {
        assert!(SegmentBoundaries::from_indices(vec![1, 4], 10).is_err());
        assert!(SegmentBoundaries::from_indices(vec![0, 4, 4], 10).is_err());
        assert!(SegmentBoundaries::from_indices(vec![0, 6, 3], 10).is_err());
        assert!(SegmentBoundaries::from_indices(vec![0, 10], 10).is_err());
    }

    #[test]
    fn from_indicator_reads_new_cp_column() {
        let flags = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let b = SegmentBoundaries::from_indicator(&flags);
        assert_eq!(b.starts(), &[0, 3, 7]);
        assert_eq!(b.series_len(), 9);
    }

    #[test]
    fn from_indicator_ignores_nan_flags() {
        let flags = [0.0, f64::NAN, 0.0, 2.0];
        let b = SegmentBoundaries::from_indicator(&flags);
        assert_eq!(b.starts(), &[0, 3]);
    }

    #[test]
    fn segment_of_finds_containing_segment() {
        let b = SegmentBoundaries::from_indices(vec![0, 4, 7], 10).unwrap();
        assert_eq!(b.segment_of(0), Some(Segment::new(0, 4)));
        assert_eq!(b.segment_of(4), Some(Segment::new(4, 7)));
        assert_eq!(b.segment_of(9), Some(Segment::new(7, 10)));
        assert_eq!(b.segment_of(10), None);
    }

    #[test]
    fn segment_helpers() {
        let s = Segment::new(3, 6);
        assert_eq!(s.len(), 3);
        assert!(s.contains(3));
        assert!(!s.contains(6));
        assert_eq!(s.range(), 3..6);
        assert!(Segment::new(2, 2).is_empty());
    }
}
