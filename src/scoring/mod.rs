//! Anomaly scoring of feature streams.

mod vaad;

pub use vaad::{KinematicScorer, SegmentStats};

use crate::core::SegmentBoundaries;
use crate::error::Result;
use crate::topology::ShapeFeature;

/// Turns one feature stream into an anomaly score stream.
pub trait Scorer {
    /// Score `stream`, which is aligned to the series partitioned by
    /// `boundaries`.
    fn score(
        &self,
        feature: ShapeFeature,
        stream: &[Option<f64>],
        boundaries: &SegmentBoundaries,
    ) -> Result<ScoreStream>;

    /// Scorer name.
    fn name(&self) -> &str;
}

/// Per-timestamp scores derived from one feature.
///
/// `None` marks timestamps where the score is undefined; defined scores are
/// always finite.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStream {
    feature: ShapeFeature,
    values: Vec<Option<f64>>,
}

impl ScoreStream {
    /// Build a stream, mapping non-finite entries to undefined.
    pub fn new(feature: ShapeFeature, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Self { feature, values }
    }

    pub fn feature(&self) -> ShapeFeature {
        self.feature
    }

    /// Table column name, `anomalyscore_<feature>`.
    pub fn column_name(&self) -> String {
        format!("anomalyscore_{}", self.feature.name())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// `|score|` at `index`, the magnitude decisions act on.
    pub fn magnitude(&self, index: usize) -> Option<f64> {
        self.get(index).map(f64::abs)
    }

    /// (index, |score|) for every defined timestamp in `range`.
    pub fn magnitudes_in(
        &self,
        range: std::ops::Range<usize>,
    ) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values[range.clone()]
            .iter()
            .zip(range)
            .filter_map(|(v, i)| v.map(|x| (i, x.abs())))
    }

    /// (index, |score|) for every defined timestamp.
    pub fn magnitudes(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.magnitudes_in(0..self.values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_scores_become_undefined() {
        let s = ScoreStream::new(
            ShapeFeature::Auc,
            vec![Some(1.0), Some(f64::NAN), None, Some(f64::INFINITY), Some(-2.0)],
        );
        assert_eq!(s.defined_count(), 2);
        assert_eq!(s.get(1), None);
        assert_eq!(s.magnitude(4), Some(2.0));
        assert_eq!(s.get(10), None);
    }

    #[test]
    fn magnitudes_keep_series_indices() {
        let s = ScoreStream::new(
            ShapeFeature::Gini,
            vec![None, Some(-3.0), Some(0.5), None, Some(1.0)],
        );
        let all: Vec<_> = s.magnitudes().collect();
        assert_eq!(all, vec![(1, 3.0), (2, 0.5), (4, 1.0)]);
        let tail: Vec<_> = s.magnitudes_in(2..5).collect();
        assert_eq!(tail, vec![(2, 0.5), (4, 1.0)]);
        assert_eq!(s.column_name(), "anomalyscore_gini");
    }
}
