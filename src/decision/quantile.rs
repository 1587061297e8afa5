//! Per-segment quantile threshold.

use crate::core::SegmentBoundaries;
use crate::decision::{check_alignment, check_probability, DecisionStrategy, Prediction};
use crate::error::Result;
use crate::scoring::ScoreStream;
use crate::utils::stats::quantile;
use serde::{Deserialize, Serialize};

/// Flags `|score| > quantile(|score|, q)` within each segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantileStrategy {
    q: f64,
}

impl Default for QuantileStrategy {
    fn default() -> Self {
        Self { q: 0.99 }
    }
}

impl QuantileStrategy {
    /// # Errors
    /// `InvalidQuantile` when `q` is outside [0, 1].
    pub fn new(q: f64) -> Result<Self> {
        check_probability(q)?;
        Ok(Self { q })
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    /// Apply the rule to one segment's range, writing into `prediction`.
    pub(crate) fn flag_range(
        scores: &ScoreStream,
        range: std::ops::Range<usize>,
        q: f64,
        prediction: &mut Prediction,
    ) -> Result<Option<f64>> {
        let magnitudes: Vec<(usize, f64)> = scores.magnitudes_in(range).collect();
        if magnitudes.is_empty() {
            return Ok(None);
        }
        let values: Vec<f64> = magnitudes.iter().map(|&(_, m)| m).collect();
        let threshold = quantile(&values, q)?;
        for &(i, m) in &magnitudes {
            if m > threshold {
                prediction.set(i);
            }
        }
        Ok(Some(threshold))
    }
}

impl DecisionStrategy for QuantileStrategy {
    fn decide(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
        _ground_truth: Option<&[bool]>,
    ) -> Result<Prediction> {
        check_alignment(scores, boundaries)?;
        check_probability(self.q)?;
        let mut prediction = Prediction::empty(scores.len());
        for segment in boundaries.segments() {
            Self::flag_range(scores, segment.range(), self.q, &mut prediction)?;
        }
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "Quantile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnomalyError;
    use crate::topology::ShapeFeature;

    #[test]
    fn flags_strictly_above_quantile() {
        let values: Vec<Option<f64>> = (0..100).map(|i| Some(i as f64)).collect();
        let s = ScoreStream::new(ShapeFeature::Auc, values);
        let p = QuantileStrategy::new(0.95)
            .unwrap()
            .decide(&s, &SegmentBoundaries::single(100), None)
            .unwrap();
        // threshold 94.05
        assert_eq!(p.positives(), (95..100).collect::<Vec<_>>());
    }

    #[test]
    fn thresholds_are_per_segment() {
        let mut values = vec![Some(1.0); 10];
        values[3] = Some(2.0);
        values.extend(vec![Some(100.0); 10]);
        values[15] = Some(150.0);
        let s = ScoreStream::new(ShapeFeature::Auc, values);
        let b = SegmentBoundaries::from_indices(vec![0, 10], 20).unwrap();
        let p = QuantileStrategy::new(0.9).unwrap().decide(&s, &b, None).unwrap();
        assert_eq!(p.positives(), vec![3, 15]);
    }

    #[test]
    fn constant_scores_flag_nothing() {
        let s = ScoreStream::new(ShapeFeature::Auc, vec![Some(0.0); 8]);
        let p = QuantileStrategy::default()
            .decide(&s, &SegmentBoundaries::single(8), None)
            .unwrap();
        assert_eq!(p.positive_count(), 0);
    }

    #[test]
    fn rejects_invalid_quantile() {
        assert_eq!(QuantileStrategy::new(1.5), Err(AnomalyError::InvalidQuantile(1.5)));
        assert!(QuantileStrategy::new(-0.1).is_err());
    }
}
