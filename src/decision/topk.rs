//! Oracle top-K decision.

use crate::core::SegmentBoundaries;
use crate::decision::{check_alignment, DecisionStrategy, Prediction};
use crate::error::{AnomalyError, Result};
use crate::scoring::ScoreStream;

/// Flags the K largest `|score|` timestamps, K being the number of
/// ground-truth positives.
///
/// This is an analysis oracle: it needs the labels it is evaluated against
/// and only measures how well the score ranks anomalies. Ties are broken
/// by the earliest timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKStrategy;

impl TopKStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl DecisionStrategy for TopKStrategy {
    fn decide(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
        ground_truth: Option<&[bool]>,
    ) -> Result<Prediction> {
        check_alignment(scores, boundaries)?;
        let truth = ground_truth.ok_or(AnomalyError::MissingGroundTruth)?;
        if truth.len() != scores.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: scores.len(),
                got: truth.len(),
            });
        }
        let k = truth.iter().filter(|&&t| t).count();

        let mut ranked: Vec<(usize, f64)> = scores.magnitudes().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        Prediction::from_indices(scores.len(), ranked.into_iter().take(k).map(|(i, _)| i))
    }

    fn name(&self) -> &str {
        "TopK"
    }

    fn requires_ground_truth(&self) -> bool {
        true
    }
}
