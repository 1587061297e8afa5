//! Prominence-based peaks-over-threshold decision.

use crate::core::SegmentBoundaries;
use crate::decision::{check_alignment, DecisionStrategy, Prediction};
use crate::error::{AnomalyError, Result};
use crate::scoring::ScoreStream;
use crate::utils::stats::{mean, population_std};
use serde::{Deserialize, Serialize};

/// A local maximum and its topographic prominence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Position in the input sequence (first sample of a plateau).
    pub index: usize,
    pub height: f64,
    /// Height above the higher of the two surrounding bases.
    pub prominence: f64,
}

/// Local maxima of `y` with their prominences.
///
/// A peak is a sample (or a flat plateau, reported at its first sample)
/// strictly higher than its left neighbour and than the first differing
/// sample to its right. Samples at either end are never peaks. The base on
/// each side is the minimum reached before the signal climbs above the peak
/// height or the sequence ends.
///
/// # Example
/// ```
/// use topo_vaad::decision::find_peaks;
///
/// let peaks = find_peaks(&[0.0, 3.0, 1.0, 2.0, 0.5]);
/// assert_eq!(peaks.len(), 2);
/// assert_eq!((peaks[0].index, peaks[0].prominence), (1, 2.5));
/// assert_eq!((peaks[1].index, peaks[1].prominence), (3, 1.0));
/// ```
pub fn find_peaks(y: &[f64]) -> Vec<Peak> {
    let n = y.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if y[i] <= y[i - 1] {
            i += 1;
            continue;
        }
        let height = y[i];
        let mut plateau_end = i;
        while plateau_end + 1 < n && y[plateau_end + 1] == height {
            plateau_end += 1;
        }
        if plateau_end + 1 < n && y[plateau_end + 1] < height {
            let left_base = y[..i]
                .iter()
                .rev()
                .take_while(|&&v| v <= height)
                .fold(height, |m, &v| m.min(v));
            let right_base = y[plateau_end + 1..]
                .iter()
                .take_while(|&&v| v <= height)
                .fold(height, |m, &v| m.min(v));
            peaks.push(Peak {
                index: i,
                height,
                prominence: height - left_base.max(right_base),
            });
        }
        i = plateau_end + 1;
    }
    peaks
}

/// Flags peaks of `|score|` whose prominence exceeds
/// `mean + k * std` of all peak prominences.
///
/// Peaks are searched within each segment over its defined scores, so the
/// last sample of a segment is never a peak; undefined timestamps are
/// skipped rather than treated as zeros. The threshold pools the
/// prominences of all segments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotStrategy {
    k: f64,
    min_prominence: f64,
}

impl Default for PotStrategy {
    fn default() -> Self {
        Self {
            k: 3.0,
            min_prominence: 0.0,
        }
    }
}

impl PotStrategy {
    pub fn new(k: f64) -> Result<Self> {
        let strategy = Self {
            k,
            ..Self::default()
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Ignore peaks with prominence below `min_prominence`.
    pub fn with_min_prominence(mut self, min_prominence: f64) -> Self {
        self.min_prominence = min_prominence;
        self
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    pub fn min_prominence(&self) -> f64 {
        self.min_prominence
    }

    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() {
            return Err(AnomalyError::InvalidParameter(format!(
                "POT multiplier must be finite, got {}",
                self.k
            )));
        }
        if !(self.min_prominence >= 0.0) || !self.min_prominence.is_finite() {
            return Err(AnomalyError::InvalidParameter(format!(
                "minimum prominence must be finite and non-negative, got {}",
                self.min_prominence
            )));
        }
        Ok(())
    }
}

impl DecisionStrategy for PotStrategy {
    fn decide(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
        _ground_truth: Option<&[bool]>,
    ) -> Result<Prediction> {
        check_alignment(scores, boundaries)?;
        self.validate()?;

        // (series index, prominence) of every peak, pooled over segments.
        let mut peaks: Vec<(usize, f64)> = Vec::new();
        for segment in boundaries.segments() {
            let (indices, magnitudes): (Vec<usize>, Vec<f64>) =
                scores.magnitudes_in(segment.range()).unzip();
            peaks.extend(
                find_peaks(&magnitudes)
                    .into_iter()
                    .filter(|p| p.prominence >= self.min_prominence)
                    .map(|p| (indices[p.index], p.prominence)),
            );
        }

        let mut prediction = Prediction::empty(scores.len());
        if peaks.is_empty() {
            return Ok(prediction);
        }
        let prominences: Vec<f64> = peaks.iter().map(|&(_, p)| p).collect();
        let threshold = mean(&prominences) + self.k * population_std(&prominences);
        for &(index, _) in peaks.iter().filter(|&&(_, p)| p > threshold) {
            prediction.set(index);
        }
        Ok(prediction)
    }

    fn name(&self) -> &str {
        "POT"
    }
}
