//! Decision strategies turning a score stream into binary flags.
//!
//! All strategies act on `|score|` and ignore undefined timestamps, which
//! are never flagged.

mod evt;
mod pot;
mod quantile;
mod topk;

pub use evt::{EvtOutcome, EvtSegmentOutcome, EvtStrategy, TailModel};
pub use pot::{find_peaks, Peak, PotStrategy};
pub use quantile::QuantileStrategy;
pub use topk::TopKStrategy;

use crate::core::SegmentBoundaries;
use crate::error::{AnomalyError, Result};
use crate::scoring::ScoreStream;

/// Common interface of all decision rules.
///
/// This trait is object-safe and can be used with `Box<dyn DecisionStrategy>`.
pub trait DecisionStrategy: Send + Sync {
    /// Flag timestamps of `scores`.
    ///
    /// `ground_truth` is only consulted by oracle strategies.
    fn decide(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
        ground_truth: Option<&[bool]>,
    ) -> Result<Prediction>;

    /// Strategy name used in summaries.
    fn name(&self) -> &str;

    /// Whether `decide` needs ground truth.
    fn requires_ground_truth(&self) -> bool {
        false
    }
}

/// Type alias for boxed strategy trait objects.
pub type BoxedStrategy = Box<dyn DecisionStrategy>;

/// Per-timestamp binary decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prediction {
    flags: Vec<bool>,
}

impl Prediction {
    pub fn new(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    /// All-negative prediction of length `len`.
    pub fn empty(len: usize) -> Self {
        Self {
            flags: vec![false; len],
        }
    }

    /// Prediction of length `len` that flags `indices`.
    ///
    /// # Errors
    /// `IndexOutOfBounds` for an index `>= len`.
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Result<Self> {
        let mut flags = vec![false; len];
        for i in indices {
            *flags
                .get_mut(i)
                .ok_or(AnomalyError::IndexOutOfBounds { index: i, size: len })? = true;
        }
        Ok(Self { flags })
    }

    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn is_positive(&self, index: usize) -> bool {
        self.flags.get(index).copied().unwrap_or(false)
    }

    /// Indices of flagged timestamps, ascending.
    pub fn positives(&self) -> Vec<usize> {
        self.flags
            .iter()
            .enumerate()
            .filter_map(|(i, &f)| f.then_some(i))
            .collect()
    }

    pub fn positive_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    fn set(&mut self, index: usize) {
        self.flags[index] = true;
    }
}

/// Check that scores and boundaries describe the same series.
fn check_alignment(scores: &ScoreStream, boundaries: &SegmentBoundaries) -> Result<()> {
    if scores.len() != boundaries.series_len() {
        return Err(AnomalyError::DimensionMismatch {
            expected: boundaries.series_len(),
            got: scores.len(),
        });
    }
    Ok(())
}

fn check_probability(q: f64) -> Result<()> {
    if (0.0..=1.0).contains(&q) {
        Ok(())
    } else {
        Err(AnomalyError::InvalidQuantile(q))
    }
}
