//! Tolerance-aware evaluation of binary predictions.
//!
//! Ground-truth anomalies are counted as events (maximal runs of positive
//! labels) rather than as individual timestamps. An event is detected when
//! any prediction lands within `tolerance` samples of it; predictions near
//! an event never count as false positives, however many there are.

mod summary;

pub use summary::{ResultRow, StrategySummary};

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};

/// A maximal run of ground-truth positives, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub start: usize,
    pub end: usize,
}

/// Maximal runs of `true` in `labels`.
pub fn events(labels: &[bool]) -> Vec<Event> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, &label) in labels.iter().enumerate() {
        match (label, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                out.push(Event { start: s, end: i - 1 });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push(Event {
            start: s,
            end: labels.len() - 1,
        });
    }
    out
}

/// Confusion counts and derived scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionMetrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub total_predicted: usize,
}

impl DetectionMetrics {
    fn from_counts(tp: usize, fp: usize, fn_: usize, tn: usize, total_predicted: usize) -> Self {
        let (precision, recall, f1) = if tp + fn_ == 0 && total_predicted == 0 {
            (1.0, 1.0, 1.0)
        } else {
            let ratio = |num: usize, den: usize| {
                if den == 0 {
                    0.0
                } else {
                    num as f64 / den as f64
                }
            };
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (precision, recall, f1)
        };
        Self {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            true_negatives: tn,
            precision,
            recall,
            f1,
            total_predicted,
        }
    }
}

/// Event-level evaluator with temporal tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluator {
    tolerance: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self { tolerance: 3 }
    }
}

impl Evaluator {
    pub fn new(tolerance: usize) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> usize {
        self.tolerance
    }

    /// Score `predicted` against `truth`.
    ///
    /// # Example
    /// ```
    /// use topo_vaad::evaluation::Evaluator;
    ///
    /// let truth = [false, false, true, true, false, false, false, false];
    /// let predicted = [false, false, false, false, true, false, false, true];
    /// let m = Evaluator::new(2).evaluate(&predicted, &truth).unwrap();
    /// assert_eq!((m.true_positives, m.false_positives), (1, 1));
    /// assert!((m.f1 - 2.0 / 3.0).abs() < 1e-12);
    /// ```
    ///
    /// # Errors
    /// `DimensionMismatch` when the slices differ in length.
    pub fn evaluate(&self, predicted: &[bool], truth: &[bool]) -> Result<DetectionMetrics> {
        if predicted.len() != truth.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: truth.len(),
                got: predicted.len(),
            });
        }
        let n = truth.len();
        let events = events(truth);

        let mut covered = vec![false; n];
        let mut tp = 0;
        for event in &events {
            let lo = event.start.saturating_sub(self.tolerance);
            let hi = (event.end + self.tolerance).min(n - 1);
            covered[lo..=hi].iter_mut().for_each(|c| *c = true);
            if predicted[lo..=hi].iter().any(|&p| p) {
                tp += 1;
            }
        }

        let mut fp = 0;
        let mut tn = 0;
        for (&p, &c) in predicted.iter().zip(&covered) {
            match (p, c) {
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                _ => {}
            }
        }
        let total_predicted = predicted.iter().filter(|&&p| p).count();

        Ok(DetectionMetrics::from_counts(
            tp,
            fp,
            events.len() - tp,
            tn,
            total_predicted,
        ))
    }
}
