//! Extreme-value decision with a generalized Pareto tail.
//!
//! Within each segment, magnitudes above the gate quantile `g` form the
//! tail. A GPD fitted to the excesses over the gate is extrapolated to the
//! final quantile `f`, and magnitudes above that level are flagged. When the
//! tail is too thin to fit, the segment falls back to the plain empirical
//! `f`-quantile.

use crate::core::{Segment, SegmentBoundaries};
use crate::decision::quantile::QuantileStrategy;
use crate::decision::{check_alignment, DecisionStrategy, Prediction};
use crate::error::{AnomalyError, Result};
use crate::scoring::ScoreStream;
use crate::utils::stats::quantile;
use crate::utils::tail::{fit_generalized_pareto_with, gpd_exceedance_threshold, GpdFit};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How a segment's threshold was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum TailModel {
    /// GPD extrapolation from the fitted tail.
    Fitted(GpdFit),
    /// Empirical `f`-quantile after the tail fit failed.
    Fallback { reason: String },
}

/// Threshold details for one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct EvtSegmentOutcome {
    pub segment: Segment,
    /// Gate level, the `g`-quantile of the segment's magnitudes.
    pub gate: f64,
    pub threshold: f64,
    pub tail: TailModel,
}

/// Prediction plus per-segment diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvtOutcome {
    pub prediction: Prediction,
    /// One entry per segment with at least one defined score.
    pub segments: Vec<EvtSegmentOutcome>,
}

impl EvtOutcome {
    /// Did any segment fall back to the empirical quantile?
    pub fn degraded(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s.tail, TailModel::Fallback { .. }))
    }
}

/// EVT decision rule with gate quantile `g` and final quantile `f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvtStrategy {
    gate: f64,
    target: f64,
    min_tail: usize,
}

impl Default for EvtStrategy {
    fn default() -> Self {
        Self {
            gate: 0.85,
            target: 0.995,
            min_tail: 20,
        }
    }
}

impl EvtStrategy {
    /// # Errors
    /// `InvalidQuantile` unless both levels lie in (0, 1);
    /// `InvalidParameter` unless `target > gate`.
    pub fn new(gate: f64, target: f64) -> Result<Self> {
        let strategy = Self {
            gate,
            target,
            ..Self::default()
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Minimum number of excesses required to attempt a fit.
    pub fn with_min_tail(mut self, min_tail: usize) -> Self {
        self.min_tail = min_tail;
        self
    }

    pub fn gate(&self) -> f64 {
        self.gate
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn min_tail(&self) -> usize {
        self.min_tail
    }

    pub fn validate(&self) -> Result<()> {
        for q in [self.gate, self.target] {
            if !(q > 0.0 && q < 1.0) {
                return Err(AnomalyError::InvalidQuantile(q));
            }
        }
        if self.target <= self.gate {
            return Err(AnomalyError::InvalidParameter(format!(
                "final quantile {} must exceed gate quantile {}",
                self.target, self.gate
            )));
        }
        Ok(())
    }

    /// Decide and report how every segment's threshold was obtained.
    pub fn decide_detailed(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
    ) -> Result<EvtOutcome> {
        check_alignment(scores, boundaries)?;
        self.validate()?;

        let mut prediction = Prediction::empty(scores.len());
        let mut outcomes = Vec::with_capacity(boundaries.n_segments());
        for segment in boundaries.segments() {
            let magnitudes: Vec<(usize, f64)> = scores.magnitudes_in(segment.range()).collect();
            if magnitudes.is_empty() {
                continue;
            }
            let outcome = self.segment_threshold(scores, segment, &magnitudes)?;
            for &(i, m) in &magnitudes {
                if m > outcome.threshold {
                    prediction.set(i);
                }
            }
            outcomes.push(outcome);
        }
        Ok(EvtOutcome {
            prediction,
            segments: outcomes,
        })
    }

    fn segment_threshold(
        &self,
        scores: &ScoreStream,
        segment: Segment,
        magnitudes: &[(usize, f64)],
    ) -> Result<EvtSegmentOutcome> {
        let values: Vec<f64> = magnitudes.iter().map(|&(_, m)| m).collect();
        let gate = quantile(&values, self.gate)?;
        let excesses: Vec<f64> = values
            .iter()
            .filter(|&&m| m > gate)
            .map(|m| m - gate)
            .collect();

        match fit_generalized_pareto_with(&excesses, self.min_tail) {
            Ok(fit) => {
                let threshold = gpd_exceedance_threshold(
                    fit.shape,
                    fit.scale,
                    gate,
                    values.len(),
                    excesses.len(),
                    self.target,
                )?;
                debug!(
                    feature = scores.feature().name(),
                    start = segment.start,
                    shape = fit.shape,
                    scale = fit.scale,
                    threshold,
                    "EVT tail fitted"
                );
                Ok(EvtSegmentOutcome {
                    segment,
                    gate,
                    threshold,
                    tail: TailModel::Fitted(fit),
                })
            }
            Err(AnomalyError::TailFit(reason)) => {
                let threshold = quantile(&values, self.target)?;
                warn!(
                    feature = scores.feature().name(),
                    start = segment.start,
                    tail = excesses.len(),
                    %reason,
                    "EVT tail fit failed, using empirical quantile threshold"
                );
                Ok(EvtSegmentOutcome {
                    segment,
                    gate,
                    threshold,
                    tail: TailModel::Fallback { reason },
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Quantile rule at the final level, the fallback used for thin tails.
    pub fn fallback_strategy(&self) -> Result<QuantileStrategy> {
        QuantileStrategy::new(self.target)
    }
}

impl DecisionStrategy for EvtStrategy {
    fn decide(
        &self,
        scores: &ScoreStream,
        boundaries: &SegmentBoundaries,
        _ground_truth: Option<&[bool]>,
    ) -> Result<Prediction> {
        Ok(self.decide_detailed(scores, boundaries)?.prediction)
    }

    fn name(&self) -> &str {
        "EVT"
    }
}
