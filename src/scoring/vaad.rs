//! Velocity/acceleration anomaly detection (VAAD) scoring.
//!
//! A spike in a feature stream shows up as a large first difference
//! followed by a sign flip in the second difference. The score multiplies
//! the robustly normalized velocity and acceleration of the stream so that
//! only samples moving abnormally fast *and* bending abnormally hard score
//! highly.

use crate::core::SegmentBoundaries;
use crate::error::{AnomalyError, Result};
use crate::scoring::{ScoreStream, Scorer};
use crate::topology::ShapeFeature;
use crate::utils::stats::{median, robust_normalize, robust_scale};
use serde::{Deserialize, Serialize};

/// Robust center and scale of one derivative over one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStats {
    pub center: f64,
    pub scale: f64,
}

impl SegmentStats {
    /// Median and robust scale of the defined entries, if any.
    pub fn of(values: &[Option<f64>]) -> Result<Option<Self>> {
        let defined: Vec<f64> = values.iter().flatten().copied().collect();
        if defined.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self {
            center: median(&defined)?,
            scale: robust_scale(&defined)?,
        }))
    }

    pub fn normalize(&self, x: f64) -> f64 {
        robust_normalize(x, self.center, self.scale)
    }
}

/// `score[t] = (k_v * V[t]) * (k_a * A[t])` on segment-normalized first and
/// second differences of a feature stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicScorer {
    velocity_gain: f64,
    acceleration_gain: f64,
}

impl Default for KinematicScorer {
    fn default() -> Self {
        Self {
            velocity_gain: 1.0,
            acceleration_gain: 1.0,
        }
    }
}

impl KinematicScorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the velocity gain `k_v`.
    pub fn with_velocity_gain(mut self, gain: f64) -> Self {
        self.velocity_gain = gain;
        self
    }

    /// Set the acceleration gain `k_a`.
    pub fn with_acceleration_gain(mut self, gain: f64) -> Self {
        self.acceleration_gain = gain;
        self
    }

    pub fn velocity_gain(&self) -> f64 {
        self.velocity_gain
    }

    pub fn acceleration_gain(&self) -> f64 {
        self.acceleration_gain
    }

    pub fn validate(&self) -> Result<()> {
        if !self.velocity_gain.is_finite() || !self.acceleration_gain.is_finite() {
            return Err(AnomalyError::InvalidParameter(format!(
                "gains must be finite (k_v {}, k_a {})",
                self.velocity_gain, self.acceleration_gain
            )));
        }
        Ok(())
    }

    /// Score one segment's slice of a feature stream.
    fn score_segment(&self, features: &[Option<f64>], out: &mut [Option<f64>]) -> Result<()> {
        let difference = |series: &[Option<f64>]| -> Vec<Option<f64>> {
            let mut diff = vec![None; series.len()];
            for t in 1..series.len() {
                if let (Some(cur), Some(prev)) = (series[t], series[t - 1]) {
                    diff[t] = Some(cur - prev);
                }
            }
            diff
        };
        let velocity = difference(features);
        let acceleration = difference(&velocity);

        let (Some(v_stats), Some(a_stats)) =
            (SegmentStats::of(&velocity)?, SegmentStats::of(&acceleration)?)
        else {
            return Ok(());
        };

        for (t, slot) in out.iter_mut().enumerate() {
            if let (Some(v), Some(a)) = (velocity[t], acceleration[t]) {
                let score = (self.velocity_gain * v_stats.normalize(v))
                    * (self.acceleration_gain * a_stats.normalize(a));
                *slot = Some(if score.is_finite() { score } else { 0.0 });
            }
        }
        Ok(())
    }
}

impl Scorer for KinematicScorer {
    fn score(
        &self,
        feature: ShapeFeature,
        stream: &[Option<f64>],
        boundaries: &SegmentBoundaries,
    ) -> Result<ScoreStream> {
        self.validate()?;
        if stream.len() != boundaries.series_len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: boundaries.series_len(),
                got: stream.len(),
            });
        }
        let mut scores = vec![None; stream.len()];
        for segment in boundaries.segments() {
            self.score_segment(&stream[segment.range()], &mut scores[segment.range()])?;
        }
        Ok(ScoreStream::new(feature, scores))
    }

    fn name(&self) -> &str {
        "VAAD"
    }
}
