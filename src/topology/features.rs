//! Scalar summaries of an H0 lifetime multiset.
//!
//! Every feature is a pure function of the strictly positive finite
//! lifetimes `L` of one window. With `L` sorted descending as
//! `l_0 >= ... >= l_{n-1}` and rank coordinates `r_i = i / (n - 1)`, the
//! sorted lifetimes trace a decreasing piecewise-linear landscape curve on
//! `[0, 1]`; several features integrate or weight that curve.
//!
//! An empty multiset (flat window, single point) maps every feature to 0.

use crate::error::{AnomalyError, Result};
use crate::utils::stats::{gini, quantile_of_sorted};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quantile level of [`ShapeFeature::UpperQuantile`].
pub const UPPER_QUANTILE_LEVEL: f64 = 0.9;

/// A topological shape descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeFeature {
    /// Longest lifetime, max(L).
    Bottleneck,
    /// Trapezoid area under the sorted-lifetime landscape.
    Auc,
    /// `auc / max(L)`.
    AucOverMax,
    /// `auc / ||L||_2`.
    AucOverL2,
    /// `auc / sum(L)`.
    RatioAucL1ToSum,
    /// Gini coefficient of L.
    Gini,
    /// `||L||_2`.
    #[serde(rename = "l2norm")]
    L2Norm,
    /// `||L||_2 / sum(L)`, in [0, 1].
    EnergyConcentration,
    /// `sum(L)`.
    TotalPersistence,
    /// `max(L) / sum(L)`.
    DominantShare,
    /// Lifetime-weighted mean rank, `sum(r_i l_i) / sum(L)`.
    Centroid,
    /// Mean second difference of the landscape over `max(L)`.
    TailConcavity,
    /// 0.9-quantile of L.
    UpperQuantile,
}

impl ShapeFeature {
    pub const COUNT: usize = 13;

    pub const ALL: [ShapeFeature; Self::COUNT] = [
        ShapeFeature::Bottleneck,
        ShapeFeature::Auc,
        ShapeFeature::AucOverMax,
        ShapeFeature::AucOverL2,
        ShapeFeature::RatioAucL1ToSum,
        ShapeFeature::Gini,
        ShapeFeature::L2Norm,
        ShapeFeature::EnergyConcentration,
        ShapeFeature::TotalPersistence,
        ShapeFeature::DominantShare,
        ShapeFeature::Centroid,
        ShapeFeature::TailConcavity,
        ShapeFeature::UpperQuantile,
    ];

    /// Column name used in tables and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeFeature::Bottleneck => "bottleneck",
            ShapeFeature::Auc => "auc",
            ShapeFeature::AucOverMax => "auc_over_max",
            ShapeFeature::AucOverL2 => "auc_over_l2",
            ShapeFeature::RatioAucL1ToSum => "ratio_auc_l1_to_sum",
            ShapeFeature::Gini => "gini",
            ShapeFeature::L2Norm => "l2norm",
            ShapeFeature::EnergyConcentration => "energy_concentration",
            ShapeFeature::TotalPersistence => "total_persistence",
            ShapeFeature::DominantShare => "dominant_share",
            ShapeFeature::Centroid => "centroid",
            ShapeFeature::TailConcavity => "tail_concavity",
            ShapeFeature::UpperQuantile => "upper_quantile",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    /// Compute this feature alone.
    pub fn compute(&self, lifetimes: &[f64]) -> f64 {
        FeatureVector::from_lifetimes(lifetimes).get(*self)
    }
}

impl fmt::Display for ShapeFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeFeature {
    type Err = AnomalyError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase();
        ShapeFeature::ALL
            .into_iter()
            .find(|f| f.name() == key)
            .ok_or_else(|| AnomalyError::InvalidParameter(format!("unknown feature '{}'", s)))
    }
}

/// Values of all [`ShapeFeature`]s for one timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    values: [f64; ShapeFeature::COUNT],
}

impl FeatureVector {
    /// All features equal to the 0 sentinel.
    pub fn zeros() -> Self {
        Self {
            values: [0.0; ShapeFeature::COUNT],
        }
    }

    /// Reduce a lifetime multiset to every feature.
    ///
    /// Non-positive and non-finite entries are ignored, so callers may pass
    /// raw death radii.
    pub fn from_lifetimes(lifetimes: &[f64]) -> Self {
        let mut sorted: Vec<f64> = lifetimes
            .iter()
            .copied()
            .filter(|l| l.is_finite() && *l > 0.0)
            .collect();
        sorted.sort_by(|a, b| b.total_cmp(a));
        Self::from_sorted_desc(&sorted)
    }

    /// Reduce lifetimes that are already positive, finite and sorted
    /// descending.
    pub fn from_sorted_desc(sorted: &[f64]) -> Self {
        let n = sorted.len();
        if n == 0 {
            return Self::zeros();
        }

        let max = sorted[0];
        let sum: f64 = sorted.iter().sum();
        let l2 = sorted.iter().map(|l| l * l).sum::<f64>().sqrt();

        let (auc, centroid) = if n == 1 {
            (max, 0.0)
        } else {
            let step = 1.0 / (n - 1) as f64;
            let auc: f64 = sorted
                .windows(2)
                .map(|w| 0.5 * (w[0] + w[1]) * step)
                .sum();
            let weighted: f64 = sorted
                .iter()
                .enumerate()
                .map(|(i, l)| i as f64 * step * l)
                .sum();
            (auc, weighted / sum)
        };

        let tail_concavity = if n < 3 {
            0.0
        } else {
            let second: f64 = sorted
                .windows(3)
                .map(|w| w[0] - 2.0 * w[1] + w[2])
                .sum();
            second / (n - 2) as f64 / max
        };

        let mut ascending = sorted.to_vec();
        ascending.reverse();
        let upper = quantile_of_sorted(&ascending, UPPER_QUANTILE_LEVEL);

        let mut values = [0.0; ShapeFeature::COUNT];
        values[ShapeFeature::Bottleneck.index()] = max;
        values[ShapeFeature::Auc.index()] = auc;
        values[ShapeFeature::AucOverMax.index()] = auc / max;
        values[ShapeFeature::AucOverL2.index()] = auc / l2;
        values[ShapeFeature::RatioAucL1ToSum.index()] = auc / sum;
        values[ShapeFeature::Gini.index()] = gini(sorted);
        values[ShapeFeature::L2Norm.index()] = l2;
        values[ShapeFeature::EnergyConcentration.index()] = (l2 / sum).min(1.0);
        values[ShapeFeature::TotalPersistence.index()] = sum;
        values[ShapeFeature::DominantShare.index()] = max / sum;
        values[ShapeFeature::Centroid.index()] = centroid;
        values[ShapeFeature::TailConcavity.index()] = tail_concavity;
        values[ShapeFeature::UpperQuantile.index()] = upper;

        // Guard against overflow in pathological magnitudes.
        for v in values.iter_mut() {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
        Self { values }
    }

    pub fn get(&self, feature: ShapeFeature) -> f64 {
        self.values[feature.index()]
    }

    /// (feature, value) pairs in [`ShapeFeature::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeFeature, f64)> + '_ {
        ShapeFeature::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}
