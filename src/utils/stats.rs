//! Robust statistical primitives.
//!
//! Everything downstream of the extractor normalizes with medians and
//! median absolute deviations rather than means and standard deviations, so
//! a single anomaly cannot inflate the scale it is measured against.

use crate::error::{AnomalyError, Result};

/// Consistency constant turning a MAD into a standard-deviation equivalent
/// under normality (1 / Phi^-1(0.75)).
pub const MAD_SCALE: f64 = 1.4826;

/// Consistency constant for the mean absolute deviation (sqrt(pi / 2)).
pub const MEAN_AD_SCALE: f64 = 1.2533;

/// Scales at or below this are treated as zero.
pub const SCALE_EPSILON: f64 = 1e-12;

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n.is_multiple_of(2) {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Calculate the mean of a slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (n denominator). Returns 0 for fewer than
/// two values.
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Calculate the median of a slice.
///
/// # Errors
/// `DegenerateInput` when `values` is empty.
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(AnomalyError::DegenerateInput(
            "median of empty slice".to_string(),
        ));
    }
    Ok(median_of_sorted(&sorted_copy(values)))
}

/// Median absolute deviation around the median, scaled by [`MAD_SCALE`].
///
/// Returns 0 (not NaN) for constant input.
///
/// # Example
/// ```
/// use topo_vaad::utils::stats::mad;
///
/// let m = mad(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
/// assert!((m - 1.4826).abs() < 1e-9);
/// ```
pub fn mad(values: &[f64]) -> Result<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    Ok(median_of_sorted(&sorted_copy(&deviations)) * MAD_SCALE)
}

/// Robust scale estimate for normalization.
///
/// The scaled MAD when it is positive; otherwise the scaled mean absolute
/// deviation around the median, which is zero only for constant input. A
/// series that is constant except for a handful of points has zero MAD but
/// a positive fallback scale.
pub fn robust_scale(values: &[f64]) -> Result<f64> {
    let center = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - center).abs()).collect();
    let mad = median_of_sorted(&sorted_copy(&deviations)) * MAD_SCALE;
    if mad > SCALE_EPSILON {
        return Ok(mad);
    }
    Ok(mean(&deviations) * MEAN_AD_SCALE)
}

/// Normalize `x` as `(x - center) / scale`.
///
/// A scale at or below [`SCALE_EPSILON`] yields 0 regardless of the
/// numerator, so a flat reference never produces Inf or NaN.
pub fn robust_normalize(x: f64, center: f64, scale: f64) -> f64 {
    if !(scale > SCALE_EPSILON) || !x.is_finite() || !center.is_finite() {
        return 0.0;
    }
    (x - center) / scale
}

/// Linear-interpolation quantile.
///
/// # Errors
/// `InvalidQuantile` when `q` lies outside [0, 1]; `DegenerateInput` when
/// `values` is empty.
///
/// # Example
/// ```
/// use topo_vaad::utils::stats::quantile;
///
/// let q = quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.25).unwrap();
/// assert!((q - 2.0).abs() < 1e-12);
/// ```
pub fn quantile(values: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(AnomalyError::InvalidQuantile(q));
    }
    if values.is_empty() {
        return Err(AnomalyError::DegenerateInput(
            "quantile of empty slice".to_string(),
        ));
    }
    let sorted = sorted_copy(values);
    Ok(quantile_of_sorted(&sorted, q))
}

/// Quantile of already sorted, non-empty data. `q` must be in [0, 1].
pub(crate) fn quantile_of_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Gini coefficient of a non-negative multiset.
///
/// Uses the rank form `sum((2i - n - 1) * x_(i)) / (n * sum(x))` over the
/// ascending order statistics. The rank weights sum to zero, so order
/// statistics are measured from the minimum and repeated equal values give
/// exactly 0. Returns 0 for at most one element or an all-zero input.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }
    let total: f64 = values.iter().sum();
    if !(total > 0.0) {
        return 0.0;
    }
    let sorted = sorted_copy(values);
    let min = sorted[0];
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &x)| (2.0 * (i + 1) as f64 - n as f64 - 1.0) * (x - min))
        .sum();
    (weighted / (n as f64 * total)).max(0.0)
}
