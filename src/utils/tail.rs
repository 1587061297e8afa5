//! Generalized Pareto tail estimation (peaks-over-threshold).
//!
//! Excesses `y = x - u` over a high gate `u` are modelled as
//! GPD(shape xi, scale sigma) with density
//! `(1/sigma) * (1 + xi * y / sigma)^(-1/xi - 1)`, reducing to the
//! exponential distribution as xi -> 0.

use crate::error::{AnomalyError, Result};
use crate::utils::optimization::{minimize, SimplexConfig};
use crate::utils::stats::mean;
use tracing::debug;

/// Smallest number of excesses a fit is attempted on.
pub const MIN_TAIL_SAMPLES: usize = 10;

/// Shapes closer to zero than this use the exponential limit.
const SHAPE_EPSILON: f64 = 1e-9;

/// Objective value for parameters outside the GPD support.
const INFEASIBLE: f64 = 1e12;

/// Estimator that produced a [`GpdFit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpdMethod {
    MaximumLikelihood,
    MethodOfMoments,
}

/// Fitted generalized Pareto parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpdFit {
    /// Shape xi.
    pub shape: f64,
    /// Scale sigma, always positive.
    pub scale: f64,
    pub method: GpdMethod,
    /// Number of excesses the fit used.
    pub n_excesses: usize,
}

/// Fit a GPD to excesses over a threshold with at least
/// [`MIN_TAIL_SAMPLES`] observations.
pub fn fit_generalized_pareto(excesses: &[f64]) -> Result<GpdFit> {
    fit_generalized_pareto_with(excesses, MIN_TAIL_SAMPLES)
}

/// Fit a GPD by maximum likelihood, starting from (and falling back to) the
/// method-of-moments estimate.
///
/// # Errors
/// `TailFit` when fewer than `min_samples` excesses are given, when the
/// excesses are negative or non-finite, or when they have zero variance so
/// that neither estimator is defined.
pub fn fit_generalized_pareto_with(excesses: &[f64], min_samples: usize) -> Result<GpdFit> {
    let min_samples = min_samples.max(2);
    if excesses.len() < min_samples {
        return Err(AnomalyError::TailFit(format!(
            "{} tail samples, need at least {}",
            excesses.len(),
            min_samples
        )));
    }
    if excesses.iter().any(|y| !y.is_finite() || *y < 0.0) {
        return Err(AnomalyError::TailFit(
            "excesses must be finite and non-negative".to_string(),
        ));
    }

    let (shape0, scale0) = method_of_moments(excesses).ok_or_else(|| {
        AnomalyError::TailFit("tail excesses have zero mean or variance".to_string())
    })?;

    let objective = |p: &[f64]| negative_log_likelihood(p[0], p[1], excesses);
    let bounds = [(-0.5, 3.0), (-50.0, 50.0)];
    let initial = [shape0.clamp(-0.45, 0.95), scale0.ln().clamp(-50.0, 50.0)];
    let result = minimize(objective, &initial, Some(&bounds), &SimplexConfig::default());

    if result.converged && result.value.is_finite() && result.value < INFEASIBLE {
        return Ok(GpdFit {
            shape: result.point[0],
            scale: result.point[1].exp(),
            method: GpdMethod::MaximumLikelihood,
            n_excesses: excesses.len(),
        });
    }

    debug!(
        iterations = result.iterations,
        n = excesses.len(),
        "GPD likelihood did not converge, using moment estimates"
    );
    Ok(GpdFit {
        shape: shape0,
        scale: scale0,
        method: GpdMethod::MethodOfMoments,
        n_excesses: excesses.len(),
    })
}

/// Moment estimates `xi = (1 - m^2/v) / 2`, `sigma = m (m^2/v + 1) / 2`.
fn method_of_moments(excesses: &[f64]) -> Option<(f64, f64)> {
    let m = mean(excesses);
    let n = excesses.len() as f64;
    let v = excesses.iter().map(|y| (y - m).powi(2)).sum::<f64>() / (n - 1.0);
    if !(m > 0.0) || !(v > 0.0) {
        return None;
    }
    let ratio = m * m / v;
    let shape = 0.5 * (1.0 - ratio);
    let scale = 0.5 * m * (ratio + 1.0);
    (shape.is_finite() && scale.is_finite() && scale > 0.0).then_some((shape, scale))
}

/// GPD negative log-likelihood in (xi, ln sigma).
fn negative_log_likelihood(shape: f64, log_scale: f64, excesses: &[f64]) -> f64 {
    let scale = log_scale.exp();
    let n = excesses.len() as f64;
    if shape.abs() < SHAPE_EPSILON {
        return n * log_scale + excesses.iter().map(|y| y / scale).sum::<f64>();
    }
    let mut total = n * log_scale;
    for y in excesses {
        let z = 1.0 + shape * y / scale;
        if z <= 0.0 {
            return INFEASIBLE;
        }
        total += (1.0 + 1.0 / shape) * z.ln();
    }
    total
}

/// Value exceeded with probability `1 - target_prob` under the fitted tail.
///
/// `threshold = gate + (sigma / xi) * (((n_total / n_tail) * (1 - target))^(-xi) - 1)`,
/// or `gate - sigma * ln((n_total / n_tail) * (1 - target))` for xi near 0.
/// Non-decreasing in `target_prob`.
///
/// # Errors
/// `InvalidQuantile` unless `0 < target_prob < 1`; `InvalidParameter` for a
/// non-positive scale or tail counts with `n_tail == 0` or
/// `n_tail > n_total`.
///
/// # Example
/// ```
/// use topo_vaad::utils::tail::gpd_exceedance_threshold;
///
/// // Exponential tail (xi = 0) with unit scale: 100 of 1000 samples above
/// // the gate, so the 0.99 quantile sits ln(10) above it.
/// let t = gpd_exceedance_threshold(0.0, 1.0, 5.0, 1000, 100, 0.99).unwrap();
/// assert!((t - (5.0 + 10f64.ln())).abs() < 1e-9);
/// ```
pub fn gpd_exceedance_threshold(
    shape: f64,
    scale: f64,
    gate: f64,
    n_total: usize,
    n_tail: usize,
    target_prob: f64,
) -> Result<f64> {
    if !(target_prob > 0.0 && target_prob < 1.0) {
        return Err(AnomalyError::InvalidQuantile(target_prob));
    }
    if !(scale > 0.0) || !scale.is_finite() || !shape.is_finite() {
        return Err(AnomalyError::InvalidParameter(format!(
            "GPD parameters must be finite with positive scale (shape {}, scale {})",
            shape, scale
        )));
    }
    if n_tail == 0 || n_tail > n_total {
        return Err(AnomalyError::InvalidParameter(format!(
            "tail count {} incompatible with total {}",
            n_tail, n_total
        )));
    }

    let rate = (n_total as f64 / n_tail as f64) * (1.0 - target_prob);
    if shape.abs() < SHAPE_EPSILON {
        return Ok(gate - scale * rate.ln());
    }
    Ok(gate + (scale / shape) * (rate.powf(-shape) - 1.0))
}
