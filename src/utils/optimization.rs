//! Derivative-free minimization for small likelihood problems.
//!
//! The only consumer is the generalized Pareto fit, which minimizes a
//! two-parameter negative log-likelihood with a hard support constraint.
//! The objective may return a large finite penalty outside its support;
//! the simplex then contracts back into the feasible region.

/// Outcome of a simplex minimization.
#[derive(Debug, Clone)]
pub struct SimplexResult {
    /// Best vertex found.
    pub point: Vec<f64>,
    /// Objective value at `point`.
    pub value: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether the value spread or the simplex diameter fell below tolerance.
    pub converged: bool,
}

/// Nelder-Mead coefficients and stopping rules.
#[derive(Debug, Clone)]
pub struct SimplexConfig {
    pub max_iter: usize,
    pub tolerance: f64,
    /// Reflection coefficient.
    pub reflection: f64,
    /// Expansion coefficient.
    pub expansion: f64,
    /// Contraction coefficient.
    pub contraction: f64,
    /// Shrink coefficient.
    pub shrink: f64,
    /// Relative size of the initial simplex.
    pub initial_step: f64,
}

impl Default for SimplexConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-10,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
            initial_step: 0.05,
        }
    }
}

struct Simplex<'a> {
    vertices: Vec<Vec<f64>>,
    values: Vec<f64>,
    bounds: Option<&'a [(f64, f64)]>,
}

impl Simplex<'_> {
    fn clamp(&self, mut point: Vec<f64>) -> Vec<f64> {
        if let Some(bounds) = self.bounds {
            for (x, &(lo, hi)) in point.iter_mut().zip(bounds) {
                *x = x.clamp(lo, hi);
            }
        }
        point
    }

    /// Vertex indices ordered best to worst.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.vertices.len()).collect();
        order.sort_by(|&a, &b| self.values[a].total_cmp(&self.values[b]));
        order
    }

    fn centroid_without(&self, excluded: usize) -> Vec<f64> {
        let dim = self.vertices[0].len();
        let mut centroid = vec![0.0; dim];
        for (_, vertex) in self
            .vertices
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != excluded)
        {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v;
            }
        }
        let count = (self.vertices.len() - 1) as f64;
        centroid.iter_mut().for_each(|c| *c /= count);
        centroid
    }

    fn replace(&mut self, index: usize, point: Vec<f64>, value: f64) {
        self.vertices[index] = point;
        self.values[index] = value;
    }
}

/// Affine step `from + t * (to - from)`.
fn lerp(from: &[f64], to: &[f64], t: f64) -> Vec<f64> {
    from.iter().zip(to).map(|(f, x)| f + t * (x - f)).collect()
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Minimize `objective` from `initial` with the Nelder-Mead simplex method.
///
/// # Example
/// ```
/// use topo_vaad::utils::optimization::{minimize, SimplexConfig};
///
/// let result = minimize(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     &SimplexConfig::default(),
/// );
/// assert!(result.converged);
/// assert!((result.point[0] - 2.0).abs() < 1e-3);
/// ```
pub fn minimize<F>(
    objective: F,
    initial: &[f64],
    bounds: Option<&[(f64, f64)]>,
    config: &SimplexConfig,
) -> SimplexResult
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 {
        return SimplexResult {
            point: Vec::new(),
            value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let mut simplex = Simplex {
        vertices: Vec::with_capacity(dim + 1),
        values: Vec::with_capacity(dim + 1),
        bounds,
    };
    let start = simplex.clamp(initial.to_vec());
    simplex.vertices.push(start.clone());
    for i in 0..dim {
        let mut vertex = start.clone();
        vertex[i] += if start[i].abs() > 1e-10 {
            config.initial_step * start[i].abs()
        } else {
            config.initial_step
        };
        let vertex = simplex.clamp(vertex);
        simplex.vertices.push(vertex);
    }
    simplex.values = simplex.vertices.iter().map(|v| objective(v)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;

        let order = simplex.ranking();
        let (best, worst, second_worst) = (order[0], order[dim], order[dim - 1]);

        if simplex.values[worst] - simplex.values[best] < config.tolerance {
            converged = true;
            break;
        }
        let centroid = simplex.centroid_without(worst);
        let diameter = simplex
            .vertices
            .iter()
            .map(|v| distance(v, &centroid))
            .fold(0.0, f64::max);
        if diameter < config.tolerance {
            converged = true;
            break;
        }

        let reflected = simplex.clamp(lerp(
            &centroid,
            &simplex.vertices[worst],
            -config.reflection,
        ));
        let reflected_value = objective(&reflected);

        if reflected_value < simplex.values[best] {
            let expanded = simplex.clamp(lerp(&centroid, &reflected, config.expansion));
            let expanded_value = objective(&expanded);
            if expanded_value < reflected_value {
                simplex.replace(worst, expanded, expanded_value);
            } else {
                simplex.replace(worst, reflected, reflected_value);
            }
            continue;
        }
        if reflected_value < simplex.values[second_worst] {
            simplex.replace(worst, reflected, reflected_value);
            continue;
        }

        let outside = reflected_value < simplex.values[worst];
        let target = if outside {
            reflected.clone()
        } else {
            simplex.vertices[worst].clone()
        };
        let contracted = simplex.clamp(lerp(&centroid, &target, config.contraction));
        let contracted_value = objective(&contracted);
        let accept = if outside {
            contracted_value <= reflected_value
        } else {
            contracted_value < simplex.values[worst]
        };
        if accept {
            simplex.replace(worst, contracted, contracted_value);
            continue;
        }

        let anchor = simplex.vertices[best].clone();
        for i in (0..=dim).filter(|&i| i != best) {
            let shrunk = simplex.clamp(lerp(&anchor, &simplex.vertices[i], config.shrink));
            let value = objective(&shrunk);
            simplex.replace(i, shrunk, value);
        }
    }

    let best = simplex.ranking()[0];
    SimplexResult {
        point: simplex.vertices[best].clone(),
        value: simplex.values[best],
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn minimizes_quadratic_bowl() {
        let result = minimize(
            |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
            &[0.0, 0.0],
            None,
            &SimplexConfig::default(),
        );
        assert!(result.converged);
        assert_relative_eq!(result.point[0], 2.0, epsilon = 1e-4);
        assert_relative_eq!(result.point[1], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn respects_bounds() {
        let result = minimize(
            |x| (x[0] - 5.0).powi(2),
            &[1.0],
            Some(&[(0.0, 3.0)]),
            &SimplexConfig::default(),
        );
        assert_relative_eq!(result.point[0], 3.0, epsilon = 1e-4);
    }

    #[test]
    fn recovers_from_penalized_region() {
        // Feasible only for x > 1; the optimum sits at x = 2.
        let objective = |x: &[f64]| {
            if x[0] <= 1.0 {
                1e12
            } else {
                (x[0] - 2.0).powi(2)
            }
        };
        let result = minimize(objective, &[1.5], None, &SimplexConfig::default());
        assert!(result.converged);
        assert_relative_eq!(result.point[0], 2.0, epsilon = 1e-3);
    }

    #[test]
    fn empty_initial_point_does_not_converge() {
        let result = minimize(|_| 0.0, &[], None, &SimplexConfig::default());
        assert!(!result.converged);
        assert!(result.value.is_nan());
    }

    #[test]
    fn stops_at_iteration_budget() {
        let config = SimplexConfig {
            max_iter: 3,
            ..Default::default()
        };
        let result = minimize(
            |x| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2),
            &[-1.2, 1.0],
            None,
            &config,
        );
        assert_eq!(result.iterations, 3);
        assert!(!result.converged);
    }
}
