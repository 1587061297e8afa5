//! Parameter grid search over a decision strategy.

use crate::core::SegmentBoundaries;
use crate::decision::{DecisionStrategy, EvtStrategy};
use crate::error::{AnomalyError, Result};
use crate::evaluation::{DetectionMetrics, Evaluator};
use crate::scoring::ScoreStream;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

/// Gate quantiles of the default EVT grid.
pub const DEFAULT_EVT_GATES: [f64; 6] = [0.70, 0.75, 0.80, 0.85, 0.90, 0.95];

/// Final quantiles of the default EVT grid. Crossed with
/// [`DEFAULT_EVT_GATES`], [`evt_grid`] drops the (0.95, 0.95) pair and
/// leaves 29 cells.
pub const DEFAULT_EVT_TARGETS: [f64; 5] = [0.95, 0.975, 0.99, 0.995, 0.999];

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell<P> {
    pub params: P,
    /// Position of `params` in the input grid.
    pub position: usize,
    pub metrics: DetectionMetrics,
}

/// An EVT (gate, final) quantile pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvtGridPoint {
    pub gate: f64,
    pub target: f64,
}

/// Evaluate the strategy built by `factory` at every grid point.
///
/// Cells are computed in parallel and returned sorted by F1 descending,
/// ties kept in grid order. The first error from `factory` or a strategy
/// aborts the search.
pub fn grid_search<P, S, F>(
    grid: &[P],
    factory: F,
    scores: &ScoreStream,
    boundaries: &SegmentBoundaries,
    ground_truth: &[bool],
    evaluator: &Evaluator,
) -> Result<Vec<GridCell<P>>>
where
    P: Clone + Send + Sync,
    S: DecisionStrategy,
    F: Fn(&P) -> Result<S> + Sync,
{
    if grid.is_empty() {
        return Err(AnomalyError::InvalidParameter("empty parameter grid".to_string()));
    }
    let mut cells = grid
        .par_iter()
        .enumerate()
        .map(|(position, params)| {
            let strategy = factory(params)?;
            let prediction = strategy.decide(scores, boundaries, Some(ground_truth))?;
            Ok(GridCell {
                params: params.clone(),
                position,
                metrics: evaluator.evaluate(prediction.flags(), ground_truth)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    cells.sort_by(|a, b| {
        b.metrics
            .f1
            .total_cmp(&a.metrics.f1)
            .then(a.position.cmp(&b.position))
    });
    if let Some(best) = cells.first() {
        info!(
            feature = scores.feature().name(),
            cells = cells.len(),
            best_f1 = best.metrics.f1,
            best_position = best.position,
            "grid search finished"
        );
    }
    Ok(cells)
}

/// Every (gate, final) pair with `final > gate`, gate-major.
pub fn evt_grid(gates: &[f64], targets: &[f64]) -> Vec<EvtGridPoint> {
    gates
        .iter()
        .flat_map(|&gate| {
            targets
                .iter()
                .filter(move |&&target| target > gate)
                .map(move |&target| EvtGridPoint { gate, target })
        })
        .collect()
}

/// Grid search over EVT (gate, final) pairs.
pub fn evt_grid_search(
    grid: &[EvtGridPoint],
    min_tail: usize,
    scores: &ScoreStream,
    boundaries: &SegmentBoundaries,
    ground_truth: &[bool],
    evaluator: &Evaluator,
) -> Result<Vec<GridCell<EvtGridPoint>>> {
    grid_search(
        grid,
        |p| Ok(EvtStrategy::new(p.gate, p.target)?.with_min_tail(min_tail)),
        scores,
        boundaries,
        ground_truth,
        evaluator,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::QuantileStrategy;
    use crate::topology::ShapeFeature;

    fn stream_with_spike(n: usize, spike: usize) -> (ScoreStream, Vec<bool>) {
        let mut values: Vec<Option<f64>> = (0..n).map(|i| Some(((i * 7) % 11) as f64)).collect();
        values[spike] = Some(100.0);
        let mut truth = vec![false; n];
        truth[spike] = true;
        (ScoreStream::new(ShapeFeature::L2Norm, values), truth)
    }

    #[test]
    fn evt_grid_keeps_valid_pairs() {
        let grid = evt_grid(&[0.8, 0.99], &[0.9, 0.99, 0.995]);
        assert_eq!(
            grid,
            vec![
                EvtGridPoint { gate: 0.8, target: 0.9 },
                EvtGridPoint { gate: 0.8, target: 0.99 },
                EvtGridPoint { gate: 0.8, target: 0.995 },
                EvtGridPoint { gate: 0.99, target: 0.995 },
            ]
        );

        // 6 gates x 5 targets, minus the (0.95, 0.95) pair where final == gate.
        let defaults = evt_grid(&DEFAULT_EVT_GATES, &DEFAULT_EVT_TARGETS);
        assert_eq!(defaults.len(), 29);
        assert!(!defaults.contains(&EvtGridPoint { gate: 0.95, target: 0.95 }));
        assert!(defaults.iter().all(|p| p.target > p.gate));
    }

    #[test]
    fn cells_are_sorted_by_f1_then_position() {
        let (scores, truth) = stream_with_spike(200, 120);
        let b = SegmentBoundaries::single(200);
        let grid = [0.5, 0.999, 0.9, 0.995];
        let cells = grid_search(
            &grid,
            |&q| QuantileStrategy::new(q),
            &scores,
            &b,
            &truth,
            &Evaluator::new(0),
        )
        .unwrap();
        assert_eq!(cells.len(), 4);
        assert_eq!(cells[0].params, 0.999);
        assert_eq!(cells[0].metrics.f1, 1.0);
        for w in cells.windows(2) {
            assert!(
                w[0].metrics.f1 > w[1].metrics.f1
                    || (w[0].metrics.f1 == w[1].metrics.f1 && w[0].position < w[1].position)
            );
        }
    }

    #[test]
    fn factory_errors_abort() {
        let (scores, truth) = stream_with_spike(50, 10);
        let b = SegmentBoundaries::single(50);
        let result = grid_search(
            &[0.5, 2.0],
            |&q| QuantileStrategy::new(q),
            &scores,
            &b,
            &truth,
            &Evaluator::default(),
        );
        assert_eq!(result, Err(AnomalyError::InvalidQuantile(2.0)));
        assert!(grid_search(
            &[] as &[f64],
            |&q| QuantileStrategy::new(q),
            &scores,
            &b,
            &truth,
            &Evaluator::default()
        )
        .is_err());
    }

    #[test]
    fn evt_search_is_deterministic() {
        let (scores, truth) = stream_with_spike(300, 150);
        let b = SegmentBoundaries::single(300);
        let grid = evt_grid(&[0.8, 0.85], &[0.99, 0.995]);
        let run = || evt_grid_search(&grid, 20, &scores, &b, &truth, &Evaluator::default()).unwrap();
        assert_eq!(run(), run());
    }
}
