//! Property-based tests for the detection pipeline.
//!
//! These tests verify invariants that should hold for all valid inputs,
//! using randomly generated lifetimes, score streams and label vectors.

use proptest::prelude::*;
use topo_vaad::core::SegmentBoundaries;
use topo_vaad::decision::{DecisionStrategy, EvtStrategy, PotStrategy, QuantileStrategy};
use topo_vaad::evaluation::Evaluator;
use topo_vaad::scoring::ScoreStream;
use topo_vaad::topology::{EmbeddingConfig, FeatureVector, ShapeExtractor, ShapeFeature};
use topo_vaad::utils::stats::{gini, robust_normalize};
use topo_vaad::utils::tail::gpd_exceedance_threshold;

/// Strategy for generating non-empty positive lifetime multisets.
fn lifetimes_strategy(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1e-3..100.0_f64, 1..max_len)
}

/// Strategy for generating score streams with undefined gaps.
fn scores_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::weighted(0.9, -50.0..50.0_f64), min_len..max_len)
}

/// Strategy for generating aligned (prediction, truth) label pairs.
fn labels_strategy(max_len: usize) -> impl Strategy<Value = (Vec<bool>, Vec<bool>)> {
    (1..max_len).prop_flat_map(|len| {
        (
            prop::collection::vec(prop::bool::weighted(0.1), len),
            prop::collection::vec(prop::bool::weighted(0.1), len),
        )
    })
}

// =============================================================================
// Property: shape features
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn bottleneck_is_max_lifetime(lifetimes in lifetimes_strategy(40)) {
        let fv = FeatureVector::from_lifetimes(&lifetimes);
        let max = lifetimes.iter().cloned().fold(f64::MIN, f64::max);
        prop_assert_eq!(fv.get(ShapeFeature::Bottleneck), max);
    }

    #[test]
    fn energy_concentration_in_unit_interval(lifetimes in lifetimes_strategy(40)) {
        let e = FeatureVector::from_lifetimes(&lifetimes).get(ShapeFeature::EnergyConcentration);
        prop_assert!((0.0..=1.0).contains(&e), "energy concentration {}", e);
    }

    #[test]
    fn all_features_are_finite(lifetimes in prop::collection::vec(0.0..1e6_f64, 0..40)) {
        let fv = FeatureVector::from_lifetimes(&lifetimes);
        for (feature, value) in fv.iter() {
            prop_assert!(value.is_finite(), "{} = {}", feature, value);
        }
    }

    #[test]
    fn gini_of_repeated_value_is_zero(x in 0.0..1e3_f64, n in 0usize..10) {
        prop_assert_eq!(gini(&vec![x; n]), 0.0);
    }

    #[test]
    fn gini_is_in_unit_interval(lifetimes in lifetimes_strategy(40)) {
        let g = gini(&lifetimes);
        prop_assert!((0.0..1.0).contains(&g), "gini {}", g);
    }

    #[test]
    fn features_are_translation_invariant(
        window in prop::collection::vec(-10.0..10.0_f64, 12),
        shift in -100.0..100.0_f64
    ) {
        let extractor = ShapeExtractor::new(EmbeddingConfig::new(12, 3, 2).unwrap());
        let base = extractor.window_features(&window).unwrap();
        let shifted: Vec<f64> = window.iter().map(|x| x + shift).collect();
        let moved = extractor.window_features(&shifted).unwrap();
        let a = base.get(ShapeFeature::TotalPersistence);
        let b = moved.get(ShapeFeature::TotalPersistence);
        prop_assert!((a - b).abs() <= 1e-6 * a.max(1.0), "{} vs {}", a, b);
    }
}

// =============================================================================
// Property: robust normalization never produces non-finite values
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn zero_scale_normalizes_to_zero(x in -1e9..1e9_f64, center in -1e9..1e9_f64) {
        prop_assert_eq!(robust_normalize(x, center, 0.0), 0.0);
    }
}

// =============================================================================
// Property: evaluator
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn perfect_prediction_has_unit_f1(
        (_, truth) in labels_strategy(200),
        tolerance in 0usize..10
    ) {
        let m = Evaluator::new(tolerance).evaluate(&truth, &truth).unwrap();
        prop_assert_eq!(m.f1, 1.0);
    }

    #[test]
    fn f1_non_decreasing_in_tolerance(
        (predicted, truth) in labels_strategy(200),
        lo in 0usize..8,
        extra in 0usize..8
    ) {
        let narrow = Evaluator::new(lo).evaluate(&predicted, &truth).unwrap();
        let wide = Evaluator::new(lo + extra).evaluate(&predicted, &truth).unwrap();
        prop_assert!(wide.f1 >= narrow.f1, "f1 {} at {} < {} at {}", wide.f1, lo + extra, narrow.f1, lo);
    }

    #[test]
    fn confusion_counts_are_consistent((predicted, truth) in labels_strategy(200), tolerance in 0usize..6) {
        let m = Evaluator::new(tolerance).evaluate(&predicted, &truth).unwrap();
        prop_assert!(m.false_positives <= m.total_predicted);
        prop_assert!(m.true_negatives + m.false_positives <= truth.len());
        prop_assert!((0.0..=1.0).contains(&m.precision));
        prop_assert!((0.0..=1.0).contains(&m.recall));
    }
}

// =============================================================================
// Property: decision layer
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    #[test]
    fn exceedance_threshold_monotone_in_target(
        shape in -0.45..2.5_f64,
        scale in 0.01..10.0_f64,
        gate in 0.0..10.0_f64,
        f_lo in 0.9..0.99_f64,
        step in 0.0..0.009_f64
    ) {
        let lo = gpd_exceedance_threshold(shape, scale, gate, 1000, 100, f_lo).unwrap();
        let hi = gpd_exceedance_threshold(shape, scale, gate, 1000, 100, f_lo + step).unwrap();
        prop_assert!(hi >= lo, "{} < {}", hi, lo);
    }

    #[test]
    fn evt_thresholds_monotone_in_target(
        scores in scores_strategy(60, 300),
        step in 0.001..0.04_f64
    ) {
        let n = scores.len();
        let stream = ScoreStream::new(ShapeFeature::L2Norm, scores);
        let b = SegmentBoundaries::single(n);
        let lo = EvtStrategy::new(0.85, 0.95).unwrap().decide_detailed(&stream, &b).unwrap();
        let hi = EvtStrategy::new(0.85, 0.95 + step).unwrap().decide_detailed(&stream, &b).unwrap();
        for (a, z) in lo.segments.iter().zip(&hi.segments) {
            prop_assert!(z.threshold >= a.threshold, "{} < {}", z.threshold, a.threshold);
        }
        prop_assert!(hi.prediction.positive_count() <= lo.prediction.positive_count());
    }

    #[test]
    fn evt_is_deterministic(scores in scores_strategy(40, 300)) {
        let n = scores.len();
        let stream = ScoreStream::new(ShapeFeature::Auc, scores);
        let b = SegmentBoundaries::single(n);
        let evt = EvtStrategy::default();
        let first = evt.decide_detailed(&stream, &b).unwrap();
        let second = evt.decide_detailed(&stream, &b).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn undefined_scores_are_never_flagged(scores in scores_strategy(10, 200)) {
        let n = scores.len();
        let stream = ScoreStream::new(ShapeFeature::Gini, scores.clone());
        let b = SegmentBoundaries::single(n);
        let strategies: Vec<Box<dyn DecisionStrategy>> = vec![
            Box::new(QuantileStrategy::default()),
            Box::new(PotStrategy::default()),
            Box::new(EvtStrategy::default()),
        ];
        for strategy in &strategies {
            let p = strategy.decide(&stream, &b, None).unwrap();
            for i in p.positives() {
                prop_assert!(scores[i].is_some(), "{} flagged undefined index {}", strategy.name(), i);
            }
        }
    }
}
