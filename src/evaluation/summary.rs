//! Per-strategy result tables.

use crate::evaluation::DetectionMetrics;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Evaluation of one feature under one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub feature: String,
    pub metrics: DetectionMetrics,
}

impl ResultRow {
    pub fn new(feature: impl Into<String>, metrics: DetectionMetrics) -> Self {
        Self {
            feature: feature.into(),
            metrics,
        }
    }

    /// F1 descending, then feature name ascending.
    fn ranking(a: &Self, b: &Self) -> Ordering {
        b.metrics
            .f1
            .total_cmp(&a.metrics.f1)
            .then_with(|| a.feature.cmp(&b.feature))
    }
}

/// All feature rows for one strategy, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy: String,
    rows: Vec<ResultRow>,
}

impl StrategySummary {
    pub fn new(strategy: impl Into<String>, mut rows: Vec<ResultRow>) -> Self {
        rows.sort_by(ResultRow::ranking);
        Self {
            strategy: strategy.into(),
            rows,
        }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn best(&self) -> Option<&ResultRow> {
        self.rows.first()
    }

    pub fn row(&self, feature: &str) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.feature == feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::Evaluator;

    fn metrics(predicted: &[bool]) -> DetectionMetrics {
        let truth = [false, true, false, false, false, false, false, false, false, true];
        Evaluator::new(0).evaluate(predicted, &truth).unwrap()
    }

    #[test]
    fn rows_sort_by_f1_then_name() {
        let perfect = [false, true, false, false, false, false, false, false, false, true];
        let half = [false, true, false, false, false, false, false, false, false, false];
        let summary = StrategySummary::new(
            "Quantile",
            vec![
                ResultRow::new("gini", metrics(&half)),
                ResultRow::new("l2norm", metrics(&perfect)),
                ResultRow::new("auc", metrics(&half)),
            ],
        );
        let order: Vec<&str> = summary.rows().iter().map(|r| r.feature.as_str()).collect();
        assert_eq!(order, vec!["l2norm", "auc", "gini"]);
        assert_eq!(summary.best().unwrap().feature, "l2norm");
        assert!(summary.row("gini").is_some());
        assert!(summary.row("centroid").is_none());
    }
}
