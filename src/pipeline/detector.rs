//! End-to-end analysis of labelled series.

use crate::core::LabeledSeries;
use crate::decision::{BoxedStrategy, Prediction};
use crate::error::{AnomalyError, Result};
use crate::evaluation::{Evaluator, ResultRow, StrategySummary};
use crate::pipeline::AnalysisConfig;
use crate::scoring::{KinematicScorer, ScoreStream, Scorer};
use crate::topology::{Extractor, ShapeExtractor, ShapeFeature};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// One strategy's decision on one feature's score stream.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePrediction {
    pub strategy: String,
    pub feature: ShapeFeature,
    pub prediction: Prediction,
}

/// Everything computed for one series.
#[derive(Debug, Clone)]
pub struct SeriesReport {
    pub series_id: String,
    /// One stream per selected feature, in feature order.
    pub scores: Vec<ScoreStream>,
    pub predictions: Vec<FeaturePrediction>,
    /// One summary per strategy; empty without ground truth.
    pub summaries: Vec<StrategySummary>,
}

impl SeriesReport {
    pub fn score(&self, feature: ShapeFeature) -> Option<&ScoreStream> {
        self.scores.iter().find(|s| s.feature() == feature)
    }

    pub fn prediction(&self, strategy: &str, feature: ShapeFeature) -> Option<&Prediction> {
        self.predictions
            .iter()
            .find(|p| p.strategy == strategy && p.feature == feature)
            .map(|p| &p.prediction)
    }

    pub fn summary(&self, strategy: &str) -> Option<&StrategySummary> {
        self.summaries.iter().find(|s| s.strategy == strategy)
    }
}

/// Extractor, scorer, strategies and evaluator wired from one
/// [`AnalysisConfig`].
pub struct Detector {
    extractor: ShapeExtractor,
    scorer: KinematicScorer,
    strategies: Vec<BoxedStrategy>,
    evaluator: Evaluator,
    features: Vec<ShapeFeature>,
}

impl Detector {
    /// Validate `config` and build the pipeline.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            extractor: ShapeExtractor::new(config.embedding()?),
            scorer: config.scorer(),
            strategies: config.strategies()?,
            evaluator: config.evaluator(),
            features: config.selected_features(),
        })
    }

    pub fn features(&self) -> &[ShapeFeature] {
        &self.features
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Score streams for every selected feature.
    pub fn score(&self, input: &LabeledSeries) -> Result<Vec<ScoreStream>> {
        let table = self.extractor.extract(input.series(), input.boundaries())?;
        self.features
            .par_iter()
            .map(|&feature| {
                self.scorer
                    .score(feature, &table.column(feature), input.boundaries())
            })
            .collect()
    }

    /// Score, decide and (with ground truth) evaluate one series.
    pub fn analyze(&self, input: &LabeledSeries) -> Result<SeriesReport> {
        let id = input.series().id().to_string();
        let scores = self.score(input)?;
        let truth = input.ground_truth();

        let mut predictions = Vec::with_capacity(scores.len() * self.strategies.len());
        let mut summaries = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            if strategy.requires_ground_truth() && truth.is_none() {
                debug!(series = %id, strategy = strategy.name(), "no ground truth, skipping");
                continue;
            }
            let decided: Vec<Prediction> = scores
                .par_iter()
                .map(|stream| strategy.decide(stream, input.boundaries(), truth))
                .collect::<Result<_>>()?;

            if let Some(truth) = truth {
                let rows = scores
                    .iter()
                    .zip(&decided)
                    .map(|(stream, p)| {
                        let metrics = self.evaluator.evaluate(p.flags(), truth)?;
                        Ok(ResultRow::new(stream.feature().name(), metrics))
                    })
                    .collect::<Result<Vec<_>>>()?;
                summaries.push(StrategySummary::new(strategy.name(), rows));
            }
            predictions.extend(scores.iter().zip(decided).map(|(stream, prediction)| {
                FeaturePrediction {
                    strategy: strategy.name().to_string(),
                    feature: stream.feature(),
                    prediction,
                }
            }));
        }

        debug!(
            series = %id,
            len = input.series().len(),
            segments = input.boundaries().n_segments(),
            "analyzed series"
        );
        Ok(SeriesReport {
            series_id: id,
            scores,
            predictions,
            summaries,
        })
    }

    /// Analyze many series in parallel.
    ///
    /// Results keep the input order; a failing series does not stop the
    /// others.
    pub fn analyze_batch(&self, inputs: &[LabeledSeries]) -> Vec<Result<SeriesReport>> {
        let reports: Vec<Result<SeriesReport>> =
            inputs.par_iter().map(|input| self.analyze(input)).collect();
        let failed = reports.iter().filter(|r| r.is_err()).count();
        for (input, report) in inputs.iter().zip(&reports) {
            if let Err(e) = report {
                warn!(series = input.series().id(), error = %e, "analysis failed");
            }
        }
        info!(series = inputs.len(), failed, "batch analysis finished");
        reports
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("extractor", &self.extractor)
            .field("scorer", &self.scorer)
            .field("strategies", &self.strategy_names())
            .field("evaluator", &self.evaluator)
            .field("features", &self.features)
            .finish()
    }
}

/// Reject a batch whose series ids collide, since output files are named
/// after them.
pub fn ensure_unique_ids(inputs: &[LabeledSeries]) -> Result<()> {
    let mut ids: Vec<&str> = inputs.iter().map(|s| s.series().id()).collect();
    ids.sort_unstable();
    if let Some(w) = ids.windows(2).find(|w| w[0] == w[1]) {
        return Err(AnomalyError::InvalidParameter(format!(
            "duplicate series id '{}'",
            w[0]
        )));
    }
    Ok(())
}
