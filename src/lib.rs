//! # topo-vaad
//!
//! Point-anomaly detection for univariate time series from the topological
//! shape of sliding-window delay embeddings.
//!
//! Each window is embedded into a point cloud whose zero-dimensional
//! persistence diagram is reduced to scalar shape features. The feature
//! streams are re-scored by their robustly normalized velocity and
//! acceleration, and a decision strategy (TopK oracle, quantile,
//! peaks-over-threshold or an extreme-value tail fit) turns the score into
//! binary flags, evaluated with a tolerance-aware confusion matrix.
//!
//! ```
//! use topo_vaad::prelude::*;
//!
//! let values: Vec<f64> = (0..120)
//!     .map(|i| if i == 60 { 8.0 } else { ((i * 17) % 10) as f64 * 0.01 })
//!     .collect();
//! let series = LabeledSeries::unlabeled(Series::from_values("demo", values).unwrap());
//!
//! let config = AnalysisConfig {
//!     features: vec![ShapeFeature::L2Norm],
//!     ..Default::default()
//! };
//! let report = Detector::new(&config).unwrap().analyze(&series).unwrap();
//! let flagged = report.prediction("Quantile", ShapeFeature::L2Norm).unwrap();
//! assert!(flagged.positive_count() > 0);
//! ```

#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod core;
pub mod decision;
pub mod error;
pub mod evaluation;
pub mod io;
pub mod pipeline;
pub mod scoring;
pub mod topology;
pub mod utils;

pub use error::{AnomalyError, Result};

pub mod prelude {
    pub use crate::core::{LabeledSeries, Segment, SegmentBoundaries, Series};
    pub use crate::decision::{
        DecisionStrategy, EvtStrategy, PotStrategy, Prediction, QuantileStrategy, TopKStrategy,
    };
    pub use crate::error::{AnomalyError, Result};
    pub use crate::evaluation::{DetectionMetrics, Evaluator};
    pub use crate::pipeline::{AnalysisConfig, Detector, SeriesReport};
    pub use crate::scoring::{KinematicScorer, ScoreStream, Scorer};
    pub use crate::topology::{EmbeddingConfig, Extractor, ShapeExtractor, ShapeFeature};
}
