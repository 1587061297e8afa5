//! Per-timestamp topological feature extraction.

use crate::core::{SegmentBoundaries, Series};
use crate::error::{AnomalyError, Result};
use crate::topology::embedding::EmbeddingConfig;
use crate::topology::features::{FeatureVector, ShapeFeature};
use crate::topology::persistence::PersistenceWorkspace;
use rayon::prelude::*;
use tracing::{debug, warn};

/// Turns a segmented series into per-timestamp feature vectors.
pub trait Extractor {
    /// Extract features for every timestamp of `series`.
    fn extract(&self, series: &Series, boundaries: &SegmentBoundaries) -> Result<FeatureTable>;

    /// Extractor name.
    fn name(&self) -> &str;
}

/// Feature vectors aligned to a series; `None` where no full window exists.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    rows: Vec<Option<FeatureVector>>,
}

impl FeatureTable {
    pub fn new(rows: Vec<Option<FeatureVector>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FeatureVector> {
        self.rows.get(index).and_then(|r| r.as_ref())
    }

    pub fn rows(&self) -> &[Option<FeatureVector>] {
        &self.rows
    }

    /// Number of timestamps with a defined feature vector.
    pub fn defined_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_some()).count()
    }

    /// One feature as a stream aligned to the series.
    pub fn column(&self, feature: ShapeFeature) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|r| r.as_ref().map(|fv| fv.get(feature)))
            .collect()
    }
}

/// Delay embedding + H0 persistence + scalar shape summaries.
///
/// Windows never cross a segment boundary: the first `W - 1` timestamps of
/// every segment are undefined, and a segment shorter than `W` produces no
/// features at all.
///
/// # Example
/// ```
/// use topo_vaad::core::{SegmentBoundaries, Series};
/// use topo_vaad::topology::{EmbeddingConfig, Extractor, ShapeExtractor, ShapeFeature};
///
/// let values: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
/// let series = Series::from_values("sine", values).unwrap();
/// let extractor = ShapeExtractor::new(EmbeddingConfig::new(8, 2, 1).unwrap());
/// let table = extractor
///     .extract(&series, &SegmentBoundaries::single(series.len()))
///     .unwrap();
///
/// assert!(table.get(6).is_none());
/// assert!(table.get(7).unwrap().get(ShapeFeature::Bottleneck) > 0.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShapeExtractor {
    config: EmbeddingConfig,
}

impl ShapeExtractor {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Features of a single window of exactly `W` samples.
    pub fn window_features(&self, window: &[f64]) -> Result<FeatureVector> {
        self.config.validate()?;
        if window.len() != self.config.window() {
            return Err(AnomalyError::DimensionMismatch {
                expected: self.config.window(),
                got: window.len(),
            });
        }
        let mut workspace = PersistenceWorkspace::with_capacity(self.config.n_points());
        let points = self.config.embed(window);
        Ok(FeatureVector::from_sorted_desc(
            workspace.lifetimes(&points, self.config.dimension()),
        ))
    }

    fn extract_segment(&self, values: &[f64]) -> Vec<FeatureVector> {
        let window = self.config.window();
        let n_points = self.config.n_points();
        let dimension = self.config.dimension();

        (window - 1..values.len())
            .into_par_iter()
            .map_init(
                || {
                    (
                        PersistenceWorkspace::with_capacity(n_points),
                        Vec::with_capacity(n_points * dimension),
                    )
                },
                |(workspace, points), t| {
                    self.config.embed_into(&values[t + 1 - window..=t], points);
                    FeatureVector::from_sorted_desc(workspace.lifetimes(points, dimension))
                },
            )
            .collect()
    }
}

impl Extractor for ShapeExtractor {
    fn extract(&self, series: &Series, boundaries: &SegmentBoundaries) -> Result<FeatureTable> {
        self.config.validate()?;
        if boundaries.series_len() != series.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: series.len(),
                got: boundaries.series_len(),
            });
        }

        let window = self.config.window();
        let mut rows = vec![None; series.len()];
        for segment in boundaries.segments() {
            if segment.len() < window {
                warn!(
                    series = series.id(),
                    start = segment.start,
                    len = segment.len(),
                    window,
                    "segment shorter than window, no features"
                );
                continue;
            }
            let features = self.extract_segment(series.segment_values(&segment));
            debug!(
                series = series.id(),
                start = segment.start,
                defined = features.len(),
                "extracted segment"
            );
            for (row, fv) in rows[segment.start + window - 1..segment.end]
                .iter_mut()
                .zip(features)
            {
                *row = Some(fv);
            }
        }
        Ok(FeatureTable::new(rows))
    }

    fn name(&self) -> &str {
        "ShapeExtractor"
    }
}
