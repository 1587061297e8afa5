//! Series data structures.

use crate::core::segment::{Segment, SegmentBoundaries};
use crate::error::{AnomalyError, Result};
use chrono::{DateTime, Duration, Utc};

/// An immutable univariate series of (timestamp, value) pairs.
#[derive(Debug, Clone)]
pub struct Series {
    id: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl Series {
    /// Create a series from aligned timestamps and values.
    ///
    /// Values must be finite; the decision layer relies on never seeing NaN.
    pub fn new(
        id: impl Into<String>,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
    ) -> Result<Self> {
        if values.is_empty() {
            return Err(AnomalyError::EmptyData);
        }
        if timestamps.len() != values.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: values.len(),
                got: timestamps.len(),
            });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(AnomalyError::DegenerateInput(format!(
                "non-finite value at index {}",
                pos
            )));
        }
        Ok(Self {
            id: id.into(),
            timestamps,
            values,
        })
    }

    /// Create a series with one-second timestamps starting at the Unix epoch.
    pub fn from_values(id: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let timestamps = (0..values.len())
            .map(|i| DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(i as i64))
            .collect();
        Self::new(id, timestamps, values)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Values of one segment.
    pub fn segment_values(&self, segment: &Segment) -> &[f64] {
        &self.values[segment.range()]
    }
}

/// A series together with its regime boundaries and optional ground truth.
#[derive(Debug, Clone)]
pub struct LabeledSeries {
    series: Series,
    boundaries: SegmentBoundaries,
    ground_truth: Option<Vec<bool>>,
}

impl LabeledSeries {
    pub fn new(
        series: Series,
        boundaries: SegmentBoundaries,
        ground_truth: Option<Vec<bool>>,
    ) -> Result<Self> {
        if boundaries.series_len() != series.len() {
            return Err(AnomalyError::DimensionMismatch {
                expected: series.len(),
                got: boundaries.series_len(),
            });
        }
        if let Some(gt) = &ground_truth {
            if gt.len() != series.len() {
                return Err(AnomalyError::DimensionMismatch {
                    expected: series.len(),
                    got: gt.len(),
                });
            }
        }
        Ok(Self {
            series,
            boundaries,
            ground_truth,
        })
    }

    /// Unsegmented series without labels.
    pub fn unlabeled(series: Series) -> Self {
        let boundaries = SegmentBoundaries::single(series.len());
        Self {
            series,
            boundaries,
            ground_truth: None,
        }
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    pub fn boundaries(&self) -> &SegmentBoundaries {
        &self.boundaries
    }

    pub fn ground_truth(&self) -> Option<&[bool]> {
        self.ground_truth.as_deref()
    }

    /// Number of labelled anomalous timestamps.
    pub fn anomaly_count(&self) -> usize {
        self.ground_truth
            .as_ref()
            .map_or(0, |gt| gt.iter().filter(|&&a| a).count())
    }
}
