//! Error types for the topo-vaad library.

use thiserror::Error;

/// Result type alias for detection operations.
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Errors that can occur while extracting, scoring, or deciding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Window, dimension and delay do not describe a valid delay embedding.
    #[error(
        "invalid embedding: window {window}, dimension {dimension}, delay {delay} \
         (require (dimension - 1) * delay < window)"
    )]
    InvalidEmbeddingConfig {
        window: usize,
        dimension: usize,
        delay: usize,
    },

    /// Input is empty or too short for the requested statistic.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Quantile level outside [0, 1].
    #[error("invalid quantile {0}: must lie in [0, 1]")]
    InvalidQuantile(f64),

    /// Generalized Pareto tail fit could not be produced.
    #[error("tail fit failed: {0}")]
    TailFit(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between aligned streams.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// A strategy that needs ground truth was run without it.
    #[error("ground truth is required for this strategy")]
    MissingGroundTruth,

    /// Malformed input table.
    #[error("parse error: {0}")]
    Parse(String),

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AnomalyError {
    fn from(err: std::io::Error) -> Self {
        AnomalyError::Io(err.to_string())
    }
}
