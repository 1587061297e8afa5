//! Numerical utilities shared by the extractor, scorer and decision layer.

pub mod optimization;
pub mod stats;
pub mod tail;

pub use optimization::{minimize, SimplexConfig, SimplexResult};
pub use stats::{gini, mad, median, quantile, robust_normalize, robust_scale};
pub use tail::{fit_generalized_pareto, gpd_exceedance_threshold, GpdFit, GpdMethod};
