//! Analysis drivers: configuration, per-series detection and grid search.

mod config;
mod detector;
mod grid;

pub use config::AnalysisConfig;
pub use detector::{ensure_unique_ids, Detector, FeaturePrediction, SeriesReport};
pub use grid::{
    evt_grid, evt_grid_search, grid_search, EvtGridPoint, GridCell, DEFAULT_EVT_GATES,
    DEFAULT_EVT_TARGETS,
};
