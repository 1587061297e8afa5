//! Core data structures: series, segments and labels.

mod segment;
mod series;

pub use segment::{Segment, SegmentBoundaries};
pub use series::{LabeledSeries, Series};
