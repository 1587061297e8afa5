//! Topological shape descriptors of sliding windows.
//!
//! A window is delay-embedded into a point cloud, its zero-dimensional
//! persistence diagram is computed, and the diagram's finite lifetimes are
//! reduced to scalar [`ShapeFeature`]s.

pub mod embedding;
pub mod extractor;
pub mod features;
pub mod persistence;

pub use embedding::EmbeddingConfig;
pub use extractor::{Extractor, FeatureTable, ShapeExtractor};
pub use features::{FeatureVector, ShapeFeature};
pub use persistence::{PersistencePair, PersistenceWorkspace};
