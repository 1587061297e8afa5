//! Analysis configuration.

use crate::decision::{BoxedStrategy, EvtStrategy, PotStrategy, QuantileStrategy, TopKStrategy};
use crate::error::{AnomalyError, Result};
use crate::evaluation::Evaluator;
use crate::scoring::KinematicScorer;
use crate::topology::{EmbeddingConfig, ShapeFeature};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Every tunable parameter of an analysis run.
///
/// Missing JSON fields take their defaults.
///
/// # Example
/// ```
/// use topo_vaad::pipeline::AnalysisConfig;
///
/// let config = AnalysisConfig::from_json_str(r#"{ "window": 16, "evt_gate": 0.9 }"#).unwrap();
/// assert_eq!(config.window, 16);
/// assert_eq!(config.dimension, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sliding window length W.
    pub window: usize,
    /// Embedding dimension d.
    pub dimension: usize,
    /// Embedding delay tau.
    pub delay: usize,
    /// Velocity gain k_v.
    pub velocity_gain: f64,
    /// Acceleration gain k_a.
    pub acceleration_gain: f64,
    /// Quantile strategy level.
    pub quantile: f64,
    /// POT prominence multiplier K.
    pub pot_k: f64,
    pub pot_min_prominence: f64,
    /// EVT gate quantile g.
    pub evt_gate: f64,
    /// EVT final quantile f.
    pub evt_target: f64,
    pub evt_min_tail: usize,
    /// Evaluation tolerance NTOL.
    pub tolerance: usize,
    /// Run the TopK oracle when ground truth is available.
    pub topk_oracle: bool,
    /// Features to score; empty means all.
    pub features: Vec<ShapeFeature>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let embedding = EmbeddingConfig::default();
        let scorer = KinematicScorer::default();
        let pot = PotStrategy::default();
        let evt = EvtStrategy::default();
        Self {
            window: embedding.window(),
            dimension: embedding.dimension(),
            delay: embedding.delay(),
            velocity_gain: scorer.velocity_gain(),
            acceleration_gain: scorer.acceleration_gain(),
            quantile: QuantileStrategy::default().q(),
            pot_k: pot.k(),
            pot_min_prominence: pot.min_prominence(),
            evt_gate: evt.gate(),
            evt_target: evt.target(),
            evt_min_tail: evt.min_tail(),
            tolerance: Evaluator::default().tolerance(),
            topk_oracle: true,
            features: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AnomalyError::Parse(format!("config: {}", e)))
    }

    /// Load a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnomalyError::Parse(e.to_string()))
    }

    /// Check every parameter before a run.
    pub fn validate(&self) -> Result<()> {
        self.embedding()?;
        self.scorer().validate()?;
        self.quantile_strategy()?;
        self.pot_strategy()?;
        self.evt_strategy()?;
        Ok(())
    }

    pub fn embedding(&self) -> Result<EmbeddingConfig> {
        EmbeddingConfig::new(self.window, self.dimension, self.delay)
    }

    pub fn scorer(&self) -> KinematicScorer {
        KinematicScorer::new()
            .with_velocity_gain(self.velocity_gain)
            .with_acceleration_gain(self.acceleration_gain)
    }

    pub fn quantile_strategy(&self) -> Result<QuantileStrategy> {
        QuantileStrategy::new(self.quantile)
    }

    pub fn pot_strategy(&self) -> Result<PotStrategy> {
        let pot = PotStrategy::new(self.pot_k)?.with_min_prominence(self.pot_min_prominence);
        pot.validate()?;
        Ok(pot)
    }

    pub fn evt_strategy(&self) -> Result<EvtStrategy> {
        Ok(EvtStrategy::new(self.evt_gate, self.evt_target)?.with_min_tail(self.evt_min_tail))
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(self.tolerance)
    }

    /// Configured strategies in reporting order.
    pub fn strategies(&self) -> Result<Vec<BoxedStrategy>> {
        let mut strategies: Vec<BoxedStrategy> = Vec::with_capacity(4);
        if self.topk_oracle {
            strategies.push(Box::new(TopKStrategy::new()));
        }
        strategies.push(Box::new(self.quantile_strategy()?));
        strategies.push(Box::new(self.pot_strategy()?));
        strategies.push(Box::new(self.evt_strategy()?));
        Ok(strategies)
    }

    /// Features to score, all of them when none are listed.
    pub fn selected_features(&self) -> Vec<ShapeFeature> {
        if self.features.is_empty() {
            ShapeFeature::ALL.to_vec()
        } else {
            let mut features = self.features.clone();
            features.sort();
            features.dedup();
            features
        }
    }
}
