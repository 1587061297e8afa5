//! Takens time-delay embedding.
//!
//! A window of `W` consecutive samples ending at `t` is reconstructed as a
//! point cloud of `W - (d - 1) * tau` points in R^d. With `s = t - W + 1`,
//! point `j` is `(x[s+j], x[s+j+tau], ..., x[s+j+(d-1)tau])`.

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};

/// Window length, embedding dimension and delay.
///
/// Deserialization runs [`validate`](Self::validate), so an invalid triple
/// never reaches the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEmbeddingConfig")]
pub struct EmbeddingConfig {
    window: usize,
    dimension: usize,
    delay: usize,
}

#[derive(Deserialize)]
struct RawEmbeddingConfig {
    window: usize,
    dimension: usize,
    delay: usize,
}

impl TryFrom<RawEmbeddingConfig> for EmbeddingConfig {
    type Error = AnomalyError;

    fn try_from(raw: RawEmbeddingConfig) -> Result<Self> {
        Self::new(raw.window, raw.dimension, raw.delay)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            window: 10,
            dimension: 3,
            delay: 1,
        }
    }
}

impl EmbeddingConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    /// `InvalidEmbeddingConfig` unless `window >= 2`, `dimension >= 1`,
    /// `delay >= 1` and `(dimension - 1) * delay < window`.
    pub fn new(window: usize, dimension: usize, delay: usize) -> Result<Self> {
        let config = Self {
            window,
            dimension,
            delay,
        };
        config.validate()?;
        Ok(config)
    }

    /// Re-check the invariants, e.g. after deserialization.
    pub fn validate(&self) -> Result<()> {
        let span = self
            .dimension
            .checked_sub(1)
            .and_then(|d| d.checked_mul(self.delay));
        let valid = self.window >= 2
            && self.dimension >= 1
            && self.delay >= 1
            && span.is_some_and(|s| s < self.window);
        if valid {
            Ok(())
        } else {
            Err(AnomalyError::InvalidEmbeddingConfig {
                window: self.window,
                dimension: self.dimension,
                delay: self.delay,
            })
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn delay(&self) -> usize {
        self.delay
    }

    /// Number of points in each window's cloud.
    pub fn n_points(&self) -> usize {
        self.window - (self.dimension - 1) * self.delay
    }

    /// Embed `window` into `out` as a row-major `n_points x dimension`
    /// matrix, reusing `out`'s allocation.
    ///
    /// `window` must hold exactly `self.window()` samples.
    pub fn embed_into(&self, window: &[f64], out: &mut Vec<f64>) {
        debug_assert_eq!(window.len(), self.window);
        out.clear();
        for j in 0..self.n_points() {
            out.extend((0..self.dimension).map(|k| window[j + k * self.delay]));
        }
    }

    /// Allocating variant of [`embed_into`](Self::embed_into).
    pub fn embed(&self, window: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_points() * self.dimension);
        self.embed_into(window, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = EmbeddingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.n_points(), 8);
    }

    #[test]
    fn rejects_span_not_shorter_than_window() {
        assert!(EmbeddingConfig::new(5, 3, 2).is_ok());
        let err = EmbeddingConfig::new(4, 3, 2).unwrap_err();
        assert_eq!(
            err,
            AnomalyError::InvalidEmbeddingConfig {
                window: 4,
                dimension: 3,
                delay: 2
            }
        );
        assert!(EmbeddingConfig::new(10, 0, 1).is_err());
        assert!(EmbeddingConfig::new(10, 2, 0).is_err());
        assert!(EmbeddingConfig::new(1, 1, 1).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let err = serde_json::from_str::<EmbeddingConfig>(
            r#"{"window":3,"dimension":5,"delay":1}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid embedding"), "{}", err);

        let config = EmbeddingConfig::new(12, 3, 2).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<EmbeddingConfig>(&json).unwrap(), config);
    }

    #[test]
    fn embeds_delay_coordinates() {
        let config = EmbeddingConfig::new(5, 2, 2).unwrap();
        let points = config.embed(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        // points: (0,2), (1,3), (2,4)
        assert_eq!(points, vec![0.0, 2.0, 1.0, 3.0, 2.0, 4.0]);
    }

    #[test]
    fn dimension_one_is_the_raw_window() {
        let config = EmbeddingConfig::new(3, 1, 1).unwrap();
        assert_eq!(config.embed(&[7.0, 8.0, 9.0]), vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn embed_into_reuses_buffer() {
        let config = EmbeddingConfig::new(4, 2, 1).unwrap();
        let mut buf = Vec::new();
        config.embed_into(&[1.0, 2.0, 3.0, 4.0], &mut buf);
        let cap = buf.capacity();
        config.embed_into(&[5.0, 6.0, 7.0, 8.0], &mut buf);
        assert_eq!(buf, vec![5.0, 6.0, 6.0, 7.0, 7.0, 8.0]);
        assert_eq!(buf.capacity(), cap);
    }
}
