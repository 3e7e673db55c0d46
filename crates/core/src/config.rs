use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::genetics::cross::PROBABILITY_TOLERANCE;
use crate::genetics::pedigree::DEFAULT_MAX_GENERATIONS;

/// Tunables for an analysis.
///
/// Built with chained setters or deserialized from JSON; missing fields take
/// their defaults.
///
/// # Examples
/// ```
/// use herp_breeding_core::EngineConfig;
///
/// let config = EngineConfig::new().max_generations(5).high_threshold(0.2);
/// assert_eq!(config.max_generations, 5);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Generations searched for shared ancestry.
    pub max_generations: usize,
    /// Allowed deviation of a cross outcome's total from 1.
    pub probability_tolerance: f64,
    /// Coefficient at which an inbreeding advisory becomes moderate.
    pub moderate_threshold: f64,
    /// Coefficient at which an inbreeding advisory becomes high.
    pub high_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_generations: DEFAULT_MAX_GENERATIONS,
            probability_tolerance: PROBABILITY_TOLERANCE,
            moderate_threshold: 0.125,
            high_threshold: 0.25,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_generations(mut self, generations: usize) -> Self {
        self.max_generations = generations;
        self
    }

    pub fn probability_tolerance(mut self, tolerance: f64) -> Self {
        self.probability_tolerance = tolerance;
        self
    }

    pub fn moderate_threshold(mut self, threshold: f64) -> Self {
        self.moderate_threshold = threshold;
        self
    }

    pub fn high_threshold(mut self, threshold: f64) -> Self {
        self.high_threshold = threshold;
        self
    }

    /// Check that thresholds are ordered and within `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(self.probability_tolerance > 0.0 && self.probability_tolerance < 1.0) {
            return Err(EngineError::Data(format!(
                "probability_tolerance {} must be in (0, 1)",
                self.probability_tolerance
            )));
        }
        let in_range = |t: f64| t > 0.0 && t <= 1.0;
        if !in_range(self.moderate_threshold)
            || !in_range(self.high_threshold)
            || self.moderate_threshold > self.high_threshold
        {
            return Err(EngineError::Data(format!(
                "advisory thresholds must satisfy 0 < moderate ({}) <= high ({}) <= 1",
                self.moderate_threshold, self.high_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_generations, 3);
        assert_eq!(config.probability_tolerance, 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_generations": 4}"#).unwrap();
        assert_eq!(config.max_generations, 4);
        assert_eq!(config.high_threshold, 0.25);
    }

    #[test]
    fn test_validate_threshold_order() {
        let config = EngineConfig::new().moderate_threshold(0.5).high_threshold(0.25);
        assert!(config.validate().is_err());
        let config = EngineConfig::new().probability_tolerance(0.0);
        assert!(config.validate().is_err());
    }
}
