//! Comparison configuration.

use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options shared by every comparison entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Matching tolerance in milliseconds: spikes closer than this match.
    pub delta_ms: f64,
    /// Minimum agreement fraction for a best match (strictly exceeded).
    pub match_score_threshold: f64,
    /// Minimum number of sortings an agreement set must span.
    pub minimum_matching: usize,
    /// Accuracy at or above which a ground-truth unit counts as well detected.
    pub well_detected_score: f64,
    /// Agreement at or above which an unmatched tested unit counts as redundant.
    pub redundant_score: f64,
    /// Agreement at or above which a tested unit counts toward overmerging.
    pub overmerged_score: f64,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            delta_ms: 0.4,
            match_score_threshold: 0.5,
            minimum_matching: 2,
            well_detected_score: 0.8,
            redundant_score: 0.2,
            overmerged_score: 0.2,
        }
    }
}

impl ComparisonConfig {
    /// Create a default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the matching tolerance in milliseconds.
    pub fn with_delta_ms(mut self, delta_ms: f64) -> Self {
        self.delta_ms = delta_ms;
        self
    }

    /// Set the best-match threshold.
    pub fn with_match_score_threshold(mut self, threshold: f64) -> Self {
        self.match_score_threshold = threshold;
        self
    }

    /// Set the minimum number of sortings per agreement set.
    pub fn with_minimum_matching(mut self, minimum_matching: usize) -> Self {
        self.minimum_matching = minimum_matching;
        self
    }

    /// Set the unit classification scores.
    pub fn with_classification_scores(
        mut self,
        well_detected: f64,
        redundant: f64,
        overmerged: f64,
    ) -> Self {
        self.well_detected_score = well_detected;
        self.redundant_score = redundant;
        self.overmerged_score = overmerged;
        self
    }

    /// Matching tolerance as a duration.
    ///
    /// Fails with `Configuration` when `delta_ms` is negative, not finite or
    /// too large for a `Duration`.
    pub fn delta(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.delta_ms / 1000.0).map_err(|e| {
            CompareError::Configuration(format!("delta_ms {} out of range: {}", self.delta_ms, e))
        })
    }

    /// Check every option is in range.
    pub fn validate(&self) -> Result<()> {
        if !self.delta_ms.is_finite() || self.delta_ms <= 0.0 {
            return Err(CompareError::Configuration(format!(
                "delta_ms must be finite and > 0, got {}",
                self.delta_ms
            )));
        }
        self.delta()?;
        check_fraction("match_score_threshold", self.match_score_threshold)?;
        check_fraction("well_detected_score", self.well_detected_score)?;
        check_fraction("redundant_score", self.redundant_score)?;
        check_fraction("overmerged_score", self.overmerged_score)?;
        if self.minimum_matching < 1 {
            return Err(CompareError::Configuration(
                "minimum_matching must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from YAML string. Missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CompareError::from)
    }
}

pub(crate) fn check_fraction(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(CompareError::Configuration(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ComparisonConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.minimum_matching, 2);
        assert!((config.match_score_threshold - 0.5).abs() < 1e-12);
        assert!((config.delta().unwrap().as_secs_f64() - 0.0004).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range_rejected() {
        assert!(ComparisonConfig::new().with_delta_ms(0.0).validate().is_err());
        assert!(ComparisonConfig::new().with_delta_ms(f64::NAN).validate().is_err());
        assert!(ComparisonConfig::new()
            .with_match_score_threshold(1.5)
            .validate()
            .is_err());
        assert!(ComparisonConfig::new()
            .with_minimum_matching(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_huge_delta_rejected() {
        let config = ComparisonConfig::new().with_delta_ms(1e300);
        assert!(matches!(
            config.validate(),
            Err(CompareError::Configuration(_))
        ));
        assert!(matches!(
            config.delta(),
            Err(CompareError::Configuration(_))
        ));
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config = ComparisonConfig::from_yaml("delta_ms: 1.0\nminimum_matching: 3\n").unwrap();
        assert_eq!(config.delta_ms, 1.0);
        assert_eq!(config.minimum_matching, 3);
        assert_eq!(config.match_score_threshold, 0.5);
    }

    #[test]
    fn test_yaml_invalid_rejected() {
        let err = ComparisonConfig::from_yaml("match_score_threshold: -0.1\n").unwrap_err();
        assert!(matches!(err, CompareError::Configuration(_)));
    }

    #[test]
    fn test_yaml_written_config_loads() {
        let config = ComparisonConfig::new().with_delta_ms(0.8);
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("delta_ms"));
        assert_eq!(ComparisonConfig::from_yaml(&yaml).unwrap(), config);
    }
}
