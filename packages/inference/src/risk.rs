//! Probability to risk tier mapping.

use hotspot_map_config::RiskConfig;
use hotspot_map_inference_models::{RiskColor, RiskLevel};

/// Maps a positive-class probability to a [`RiskLevel`].
///
/// `p >= high` is High, `medium <= p < high` is Medium, anything lower is
/// Low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBucketer {
    high: f64,
    medium: f64,
}

impl Default for RiskBucketer {
    fn default() -> Self {
        Self {
            high: 0.66,
            medium: 0.33,
        }
    }
}

impl RiskBucketer {
    /// Creates a bucketer, or `None` unless `0 <= medium <= high <= 1`.
    #[must_use]
    pub fn new(high: f64, medium: f64) -> Option<Self> {
        ((0.0..=1.0).contains(&medium) && (0.0..=1.0).contains(&high) && medium <= high)
            .then_some(Self { high, medium })
    }

    /// Creates a bucketer from validated configuration.
    #[must_use]
    pub fn from_config(config: &RiskConfig) -> Option<Self> {
        Self::new(config.high, config.medium)
    }

    /// The tier for `probability`.
    #[must_use]
    pub fn bucket(&self, probability: f64) -> RiskLevel {
        if probability >= self.high {
            RiskLevel::High
        } else if probability >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// The tier and its display color for `probability`.
    #[must_use]
    pub fn classify(&self, probability: f64) -> (RiskLevel, RiskColor) {
        let level = self.bucket(probability);
        (level, level.color())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_bucket_at_boundaries() {
        let bucketer = RiskBucketer::default();
        assert_eq!(bucketer.classify(0.70), (RiskLevel::High, RiskColor::Red));
        assert_eq!(bucketer.bucket(0.66), RiskLevel::High);
        assert_eq!(bucketer.bucket(0.6599), RiskLevel::Medium);
        assert_eq!(bucketer.classify(0.33), (RiskLevel::Medium, RiskColor::Orange));
        assert_eq!(bucketer.classify(0.3299), (RiskLevel::Low, RiskColor::Yellow));
        assert_eq!(bucketer.bucket(0.0), RiskLevel::Low);
        assert_eq!(bucketer.bucket(1.0), RiskLevel::High);
    }

    #[test]
    fn thresholds_are_configurable() {
        let bucketer = RiskBucketer::new(0.9, 0.5).unwrap();
        assert_eq!(bucketer.bucket(0.70), RiskLevel::Medium);
        assert_eq!(bucketer.bucket(0.45), RiskLevel::Low);

        let config = RiskConfig::default();
        assert_eq!(
            RiskBucketer::from_config(&config),
            Some(RiskBucketer::default())
        );
    }

    #[test]
    fn rejects_inverted_or_out_of_range_thresholds() {
        assert!(RiskBucketer::new(0.3, 0.6).is_none());
        assert!(RiskBucketer::new(1.2, 0.3).is_none());
        assert!(RiskBucketer::new(0.6, f64::NAN).is_none());
    }
}
