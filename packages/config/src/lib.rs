#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Configuration for training and serving.
//!
//! Read from TOML. Every key has a default, so an empty file (or no file at
//! all) yields the production settings shipped in `hotspot_map.toml`.

use std::path::{Path, PathBuf};

use hotspot_map_hotspot::{DEFAULT_PRECISION, MAX_PRECISION};
use hotspot_map_model::ClassifierKind;
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file when none is given
/// explicitly.
pub const CONFIG_ENV_VAR: &str = "HOTSPOT_MAP_CONFIG";

/// The shipped production defaults, as TOML.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../hotspot_map.toml");

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML of the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config value for {key}: {message}")]
    Invalid {
        /// Dotted key, e.g. `risk.high`.
        key: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Hotspot cluster aggregation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AggregationConfig {
    /// Decimal digits coordinates are rounded to before grouping.
    pub precision: u32,
    /// Minimum reports per cell for a center.
    pub min_count: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            min_count: 2,
        }
    }
}

/// Proximity labeling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LabelingConfig {
    /// A row within this distance of any center is labeled a hotspot.
    pub radius_meters: f64,
    /// Worker threads for labeling.
    pub partitions: usize,
}

impl Default for LabelingConfig {
    fn default() -> Self {
        Self {
            radius_meters: 100.0,
            partitions: 1,
        }
    }
}

/// Risk tier thresholds on the positive-class probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskConfig {
    /// Lower bound of the High tier.
    pub high: f64,
    /// Lower bound of the Medium tier.
    pub medium: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            high: 0.66,
            medium: 0.33,
        }
    }
}

/// Classifier training settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    /// Fraction of each class held out for evaluation.
    pub test_fraction: f64,
    /// Positive-class probability at or above which a row is labeled 1.
    pub decision_threshold: f64,
    /// Which classifier to train.
    pub classifier: ClassifierKind,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            decision_threshold: 0.5,
            classifier: ClassifierKind::GaussianNb,
        }
    }
}

/// Where the trained bundle lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactsConfig {
    /// Bundle file path.
    pub path: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/artifacts/hotspot_bundle.json"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HotspotMapConfig {
    /// `[aggregation]`
    pub aggregation: AggregationConfig,
    /// `[labeling]`
    pub labeling: LabelingConfig,
    /// `[risk]`
    pub risk: RiskConfig,
    /// `[training]`
    pub training: TrainingConfig,
    /// `[artifacts]`
    pub artifacts: ArtifactsConfig,
}

fn invalid(key: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.into(),
    }
}

impl HotspotMapConfig {
    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise see
    /// [`Self::from_toml_str`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `explicit` if given, else the file named by
    /// [`CONFIG_ENV_VAR`] if set, else the defaults.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => {
                log::debug!("No config file given; using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Checks every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregation.precision > MAX_PRECISION {
            return Err(invalid(
                "aggregation.precision",
                format!(
                    "{} exceeds the maximum of {MAX_PRECISION} digits",
                    self.aggregation.precision
                ),
            ));
        }
        if self.aggregation.min_count == 0 {
            return Err(invalid("aggregation.min_count", "must be at least 1"));
        }

        let radius = self.labeling.radius_meters;
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(invalid(
                "labeling.radius_meters",
                format!("{radius} is not a finite non-negative distance"),
            ));
        }
        if self.labeling.partitions == 0 {
            return Err(invalid("labeling.partitions", "must be at least 1"));
        }

        let RiskConfig { high, medium } = self.risk;
        if !(0.0..=1.0).contains(&medium) || !(0.0..=1.0).contains(&high) || medium > high {
            return Err(invalid(
                "risk",
                format!("need 0 <= medium <= high <= 1, got medium={medium} high={high}"),
            ));
        }

        let fraction = self.training.test_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(invalid(
                "training.test_fraction",
                format!("{fraction} must be strictly between 0 and 1"),
            ));
        }
        let threshold = self.training.decision_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(invalid(
                "training.decision_threshold",
                format!("{threshold} is outside (0, 1]"),
            ));
        }

        Ok(())
    }
}
