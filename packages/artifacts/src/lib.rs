#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The trained artifact bundle.
//!
//! A [`TrainedArtifacts`] value is the one unit the serving path loads: the
//! feature schema, the frozen imputer statistics, and the fitted classifier,
//! plus the hotspot centers and holdout metrics from the run that produced
//! them. The three model parts are never mixed across bundles; see
//! [`TrainedArtifacts::validate`].
//!
//! On disk a bundle is wrapped in a checksummed envelope (see [`file`]).

pub mod file;

use chrono::{DateTime, Utc};
use hotspot_map_feature_models::{FeatureSchemaDefinition, ImputerStatistics};
use hotspot_map_hotspot_models::ClusterCenter;
use hotspot_map_model::{ClassificationReport, Classifier as _, ClassifierModel};
use serde::{Deserialize, Serialize};

pub use file::{FORMAT_VERSION, load, save};

/// Errors from building, saving, or loading a bundle.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// I/O error reading or writing the bundle file.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The bundle file is not valid JSON of the expected shape.
    #[error("Invalid bundle JSON at {path}: {source}")]
    Json {
        /// Path of the bundle file.
        path: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The stored checksum does not match the bundle contents.
    #[error("Checksum mismatch in {path}: recorded {expected}, computed {actual}")]
    ChecksumMismatch {
        /// Path of the bundle file.
        path: String,
        /// Checksum recorded in the envelope.
        expected: String,
        /// Checksum of the bytes actually present.
        actual: String,
    },

    /// The envelope was written by an incompatible format version.
    #[error("Unsupported bundle format version {found} (supported: {supported})")]
    UnsupportedFormat {
        /// Version in the file.
        found: u32,
        /// Version this build reads.
        supported: u32,
    },

    /// The bundle's parts do not belong together.
    #[error("Inconsistent bundle: {message}")]
    Inconsistent {
        /// What disagrees.
        message: String,
    },
}

/// Parameters and output of the hotspot labeling stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotspotSummary {
    /// Decimal digits coordinates were rounded to before grouping.
    pub precision: u32,
    /// Minimum reports per cell for the cell to become a center.
    pub min_count: u64,
    /// Labeling radius in meters.
    pub radius_meters: f64,
    /// The retained cluster centers.
    pub centers: Vec<ClusterCenter>,
}

/// Everything the serving path needs, versioned as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifacts {
    /// Bundle version, unique per training run.
    pub version: String,
    /// When the bundle was produced.
    pub created_at: DateTime<Utc>,
    /// The feature contract the imputer and classifier were fitted under.
    pub schema: FeatureSchemaDefinition,
    /// Frozen imputer statistics.
    pub imputer: ImputerStatistics,
    /// Fitted classifier.
    pub classifier: ClassifierModel,
    /// Positive-class probability at or above which a query is labeled 1.
    pub decision_threshold: f64,
    /// Hotspot centers used to label the training data.
    pub hotspots: HotspotSummary,
    /// Holdout metrics, absent when the holdout set was empty.
    #[serde(default)]
    pub evaluation: Option<ClassificationReport>,
}

impl TrainedArtifacts {
    /// Assembles a bundle with a fresh version and timestamp, then checks it.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Inconsistent`] if the parts disagree; see
    /// [`Self::validate`].
    pub fn new(
        schema: FeatureSchemaDefinition,
        imputer: ImputerStatistics,
        classifier: ClassifierModel,
        decision_threshold: f64,
        hotspots: HotspotSummary,
        evaluation: Option<ClassificationReport>,
    ) -> Result<Self, ArtifactError> {
        let created_at = Utc::now();
        let artifacts = Self {
            version: new_version(created_at),
            created_at,
            schema,
            imputer,
            classifier,
            decision_threshold,
            hotspots,
            evaluation,
        };
        artifacts.validate()?;
        Ok(artifacts)
    }

    /// Checks that schema, imputer, and classifier describe the same
    /// columns, and that the threshold is a probability.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::Inconsistent`] describing the first
    /// disagreement found.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        if self.imputer.columns != self.schema.columns {
            return Err(inconsistent(format!(
                "imputer columns {:?} differ from schema {} columns {:?}",
                self.imputer.columns, self.schema.version, self.schema.columns
            )));
        }
        if self.imputer.means.len() != self.imputer.columns.len() {
            return Err(inconsistent(format!(
                "imputer has {} means for {} columns",
                self.imputer.means.len(),
                self.imputer.columns.len()
            )));
        }
        match self.classifier.n_features() {
            Some(n) if n == self.schema.columns.len() => {}
            Some(n) => {
                return Err(inconsistent(format!(
                    "classifier expects {n} features, schema has {}",
                    self.schema.columns.len()
                )));
            }
            None => return Err(inconsistent("classifier is not fitted".to_string())),
        }
        if !(self.decision_threshold > 0.0 && self.decision_threshold <= 1.0) {
            return Err(inconsistent(format!(
                "decision threshold {} is outside (0, 1]",
                self.decision_threshold
            )));
        }
        Ok(())
    }
}

const fn inconsistent(message: String) -> ArtifactError {
    ArtifactError::Inconsistent { message }
}

/// `20240618T180500Z-1a2b3c4d`: sortable by time, unique per run.
fn new_version(created_at: DateTime<Utc>) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", created_at.format("%Y%m%dT%H%M%SZ"), &id[..8])
}
