#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Offline hotspot training pipeline.
//!
//! Turns a table of incident reports and a table of feature rows into a
//! [`hotspot_map_artifacts::TrainedArtifacts`] bundle. See
//! [`TrainingPipeline::run`] for the stages.

pub mod table;
pub mod training;

use hotspot_map_artifacts::ArtifactError;
use hotspot_map_config::ConfigError;
use hotspot_map_feature_models::FeatureError;
use hotspot_map_hotspot::HotspotError;
use hotspot_map_model::ModelError;

pub use table::FeatureTable;
pub use training::{TrainingInput, TrainingOutcome, TrainingPipeline};

/// Errors that abort a training run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// No rounded cell reached the minimum report count.
    #[error(
        "No hotspots found: no cell among {reports} reports has at least {min_count} reports; \
         no positive examples available"
    )]
    NoHotspotsFound {
        /// Number of reports aggregated.
        reports: usize,
        /// Threshold that no cell met.
        min_count: u64,
    },

    /// Labeling produced a single class.
    #[error(
        "Only class {label} present after labeling {rows} rows; adjust radius or min_count"
    )]
    SingleClass {
        /// The only label produced.
        label: u8,
        /// Number of labeled rows.
        rows: usize,
    },

    /// Every feature row lacked a location.
    #[error("None of the {rows} feature rows has a location")]
    NoUsableRows {
        /// Number of input rows.
        rows: usize,
    },

    /// A feature row failed strict reshaping.
    #[error("Feature row {row}: {source}")]
    Row {
        /// Zero-based input row number.
        row: usize,
        /// The reshape failure.
        source: FeatureError,
    },

    /// Cluster aggregation failed.
    #[error(transparent)]
    Hotspot(#[from] HotspotError),

    /// Schema or imputer failure.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Classifier fit or evaluation failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Bundle assembly failure.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
