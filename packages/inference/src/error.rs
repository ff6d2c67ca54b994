//! Stage-tagged inference failures.

use hotspot_map_artifacts::ArtifactError;
use hotspot_map_feature_models::FeatureError;
use hotspot_map_inference_models::ErrorBody;
use hotspot_map_model::ModelError;
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

/// The pipeline stage a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InferenceStage {
    /// Reshaping the raw query.
    Schema,
    /// Filling missing values.
    Imputer,
    /// Scoring.
    Classifier,
    /// Loading or swapping the bundle.
    Artifacts,
}

/// What went wrong.
#[derive(Debug, thiserror::Error)]
pub enum InferenceErrorKind {
    /// Schema, alias, value, or imputer failure.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Classifier failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The classifier produced something that is not a probability.
    #[error("Classifier returned invalid probability {0}")]
    InvalidProbability(f64),

    /// The artifact bundle could not be loaded.
    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ArtifactError),
}

impl InferenceErrorKind {
    /// Stable identifier for mapping to transport status codes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Feature(e) => match e {
                FeatureError::MissingFeature { .. } => "missing_feature",
                FeatureError::DuplicateColumn { .. } => "duplicate_column",
                FeatureError::InvalidValue { .. } => "invalid_value",
                FeatureError::SchemaMismatch { .. } => "schema_mismatch",
                FeatureError::SchemaVersionMismatch { .. } => "schema_version_mismatch",
                FeatureError::NoObservedValues { .. } => "no_observed_values",
                FeatureError::InvalidCoordinate(_) => "invalid_coordinate",
                FeatureError::InvalidSchema { .. } => "invalid_schema",
            },
            Self::Model(ModelError::DimensionMismatch { .. }) => "schema_mismatch",
            Self::Model(ModelError::NonFiniteFeature { .. }) => "invalid_value",
            Self::Model(_) | Self::InvalidProbability(_) => "classifier_error",
            Self::ModelUnavailable(_) => "model_unavailable",
        }
    }

    /// Whether the caller's input caused the failure, as opposed to the
    /// service's own state.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Feature(
                FeatureError::MissingFeature { .. }
                    | FeatureError::DuplicateColumn { .. }
                    | FeatureError::InvalidValue { .. }
                    | FeatureError::InvalidCoordinate(_)
            )
        )
    }
}

/// A failure during inference, tagged with the stage it came from.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct InferenceError {
    /// Stage that failed.
    pub stage: InferenceStage,
    /// What went wrong.
    pub kind: InferenceErrorKind,
}

impl InferenceError {
    /// Tags `kind` with `stage`.
    pub fn new(stage: InferenceStage, kind: impl Into<InferenceErrorKind>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    /// Stable identifier. Any failure to load or install a bundle is
    /// `model_unavailable`; otherwise see [`InferenceErrorKind::code`].
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self.stage {
            InferenceStage::Artifacts => "model_unavailable",
            _ => self.kind.code(),
        }
    }

    /// The serializable response body.
    #[must_use]
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            kind: self.code().to_string(),
            stage: self.stage.to_string(),
        }
    }
}
