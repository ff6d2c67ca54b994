#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Response types of the hotspot inference service.
//!
//! A successful prediction serializes as
//! `{"hotspot_prediction": 1, "probability": 0.7, "risk_level": "High", "color": "red"}`;
//! a failure as `{"error": "...", "kind": "missing_feature", "stage": "schema"}`.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discrete risk tier derived from the positive-class probability.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum RiskLevel {
    /// Below the medium threshold.
    Low,
    /// At or above the medium threshold, below the high threshold.
    Medium,
    /// At or above the high threshold.
    High,
}

impl RiskLevel {
    /// Display color for the tier.
    #[must_use]
    pub const fn color(self) -> RiskColor {
        match self {
            Self::Low => RiskColor::Yellow,
            Self::Medium => RiskColor::Orange,
            Self::High => RiskColor::Red,
        }
    }
}

/// Display color of a risk tier.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskColor {
    /// Low risk.
    Yellow,
    /// Medium risk.
    Orange,
    /// High risk.
    Red,
}

/// One prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// `1` if the query is predicted to be in a hotspot, else `0`.
    pub hotspot_prediction: u8,
    /// Positive-class probability in `[0, 1]`.
    pub probability: f64,
    /// Risk tier.
    pub risk_level: RiskLevel,
    /// Display color of the tier.
    pub color: RiskColor,
}

/// Body of a failed prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// User-facing message.
    pub error: String,
    /// Stable machine-readable error kind.
    pub kind: String,
    /// Stage that failed.
    pub stage: String,
}

/// What a transport layer sends back for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    /// The query was scored.
    Prediction(PredictionResult),
    /// The query was rejected or could not be scored.
    Error(ErrorBody),
}
