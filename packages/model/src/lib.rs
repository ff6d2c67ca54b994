#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Binary classifier capability used by the hotspot pipeline.
//!
//! The pipeline and the inference service only depend on [`Classifier`]:
//! `fit`, `predict_proba`, and `predict`. Two serializable baselines ship
//! with the crate so a trained bundle can be persisted and reloaded:
//! [`GaussianNb`] and [`PriorClassifier`]. [`ClassifierModel`] is the
//! persisted, tagged union of the two.
//!
//! Rows are positional `f64` slices in the feature schema's column order.
//! Labels are `0` (not a hotspot) and `1` (hotspot).

pub mod evaluation;
pub mod naive_bayes;
pub mod prior;
pub mod split;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use evaluation::{ClassMetrics, ClassificationReport, evaluate};
pub use naive_bayes::GaussianNb;
pub use prior::PriorClassifier;
pub use split::{Split, stratified_split};

/// Positive-class probability at or above which a row is labeled `1`.
pub const DEFAULT_DECISION_THRESHOLD: f64 = 0.5;

/// Errors from fitting or applying a classifier.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// `predict_proba` was called before `fit`.
    #[error("Classifier has not been fitted")]
    NotFitted,

    /// A row has the wrong number of features.
    #[error("Expected {expected} features, found {found}")]
    DimensionMismatch {
        /// Width the classifier was fitted with.
        expected: usize,
        /// Width of the offending row.
        found: usize,
    },

    /// Row and label counts differ.
    #[error("Got {rows} rows but {labels} labels")]
    LengthMismatch {
        /// Number of feature rows.
        rows: usize,
        /// Number of labels.
        labels: usize,
    },

    /// The training set is empty.
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// Only one class is present in the training labels.
    #[error("Only class {label} present in training labels; need both classes")]
    SingleClass {
        /// The only label seen.
        label: u8,
    },

    /// A label other than `0` or `1`.
    #[error("Invalid label {label}: expected 0 or 1")]
    InvalidLabel {
        /// The rejected label.
        label: u8,
    },

    /// A row contains NaN or infinity.
    #[error("Feature {index} is not finite")]
    NonFiniteFeature {
        /// Column position of the bad value.
        index: usize,
    },

    /// A parameter is out of its valid range.
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the problem.
        message: String,
    },
}

/// A binary probabilistic classifier.
pub trait Classifier {
    /// Fits the classifier to rows `x` with labels `y`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] if the data is empty, ragged, mislabeled, or
    /// otherwise unusable by this classifier.
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError>;

    /// Returns `[p0, p1]` for one row; the two sum to 1.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFitted`] before `fit`, or
    /// [`ModelError::DimensionMismatch`] for a row of the wrong width.
    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError>;

    /// Number of features the classifier was fitted with.
    fn n_features(&self) -> Option<usize>;

    /// Predicts the label for one row at [`DEFAULT_DECISION_THRESHOLD`].
    ///
    /// # Errors
    ///
    /// See [`Classifier::predict_proba`].
    fn predict(&self, row: &[f64]) -> Result<u8, ModelError> {
        let [_, p1] = self.predict_proba(row)?;
        Ok(decide(p1, DEFAULT_DECISION_THRESHOLD))
    }
}

/// Label for a positive-class probability at a decision threshold.
#[must_use]
pub fn decide(p1: f64, threshold: f64) -> u8 {
    u8::from(p1 >= threshold)
}

/// Which classifier implementation to train.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassifierKind {
    /// Gaussian naive Bayes.
    #[default]
    GaussianNb,
    /// Class-prior baseline that ignores features.
    Prior,
}

/// A persisted classifier of any supported kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    /// Gaussian naive Bayes.
    GaussianNb(GaussianNb),
    /// Class-prior baseline.
    Prior(PriorClassifier),
}

impl ClassifierModel {
    /// An unfitted classifier of the given kind.
    #[must_use]
    pub fn untrained(kind: ClassifierKind) -> Self {
        match kind {
            ClassifierKind::GaussianNb => Self::GaussianNb(GaussianNb::default()),
            ClassifierKind::Prior => Self::Prior(PriorClassifier::default()),
        }
    }

    /// The kind of this classifier.
    #[must_use]
    pub const fn kind(&self) -> ClassifierKind {
        match self {
            Self::GaussianNb(_) => ClassifierKind::GaussianNb,
            Self::Prior(_) => ClassifierKind::Prior,
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::GaussianNb(m) => m,
            Self::Prior(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Classifier {
        match self {
            Self::GaussianNb(m) => m,
            Self::Prior(m) => m,
        }
    }
}

impl Classifier for ClassifierModel {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        self.inner().predict_proba(row)
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }
}

/// Checks the shape shared by every `fit` implementation: non-empty,
/// rectangular, finite, labels in `{0, 1}`. Returns the row width.
pub(crate) fn validate_training_set(x: &[Vec<f64>], y: &[u8]) -> Result<usize, ModelError> {
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }
    let Some(first) = x.first() else {
        return Err(ModelError::EmptyTrainingSet);
    };
    let width = first.len();
    for row in x {
        validate_row(row, width)?;
    }
    if let Some(&label) = y.iter().find(|&&l| l > 1) {
        return Err(ModelError::InvalidLabel { label });
    }
    Ok(width)
}

/// Checks one row's width and finiteness.
pub(crate) fn validate_row(row: &[f64], width: usize) -> Result<(), ModelError> {
    if row.len() != width {
        return Err(ModelError::DimensionMismatch {
            expected: width,
            found: row.len(),
        });
    }
    if let Some(index) = row.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFiniteFeature { index });
    }
    Ok(())
}
