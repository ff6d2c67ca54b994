//! Baseline that predicts the training positive rate for every row.

use serde::{Deserialize, Serialize};

use crate::{Classifier, ModelError, validate_row, validate_training_set};

/// Ignores features and returns the fitted class prior.
///
/// Useful as a floor to compare real classifiers against, and for serving
/// a fixed probability in tests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorClassifier {
    #[serde(default)]
    positive_rate: Option<f64>,
    #[serde(default)]
    n_features: Option<usize>,
}

impl PriorClassifier {
    /// A classifier already "fitted" to a known positive rate.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidParameter`] if `positive_rate` is not in
    /// `[0, 1]`.
    pub fn with_positive_rate(positive_rate: f64, n_features: usize) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&positive_rate) {
            return Err(ModelError::InvalidParameter {
                message: format!("positive rate {positive_rate} is outside [0, 1]"),
            });
        }
        Ok(Self {
            positive_rate: Some(positive_rate),
            n_features: Some(n_features),
        })
    }

    /// The fitted positive rate.
    #[must_use]
    pub const fn positive_rate(&self) -> Option<f64> {
        self.positive_rate
    }
}

impl Classifier for PriorClassifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        let width = validate_training_set(x, y)?;
        let positives = y.iter().filter(|&&l| l == 1).count();
        #[allow(clippy::cast_precision_loss)]
        let rate = positives as f64 / y.len() as f64;
        self.positive_rate = Some(rate);
        self.n_features = Some(width);
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        let (Some(p1), Some(width)) = (self.positive_rate, self.n_features) else {
            return Err(ModelError::NotFitted);
        };
        validate_row(row, width)?;
        Ok([1.0 - p1, p1])
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }
}
