//! Holdout metrics: per-class precision, recall, F1, and overall accuracy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Classifier, ModelError, decide};

/// Metrics for one class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class label.
    pub label: u8,
    /// `tp / (tp + fp)`, zero when nothing was predicted as this class.
    pub precision: f64,
    /// `tp / (tp + fn)`, zero when the class has no rows.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Number of rows whose true label is this class.
    pub support: usize,
}

/// Classification metrics over an evaluation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// One entry per label, `0` then `1`.
    pub classes: Vec<ClassMetrics>,
    /// Fraction of rows predicted correctly.
    pub accuracy: f64,
    /// Number of evaluated rows.
    pub support: usize,
    /// Threshold the predictions were made at.
    pub threshold: f64,
}

impl ClassificationReport {
    /// Metrics for a label.
    #[must_use]
    pub fn class(&self, label: u8) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>8} {:>10} {:>10} {:>10} {:>8}",
            "label", "precision", "recall", "f1", "support"
        )?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>8} {:>10.3} {:>10.3} {:>10.3} {:>8}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        write!(
            f,
            "accuracy {:.3} over {} rows (threshold {})",
            self.accuracy, self.support, self.threshold
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Scores `model` on rows `x` with true labels `y`.
///
/// # Errors
///
/// Returns [`ModelError::LengthMismatch`] if `x` and `y` differ in length,
/// or any error from [`Classifier::predict_proba`].
pub fn evaluate(
    model: &dyn Classifier,
    x: &[Vec<f64>],
    y: &[u8],
    threshold: f64,
) -> Result<ClassificationReport, ModelError> {
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            rows: x.len(),
            labels: y.len(),
        });
    }

    // confusion[actual][predicted]
    let mut confusion = [[0_usize; 2]; 2];
    for (row, &actual) in x.iter().zip(y) {
        if actual > 1 {
            return Err(ModelError::InvalidLabel { label: actual });
        }
        let [_, p1] = model.predict_proba(row)?;
        let predicted = decide(p1, threshold);
        confusion[usize::from(actual)][usize::from(predicted)] += 1;
    }

    let classes = (0..2_u8)
        .map(|label| {
            let k = usize::from(label);
            let other = 1 - k;
            let tp = confusion[k][k];
            let fp = confusion[other][k];
            let fn_ = confusion[k][other];
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support: tp + fn_,
            }
        })
        .collect();

    Ok(ClassificationReport {
        classes,
        accuracy: ratio(confusion[0][0] + confusion[1][1], y.len()),
        support: y.len(),
        threshold,
    })
}
