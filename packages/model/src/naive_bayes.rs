//! Gaussian naive Bayes for two classes.
//!
//! Per class, each feature is modeled as an independent normal distribution
//! with the class mean and (population) variance. Variances are smoothed by
//! `VAR_SMOOTHING` times the largest per-feature variance over the whole
//! training set, so a feature that is constant within one class does not
//! divide by zero.

use serde::{Deserialize, Serialize};

use crate::{Classifier, ModelError, validate_row, validate_training_set};

/// Fraction of the largest feature variance added to every class variance.
pub const VAR_SMOOTHING: f64 = 1e-9;

/// Lower bound on a smoothed variance when every feature is constant.
const MIN_VARIANCE: f64 = 1e-12;

/// Fitted parameters, indexed by class label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Parameters {
    /// `ln P(class)`.
    class_log_prior: [f64; 2],
    /// Per-class feature means.
    theta: [Vec<f64>; 2],
    /// Per-class smoothed feature variances.
    var: [Vec<f64>; 2],
}

/// Two-class Gaussian naive Bayes classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianNb {
    #[serde(default)]
    params: Option<Parameters>,
}

impl GaussianNb {
    #[cfg(test)]
    const fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    #[cfg(test)]
    fn class_means(&self, label: u8) -> Option<&[f64]> {
        self.params
            .as_ref()
            .and_then(|p| p.theta.get(usize::from(label)))
            .map(Vec::as_slice)
    }

    fn joint_log_likelihood(params: &Parameters, row: &[f64]) -> [f64; 2] {
        let mut jll = params.class_log_prior;
        for (class, total) in jll.iter_mut().enumerate() {
            let theta = &params.theta[class];
            let var = &params.var[class];
            for ((x, mu), v) in row.iter().zip(theta).zip(var) {
                let diff = x - mu;
                *total -= 0.5 * (std::f64::consts::TAU * v).ln();
                *total -= diff * diff / (2.0 * v);
            }
        }
        jll
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_and_variance<'a>(
    rows: impl Iterator<Item = &'a Vec<f64>> + Clone,
    width: usize,
) -> (Vec<f64>, Vec<f64>) {
    let mut mean = vec![0.0; width];
    let mut n = 0_usize;
    for row in rows.clone() {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
        n += 1;
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut var = vec![0.0; width];
    for row in rows {
        for ((v, x), m) in var.iter_mut().zip(row).zip(&mean) {
            let d = x - m;
            *v += d * d;
        }
    }
    for v in &mut var {
        *v /= n as f64;
    }
    (mean, var)
}

impl Classifier for GaussianNb {
    fn fit(&mut self, x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        let width = validate_training_set(x, y)?;

        let positives = y.iter().filter(|&&l| l == 1).count();
        if positives == 0 || positives == y.len() {
            return Err(ModelError::SingleClass { label: y[0] });
        }

        let (_, overall_var) = mean_and_variance(x.iter(), width);
        let epsilon = VAR_SMOOTHING * overall_var.iter().copied().fold(0.0, f64::max);

        let mut theta: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut var: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
        let mut class_log_prior = [0.0; 2];

        #[allow(clippy::cast_precision_loss)]
        for label in [0_u8, 1] {
            let members = x
                .iter()
                .zip(y)
                .filter(move |(_, l)| **l == label)
                .map(|(row, _)| row);
            let count = members.clone().count();
            let (mean, mut variance) = mean_and_variance(members, width);
            for v in &mut variance {
                *v = (*v + epsilon).max(MIN_VARIANCE);
            }
            let class = usize::from(label);
            class_log_prior[class] = (count as f64 / y.len() as f64).ln();
            theta[class] = mean;
            var[class] = variance;
        }

        log::debug!(
            "GaussianNb fitted on {} rows x {width} features ({positives} positive), epsilon={epsilon:e}",
            x.len()
        );

        self.params = Some(Parameters {
            class_log_prior,
            theta,
            var,
        });
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], ModelError> {
        let params = self.params.as_ref().ok_or(ModelError::NotFitted)?;
        validate_row(row, params.theta[0].len())?;

        let [jll0, jll1] = Self::joint_log_likelihood(params, row);
        // Two-class softmax, arranged so exp never overflows.
        let d = jll0 - jll1;
        let p1 = if d > 0.0 {
            let e = (-d).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + d.exp())
        };
        Ok([1.0 - p1, p1])
    }

    fn n_features(&self) -> Option<usize> {
        self.params.as_ref().map(|p| p.theta[0].len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = f64::from(i % 5) * 0.01;
            x.push(vec![40.0 + jitter, 18.0 + jitter]);
            y.push(1);
            x.push(vec![41.0 + jitter, 3.0 + jitter]);
            y.push(0);
        }
        (x, y)
    }

    #[test]
    fn separates_well_separated_classes() {
        let (x, y) = separable();
        let mut model = GaussianNb::default();
        model.fit(&x, &y).unwrap();

        let [p0, p1] = model.predict_proba(&[40.02, 18.02]).unwrap();
        assert!(p1 > 0.99, "expected confident positive, got {p1}");
        assert!((p0 + p1 - 1.0).abs() < 1e-12);

        assert_eq!(model.predict(&[41.02, 3.02]).unwrap(), 0);
        assert_eq!(model.n_features(), Some(2));
    }

    #[test]
    fn far_away_rows_do_not_produce_nan() {
        let (x, y) = separable();
        let mut model = GaussianNb::default();
        model.fit(&x, &y).unwrap();

        let [p0, p1] = model.predict_proba(&[1.0e6, -1.0e6]).unwrap();
        assert!(p0.is_finite() && p1.is_finite());
        assert!((0.0..=1.0).contains(&p1));
    }

    #[test]
    fn constant_feature_is_smoothed() {
        let x = vec![vec![1.0, 5.0], vec![1.0, 6.0], vec![1.0, 1.0], vec![1.0, 2.0]];
        let y = vec![1, 1, 0, 0];
        let mut model = GaussianNb::default();
        model.fit(&x, &y).unwrap();

        let [_, p1] = model.predict_proba(&[1.0, 5.5]).unwrap();
        assert!(p1 > 0.5 && p1.is_finite(), "got {p1}");
        assert_eq!(model.class_means(1), Some([1.0, 5.5].as_slice()));
    }

    #[test]
    fn requires_both_classes() {
        let mut model = GaussianNb::default();
        assert_eq!(
            model.fit(&[vec![1.0], vec![2.0]], &[1, 1]),
            Err(ModelError::SingleClass { label: 1 })
        );
        assert!(!model.is_fitted());
    }

    #[test]
    fn unfitted_and_wrong_width_are_errors() {
        let model = GaussianNb::default();
        assert_eq!(model.predict_proba(&[1.0]), Err(ModelError::NotFitted));

        let (x, y) = separable();
        let mut model = GaussianNb::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(
            model.predict_proba(&[1.0, 2.0, 3.0]),
            Err(ModelError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }
}
