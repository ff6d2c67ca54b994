//! Deterministic stratified holdout split.
//!
//! Within each class, test rows are spread evenly across the class's rows
//! in input order, so the split is reproducible without a random seed and
//! both sides keep the class balance.

use std::collections::BTreeMap;

use crate::ModelError;

/// Row indices assigned to each side of a split.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    /// Training row indices, ascending.
    pub train: Vec<usize>,
    /// Holdout row indices, ascending.
    pub test: Vec<usize>,
}

/// Splits row indices by label, sending roughly `test_fraction` of each
/// class to the holdout set.
///
/// A class with fewer than two rows stays entirely in training. Otherwise
/// each class keeps at least one row on each side.
///
/// # Errors
///
/// Returns [`ModelError::InvalidParameter`] unless `0 < test_fraction < 1`.
pub fn stratified_split(labels: &[u8], test_fraction: f64) -> Result<Split, ModelError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ModelError::InvalidParameter {
            message: format!("test fraction {test_fraction} must be strictly between 0 and 1"),
        });
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut split = Split::default();
    for members in by_class.values() {
        let n = members.len();
        let n_test = if n < 2 {
            0
        } else {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                clippy::cast_precision_loss
            )]
            let wanted = (n as f64 * test_fraction).round() as usize;
            wanted.clamp(1, n - 1)
        };

        for (j, &index) in members.iter().enumerate() {
            if (j + 1) * n_test / n > j * n_test / n {
                split.test.push(index);
            } else {
                split.train.push(index);
            }
        }
    }

    split.train.sort_unstable();
    split.test.sort_unstable();
    Ok(split)
}
