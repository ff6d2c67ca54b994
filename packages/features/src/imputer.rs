//! Mean imputation with statistics frozen at training time.
//!
//! [`fit`] runs once per training run; [`transform`] is the only operation
//! the serving path calls. Statistics are positional and carry their column
//! list so a row from a different schema is rejected instead of being
//! filled with the wrong means.

use hotspot_map_feature_models::{FeatureError, FeatureRecord, ImputerStatistics};

/// Learns the per-column mean over non-missing values.
///
/// # Errors
///
/// - [`FeatureError::SchemaMismatch`] if any row's columns differ from
///   `columns`.
/// - [`FeatureError::NoObservedValues`] if a column has no observed value
///   in `rows` (including when `rows` is empty).
pub fn fit(columns: &[String], rows: &[FeatureRecord]) -> Result<ImputerStatistics, FeatureError> {
    let mut sums = vec![0.0_f64; columns.len()];
    let mut observed = vec![0_u64; columns.len()];

    for row in rows {
        ensure_columns(columns, row)?;
        for (i, value) in row.values().iter().enumerate() {
            if let Some(v) = value {
                sums[i] += v;
                observed[i] += 1;
            }
        }
    }

    let mut means = Vec::with_capacity(columns.len());
    for (i, column) in columns.iter().enumerate() {
        if observed[i] == 0 {
            return Err(FeatureError::NoObservedValues {
                column: column.clone(),
            });
        }
        #[allow(clippy::cast_precision_loss)]
        means.push(sums[i] / observed[i] as f64);
    }

    log::debug!("Imputer fitted over {} rows: means {means:?}", rows.len());

    Ok(ImputerStatistics {
        columns: columns.to_vec(),
        means,
        observed,
    })
}

/// Replaces every missing value in `row` with its column's stored mean.
///
/// # Errors
///
/// Returns [`FeatureError::SchemaMismatch`] if `row` was not built with the
/// columns the statistics were fitted on.
pub fn transform(stats: &ImputerStatistics, row: &FeatureRecord) -> Result<Vec<f64>, FeatureError> {
    ensure_columns(&stats.columns, row)?;
    Ok(row
        .values()
        .iter()
        .zip(&stats.means)
        .map(|(value, mean)| value.unwrap_or(*mean))
        .collect())
}

/// [`transform`] over many rows.
///
/// # Errors
///
/// See [`transform`].
pub fn transform_all(
    stats: &ImputerStatistics,
    rows: &[FeatureRecord],
) -> Result<Vec<Vec<f64>>, FeatureError> {
    rows.iter().map(|row| transform(stats, row)).collect()
}

fn ensure_columns(expected: &[String], row: &FeatureRecord) -> Result<(), FeatureError> {
    if row.columns() == expected {
        Ok(())
    } else {
        Err(FeatureError::SchemaMismatch {
            expected: expected.to_vec(),
            found: row.columns().to_vec(),
        })
    }
}
