//! In-memory feature table handed to the training pipeline.

use hotspot_map_feature_models::{FeatureSchemaDefinition, RawRecord, RawValue};
use hotspot_map_hotspot_models::{IncidentReport, TemporalFields, parse_timestamp};

/// Column names filled from a timestamp.
pub const TEMPORAL_COLUMNS: [&str; 3] = ["hour", "day", "month"];

/// Rows of raw keyed values, one per feature record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    rows: Vec<RawRecord>,
}

impl FeatureTable {
    /// Wraps already-keyed rows.
    #[must_use]
    pub const fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }

    /// One row per report: `latitude`, `longitude`, the temporal columns
    /// (missing when the report has no timestamp), and every attribute as
    /// text.
    #[must_use]
    pub fn from_reports(reports: &[IncidentReport]) -> Self {
        let rows = reports
            .iter()
            .map(|report| {
                let mut row: RawRecord = report
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), RawValue::Text(v.clone())))
                    .collect();
                row.insert(
                    "latitude".to_string(),
                    RawValue::Number(report.location.latitude()),
                );
                row.insert(
                    "longitude".to_string(),
                    RawValue::Number(report.location.longitude()),
                );
                insert_temporal(&mut row, report.temporal());
                row
            })
            .collect();
        Self { rows }
    }

    /// The rows.
    #[must_use]
    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fills `hour`, `day`, and `month` from the text timestamp in
    /// `timestamp_column` wherever a row lacks them. A column counts as
    /// supplied when it, or any alias `definition` maps to it, holds a
    /// non-missing value; supplied columns are never touched. Returns the
    /// number of rows changed.
    pub fn derive_temporal_columns(
        &mut self,
        timestamp_column: &str,
        definition: &FeatureSchemaDefinition,
    ) -> usize {
        let mut changed = 0;
        let mut unparsed = 0;
        for row in &mut self.rows {
            let gaps: Vec<&str> = TEMPORAL_COLUMNS
                .into_iter()
                .filter(|column| !is_supplied(row, column, definition))
                .collect();
            if gaps.is_empty() {
                continue;
            }
            let fields = match row.get(timestamp_column) {
                Some(RawValue::Text(text)) => {
                    parse_timestamp(text).map(TemporalFields::from_timestamp)
                }
                _ => None,
            };
            let Some(fields) = fields else {
                unparsed += 1;
                continue;
            };
            for (column, value) in temporal_values(fields) {
                if gaps.contains(&column) {
                    row.insert(column.to_string(), RawValue::Number(f64::from(value)));
                }
            }
            changed += 1;
        }
        if unparsed > 0 {
            log::warn!(
                "{unparsed} rows lack temporal columns and a parseable '{timestamp_column}'; \
                 their gaps will be imputed"
            );
        }
        log::debug!("Derived temporal columns for {changed} rows from '{timestamp_column}'");
        changed
    }
}

fn temporal_values(fields: TemporalFields) -> [(&'static str, u32); 3] {
    [
        (TEMPORAL_COLUMNS[0], fields.hour),
        (TEMPORAL_COLUMNS[1], fields.day),
        (TEMPORAL_COLUMNS[2], fields.month),
    ]
}

fn is_gap(value: Option<&RawValue>) -> bool {
    match value {
        None | Some(RawValue::Missing) => true,
        Some(RawValue::Text(text)) => text.trim().is_empty(),
        Some(RawValue::Number(n)) => n.is_nan(),
        Some(RawValue::Flag(_)) => false,
    }
}

/// Whether `column` or one of its aliases carries a value in `row`.
fn is_supplied(row: &RawRecord, column: &str, definition: &FeatureSchemaDefinition) -> bool {
    let aliases = definition
        .aliases
        .iter()
        .filter(|(_, target)| target.as_str() == column)
        .map(|(alias, _)| alias.as_str());
    std::iter::once(column)
        .chain(aliases)
        .any(|key| !is_gap(row.get(key)))
}

/// Writes every temporal column; missing values when `fields` is `None`.
fn insert_temporal(row: &mut RawRecord, fields: Option<TemporalFields>) {
    match fields {
        Some(fields) => {
            for (column, value) in temporal_values(fields) {
                row.insert(column.to_string(), RawValue::Number(f64::from(value)));
            }
        }
        None => {
            for column in TEMPORAL_COLUMNS {
                row.insert(column.to_string(), RawValue::Missing);
            }
        }
    }
}

impl From<Vec<RawRecord>> for FeatureTable {
    fn from(rows: Vec<RawRecord>) -> Self {
        Self::new(rows)
    }
}
