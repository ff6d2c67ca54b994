//! CSV adapter for the two training tables.
//!
//! Columns are matched by header name. Empty cells become missing values so
//! the imputer fills them; they are never read as zero.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use hotspot_map_feature_models::{FeatureSchemaDefinition, RawRecord, RawValue};
use hotspot_map_geo_models::GeoPoint;
use hotspot_map_hotspot_models::{IncidentReport, parse_timestamp};
use hotspot_map_pipeline::FeatureTable;

/// Header of the optional report timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

const LATITUDE_COLUMN: &str = "latitude";
const LONGITUDE_COLUMN: &str = "longitude";

/// Errors reading a CSV table.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// CSV parsing error.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A required header is absent.
    #[error("{path} has no '{column}' column")]
    MissingColumn {
        /// Path to the CSV file.
        path: String,
        /// The header that was expected.
        column: &'static str,
    },
}

/// Reads incident reports from `path`.
///
/// Requires `latitude` and `longitude` headers. A `timestamp` column, if
/// present, feeds the derived hour/day/month. Every other non-empty cell is
/// kept as a text attribute. Rows whose coordinates do not parse or are out
/// of range are skipped with a warning.
///
/// # Errors
///
/// * [`TableError::Csv`] if the file cannot be opened or parsed
/// * [`TableError::MissingColumn`] if a coordinate header is absent
pub fn read_reports(path: &Path) -> Result<Vec<IncidentReport>, TableError> {
    let name = path.display().to_string();
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableError::Csv {
            path: name.clone(),
            source: e,
        })?;
    reports_from_csv(reader, &name)
}

/// Reads feature rows from `path`, one [`RawRecord`] per line keyed by
/// header. With a `timestamp` column, temporal columns the row does not
/// supply (directly or through an alias such as `dayofweek`) are derived
/// from it.
///
/// # Errors
///
/// [`TableError::Csv`] if the file cannot be opened or parsed.
pub fn read_features(path: &Path) -> Result<FeatureTable, TableError> {
    let name = path.display().to_string();
    let reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| TableError::Csv {
            path: name.clone(),
            source: e,
        })?;
    features_from_csv(reader, &name)
}

fn reports_from_csv<R: Read>(
    mut reader: csv::Reader<R>,
    name: &str,
) -> Result<Vec<IncidentReport>, TableError> {
    let headers = reader
        .headers()
        .map_err(|e| TableError::Csv {
            path: name.to_string(),
            source: e,
        })?
        .clone();
    let position = |column: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| TableError::MissingColumn {
                path: name.to_string(),
                column,
            })
    };
    let lat_idx = position(LATITUDE_COLUMN)?;
    let lng_idx = position(LONGITUDE_COLUMN)?;
    let ts_idx = headers.iter().position(|h| h.trim() == TIMESTAMP_COLUMN);

    let mut reports = Vec::new();
    let mut skipped = 0u64;
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| TableError::Csv {
            path: name.to_string(),
            source: e,
        })?;

        let location = coordinate(&record, lat_idx)
            .zip(coordinate(&record, lng_idx))
            .and_then(|(lat, lng)| GeoPoint::new(lat, lng).ok());
        let Some(location) = location else {
            log::trace!("  skipping report row {}: no valid coordinate", line + 1);
            skipped += 1;
            continue;
        };

        let occurred_at = ts_idx
            .and_then(|i| record.get(i))
            .and_then(parse_timestamp);

        let attributes: BTreeMap<String, String> = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, (_, value))| {
                *i != lat_idx && *i != lng_idx && Some(*i) != ts_idx && !value.trim().is_empty()
            })
            .map(|(_, (header, value))| (header.trim().to_string(), value.trim().to_string()))
            .collect();

        reports.push(IncidentReport {
            location,
            occurred_at,
            attributes,
        });
    }

    if skipped > 0 {
        log::warn!("{name}: skipped {skipped} reports without a valid coordinate");
    }
    log::info!("Read {} reports from {name}", reports.len());

    Ok(reports)
}

fn features_from_csv<R: Read>(
    mut reader: csv::Reader<R>,
    name: &str,
) -> Result<FeatureTable, TableError> {
    let headers = reader
        .headers()
        .map_err(|e| TableError::Csv {
            path: name.to_string(),
            source: e,
        })?
        .clone();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| TableError::Csv {
            path: name.to_string(),
            source: e,
        })?;
        let row: RawRecord = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.trim().to_string(), cell(value)))
            .collect();
        rows.push(row);
    }

    let mut table = FeatureTable::new(rows);
    if headers.iter().any(|h| h.trim() == TIMESTAMP_COLUMN) {
        let definition = FeatureSchemaDefinition::hotspot_v1();
        table.derive_temporal_columns(TIMESTAMP_COLUMN, &definition);
    }
    log::info!("Read {} feature rows from {name}", table.len());

    Ok(table)
}

fn coordinate(record: &csv::StringRecord, index: usize) -> Option<f64> {
    record.get(index)?.trim().parse().ok()
}

fn cell(value: &str) -> RawValue {
    let value = value.trim();
    if value.is_empty() {
        RawValue::Missing
    } else {
        RawValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(text: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes())
    }

    #[test]
    fn reports_keep_location_time_and_attributes() {
        let text = "latitude,longitude,timestamp,type\n\
                    40.1,-75.0,2024-03-05T18:30:00Z,Theft\n\
                    40.2,-75.1,,\n";
        let reports = reports_from_csv(reader(text), "reports.csv").unwrap();

        assert_eq!(reports.len(), 2);
        assert!((reports[0].location.latitude() - 40.1).abs() < 1e-12);
        let temporal = reports[0].temporal().unwrap();
        assert_eq!((temporal.hour, temporal.month), (18, 3));
        assert_eq!(reports[0].attributes.get("type").map(String::as_str), Some("Theft"));
        assert!(reports[1].occurred_at.is_none());
        assert!(reports[1].attributes.is_empty());
    }

    #[test]
    fn reports_without_valid_coordinates_are_skipped() {
        let text = "latitude,longitude\n40.1,-75.0\n,\nabc,-75.0\n91.0,0.0\n";
        let reports = reports_from_csv(reader(text), "reports.csv").unwrap();
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn reports_require_coordinate_headers() {
        let err = reports_from_csv(reader("lat,lng\n40.1,-75.0\n"), "reports.csv").unwrap_err();
        assert!(
            matches!(err, TableError::MissingColumn { column, .. } if column == "latitude"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn empty_feature_cells_are_missing_not_zero() {
        let text = "latitude,longitude,hour,dayofweek,month\n40.1,-75.0,,2,6\n";
        let table = features_from_csv(reader(text), "features.csv").unwrap();

        let row = &table.rows()[0];
        assert_eq!(row.get("hour"), Some(&RawValue::Missing));
        assert_eq!(row.get("dayofweek"), Some(&RawValue::Text("2".to_string())));
        assert_eq!(row.get("latitude"), Some(&RawValue::Text("40.1".to_string())));
    }

    #[test]
    fn feature_timestamps_fill_temporal_gaps() {
        let text = "latitude,longitude,timestamp,hour\n40.1,-75.0,2024-03-05 18:30:00,\n";
        let table = features_from_csv(reader(text), "features.csv").unwrap();

        let row = &table.rows()[0];
        assert_eq!(row.get("hour"), Some(&RawValue::Number(18.0)));
        assert_eq!(row.get("month"), Some(&RawValue::Number(3.0)));
    }

    #[test]
    fn alias_and_timestamp_columns_train_cleanly() {
        let text = "latitude,longitude,timestamp,hour,dayofweek,month\n\
                    40.1,-75.0,2024-03-05 18:30:00,18,,3\n\
                    40.1,-75.0,2024-03-05 18:30:00,18,4,3\n";
        let table = features_from_csv(reader(text), "features.csv").unwrap();
        let pipeline = hotspot_map_pipeline::TrainingPipeline::new(
            hotspot_map_config::HotspotMapConfig::default(),
        )
        .unwrap();

        let filled = pipeline.schema().reshape_training(&table.rows()[0]).unwrap();
        assert_eq!(filled.get("day"), Some(1.0));

        let kept = pipeline.schema().reshape_training(&table.rows()[1]).unwrap();
        assert_eq!(kept.get("day"), Some(4.0), "dayofweek wins over the timestamp");
    }
}
