#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature schema contract types.
//!
//! A [`FeatureSchemaDefinition`] is the single source of truth for which
//! columns the model sees and in what order. It is stored inside every
//! trained artifact bundle and compared against the serving code's own
//! definition before any prediction runs. Column order is positional: the
//! imputer and classifier never look values up by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use hotspot_map_geo_models::GeoError;
use serde::{Deserialize, Serialize};

/// Version tag of the built-in hotspot feature schema.
pub const HOTSPOT_SCHEMA_VERSION: &str = "hotspot-v1";

/// Errors raised while reshaping, validating, or imputing features.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureError {
    /// A required column is absent and has no registered default.
    #[error("Missing expected feature in input: {column}")]
    MissingFeature {
        /// Canonical column name.
        column: String,
    },

    /// An alias and its canonical column were both supplied with different
    /// values.
    #[error("Duplicate column: '{alias}' and '{column}' were both supplied with different values")]
    DuplicateColumn {
        /// The alias key that was supplied.
        alias: String,
        /// The canonical column it maps to.
        column: String,
    },

    /// A value could not be parsed as a finite number.
    #[error("Invalid value for feature {column}: {value}")]
    InvalidValue {
        /// Canonical column name.
        column: String,
        /// The offending raw value, rendered for display.
        value: String,
    },

    /// Columns do not match what the statistics or model were built with.
    #[error("Schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        /// Columns recorded at training time.
        expected: Vec<String>,
        /// Columns presented now.
        found: Vec<String>,
    },

    /// Schema versions differ between the live code and a trained bundle.
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Version the caller expects.
        expected: String,
        /// Version that was presented.
        found: String,
    },

    /// A column had no non-missing value in the fit set.
    #[error("No observed values for feature {column}")]
    NoObservedValues {
        /// Canonical column name.
        column: String,
    },

    /// The location columns hold an out-of-range coordinate.
    #[error(transparent)]
    InvalidCoordinate(#[from] GeoError),

    /// The schema definition itself is inconsistent.
    #[error("Invalid feature schema: {message}")]
    InvalidSchema {
        /// Description of the inconsistency.
        message: String,
    },
}

/// A raw, untyped input value as it arrives from a request or table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// A JSON number.
    Number(f64),
    /// A JSON boolean. Never a valid feature value.
    Flag(bool),
    /// Text that may hold a number.
    Text(String),
    /// An explicit null / empty cell.
    Missing,
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Missing => f.write_str("null"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A keyed raw input record, e.g. one request body or one table row.
pub type RawRecord = BTreeMap<String, RawValue>;

/// Names of the columns holding a row's coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationColumns {
    /// Latitude column name.
    pub latitude: String,
    /// Longitude column name.
    pub longitude: String,
}

/// The versioned feature contract shared by training and serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchemaDefinition {
    /// Version tag. Bump whenever any other field changes.
    pub version: String,
    /// Canonical column names in model input order.
    pub columns: Vec<String>,
    /// Alias name to canonical name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Serving-time values for columns absent from a request.
    #[serde(default)]
    pub defaults: BTreeMap<String, f64>,
    /// Which columns hold the row's coordinates, if any.
    #[serde(default)]
    pub location: Option<LocationColumns>,
}

impl FeatureSchemaDefinition {
    /// The hotspot model contract: `[latitude, longitude, hour, day,
    /// month]`, accepting `dayofweek` for `day`, with no serving defaults.
    #[must_use]
    pub fn hotspot_v1() -> Self {
        Self {
            version: HOTSPOT_SCHEMA_VERSION.to_string(),
            columns: ["latitude", "longitude", "hour", "day", "month"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            aliases: BTreeMap::from([("dayofweek".to_string(), "day".to_string())]),
            defaults: BTreeMap::new(),
            location: Some(LocationColumns {
                latitude: "latitude".to_string(),
                longitude: "longitude".to_string(),
            }),
        }
    }

    /// Verifies that `other` is the same contract as `self`.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::SchemaVersionMismatch`] if the versions
    /// differ, or [`FeatureError::SchemaMismatch`] if the versions agree
    /// but the column lists do not.
    pub fn ensure_compatible(&self, other: &Self) -> Result<(), FeatureError> {
        if self.version != other.version {
            return Err(FeatureError::SchemaVersionMismatch {
                expected: self.version.clone(),
                found: other.version.clone(),
            });
        }
        if self != other {
            return Err(FeatureError::SchemaMismatch {
                expected: self.columns.clone(),
                found: other.columns.clone(),
            });
        }
        Ok(())
    }
}

/// One reshaped row: values in canonical column order.
///
/// `None` marks a missing value that the imputer will fill.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    columns: Arc<[String]>,
    values: Vec<Option<f64>>,
}

impl FeatureRecord {
    /// Pairs a column list with positional values.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::SchemaMismatch`] if the lengths differ.
    pub fn new(columns: Arc<[String]>, values: Vec<Option<f64>>) -> Result<Self, FeatureError> {
        if columns.len() != values.len() {
            return Err(FeatureError::SchemaMismatch {
                expected: columns.to_vec(),
                found: vec![format!("<{} values>", values.len())],
            });
        }
        Ok(Self { columns, values })
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Value of a named column, `None` if the column is unknown or missing.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values[i])
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-column means learned at training time and frozen for serving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputerStatistics {
    /// Columns in the order the means apply to.
    pub columns: Vec<String>,
    /// Mean of the observed values per column.
    pub means: Vec<f64>,
    /// Number of observed (non-missing) values per column.
    pub observed: Vec<u64>,
}

impl ImputerStatistics {
    /// Mean for a named column.
    #[must_use]
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.means[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_deserialize_from_json() {
        let record: RawRecord = serde_json::from_str(
            r#"{"latitude": 40.0, "hour": 18, "day": "2", "flag": true, "month": null}"#,
        )
        .unwrap();

        assert_eq!(record["latitude"], RawValue::Number(40.0));
        assert_eq!(record["hour"], RawValue::Number(18.0));
        assert_eq!(record["day"], RawValue::Text("2".to_string()));
        assert_eq!(record["flag"], RawValue::Flag(true));
        assert_eq!(record["month"], RawValue::Missing);
    }

    #[test]
    fn hotspot_schema_is_self_compatible() {
        let schema = FeatureSchemaDefinition::hotspot_v1();
        assert!(schema.ensure_compatible(&schema.clone()).is_ok());
    }

    #[test]
    fn reordered_columns_are_incompatible() {
        let live = FeatureSchemaDefinition::hotspot_v1();
        let mut drifted = live.clone();
        drifted.columns.swap(3, 4);

        assert!(matches!(
            live.ensure_compatible(&drifted),
            Err(FeatureError::SchemaMismatch { .. })
        ));

        drifted.version = "hotspot-v0".to_string();
        assert!(matches!(
            live.ensure_compatible(&drifted),
            Err(FeatureError::SchemaVersionMismatch { .. })
        ));
    }

    #[test]
    fn record_rejects_length_mismatch() {
        let columns: Arc<[String]> = vec!["a".to_string(), "b".to_string()].into();
        assert!(FeatureRecord::new(Arc::clone(&columns), vec![Some(1.0)]).is_err());

        let record = FeatureRecord::new(columns, vec![Some(1.0), None]).unwrap();
        assert_eq!(record.get("a"), Some(1.0));
        assert_eq!(record.get("b"), None);
        assert_eq!(record.get("c"), None);
    }
}
