//! Reshaping keyed input into the canonical feature vector.
//!
//! Reshaping runs three passes in a fixed order: alias resolution,
//! required-column resolution, then emission in declared column order.
//! Input key order never matters and unknown keys are ignored.

use std::collections::BTreeMap;
use std::sync::Arc;

use hotspot_map_feature_models::{
    FeatureError, FeatureRecord, FeatureSchemaDefinition, RawRecord, RawValue,
};
use hotspot_map_geo_models::GeoPoint;

/// How absent columns are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReshapeMode {
    /// Absent columns are always an error; defaults are never applied.
    Training,
    /// Absent columns take their registered default, if any.
    Serving,
}

/// A validated, ready-to-use feature schema.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    definition: FeatureSchemaDefinition,
    columns: Arc<[String]>,
    /// Canonical column -> aliases that map to it.
    aliases_by_column: BTreeMap<String, Vec<String>>,
    /// Positions of the latitude and longitude columns.
    location: Option<(usize, usize)>,
}

impl FeatureSchema {
    /// Validates a definition and prepares it for reshaping.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidSchema`] if the column list is empty
    /// or has duplicates, an alias shadows a column or targets an unknown
    /// one, a default names an unknown column or is not finite, or the
    /// location columns are not part of the schema.
    pub fn new(definition: FeatureSchemaDefinition) -> Result<Self, FeatureError> {
        if definition.columns.is_empty() {
            return Err(invalid("schema declares no columns"));
        }

        let position = |name: &str| definition.columns.iter().position(|c| c == name);

        for (i, column) in definition.columns.iter().enumerate() {
            if position(column) != Some(i) {
                return Err(invalid(format!("column '{column}' is declared twice")));
            }
        }

        let mut aliases_by_column: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (alias, target) in &definition.aliases {
            if position(alias).is_some() {
                return Err(invalid(format!("alias '{alias}' shadows a canonical column")));
            }
            if position(target).is_none() {
                return Err(invalid(format!(
                    "alias '{alias}' targets unknown column '{target}'"
                )));
            }
            aliases_by_column
                .entry(target.clone())
                .or_default()
                .push(alias.clone());
        }

        for (column, value) in &definition.defaults {
            if position(column).is_none() {
                return Err(invalid(format!("default for unknown column '{column}'")));
            }
            if !value.is_finite() {
                return Err(invalid(format!("default for '{column}' is not finite")));
            }
        }

        let location = match &definition.location {
            Some(loc) => match (position(&loc.latitude), position(&loc.longitude)) {
                (Some(lat), Some(lng)) => Some((lat, lng)),
                _ => {
                    return Err(invalid(format!(
                        "location columns '{}'/'{}' are not in the schema",
                        loc.latitude, loc.longitude
                    )));
                }
            },
            None => None,
        };

        let columns: Arc<[String]> = definition.columns.clone().into();

        Ok(Self {
            definition,
            columns,
            aliases_by_column,
            location,
        })
    }

    /// The underlying definition.
    #[must_use]
    pub const fn definition(&self) -> &FeatureSchemaDefinition {
        &self.definition
    }

    /// Canonical columns in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Shared handle to the column list, for building records.
    #[must_use]
    pub fn column_handle(&self) -> Arc<[String]> {
        Arc::clone(&self.columns)
    }

    /// Reshapes a serving request. Absent columns take their default.
    ///
    /// # Errors
    ///
    /// See [`FeatureSchema::reshape_with`].
    pub fn reshape(&self, raw: &RawRecord) -> Result<FeatureRecord, FeatureError> {
        self.reshape_with(raw, ReshapeMode::Serving)
    }

    /// Reshapes a training row. Absent columns are always an error.
    ///
    /// # Errors
    ///
    /// See [`FeatureSchema::reshape_with`].
    pub fn reshape_training(&self, raw: &RawRecord) -> Result<FeatureRecord, FeatureError> {
        self.reshape_with(raw, ReshapeMode::Training)
    }

    /// Reshapes `raw` into a [`FeatureRecord`] in canonical order.
    ///
    /// # Errors
    ///
    /// - [`FeatureError::DuplicateColumn`] if an alias and its column (or
    ///   two aliases of one column) carry different non-missing values.
    /// - [`FeatureError::MissingFeature`] if a column is absent and cannot
    ///   be defaulted in this mode.
    /// - [`FeatureError::InvalidValue`] if a value is not numeric.
    /// - [`FeatureError::InvalidCoordinate`] if the location columns hold
    ///   an out-of-range coordinate.
    pub fn reshape_with(
        &self,
        raw: &RawRecord,
        mode: ReshapeMode,
    ) -> Result<FeatureRecord, FeatureError> {
        let resolved = self.resolve_aliases(raw)?;

        let mut values = Vec::with_capacity(self.columns.len());
        for column in self.columns.iter() {
            let value = match resolved.get(column.as_str()) {
                Some(raw_value) => parse_value(column, raw_value)?,
                None => match (mode, self.definition.defaults.get(column)) {
                    (ReshapeMode::Serving, Some(default)) => Some(*default),
                    _ => {
                        return Err(FeatureError::MissingFeature {
                            column: column.clone(),
                        });
                    }
                },
            };
            values.push(value);
        }

        if log::log_enabled!(log::Level::Debug) {
            let ignored: Vec<&str> = raw
                .keys()
                .map(String::as_str)
                .filter(|k| {
                    !self.columns.iter().any(|c| c.as_str() == *k)
                        && !self.definition.aliases.contains_key(*k)
                })
                .collect();
            if !ignored.is_empty() {
                log::debug!("Ignoring non-schema keys: {ignored:?}");
            }
        }

        let record = FeatureRecord::new(self.column_handle(), values)?;
        self.location_of(&record)?;
        Ok(record)
    }

    /// The record's coordinate, or `None` if the schema has no location
    /// columns or either value is missing.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::InvalidCoordinate`] for out-of-range values
    /// and [`FeatureError::SchemaMismatch`] if the record was built from a
    /// different column list.
    pub fn location_of(&self, record: &FeatureRecord) -> Result<Option<GeoPoint>, FeatureError> {
        if record.columns() != self.columns() {
            return Err(FeatureError::SchemaMismatch {
                expected: self.columns.to_vec(),
                found: record.columns().to_vec(),
            });
        }
        let Some((lat_idx, lng_idx)) = self.location else {
            return Ok(None);
        };
        match (record.values()[lat_idx], record.values()[lng_idx]) {
            (Some(lat), Some(lng)) => Ok(Some(GeoPoint::new(lat, lng)?)),
            _ => Ok(None),
        }
    }

    /// Maps every canonical column to the raw value that supplies it.
    fn resolve_aliases<'a>(
        &self,
        raw: &'a RawRecord,
    ) -> Result<BTreeMap<&str, &'a RawValue>, FeatureError> {
        let mut resolved = BTreeMap::new();

        for column in self.columns.iter() {
            let mut source: Option<(&str, &'a RawValue)> =
                raw.get(column).map(|v| (column.as_str(), v));

            for alias in self.aliases_by_column.get(column).into_iter().flatten() {
                let Some(alias_value) = raw.get(alias) else {
                    continue;
                };
                match source {
                    None => source = Some((alias.as_str(), alias_value)),
                    Some((_, existing))
                        if is_missing(column, alias_value)
                            || same_value(column, existing, alias_value) => {}
                    Some((_, existing)) if is_missing(column, existing) => {
                        source = Some((alias.as_str(), alias_value));
                    }
                    Some(_) => {
                        return Err(FeatureError::DuplicateColumn {
                            alias: alias.clone(),
                            column: column.clone(),
                        });
                    }
                }
            }

            if let Some((_, value)) = source {
                resolved.insert(column.as_str(), value);
            }
        }

        Ok(resolved)
    }
}

fn invalid(message: impl Into<String>) -> FeatureError {
    FeatureError::InvalidSchema {
        message: message.into(),
    }
}

/// Parses one raw value. Null, empty text, and NaN are missing.
fn parse_value(column: &str, raw: &RawValue) -> Result<Option<f64>, FeatureError> {
    let invalid_value = || FeatureError::InvalidValue {
        column: column.to_string(),
        value: raw.to_string(),
    };

    let number = match raw {
        RawValue::Missing => return Ok(None),
        RawValue::Number(n) => *n,
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<f64>().map_err(|_| invalid_value())?
        }
        RawValue::Flag(_) => return Err(invalid_value()),
    };

    if number.is_nan() {
        Ok(None)
    } else if number.is_infinite() {
        Err(invalid_value())
    } else {
        Ok(Some(number))
    }
}

/// Whether `raw` parses to a missing value. A missing side never conflicts
/// with a present one.
fn is_missing(column: &str, raw: &RawValue) -> bool {
    matches!(parse_value(column, raw), Ok(None))
}

/// Whether two raw values supplying the same column agree.
fn same_value(column: &str, a: &RawValue, b: &RawValue) -> bool {
    match (parse_value(column, a), parse_value(column, b)) {
        (Ok(x), Ok(y)) => x == y,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotspot_schema() -> FeatureSchema {
        FeatureSchema::new(FeatureSchemaDefinition::hotspot_v1()).unwrap()
    }

    fn record(pairs: &[(&str, RawValue)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn query() -> RawRecord {
        record(&[
            ("latitude", 40.0.into()),
            ("longitude", (-75.0).into()),
            ("hour", 18.0.into()),
            ("dayofweek", 2.0.into()),
            ("month", 6.0.into()),
        ])
    }

    #[test]
    fn reshapes_alias_into_canonical_order() {
        let reshaped = hotspot_schema().reshape(&query()).unwrap();
        assert_eq!(
            reshaped.values(),
            &[Some(40.0), Some(-75.0), Some(18.0), Some(2.0), Some(6.0)]
        );
        assert_eq!(
            reshaped.columns(),
            &["latitude", "longitude", "hour", "day", "month"]
        );
    }

    #[test]
    fn missing_column_without_default_is_named() {
        let mut raw = query();
        raw.remove("month");
        assert_eq!(
            hotspot_schema().reshape(&raw),
            Err(FeatureError::MissingFeature {
                column: "month".to_string()
            })
        );
    }

    #[test]
    fn serving_defaults_fill_absent_columns_but_training_does_not() {
        let mut definition = FeatureSchemaDefinition::hotspot_v1();
        definition.defaults.insert("month".to_string(), 6.0);
        let schema = FeatureSchema::new(definition).unwrap();

        let mut raw = query();
        raw.remove("month");

        assert_eq!(schema.reshape(&raw).unwrap().get("month"), Some(6.0));
        assert!(matches!(
            schema.reshape_training(&raw),
            Err(FeatureError::MissingFeature { .. })
        ));
    }

    #[test]
    fn conflicting_alias_and_canonical_is_duplicate() {
        let mut raw = query();
        raw.insert("day".to_string(), 3.0.into());
        assert_eq!(
            hotspot_schema().reshape(&raw),
            Err(FeatureError::DuplicateColumn {
                alias: "dayofweek".to_string(),
                column: "day".to_string()
            })
        );
    }

    #[test]
    fn agreeing_alias_and_canonical_are_accepted() {
        let mut raw = query();
        raw.insert("day".to_string(), "2".into());
        let reshaped = hotspot_schema().reshape(&raw).unwrap();
        assert_eq!(reshaped.get("day"), Some(2.0));
    }

    #[test]
    fn missing_alias_defers_to_present_canonical() {
        let mut raw = query();
        raw.remove("dayofweek");
        raw.insert("day".to_string(), 2.0.into());
        raw.insert("dayofweek".to_string(), RawValue::Missing);
        assert_eq!(hotspot_schema().reshape(&raw).unwrap().get("day"), Some(2.0));

        raw.insert("dayofweek".to_string(), " ".into());
        assert_eq!(hotspot_schema().reshape(&raw).unwrap().get("day"), Some(2.0));
    }

    #[test]
    fn present_alias_fills_missing_canonical() {
        let mut raw = query();
        raw.insert("day".to_string(), RawValue::Missing);
        assert_eq!(
            hotspot_schema().reshape_training(&raw).unwrap().get("day"),
            Some(2.0)
        );

        raw.insert("day".to_string(), "".into());
        assert_eq!(hotspot_schema().reshape(&raw).unwrap().get("day"), Some(2.0));
    }

    #[test]
    fn key_order_and_extra_keys_do_not_matter() {
        let mut raw = record(&[
            ("month", 6.0.into()),
            ("zzz_unused", "whatever".into()),
            ("day", 2.0.into()),
            ("hour", 18.0.into()),
            ("longitude", (-75.0).into()),
            ("latitude", 40.0.into()),
        ]);
        let a = hotspot_schema().reshape(&raw).unwrap();
        raw.remove("zzz_unused");
        let b = hotspot_schema().reshape(&raw).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, hotspot_schema().reshape(&query()).unwrap());
    }

    #[test]
    fn numeric_text_parses_and_garbage_is_invalid() {
        let mut raw = query();
        raw.insert("hour".to_string(), " 7 ".into());
        assert_eq!(hotspot_schema().reshape(&raw).unwrap().get("hour"), Some(7.0));

        raw.insert("hour".to_string(), "evening".into());
        assert!(matches!(
            hotspot_schema().reshape(&raw),
            Err(FeatureError::InvalidValue { column, .. }) if column == "hour"
        ));

        raw.insert("hour".to_string(), RawValue::Flag(true));
        assert!(matches!(
            hotspot_schema().reshape(&raw),
            Err(FeatureError::InvalidValue { .. })
        ));
    }

    #[test]
    fn null_and_empty_values_are_missing_not_errors() {
        let mut raw = query();
        raw.insert("hour".to_string(), RawValue::Missing);
        raw.insert("month".to_string(), "".into());
        let reshaped = hotspot_schema().reshape(&raw).unwrap();
        assert_eq!(reshaped.get("hour"), None);
        assert_eq!(reshaped.get("month"), None);
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut raw = query();
        raw.insert("latitude".to_string(), 123.0.into());
        assert!(matches!(
            hotspot_schema().reshape(&raw),
            Err(FeatureError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn inconsistent_definitions_are_rejected() {
        let mut dup = FeatureSchemaDefinition::hotspot_v1();
        dup.columns.push("hour".to_string());
        assert!(FeatureSchema::new(dup).is_err());

        let mut shadow = FeatureSchemaDefinition::hotspot_v1();
        shadow.aliases.insert("hour".to_string(), "day".to_string());
        assert!(FeatureSchema::new(shadow).is_err());

        let mut dangling = FeatureSchemaDefinition::hotspot_v1();
        dangling.aliases.insert("dow".to_string(), "weekday".to_string());
        assert!(FeatureSchema::new(dangling).is_err());

        let mut bad_default = FeatureSchemaDefinition::hotspot_v1();
        bad_default.defaults.insert("year".to_string(), 2024.0);
        assert!(FeatureSchema::new(bad_default).is_err());
    }
}
