#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident report and hotspot cluster types.
//!
//! An [`IncidentReport`] is one cleaned raw report. Cluster aggregation
//! turns a set of reports into [`ClusterCenter`]s, which are rebuilt from
//! scratch on every training run and persisted alongside the trained model.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike as _, NaiveDateTime, Timelike as _, Utc};
use hotspot_map_geo_models::GeoPoint;
use serde::{Deserialize, Serialize};

/// A cleaned incident report.
///
/// Only the location and the timestamp-derived fields feed the hotspot
/// model; `attributes` carries whatever categorical columns the source
/// provided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    /// Where the incident happened.
    pub location: GeoPoint,
    /// When the incident happened, if known.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Arbitrary categorical attributes (e.g. animal type, weather code).
    pub attributes: BTreeMap<String, String>,
}

impl IncidentReport {
    /// Creates a report with no timestamp and no attributes.
    #[must_use]
    pub const fn at(location: GeoPoint) -> Self {
        Self {
            location,
            occurred_at: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Hour/day/month fields derived from the timestamp.
    #[must_use]
    pub fn temporal(&self) -> Option<TemporalFields> {
        self.occurred_at.map(TemporalFields::from_timestamp)
    }
}

/// Calendar fields derived from an incident timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalFields {
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day of week, Monday = 0 through Sunday = 6.
    pub day: u32,
    /// Month of year, 1-12.
    pub month: u32,
}

impl TemporalFields {
    /// Derives the fields from a UTC timestamp.
    #[must_use]
    pub fn from_timestamp(ts: DateTime<Utc>) -> Self {
        Self {
            hour: ts.hour(),
            day: ts.weekday().num_days_from_monday(),
            month: ts.month(),
        }
    }
}

/// Parses an incident timestamp. Accepts RFC 3339 and the common
/// `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` forms (read as UTC).
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

/// A hotspot center: a rounded coordinate cell and how many reports fell
/// into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterCenter {
    /// Rounded cell coordinate.
    pub location: GeoPoint,
    /// Number of reports in the cell.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    #[test]
    fn derives_temporal_fields() {
        // 2024-06-18 was a Tuesday.
        let ts = Utc.with_ymd_and_hms(2024, 6, 18, 18, 5, 0).unwrap();
        let fields = TemporalFields::from_timestamp(ts);
        assert_eq!(
            fields,
            TemporalFields {
                hour: 18,
                day: 1,
                month: 6
            }
        );
    }

    #[test]
    fn report_without_timestamp_has_no_temporal_fields() {
        let report = IncidentReport::at(GeoPoint::new(40.0, -75.0).unwrap());
        assert!(report.temporal().is_none());
    }

    #[test]
    fn parses_supported_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-15T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T09:30:00-05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T14:30:00.000"), Some(expected));
        assert!(parse_timestamp("yesterday").is_none());
    }
}
