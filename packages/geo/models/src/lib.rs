#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geographic point type and great-circle distance math.
//!
//! Every coordinate that enters the hotspot pipeline passes through
//! [`GeoPoint::new`], so downstream code never sees a latitude outside
//! `[-90, 90]`, a longitude outside `[-180, 180]`, or a non-finite value.
//! Distances are computed with the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_METERS`].

use serde::{Deserialize, Serialize};

/// Earth mean radius used for all distance math, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Errors produced when constructing geographic values.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// Latitude or longitude is out of range or not a finite number.
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate {
        /// The rejected latitude.
        latitude: f64,
        /// The rejected longitude.
        longitude: f64,
    },
}

/// A validated WGS84 latitude/longitude pair in decimal degrees.
///
/// Immutable once built. Deserialization goes through the same validation
/// as [`GeoPoint::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: RawGeoPoint) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Creates a point from decimal degrees.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::InvalidCoordinate`] if either value is NaN,
    /// infinite, or outside its valid range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
        {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(GeoError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// Great-circle distance between two points in meters (haversine).
///
/// The arcsine argument is clamped to `[0, 1]` so rounding error near
/// antipodal points cannot produce NaN.
#[must_use]
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (b.longitude - a.longitude).to_radians() / 2.0;

    let h = half_dlon
        .sin()
        .powi(2)
        .mul_add(lat1.cos() * lat2.cos(), half_dlat.sin().powi(2));

    2.0 * EARTH_RADIUS_METERS * h.sqrt().clamp(0.0, 1.0).asin()
}

/// Converts a surface distance in meters to the central angle it subtends,
/// in radians.
#[must_use]
pub fn meters_to_radians(meters: f64) -> f64 {
    meters / EARTH_RADIUS_METERS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn samples() -> Vec<GeoPoint> {
        vec![
            point(40.0, -75.0),
            point(40.001, -75.0),
            point(40.0868, -75.7005),
            point(-33.8688, 151.2093),
            point(89.9, 0.0),
            point(-89.9, 179.9),
            point(0.0, -179.99),
            point(0.0, 179.99),
            point(51.5074, -0.1278),
        ]
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(GeoPoint::new(90.1, 0.0).is_err());
        assert!(GeoPoint::new(-90.1, 0.0).is_err());
        assert!(GeoPoint::new(0.0, 180.5).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::INFINITY).is_err());
        assert!(GeoPoint::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn distance_to_self_is_zero() {
        for p in samples() {
            assert!(distance(&p, &p).abs() < 1e-9, "{p} distance to self");
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pts = samples();
        for a in &pts {
            for b in &pts {
                let ab = distance(a, b);
                let ba = distance(b, a);
                assert!((ab - ba).abs() < 1e-6, "{a} -> {b}: {ab} vs {ba}");
            }
        }
    }

    #[test]
    fn distance_obeys_triangle_inequality() {
        let pts = samples();
        for a in &pts {
            for b in &pts {
                for c in &pts {
                    let direct = distance(a, c);
                    let via = distance(a, b) + distance(b, c);
                    assert!(direct <= via + 1e-3, "{a} -> {c} via {b}");
                }
            }
        }
    }

    #[test]
    fn one_thousandth_degree_of_latitude_is_about_111_meters() {
        let d = distance(&point(40.0, -75.0), &point(40.001, -75.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn antipodal_distance_is_half_circumference() {
        let d = distance(&point(0.0, 0.0), &point(0.0, 180.0));
        let expected = std::f64::consts::PI * EARTH_RADIUS_METERS;
        assert!((d - expected).abs() < 1e-3, "got {d}");
        assert!(distance(&point(90.0, 0.0), &point(-90.0, 0.0)).is_finite());
    }

    #[test]
    fn distance_across_antimeridian_is_short() {
        let d = distance(&point(0.0, -179.99), &point(0.0, 179.99));
        assert!(d < 2_300.0, "got {d}");
    }

    #[test]
    fn deserialization_validates_range() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude":40.0,"longitude":-75.0}"#).unwrap();
        assert_eq!(ok, point(40.0, -75.0));
        let bad = serde_json::from_str::<GeoPoint>(r#"{"latitude":91.0,"longitude":0.0}"#);
        assert!(bad.is_err());
    }
}
