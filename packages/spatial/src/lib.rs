#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory spatial index for exact great-circle radius queries.
//!
//! Points are bulk-loaded once into an R-tree keyed on `[longitude,
//! latitude]` degrees. A radius query first computes a conservative degree
//! bounding box around the query point (split in two when it crosses the
//! antimeridian, widened to every longitude when it covers a pole), collects
//! the candidates inside it, then keeps only those whose haversine distance
//! is within the radius. The box never excludes a true match and the
//! haversine check never admits a false one.

use std::f64::consts::PI;

use hotspot_map_geo_models::{GeoPoint, distance, meters_to_radians};
use rstar::{AABB, RTree, RTreeObject};

/// Slack added to every bounding box edge so floating-point error in the
/// box math cannot exclude a point sitting exactly on the radius.
const ENVELOPE_MARGIN_DEGREES: f64 = 1e-7;

/// An indexed point stored in the R-tree with its position in the input.
struct IndexedPoint {
    index: usize,
    point: GeoPoint,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.point.longitude(), self.point.latitude()])
    }
}

/// Immutable index over a fixed set of points.
///
/// Built once and shared read-only; lookups take `&self` and need no
/// locking.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
    points: Vec<GeoPoint>,
}

impl SpatialIndex {
    /// Bulk-loads the index. Query results refer to positions in `points`.
    #[must_use]
    pub fn build(points: Vec<GeoPoint>) -> Self {
        let entries = points
            .iter()
            .enumerate()
            .map(|(index, point)| IndexedPoint {
                index,
                point: *point,
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built spatial index over {} points", tree.size());

        Self { tree, points }
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the indices of every point whose great-circle distance to
    /// `center` is at most `radius_meters`, in ascending order.
    ///
    /// A negative or NaN radius matches nothing.
    #[must_use]
    pub fn query_radius(&self, center: &GeoPoint, radius_meters: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .candidates(center, radius_meters)
            .filter(|entry| distance(center, &entry.point) <= radius_meters)
            .map(|entry| entry.index)
            .collect();
        hits.sort_unstable();
        hits.dedup();
        hits
    }

    /// Whether any point lies within `radius_meters` of `center`.
    ///
    /// Equivalent to `!query_radius(..).is_empty()` but stops at the first
    /// match.
    #[must_use]
    pub fn any_within(&self, center: &GeoPoint, radius_meters: f64) -> bool {
        self.candidates(center, radius_meters)
            .any(|entry| distance(center, &entry.point) <= radius_meters)
    }

    fn candidates<'a>(
        &'a self,
        center: &GeoPoint,
        radius_meters: f64,
    ) -> impl Iterator<Item = &'a IndexedPoint> + 'a {
        let envelopes = if self.is_empty() || radius_meters.is_nan() || radius_meters < 0.0 {
            Vec::new()
        } else {
            query_envelopes(center, radius_meters)
        };

        envelopes
            .into_iter()
            .flat_map(move |env| self.tree.locate_in_envelope_intersecting(&env))
    }
}

/// Degree-space boxes that together contain the spherical cap of
/// `radius_meters` around `center`.
fn query_envelopes(center: &GeoPoint, radius_meters: f64) -> Vec<AABB<[f64; 2]>> {
    let angular = meters_to_radians(radius_meters);
    if angular >= PI {
        return vec![world_band(-90.0, 90.0)];
    }

    let lat = center.latitude();
    let lng = center.longitude();
    let dlat = angular.to_degrees() + ENVELOPE_MARGIN_DEGREES;
    let min_lat = lat - dlat;
    let max_lat = lat + dlat;

    // The cap reaches a pole, so every meridian passes through it.
    if min_lat <= -90.0 || max_lat >= 90.0 {
        return vec![world_band(min_lat.max(-90.0), max_lat.min(90.0))];
    }

    let ratio = angular.sin() / lat.to_radians().cos();
    if ratio >= 1.0 {
        return vec![world_band(min_lat, max_lat)];
    }

    let dlon = ratio.asin().to_degrees() + ENVELOPE_MARGIN_DEGREES;
    let west = lng - dlon;
    let east = lng + dlon;

    if west < -180.0 {
        vec![
            AABB::from_corners([west + 360.0, min_lat], [180.0, max_lat]),
            AABB::from_corners([-180.0, min_lat], [east, max_lat]),
        ]
    } else if east > 180.0 {
        vec![
            AABB::from_corners([west, min_lat], [180.0, max_lat]),
            AABB::from_corners([-180.0, min_lat], [east - 360.0, max_lat]),
        ]
    } else {
        vec![AABB::from_corners([west, min_lat], [east, max_lat])]
    }
}

fn world_band(min_lat: f64, max_lat: f64) -> AABB<[f64; 2]> {
    AABB::from_corners([-180.0, min_lat], [180.0, max_lat])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn brute_force(points: &[GeoPoint], center: &GeoPoint, radius: f64) -> Vec<usize> {
        points
            .iter()
            .enumerate()
            .filter(|(_, p)| distance(center, p) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    /// Deterministic pseudo-random points spread over the whole globe.
    fn scattered_points(count: usize) -> Vec<GeoPoint> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            #[allow(clippy::cast_precision_loss)]
            let unit = (state >> 11) as f64 / (1u64 << 53) as f64;
            unit
        };
        (0..count)
            .map(|_| point(next().mul_add(180.0, -90.0), next().mul_add(360.0, -180.0)))
            .collect()
    }

    #[test]
    fn radius_query_is_exact_at_street_scale() {
        let index = SpatialIndex::build(vec![point(40.0, -75.0), point(40.001, -75.0)]);
        let query = point(40.0, -75.0);

        assert_eq!(index.query_radius(&query, 200.0), vec![0, 1]);
        assert_eq!(index.query_radius(&query, 50.0), vec![0]);
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = SpatialIndex::build(Vec::new());
        assert!(index.is_empty());
        assert!(index.query_radius(&point(0.0, 0.0), 1e7).is_empty());
        assert!(!index.any_within(&point(0.0, 0.0), 1e7));
    }

    #[test]
    fn negative_radius_matches_nothing() {
        let index = SpatialIndex::build(vec![point(10.0, 10.0)]);
        assert!(index.query_radius(&point(10.0, 10.0), -1.0).is_empty());
        assert!(index.query_radius(&point(10.0, 10.0), f64::NAN).is_empty());
        assert_eq!(index.query_radius(&point(10.0, 10.0), 0.0), vec![0]);
    }

    #[test]
    fn finds_neighbors_across_the_antimeridian() {
        let index = SpatialIndex::build(vec![point(0.0, 179.999), point(0.0, 170.0)]);
        assert_eq!(index.query_radius(&point(0.0, -179.999), 500.0), vec![0]);
        assert!(index.any_within(&point(0.0, -179.999), 500.0));
    }

    #[test]
    fn finds_neighbors_over_the_pole() {
        let index = SpatialIndex::build(vec![point(89.999, 0.0), point(89.999, 180.0)]);
        // Both points are ~111m from the pole on opposite meridians.
        let hits = index.query_radius(&point(89.999, 90.0), 250.0);
        assert_eq!(hits, vec![0, 1]);
    }

    #[test]
    fn matches_brute_force_over_scattered_points() {
        let points = scattered_points(500);
        let index = SpatialIndex::build(points.clone());
        let queries = scattered_points(40);

        for radius in [1_000.0, 250_000.0, 2_000_000.0, 15_000_000.0] {
            for q in &queries {
                assert_eq!(
                    index.query_radius(q, radius),
                    brute_force(&points, q, radius),
                    "mismatch for {q} at radius {radius}"
                );
            }
        }
    }

    #[test]
    fn any_within_agrees_with_query_radius() {
        let points = scattered_points(200);
        let index = SpatialIndex::build(points);
        for q in &scattered_points(50) {
            let radius = 800_000.0;
            assert_eq!(
                index.any_within(q, radius),
                !index.query_radius(q, radius).is_empty(),
                "{q}"
            );
        }
    }
}
