//! Density-threshold cluster aggregation.
//!
//! Coordinates are rounded to `precision` decimal digits and reports that
//! land in the same rounded cell are counted together. At the default
//! precision of 4 a cell is roughly 11 m north-south (and narrower
//! east-west away from the equator), so distinct sites closer than that
//! merge into one center, while two reports a few centimeters apart on
//! either side of a cell edge never merge. Use `[aggregation] precision` to
//! change the cell size.

use std::collections::BTreeMap;

use hotspot_map_geo_models::GeoPoint;
use hotspot_map_hotspot_models::{ClusterCenter, IncidentReport};

use crate::HotspotError;

/// Default rounding precision in decimal digits.
pub const DEFAULT_PRECISION: u32 = 4;

/// Largest supported rounding precision. Beyond this the scaled
/// coordinates stop being exactly representable.
pub const MAX_PRECISION: u32 = 10;

/// Groups points by rounded coordinate and returns the cells with at least
/// `min_count` members, ordered by (latitude, longitude) of the cell.
///
/// An empty result is not an error here; callers that need at least one
/// hotspot must check for it.
///
/// # Errors
///
/// Returns [`HotspotError::InvalidPrecision`] if `precision` exceeds
/// [`MAX_PRECISION`].
pub fn aggregate(
    reports: &[GeoPoint],
    precision: u32,
    min_count: u64,
) -> Result<Vec<ClusterCenter>, HotspotError> {
    if precision > MAX_PRECISION {
        return Err(HotspotError::InvalidPrecision {
            precision,
            max: MAX_PRECISION,
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let scale = 10_u64.pow(precision) as f64;

    let mut cells: BTreeMap<(i64, i64), u64> = BTreeMap::new();
    for point in reports {
        let key = (
            scaled_cell(point.latitude(), scale),
            scaled_cell(point.longitude(), scale),
        );
        *cells.entry(key).or_insert(0) += 1;
    }

    let total_cells = cells.len();
    let mut centers = Vec::new();
    for ((lat_cell, lng_cell), count) in cells {
        if count < min_count {
            continue;
        }
        #[allow(clippy::cast_precision_loss)]
        let location = GeoPoint::new(lat_cell as f64 / scale, lng_cell as f64 / scale)?;
        centers.push(ClusterCenter { location, count });
    }

    log::info!(
        "Aggregated {} reports into {total_cells} cells at precision {precision}; \
         {} cells meet min_count={min_count}",
        reports.len(),
        centers.len()
    );

    Ok(centers)
}

/// Convenience wrapper over [`aggregate`] for full incident reports.
///
/// # Errors
///
/// See [`aggregate`].
pub fn aggregate_reports(
    reports: &[IncidentReport],
    precision: u32,
    min_count: u64,
) -> Result<Vec<ClusterCenter>, HotspotError> {
    let points: Vec<GeoPoint> = reports.iter().map(|r| r.location).collect();
    aggregate(&points, precision, min_count)
}

#[allow(clippy::cast_possible_truncation)]
fn scaled_cell(value: f64, scale: f64) -> i64 {
    (value * scale).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn keeps_only_cells_meeting_threshold() {
        let reports = vec![
            point(40.1, -75.0),
            point(40.100_01, -75.000_02),
            point(40.099_99, -74.999_98),
            point(40.1, -75.0),
            point(40.100_04, -75.0),
            point(41.5, -76.2),
        ];

        let centers = aggregate(&reports, 4, 2).unwrap();

        assert_eq!(centers.len(), 1);
        assert_eq!(centers[0].count, 5);
        assert_eq!(centers[0].location, point(40.1, -75.0));
    }

    #[test]
    fn no_cell_meeting_threshold_yields_empty() {
        let reports = vec![point(10.0, 10.0), point(20.0, 20.0)];
        assert!(aggregate(&reports, 4, 2).unwrap().is_empty());
        assert!(aggregate(&[], 4, 1).unwrap().is_empty());
    }

    #[test]
    fn precision_controls_cell_size() {
        // ~33m apart: separate cells at 4 digits, one cell at 3.
        let reports = vec![point(40.1001, -75.0), point(40.1004, -75.0)];
        assert!(aggregate(&reports, 4, 2).unwrap().is_empty());

        let coarse = aggregate(&reports, 3, 2).unwrap();
        assert_eq!(coarse.len(), 1);
        assert_eq!(coarse[0].location, point(40.1, -75.0));
    }

    #[test]
    fn points_across_a_cell_edge_never_merge() {
        let reports = vec![point(40.100_049, -75.0), point(40.100_051, -75.0)];
        assert!(aggregate(&reports, 4, 2).unwrap().is_empty());
    }

    #[test]
    fn rejects_excessive_precision() {
        assert!(matches!(
            aggregate(&[point(0.0, 0.0)], MAX_PRECISION + 1, 1),
            Err(HotspotError::InvalidPrecision { .. })
        ));
    }

    #[test]
    fn output_is_ordered_by_cell() {
        let reports = vec![point(50.0, 1.0), point(10.0, 5.0), point(10.0, -5.0)];
        let centers = aggregate(&reports, 2, 1).unwrap();
        let lats: Vec<f64> = centers.iter().map(|c| c.location.latitude()).collect();
        assert_eq!(lats, vec![10.0, 10.0, 50.0]);
        assert!(centers[0].location.longitude() < centers[1].location.longitude());
    }
}
