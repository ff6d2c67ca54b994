//! Binary hotspot labeling by proximity to cluster centers.

use std::sync::Arc;

use hotspot_map_geo_models::GeoPoint;
use hotspot_map_spatial::SpatialIndex;

use crate::progress::ProgressCallback;

/// Label for a location within the radius of at least one center.
pub const HOTSPOT: u8 = 1;

/// Label for a location with no center within the radius.
pub const NOT_HOTSPOT: u8 = 0;

/// Labels each point [`HOTSPOT`] iff some indexed center lies within
/// `radius_meters` of it.
#[must_use]
pub fn label(points: &[GeoPoint], centers: &SpatialIndex, radius_meters: f64) -> Vec<u8> {
    points
        .iter()
        .map(|p| {
            if centers.any_within(p, radius_meters) {
                HOTSPOT
            } else {
                NOT_HOTSPOT
            }
        })
        .collect()
}

/// Same result as [`label`], computed over `partitions` contiguous chunks
/// on scoped worker threads and concatenated in input order.
#[must_use]
pub fn label_partitioned(
    points: &[GeoPoint],
    centers: &SpatialIndex,
    radius_meters: f64,
    partitions: usize,
    progress: &Arc<dyn ProgressCallback>,
) -> Vec<u8> {
    progress.set_total(points.len() as u64);
    progress.set_message("Labeling feature rows".to_string());

    let partitions = partitions.clamp(1, points.len().max(1));
    let labels = if partitions == 1 {
        let labels = label(points, centers, radius_meters);
        progress.inc(points.len() as u64);
        labels
    } else {
        let chunk_size = points.len().div_ceil(partitions);
        std::thread::scope(|scope| {
            let handles: Vec<_> = points
                .chunks(chunk_size)
                .map(|chunk| {
                    let progress = Arc::clone(progress);
                    scope.spawn(move || {
                        let labels = label(chunk, centers, radius_meters);
                        progress.inc(chunk.len() as u64);
                        labels
                    })
                })
                .collect();

            let mut labels = Vec::with_capacity(points.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk_labels) => labels.extend(chunk_labels),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            labels
        })
    };

    let counts = LabelCounts::from_labels(&labels);
    progress.finish(format!(
        "Labeled {} rows ({} hotspot, {} not)",
        labels.len(),
        counts.positive,
        counts.negative
    ));
    labels
}

/// Number of rows per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelCounts {
    /// Rows labeled [`HOTSPOT`].
    pub positive: usize,
    /// Rows labeled [`NOT_HOTSPOT`].
    pub negative: usize,
}

impl LabelCounts {
    /// Tallies a label vector.
    #[must_use]
    pub fn from_labels(labels: &[u8]) -> Self {
        let positive = labels.iter().filter(|&&l| l == HOTSPOT).count();
        Self {
            positive,
            negative: labels.len() - positive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::progress::null_progress;

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    fn injected_cluster_index() -> SpatialIndex {
        let mut reports = vec![point(40.10, -75.00); 5];
        reports.push(point(40.5, -74.5));
        let centers = aggregate(&reports, 4, 2).unwrap();
        assert_eq!(centers.len(), 1);
        SpatialIndex::build(centers.iter().map(|c| c.location).collect())
    }

    #[test]
    fn labels_rows_near_injected_cluster() {
        let index = injected_cluster_index();
        // 0.09 degrees of latitude is ~10 km.
        let features = vec![point(40.10, -75.00), point(40.19, -75.00)];

        assert_eq!(label(&features, &index, 100.0), vec![HOTSPOT, NOT_HOTSPOT]);
    }

    #[test]
    fn empty_center_set_labels_everything_negative() {
        let index = SpatialIndex::build(Vec::new());
        let features = vec![point(1.0, 1.0), point(2.0, 2.0)];
        assert_eq!(label(&features, &index, 1e6), vec![NOT_HOTSPOT; 2]);
    }

    #[test]
    fn partitioned_labeling_matches_sequential() {
        let index = injected_cluster_index();
        let features: Vec<GeoPoint> = (0..97)
            .map(|i| point(f64::from(i).mul_add(0.000_2, 40.095), -75.0))
            .collect();

        let sequential = label(&features, &index, 100.0);
        for partitions in [1, 2, 3, 8, 500] {
            let parallel =
                label_partitioned(&features, &index, 100.0, partitions, &null_progress());
            assert_eq!(parallel, sequential, "partitions={partitions}");
        }
        assert!(sequential.contains(&HOTSPOT));
        assert!(sequential.contains(&NOT_HOTSPOT));
    }

    #[test]
    fn partitioned_labeling_handles_empty_input() {
        let index = injected_cluster_index();
        assert!(label_partitioned(&[], &index, 100.0, 4, &null_progress()).is_empty());
    }

    #[test]
    fn counts_labels() {
        let counts = LabelCounts::from_labels(&[1, 0, 0, 1, 1]);
        assert_eq!(
            counts,
            LabelCounts {
                positive: 3,
                negative: 2
            }
        );
    }
}
