//! Bundle metadata for `inspect`.

use std::collections::BTreeMap;

use hotspot_map_artifacts::TrainedArtifacts;
use hotspot_map_model::{ClassificationReport, ClassifierKind};
use serde::Serialize;

/// What `inspect` prints.
#[derive(Debug, Serialize)]
pub struct BundleSummary<'a> {
    pub version: &'a str,
    pub created_at: String,
    pub schema_version: &'a str,
    pub columns: &'a [String],
    pub aliases: &'a BTreeMap<String, String>,
    pub imputer_means: BTreeMap<&'a str, f64>,
    pub classifier: ClassifierKind,
    pub decision_threshold: f64,
    pub hotspot_centers: usize,
    pub hotspot_reports: u64,
    pub evaluation: Option<&'a ClassificationReport>,
}

impl<'a> BundleSummary<'a> {
    pub fn new(artifacts: &'a TrainedArtifacts) -> Self {
        Self {
            version: &artifacts.version,
            created_at: artifacts.created_at.to_rfc3339(),
            schema_version: &artifacts.schema.version,
            columns: &artifacts.schema.columns,
            aliases: &artifacts.schema.aliases,
            imputer_means: artifacts
                .imputer
                .columns
                .iter()
                .map(String::as_str)
                .zip(artifacts.imputer.means.iter().copied())
                .collect(),
            classifier: artifacts.classifier.kind(),
            decision_threshold: artifacts.decision_threshold,
            hotspot_centers: artifacts.hotspots.centers.len(),
            hotspot_reports: artifacts.hotspots.centers.iter().map(|c| c.count).sum(),
            evaluation: artifacts.evaluation.as_ref(),
        }
    }
}
