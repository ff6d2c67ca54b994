//! The offline training run.
//!
//! ```text
//! reports -> aggregate -> centers -> SpatialIndex
//! feature rows -> reshape (strict) -> label by proximity -> split
//!   train -> imputer fit -> transform -> classifier fit
//!   test  -> transform (frozen) -> evaluate
//! -> TrainedArtifacts
//! ```
//!
//! Any failure aborts the run before a bundle is assembled.

use std::sync::Arc;

use hotspot_map_artifacts::{HotspotSummary, TrainedArtifacts};
use hotspot_map_config::HotspotMapConfig;
use hotspot_map_feature_models::{FeatureRecord, FeatureSchemaDefinition};
use hotspot_map_features::{FeatureSchema, imputer};
use hotspot_map_geo_models::GeoPoint;
use hotspot_map_hotspot::progress::ProgressCallback;
use hotspot_map_hotspot::{LabelCounts, aggregate_reports, label_partitioned};
use hotspot_map_hotspot_models::IncidentReport;
use hotspot_map_model::{Classifier as _, ClassifierModel, evaluate, stratified_split};
use hotspot_map_spatial::SpatialIndex;

use crate::{FeatureTable, PipelineError};

/// The two tables a training run consumes.
#[derive(Debug, Clone, Default)]
pub struct TrainingInput {
    /// Raw incident reports; only their locations are used to find hotspots.
    pub reports: Vec<IncidentReport>,
    /// Feature rows to label and train on.
    pub features: FeatureTable,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// The bundle, ready to persist.
    pub artifacts: TrainedArtifacts,
    /// Label per input feature row; `None` for rows dropped for lacking a
    /// location.
    pub row_labels: Vec<Option<u8>>,
    /// Positive and negative label totals.
    pub label_counts: LabelCounts,
    /// Rows used to fit.
    pub train_rows: usize,
    /// Rows held out for evaluation.
    pub test_rows: usize,
}

/// Runs training with a fixed configuration and feature schema.
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: HotspotMapConfig,
    schema: FeatureSchema,
}

impl TrainingPipeline {
    /// A pipeline over the built-in hotspot schema.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `config` fails validation.
    pub fn new(config: HotspotMapConfig) -> Result<Self, PipelineError> {
        Self::with_schema(config, FeatureSchemaDefinition::hotspot_v1())
    }

    /// A pipeline over a custom schema. The schema must name location
    /// columns, since labeling is by location.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for an invalid config, or
    /// [`PipelineError::Feature`] for an invalid or location-less schema.
    pub fn with_schema(
        config: HotspotMapConfig,
        definition: FeatureSchemaDefinition,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if definition.location.is_none() {
            return Err(PipelineError::Feature(
                hotspot_map_feature_models::FeatureError::InvalidSchema {
                    message: format!(
                        "schema {} has no location columns to label by",
                        definition.version
                    ),
                },
            ));
        }
        let schema = FeatureSchema::new(definition)?;
        Ok(Self { config, schema })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &HotspotMapConfig {
        &self.config
    }

    /// The feature schema in use.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Runs the full pipeline.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NoHotspotsFound`] if no cell reaches `min_count`.
    /// - [`PipelineError::Row`] if a feature row fails strict reshaping.
    /// - [`PipelineError::NoUsableRows`] if no row has a location.
    /// - [`PipelineError::SingleClass`] if labeling yields only one class.
    /// - [`PipelineError::Feature`] if a column is never observed in the
    ///   training split.
    /// - [`PipelineError::Model`] / [`PipelineError::Artifact`] if fitting
    ///   or bundle assembly fails.
    pub fn run(
        &self,
        input: &TrainingInput,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<TrainingOutcome, PipelineError> {
        let aggregation = &self.config.aggregation;
        let labeling = &self.config.labeling;
        let training = &self.config.training;

        log::info!(
            "Training on {} reports and {} feature rows (schema {})",
            input.reports.len(),
            input.features.len(),
            self.schema.definition().version
        );

        let centers =
            aggregate_reports(&input.reports, aggregation.precision, aggregation.min_count)?;
        if centers.is_empty() {
            return Err(PipelineError::NoHotspotsFound {
                reports: input.reports.len(),
                min_count: aggregation.min_count,
            });
        }
        let index = SpatialIndex::build(centers.iter().map(|c| c.location).collect());

        let (records, points, kept) = self.reshape_rows(&input.features)?;

        let labels = label_partitioned(
            &points,
            &index,
            labeling.radius_meters,
            labeling.partitions,
            progress,
        );
        let label_counts = LabelCounts::from_labels(&labels);
        log::info!(
            "Labels: {} hotspot, {} not hotspot (radius {} m)",
            label_counts.positive,
            label_counts.negative,
            labeling.radius_meters
        );
        if label_counts.positive == 0 || label_counts.negative == 0 {
            return Err(PipelineError::SingleClass {
                label: labels[0],
                rows: labels.len(),
            });
        }

        let split = stratified_split(&labels, training.test_fraction)?;
        log::info!(
            "Split: {} train rows, {} holdout rows",
            split.train.len(),
            split.test.len()
        );

        let train_records: Vec<FeatureRecord> =
            split.train.iter().map(|&i| records[i].clone()).collect();
        let y_train: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();

        let statistics = imputer::fit(self.schema.columns(), &train_records)?;
        let x_train = imputer::transform_all(&statistics, &train_records)?;

        let mut classifier = ClassifierModel::untrained(training.classifier);
        classifier.fit(&x_train, &y_train)?;
        log::info!(
            "Fitted {} classifier on {} rows",
            classifier.kind(),
            x_train.len()
        );

        let evaluation = if split.test.is_empty() {
            log::warn!("Holdout set is empty; skipping evaluation");
            None
        } else {
            let test_records: Vec<FeatureRecord> =
                split.test.iter().map(|&i| records[i].clone()).collect();
            let x_test = imputer::transform_all(&statistics, &test_records)?;
            let y_test: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();
            let report = evaluate(&classifier, &x_test, &y_test, training.decision_threshold)?;
            log::info!("Holdout evaluation:\n{report}");
            Some(report)
        };

        let artifacts = TrainedArtifacts::new(
            self.schema.definition().clone(),
            statistics,
            classifier,
            training.decision_threshold,
            HotspotSummary {
                precision: aggregation.precision,
                min_count: aggregation.min_count,
                radius_meters: labeling.radius_meters,
                centers,
            },
            evaluation,
        )?;

        let mut row_labels = vec![None; input.features.len()];
        for (&row, &label) in kept.iter().zip(&labels) {
            row_labels[row] = Some(label);
        }

        log::info!("Trained bundle {}", artifacts.version);

        Ok(TrainingOutcome {
            artifacts,
            row_labels,
            label_counts,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
        })
    }

    /// Strictly reshapes every row and keeps those with a location.
    /// Returns the records, their points, and their input row numbers.
    fn reshape_rows(
        &self,
        table: &FeatureTable,
    ) -> Result<(Vec<FeatureRecord>, Vec<GeoPoint>, Vec<usize>), PipelineError> {
        let mut records = Vec::with_capacity(table.len());
        let mut points = Vec::with_capacity(table.len());
        let mut kept = Vec::with_capacity(table.len());

        for (row, raw) in table.rows().iter().enumerate() {
            let record = self
                .schema
                .reshape_training(raw)
                .map_err(|source| PipelineError::Row { row, source })?;
            let location = self
                .schema
                .location_of(&record)
                .map_err(|source| PipelineError::Row { row, source })?;
            if let Some(point) = location {
                records.push(record);
                points.push(point);
                kept.push(row);
            }
        }

        let dropped = table.len() - kept.len();
        if dropped > 0 {
            log::warn!("Dropped {dropped} feature rows with no location");
        }
        if records.is_empty() {
            return Err(PipelineError::NoUsableRows { rows: table.len() });
        }

        Ok((records, points, kept))
    }
}
