//! The single inference entry point.

use std::path::Path;
use std::sync::Arc;

use hotspot_map_artifacts::TrainedArtifacts;
use hotspot_map_feature_models::{FeatureSchemaDefinition, RawRecord};
use hotspot_map_features::imputer;
use hotspot_map_inference_models::{PredictionResponse, PredictionResult};
use hotspot_map_model::{Classifier as _, decide};

use crate::error::{InferenceError, InferenceErrorKind, InferenceStage};
use crate::risk::RiskBucketer;
use crate::store::{ArtifactStore, LoadedBundle};

/// Scores raw queries against the active bundle.
///
/// `predict` takes `&self` and is safe to call from many threads while
/// [`InferenceService::reload`] swaps in a new bundle.
#[derive(Debug)]
pub struct InferenceService {
    live_schema: FeatureSchemaDefinition,
    bucketer: RiskBucketer,
    store: ArtifactStore,
}

impl InferenceService {
    /// Starts serving `artifacts`.
    ///
    /// # Errors
    ///
    /// Fails at stage [`InferenceStage::Artifacts`] if the bundle is
    /// internally inconsistent or was trained under a schema other than
    /// `live_schema`.
    pub fn new(
        artifacts: TrainedArtifacts,
        live_schema: FeatureSchemaDefinition,
        bucketer: RiskBucketer,
    ) -> Result<Self, InferenceError> {
        let bundle = prepare(artifacts, &live_schema)?;
        log::info!(
            "Serving bundle {} (schema {})",
            bundle.version(),
            live_schema.version
        );
        Ok(Self {
            live_schema,
            bucketer,
            store: ArtifactStore::new(bundle),
        })
    }

    /// Loads the bundle at `path` and starts serving it.
    ///
    /// # Errors
    ///
    /// Fails with `model_unavailable` if the file cannot be loaded, and as
    /// [`InferenceService::new`] otherwise.
    pub fn from_path(
        path: &Path,
        live_schema: FeatureSchemaDefinition,
        bucketer: RiskBucketer,
    ) -> Result<Self, InferenceError> {
        let artifacts = hotspot_map_artifacts::load(path)
            .map_err(|e| InferenceError::new(InferenceStage::Artifacts, e))?;
        Self::new(artifacts, live_schema, bucketer)
    }

    /// Version of the bundle currently serving.
    #[must_use]
    pub fn version(&self) -> String {
        self.store.current().version().to_string()
    }

    /// The bundle currently serving.
    #[must_use]
    pub fn current(&self) -> Arc<LoadedBundle> {
        self.store.current()
    }

    /// Scores one raw query.
    ///
    /// # Errors
    ///
    /// Returns an [`InferenceError`] tagged with the failing stage:
    /// [`InferenceStage::Schema`] for missing, duplicate, or invalid input,
    /// [`InferenceStage::Imputer`] for a column mismatch with the frozen
    /// statistics, [`InferenceStage::Classifier`] if scoring fails.
    pub fn predict(&self, raw: &RawRecord) -> Result<PredictionResult, InferenceError> {
        let bundle = self.store.current();
        let result = self.predict_with(&bundle, raw);
        match &result {
            Ok(prediction) => log::debug!(
                "Prediction with bundle {}: {} p={:.4} {}",
                bundle.version(),
                prediction.hotspot_prediction,
                prediction.probability,
                prediction.risk_level
            ),
            Err(e) if e.kind.is_client_error() => log::debug!(
                "Rejected query at {} stage ({}): {e}",
                e.stage,
                e.code()
            ),
            Err(e) => log::error!(
                "Prediction failed at {} stage ({}) with bundle {}: {e}",
                e.stage,
                e.code(),
                bundle.version()
            ),
        }
        result
    }

    /// [`InferenceService::predict`] folded into the transport response
    /// shape.
    #[must_use]
    pub fn respond(&self, raw: &RawRecord) -> PredictionResponse {
        match self.predict(raw) {
            Ok(prediction) => PredictionResponse::Prediction(prediction),
            Err(e) => PredictionResponse::Error(e.to_body()),
        }
    }

    fn predict_with(
        &self,
        bundle: &LoadedBundle,
        raw: &RawRecord,
    ) -> Result<PredictionResult, InferenceError> {
        let artifacts = bundle.artifacts();

        let record = bundle
            .schema()
            .reshape(raw)
            .map_err(|e| InferenceError::new(InferenceStage::Schema, e))?;

        let row = imputer::transform(&artifacts.imputer, &record)
            .map_err(|e| InferenceError::new(InferenceStage::Imputer, e))?;

        let [_, probability] = artifacts
            .classifier
            .predict_proba(&row)
            .map_err(|e| InferenceError::new(InferenceStage::Classifier, e))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::new(
                InferenceStage::Classifier,
                InferenceErrorKind::InvalidProbability(probability),
            ));
        }

        let (risk_level, color) = self.bucketer.classify(probability);
        Ok(PredictionResult {
            hotspot_prediction: decide(probability, artifacts.decision_threshold),
            probability,
            risk_level,
            color,
        })
    }

    /// Loads the bundle at `path` and swaps it in. Returns the new version.
    ///
    /// On any failure the current bundle keeps serving.
    ///
    /// # Errors
    ///
    /// Fails at stage [`InferenceStage::Artifacts`] if the file cannot be
    /// loaded or was trained under another schema.
    pub fn reload(&self, path: &Path) -> Result<String, InferenceError> {
        let loaded = hotspot_map_artifacts::load(path)
            .map_err(|e| InferenceError::new(InferenceStage::Artifacts, e));
        match loaded.and_then(|artifacts| self.install(artifacts)) {
            Ok(version) => Ok(version),
            Err(e) => {
                log::error!(
                    "Reload from {} failed ({e}); still serving bundle {}",
                    path.display(),
                    self.version()
                );
                Err(e)
            }
        }
    }

    /// Swaps in an in-memory bundle. Returns the new version.
    ///
    /// # Errors
    ///
    /// As [`InferenceService::new`]; the current bundle keeps serving.
    pub fn install(&self, artifacts: TrainedArtifacts) -> Result<String, InferenceError> {
        let bundle = prepare(artifacts, &self.live_schema)?;
        let version = bundle.version().to_string();
        let previous = self.store.swap(bundle);
        log::info!("Swapped bundle {} -> {version}", previous.version());
        Ok(version)
    }
}

fn prepare(
    artifacts: TrainedArtifacts,
    live_schema: &FeatureSchemaDefinition,
) -> Result<LoadedBundle, InferenceError> {
    artifacts
        .validate()
        .map_err(|e| InferenceError::new(InferenceStage::Artifacts, e))?;
    LoadedBundle::prepare(artifacts, live_schema)
        .map_err(|e| InferenceError::new(InferenceStage::Artifacts, e))
}
