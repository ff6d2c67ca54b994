//! Holder for the active bundle, swappable while requests are in flight.
//!
//! Readers clone an `Arc` to the current [`LoadedBundle`] and use it for
//! the whole request, so a concurrent swap never mixes parts of two
//! bundles. A swap only ever installs a bundle that was fully loaded and
//! checked beforehand.

use std::sync::{Arc, PoisonError, RwLock};

use hotspot_map_artifacts::TrainedArtifacts;
use hotspot_map_feature_models::{FeatureError, FeatureSchemaDefinition};
use hotspot_map_features::FeatureSchema;

/// A bundle together with its prepared feature schema.
#[derive(Debug)]
pub struct LoadedBundle {
    artifacts: TrainedArtifacts,
    schema: FeatureSchema,
}

impl LoadedBundle {
    /// Prepares `artifacts` for serving under the `live` schema.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::SchemaVersionMismatch`] or
    /// [`FeatureError::SchemaMismatch`] if the bundle was trained under a
    /// different contract, or [`FeatureError::InvalidSchema`] if its
    /// schema is malformed.
    pub fn prepare(
        artifacts: TrainedArtifacts,
        live: &FeatureSchemaDefinition,
    ) -> Result<Self, FeatureError> {
        live.ensure_compatible(&artifacts.schema)?;
        let schema = FeatureSchema::new(artifacts.schema.clone())?;
        Ok(Self { artifacts, schema })
    }

    /// The bundle.
    #[must_use]
    pub const fn artifacts(&self) -> &TrainedArtifacts {
        &self.artifacts
    }

    /// The bundle's prepared schema.
    #[must_use]
    pub const fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// The bundle version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.artifacts.version
    }
}

/// The active bundle reference.
#[derive(Debug)]
pub struct ArtifactStore {
    current: RwLock<Arc<LoadedBundle>>,
}

impl ArtifactStore {
    /// A store serving `bundle`.
    #[must_use]
    pub fn new(bundle: LoadedBundle) -> Self {
        Self {
            current: RwLock::new(Arc::new(bundle)),
        }
    }

    /// The bundle to use for one request.
    #[must_use]
    pub fn current(&self) -> Arc<LoadedBundle> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Installs `bundle` and returns the one it replaced.
    pub fn swap(&self, bundle: LoadedBundle) -> Arc<LoadedBundle> {
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(bundle))
    }
}
