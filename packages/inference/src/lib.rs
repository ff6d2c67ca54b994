#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Online hotspot risk inference.
//!
//! [`InferenceService::predict`] is the one entry point transport code
//! calls: reshape the raw query with the bundle's feature schema, fill gaps
//! with the frozen imputer statistics, score with the classifier, and map
//! the probability to a risk tier. Failures come back as an
//! [`InferenceError`] naming the stage that failed.

pub mod error;
pub mod risk;
pub mod service;
pub mod store;

pub use error::{InferenceError, InferenceErrorKind, InferenceStage};
pub use risk::RiskBucketer;
pub use service::InferenceService;
pub use store::{ArtifactStore, LoadedBundle};
