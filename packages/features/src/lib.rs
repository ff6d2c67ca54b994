#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Feature schema enforcement and imputation.
//!
//! Training and serving both go through [`FeatureSchema`] so the vector
//! handed to the classifier has identical column identity and order on
//! both sides, and through [`imputer`] so missing values are filled with
//! the same frozen statistics.

pub mod imputer;
pub mod schema;

pub use schema::{FeatureSchema, ReshapeMode};
