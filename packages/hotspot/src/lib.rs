#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Hotspot identification and proximity labeling.
//!
//! [`aggregate`] groups raw report coordinates into rounded cells and keeps
//! the cells dense enough to count as hotspots. [`label`] marks every
//! feature location that lies within a radius of any hotspot center, using
//! the exact great-circle index from `hotspot_map_spatial`.

pub mod aggregate;
pub mod label;
pub mod progress;

pub use aggregate::{DEFAULT_PRECISION, MAX_PRECISION, aggregate, aggregate_reports};
pub use label::{HOTSPOT, LabelCounts, NOT_HOTSPOT, label, label_partitioned};

/// Errors that can occur while building hotspots.
#[derive(Debug, thiserror::Error)]
pub enum HotspotError {
    /// Rounding precision outside the supported range.
    #[error("Invalid rounding precision {precision}: expected 0-{max}")]
    InvalidPrecision {
        /// The rejected precision.
        precision: u32,
        /// Largest supported precision.
        max: u32,
    },

    /// A rounded cell produced an invalid coordinate.
    #[error(transparent)]
    Geo(#[from] hotspot_map_geo_models::GeoError),
}
