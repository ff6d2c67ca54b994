//! Progress reporting for row labeling.
//!
//! [`label_partitioned`](crate::label::label_partitioned) reports through a
//! [`ProgressCallback`] so the library never draws anything itself. The CLI
//! plugs in an `indicatif` bar; tests pass [`NullProgress`].

use std::sync::Arc;

/// Receives progress updates from labeling.
///
/// Must be `Send + Sync`: partition workers call [`Self::inc`] from their
/// own threads.
pub trait ProgressCallback: Send + Sync {
    /// Total rows to be labeled.
    fn set_total(&self, total: u64);

    /// `delta` more rows are done.
    fn inc(&self, delta: u64);

    /// Replaces the text shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Labeling is complete; `msg` summarizes the result.
    fn finish(&self, msg: String);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// A shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
