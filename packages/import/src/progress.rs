//! Progress reporting for import runs.
//!
//! The pipeline reports through [`ProgressCallback`] so that it does not
//! depend on a terminal renderer. The CLI supplies an `indicatif` bar.

/// Receives progress updates from the pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Advances by `delta` input records.
    fn inc(&self, delta: u64);

    /// Marks the run as complete.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _msg: String) {}
}
