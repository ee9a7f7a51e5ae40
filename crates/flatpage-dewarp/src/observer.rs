//! Progress hooks for the dewarping pipeline
//!
//! The library never logs. Callers that want progress output or debug
//! images implement [`DewarpObserver`] and pass it to
//! [`dewarp`](crate::dewarp) or [`optimize`](crate::optimize).

use crate::types::{FitResult, TextLine};

/// Outcome of one fitting attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptReport {
    /// Attempt number, starting at 0
    pub index: usize,
    /// Seed the attempt was started from
    pub seed: u64,
    /// RMS residual in pixels, or `None` if the attempt was singular
    pub residual: Option<f64>,
    /// Solver iterations (0 for singular attempts)
    pub iterations: usize,
}

/// Receives intermediate results of a dewarp
///
/// All methods default to doing nothing.
pub trait DewarpObserver {
    /// Called once with the lines the fit will use, top to bottom.
    fn lines_extracted(&mut self, _lines: &[TextLine]) {}

    /// Called after every attempt, in attempt order.
    fn attempt_finished(&mut self, _report: &AttemptReport) {}

    /// Called with the winning model before the image is resampled.
    fn model_selected(&mut self, _fit: &FitResult) {}
}
