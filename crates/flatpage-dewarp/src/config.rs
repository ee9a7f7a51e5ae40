//! Model configuration and per-call options
//!
//! [`DewarpConfig`] fixes the shape of the model (polynomial degrees) and the
//! solver knobs. It is validated once and then passed by reference to every
//! stage, so two dewarps with different settings can run side by side.
//! [`DewarpOptions`] holds what varies per call.

use crate::{DewarpError, DewarpResult};

/// Default number of randomized fitting attempts
pub const DEFAULT_N_TRIES: i32 = 30;

/// Default base seed for the attempt sequence
pub const DEFAULT_SEED: u64 = 0x5eed_f1a7_9a9e;

/// Validated model configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DewarpConfig {
    gcs_degree: u32,
    line_degree: u32,
    max_iterations: usize,
    tolerance: f64,
    line_regularization: f64,
}

/// Build a [`DewarpConfig`] from the two polynomial degrees.
///
/// # Errors
///
/// Returns [`DewarpError::InvalidArgument`] if either degree is not positive.
pub fn configure(gcs_degree: i32, line_degree: i32) -> DewarpResult<DewarpConfig> {
    DewarpConfig::new(gcs_degree, line_degree)
}

impl DewarpConfig {
    /// Create a configuration with default solver settings.
    ///
    /// # Errors
    ///
    /// Returns [`DewarpError::InvalidArgument`] if either degree is not positive.
    pub fn new(gcs_degree: i32, line_degree: i32) -> DewarpResult<Self> {
        if gcs_degree <= 0 {
            return Err(DewarpError::InvalidArgument(format!(
                "gcs_degree must be positive, got {gcs_degree}"
            )));
        }
        if line_degree <= 0 {
            return Err(DewarpError::InvalidArgument(format!(
                "line_degree must be positive, got {line_degree}"
            )));
        }
        Ok(Self {
            gcs_degree: gcs_degree as u32,
            line_degree: line_degree as u32,
            max_iterations: 100,
            tolerance: 1e-10,
            line_regularization: 0.05,
        })
    }

    /// Set the iteration cap of a single fit (minimum 1)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Set the relative cost improvement below which a fit stops
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        if tolerance.is_finite() && tolerance >= 0.0 {
            self.tolerance = tolerance;
        }
        self
    }

    /// Set the weight pulling line polynomials toward straight lines
    ///
    /// Curvature shared by all lines is then explained by the surface.
    pub fn with_line_regularization(mut self, weight: f64) -> Self {
        self.line_regularization = if weight.is_finite() {
            weight.max(0.0)
        } else {
            0.0
        };
        self
    }

    /// Degree of the page-surface polynomial
    pub fn gcs_degree(&self) -> u32 {
        self.gcs_degree
    }

    /// Degree of every text-line polynomial
    pub fn line_degree(&self) -> u32 {
        self.line_degree
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn line_regularization(&self) -> f64 {
        self.line_regularization
    }
}

/// Per-call options for [`dewarp`](crate::dewarp)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DewarpOptions {
    /// Number of randomized fitting attempts (default: 30)
    ///
    /// Must be positive; checked when the pipeline runs.
    pub n_tries: i32,

    /// Width of the output image (default: input width)
    pub output_width: Option<u32>,

    /// Base seed; attempt `i` derives its own seed from it
    pub seed: u64,

    /// Gray value for pixels brought in from outside (0-255, default: 255)
    pub gray_in: u8,
}

impl Default for DewarpOptions {
    fn default() -> Self {
        Self {
            n_tries: DEFAULT_N_TRIES,
            output_width: None,
            seed: DEFAULT_SEED,
            gray_in: 255,
        }
    }
}

impl DewarpOptions {
    /// Create new options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of fitting attempts
    pub fn with_n_tries(mut self, n_tries: i32) -> Self {
        self.n_tries = n_tries;
        self
    }

    /// Set the output width
    pub fn with_output_width(mut self, width: u32) -> Self {
        self.output_width = Some(width);
        self
    }

    /// Set the base seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the gray value for outside pixels
    pub fn with_gray_in(mut self, gray_in: u8) -> Self {
        self.gray_in = gray_in;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_rejects_non_positive_degrees() {
        assert!(matches!(
            configure(0, 3),
            Err(DewarpError::InvalidArgument(_))
        ));
        assert!(matches!(
            configure(2, -1),
            Err(DewarpError::InvalidArgument(_))
        ));
        let config = configure(2, 3).unwrap();
        assert_eq!(config.gcs_degree(), 2);
        assert_eq!(config.line_degree(), 3);
    }

    #[test]
    fn test_config_builders_clamp() {
        let config = configure(1, 1)
            .unwrap()
            .with_max_iterations(0)
            .with_line_regularization(-3.0)
            .with_tolerance(f64::NAN);
        assert_eq!(config.max_iterations(), 1);
        assert_eq!(config.line_regularization(), 0.0);
        assert_eq!(config.tolerance(), 1e-10);
    }

    #[test]
    fn test_options_default() {
        let options = DewarpOptions::default();
        assert_eq!(options.n_tries, 30);
        assert_eq!(options.output_width, None);
        assert_eq!(options.gray_in, 255);

        let options = options.with_n_tries(5).with_output_width(640).with_seed(7);
        assert_eq!(options.n_tries, 5);
        assert_eq!(options.output_width, Some(640));
        assert_eq!(options.seed, 7);
    }
}
