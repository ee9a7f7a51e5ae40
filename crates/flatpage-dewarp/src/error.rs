//! Error types for flatpage-dewarp

use thiserror::Error;

/// Errors that can occur while dewarping a page
#[derive(Debug, Error)]
pub enum DewarpError {
    /// Core library error
    #[error("core error")]
    Core(#[from] flatpage_core::Error),

    /// Color library error
    #[error("color error")]
    Color(#[from] flatpage_color::ColorError),

    /// Morphology library error
    #[error("morphology error")]
    Morph(#[from] flatpage_morph::MorphError),

    /// Region library error
    #[error("region error")]
    Region(#[from] flatpage_region::RegionError),

    /// Transform library error
    #[error("transform error")]
    Transform(#[from] flatpage_transform::TransformError),

    /// A degree, attempt count or output width is out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Not enough text lines to constrain the model
    #[error("insufficient evidence: {0}")]
    InsufficientEvidence(String),

    /// The damped normal equations of one attempt could not be solved
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// Every attempt ended in a singular system
    #[error("no convergent fit in {attempts} attempts")]
    NoConvergentFit { attempts: usize },

    /// The fitted surface cannot be inverted over the output domain
    #[error("degenerate mapping: {0}")]
    DegenerateMapping(String),
}

/// Result type for dewarping operations
pub type DewarpResult<T> = Result<T, DewarpError>;
