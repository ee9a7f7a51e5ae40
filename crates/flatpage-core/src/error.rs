//! Error types for flatpage-core
//!
//! Every fallible operation on the core containers returns [`Result`].
//! Variants carry enough context for diagnostics without exposing the
//! packed data layout.

use thiserror::Error;

/// flatpage-core error type
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid image dimensions
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },

    /// Index out of bounds
    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Unsupported pixel depth for this operation
    #[error("unsupported pixel depth: {0} bpp")]
    UnsupportedDepth(u32),

    /// Invalid parameter value
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for flatpage-core operations
pub type Result<T> = std::result::Result<T, Error>;
