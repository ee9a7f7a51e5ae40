//! flatpage-morph - Binary morphology with brick structuring elements
//!
//! Erosion, dilation, opening and closing of 1 bpp images by axis-aligned
//! rectangles. Every operation is separable and runs in time independent of
//! the brick size.

pub mod binary;
mod error;

pub use binary::{close_brick, dilate_brick, erode_brick, open_brick};
pub use error::{MorphError, MorphResult};
