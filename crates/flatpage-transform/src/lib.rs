//! flatpage-transform - Geometric resampling
//!
//! Resamples an image through explicit per-pixel source-coordinate maps.
//! Any warp whose inverse can be tabulated (page dewarping, synthetic
//! distortions in tests) reduces to one [`remap`] call.

mod error;
pub mod remap;

pub use error::{TransformError, TransformResult};
pub use remap::{RemapFill, remap, remap_sampled};
