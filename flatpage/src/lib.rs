//! flatpage - Page dewarping for Rust
//!
//! Straightens the curled text of photographed book pages. Text lines are
//! detected, a polynomial page surface is fitted to them and the image is
//! resampled onto the flat page.
//!
//! # Overview
//!
//! - Image I/O (PNG, JPEG, PNM)
//! - Grayscale conversion and Otsu binarization
//! - Brick morphology and connected components
//! - Map-driven resampling
//! - Text line extraction, surface fitting and rectification
//!
//! # Example
//!
//! ```no_run
//! use flatpage::dewarp::{DewarpOptions, configure, dewarp};
//!
//! let pix = flatpage::io::read_image("page.jpg").unwrap();
//! let config = configure(2, 3).unwrap();
//! let out = dewarp(&pix, &config, &DewarpOptions::default(), None).unwrap();
//! flatpage::io::write_image_auto(&out.pix, "page_flat.png").unwrap();
//! ```

// Re-export core types (primary data structures used everywhere)
pub use flatpage_core::*;

// Re-export domain crates as modules to avoid name conflicts
pub use flatpage_color as color;
pub use flatpage_dewarp as dewarp;
pub use flatpage_io as io;
pub use flatpage_morph as morph;
pub use flatpage_region as region;
pub use flatpage_transform as transform;
