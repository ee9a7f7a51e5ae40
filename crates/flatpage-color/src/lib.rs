//! flatpage Color - Gray conversion and binarization
//!
//! - **Color space conversion** ([`colorspace`]): RGB to luminance
//! - **Analysis** ([`analysis`]): gray histograms and dynamic range
//! - **Thresholding** ([`threshold`]): fixed threshold and Otsu's method

pub mod analysis;
pub mod colorspace;
pub mod error;
pub mod threshold;

pub use error::{ColorError, ColorResult};

pub use analysis::{gray_range, grayscale_histogram};
pub use colorspace::{pix_convert_to_gray, rgb_to_gray};
pub use threshold::{compute_otsu_threshold, threshold_otsu, threshold_to_binary};
