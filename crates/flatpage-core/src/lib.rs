//! flatpage Core - Basic image containers
//!
//! - [`Pix`] / [`PixMut`] - The main image container (immutable / mutable)
//! - [`FPix`] - Floating-point image
//! - [`Box`] - Rectangle regions

pub mod box_;
pub mod error;
pub mod fpix;
pub mod pix;

pub use box_::Box;
pub use error::{Error, Result};
pub use fpix::FPix;
pub use pix::{ImageFormat, Pix, PixMut, PixelDepth};

/// Color channel helpers for 32-bit RGBA pixels.
///
/// # Pixel format
///
/// 32-bit pixels are stored as `0xRRGGBBAA` (red in MSB, alpha in LSB).
pub mod color {
    pub const RED_SHIFT: u32 = 24;
    pub const GREEN_SHIFT: u32 = 16;
    pub const BLUE_SHIFT: u32 = 8;
    pub const ALPHA_SHIFT: u32 = 0;

    /// Extract red component from a 32-bit pixel.
    #[inline]
    pub fn red(pixel: u32) -> u8 {
        ((pixel >> RED_SHIFT) & 0xff) as u8
    }

    /// Extract green component from a 32-bit pixel.
    #[inline]
    pub fn green(pixel: u32) -> u8 {
        ((pixel >> GREEN_SHIFT) & 0xff) as u8
    }

    /// Extract blue component from a 32-bit pixel.
    #[inline]
    pub fn blue(pixel: u32) -> u8 {
        ((pixel >> BLUE_SHIFT) & 0xff) as u8
    }

    /// Compose a 32-bit RGB pixel (alpha = 255).
    #[inline]
    pub fn compose_rgb(r: u8, g: u8, b: u8) -> u32 {
        ((r as u32) << RED_SHIFT)
            | ((g as u32) << GREEN_SHIFT)
            | ((b as u32) << BLUE_SHIFT)
            | (255 << ALPHA_SHIFT)
    }

    /// Extract RGB values from a 32-bit pixel.
    #[inline]
    pub fn extract_rgb(pixel: u32) -> (u8, u8, u8) {
        (red(pixel), green(pixel), blue(pixel))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_compose_extract() {
            let p = compose_rgb(1, 2, 3);
            assert_eq!(p, 0x0102_03ff);
            assert_eq!(extract_rgb(p), (1, 2, 3));
        }
    }
}
