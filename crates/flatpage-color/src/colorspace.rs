//! Color space conversion

use crate::ColorResult;
use flatpage_core::{Pix, PixelDepth, color};

/// Convert RGB to gray using ITU-R BT.601 luma weights.
#[inline]
pub fn rgb_to_gray(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32 + 128) >> 8) as u8
}

/// Convert any image to 8 bpp grayscale.
///
/// - 8 bpp input is returned as a shared clone.
/// - 32 bpp input is reduced to luma.
/// - 1 bpp input maps foreground (1) to black and background to white.
pub fn pix_convert_to_gray(pix: &Pix) -> ColorResult<Pix> {
    match pix.depth() {
        PixelDepth::Bit8 => Ok(pix.clone()),
        PixelDepth::Bit32 => {
            let mut out = Pix::new(pix.width(), pix.height(), PixelDepth::Bit8)?.to_mut();
            for y in 0..pix.height() {
                for x in 0..pix.width() {
                    let (r, g, b) = color::extract_rgb(pix.get_pixel_unchecked(x, y));
                    out.set_pixel_unchecked(x, y, rgb_to_gray(r, g, b) as u32);
                }
            }
            Ok(out.into())
        }
        PixelDepth::Bit1 => {
            let mut out = Pix::new(pix.width(), pix.height(), PixelDepth::Bit8)?.to_mut();
            for y in 0..pix.height() {
                for x in 0..pix.width() {
                    let val = if pix.get_pixel_unchecked(x, y) != 0 { 0 } else { 255 };
                    out.set_pixel_unchecked(x, y, val);
                }
            }
            Ok(out.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_gray_extremes() {
        assert_eq!(rgb_to_gray(0, 0, 0), 0);
        assert_eq!(rgb_to_gray(255, 255, 255), 255);
        assert!(rgb_to_gray(0, 255, 0) > rgb_to_gray(255, 0, 0));
    }

    #[test]
    fn test_convert_rgb_and_binary() {
        let mut pm = Pix::new(2, 1, PixelDepth::Bit32).unwrap().to_mut();
        pm.set_rgb(0, 0, 255, 255, 255).unwrap();
        let gray = pix_convert_to_gray(&pm.into()).unwrap();
        assert_eq!(gray.depth(), PixelDepth::Bit8);
        assert_eq!(gray.get_pixel(0, 0), Some(255));
        assert_eq!(gray.get_pixel(1, 0), Some(0));

        let mut pm = Pix::new(2, 1, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_pixel(1, 0, 1).unwrap();
        let gray = pix_convert_to_gray(&pm.into()).unwrap();
        assert_eq!(gray.get_pixel(0, 0), Some(255));
        assert_eq!(gray.get_pixel(1, 0), Some(0));
    }
}
