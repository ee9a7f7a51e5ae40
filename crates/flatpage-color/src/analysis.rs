//! Gray-level statistics

use crate::{ColorError, ColorResult};
use flatpage_core::{Pix, PixelDepth};

fn require_gray(pix: &Pix) -> ColorResult<()> {
    if pix.depth() != PixelDepth::Bit8 {
        return Err(ColorError::UnsupportedDepth {
            expected: "8 bpp",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

/// 256-bin histogram of an 8 bpp image.
pub fn grayscale_histogram(pix: &Pix) -> ColorResult<[u32; 256]> {
    require_gray(pix)?;
    let mut hist = [0u32; 256];
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            hist[pix.get_pixel_unchecked(x, y) as usize] += 1;
        }
    }
    Ok(hist)
}

/// Darkest and brightest gray level present in an 8 bpp image.
pub fn gray_range(pix: &Pix) -> ColorResult<(u8, u8)> {
    let hist = grayscale_histogram(pix)?;
    let lo = hist.iter().position(|&c| c > 0).unwrap_or(0);
    let hi = hist.iter().rposition(|&c| c > 0).unwrap_or(0);
    Ok((lo as u8, hi as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts() {
        let mut pm = Pix::new(4, 2, PixelDepth::Bit8).unwrap().to_mut();
        pm.set_all_gray(100).unwrap();
        pm.set_pixel(0, 0, 7).unwrap();
        let pix: Pix = pm.into();
        let hist = grayscale_histogram(&pix).unwrap();
        assert_eq!(hist[100], 7);
        assert_eq!(hist[7], 1);
        assert_eq!(gray_range(&pix).unwrap(), (7, 100));
    }

    #[test]
    fn test_histogram_rejects_rgb() {
        let pix = Pix::new(2, 2, PixelDepth::Bit32).unwrap();
        assert!(grayscale_histogram(&pix).is_err());
    }
}
