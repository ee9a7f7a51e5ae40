//! Binary thresholding
//!
//! Dark pixels are foreground: the binary output has 1 where the gray
//! value is below the threshold.

use crate::analysis::grayscale_histogram;
use crate::{ColorError, ColorResult};
use flatpage_core::{Pix, PixelDepth};

/// Convert a grayscale image to binary using a fixed threshold
///
/// Pixels < threshold become foreground (1), pixels >= threshold become
/// background (0).
pub fn threshold_to_binary(pix: &Pix, threshold: u8) -> ColorResult<Pix> {
    if pix.depth() != PixelDepth::Bit8 {
        return Err(ColorError::UnsupportedDepth {
            expected: "8 bpp",
            actual: pix.depth().bits(),
        });
    }
    let mut out = Pix::new(pix.width(), pix.height(), PixelDepth::Bit1)?.to_mut();
    let threshold = threshold as u32;
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            if pix.get_pixel_unchecked(x, y) < threshold {
                out.set_pixel_unchecked(x, y, 1);
            }
        }
    }
    Ok(out.into())
}

/// Compute Otsu's threshold for a grayscale image
///
/// Returns the threshold `t` that maximizes the between-class variance of
/// the split `[0, t)` / `[t, 255]`. Ties keep the lowest candidate.
pub fn compute_otsu_threshold(pix: &Pix) -> ColorResult<u8> {
    let hist = grayscale_histogram(pix)?;
    let total: f64 = hist.iter().map(|&c| c as f64).sum();
    let sum_all: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0.0;
    let mut sum_bg = 0.0;
    let mut best_var = -1.0;
    let mut best_t = 128u8;
    for (i, &count) in hist.iter().enumerate().take(255) {
        weight_bg += count as f64;
        sum_bg += i as f64 * count as f64;
        let weight_fg = total - weight_bg;
        if weight_bg == 0.0 || weight_fg == 0.0 {
            continue;
        }
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let var = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if var > best_var {
            best_var = var;
            best_t = (i + 1) as u8;
        }
    }
    Ok(best_t)
}

/// Convert a grayscale image to binary using Otsu's method
pub fn threshold_otsu(pix: &Pix) -> ColorResult<Pix> {
    let t = compute_otsu_threshold(pix)?;
    threshold_to_binary(pix, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bimodal(dark: u8, light: u8) -> Pix {
        let mut pm = Pix::new(10, 10, PixelDepth::Bit8).unwrap().to_mut();
        pm.set_all_gray(light).unwrap();
        for y in 0..3 {
            for x in 0..10 {
                pm.set_pixel(x, y, dark as u32).unwrap();
            }
        }
        pm.into()
    }

    #[test]
    fn test_fixed_threshold_polarity() {
        let pix = bimodal(20, 220);
        let bin = threshold_to_binary(&pix, 128).unwrap();
        assert_eq!(bin.depth(), PixelDepth::Bit1);
        assert_eq!(bin.get_pixel(5, 1), Some(1));
        assert_eq!(bin.get_pixel(5, 8), Some(0));
    }

    #[test]
    fn test_otsu_separates_modes() {
        let pix = bimodal(40, 200);
        let t = compute_otsu_threshold(&pix).unwrap();
        assert!(t > 40 && t <= 200, "threshold {t}");
        let bin = threshold_otsu(&pix).unwrap();
        let ones: u32 = (0..10)
            .flat_map(|y| (0..10).map(move |x| (x, y)))
            .map(|(x, y)| bin.get_pixel(x, y).unwrap())
            .sum();
        assert_eq!(ones, 30);
    }

    #[test]
    fn test_otsu_rejects_binary() {
        let pix = Pix::new(4, 4, PixelDepth::Bit1).unwrap();
        assert!(threshold_otsu(&pix).is_err());
    }
}
