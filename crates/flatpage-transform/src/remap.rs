//! Inverse-map resampling
//!
//! For every destination pixel `(x, y)` the maps hold the source coordinate
//! `(xmap[x, y], ymap[x, y])`, with pixel centres at integer positions. Source
//! coordinates outside `[-0.5, w - 0.5] x [-0.5, h - 0.5]`, or non-finite
//! ones, produce the fill value.

use crate::{TransformError, TransformResult};
use flatpage_core::{FPix, Pix, PixelDepth, color};

/// Value brought in where the source coordinate leaves the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemapFill {
    /// Fill with white pixels
    #[default]
    White,
    /// Fill with black pixels
    Black,
    /// Fill with a gray level (replicated into RGB for 32 bpp)
    Gray(u8),
}

impl RemapFill {
    /// Get the fill value for a specific pixel depth
    pub fn to_value(self, depth: PixelDepth) -> u32 {
        let gray = match self {
            RemapFill::White => 255,
            RemapFill::Black => 0,
            RemapFill::Gray(g) => g,
        };
        match depth {
            PixelDepth::Bit1 => u32::from(gray < 128),
            PixelDepth::Bit8 => gray as u32,
            PixelDepth::Bit32 => color::compose_rgb(gray, gray, gray),
        }
    }
}

fn check_maps(xmap: &FPix, ymap: &FPix) -> TransformResult<()> {
    if xmap.dimensions() != ymap.dimensions() {
        return Err(TransformError::InvalidParameters(format!(
            "coordinate maps differ in size: {:?} vs {:?}",
            xmap.dimensions(),
            ymap.dimensions()
        )));
    }
    Ok(())
}

#[inline]
fn inside(v: f32, len: u32) -> bool {
    v.is_finite() && v >= -0.5 && v <= len as f32 - 0.5
}

/// Split a coordinate into the two neighbouring indices and the weight of
/// the second one.
#[inline]
fn neighbours(v: f32, len: u32) -> (u32, u32, f32) {
    let vc = v.clamp(0.0, (len - 1) as f32);
    let i0 = vc.floor() as u32;
    let i1 = (i0 + 1).min(len - 1);
    (i0, i1, vc - i0 as f32)
}

#[inline]
fn lerp2(p00: f32, p10: f32, p01: f32, p11: f32, fx: f32, fy: f32) -> f32 {
    let top = p00 + (p10 - p00) * fx;
    let bottom = p01 + (p11 - p01) * fx;
    top + (bottom - top) * fy
}

#[inline]
fn to_u8(v: f32) -> u32 {
    (v + 0.5).clamp(0.0, 255.0) as u32
}

/// Resample `pix` through the coordinate maps with bilinear interpolation.
///
/// The output has the size of the maps and the depth of `pix`. 1 bpp input
/// is sampled with nearest neighbour.
///
/// # Errors
///
/// Returns [`TransformError::InvalidParameters`] if the maps differ in size.
pub fn remap(pix: &Pix, xmap: &FPix, ymap: &FPix, fill: RemapFill) -> TransformResult<Pix> {
    if pix.depth() == PixelDepth::Bit1 {
        return remap_sampled(pix, xmap, ymap, fill);
    }
    check_maps(xmap, ymap)?;
    let (w, h) = (pix.width(), pix.height());
    let (ow, oh) = xmap.dimensions();
    let depth = pix.depth();
    let fill_val = fill.to_value(depth);
    let mut out = Pix::new(ow, oh, depth)?.to_mut();
    out.set_spp(pix.spp());

    for y in 0..oh {
        let xrow = xmap.row(y);
        let yrow = ymap.row(y);
        for x in 0..ow {
            let (xs, ys) = (xrow[x as usize], yrow[x as usize]);
            if !inside(xs, w) || !inside(ys, h) {
                out.set_pixel_unchecked(x, y, fill_val);
                continue;
            }
            let (x0, x1, fx) = neighbours(xs, w);
            let (y0, y1, fy) = neighbours(ys, h);
            let p00 = pix.get_pixel_unchecked(x0, y0);
            let p10 = pix.get_pixel_unchecked(x1, y0);
            let p01 = pix.get_pixel_unchecked(x0, y1);
            let p11 = pix.get_pixel_unchecked(x1, y1);
            let val = match depth {
                PixelDepth::Bit32 => {
                    let chan = |shift: u32| {
                        let c = |p: u32| ((p >> shift) & 0xff) as f32;
                        to_u8(lerp2(c(p00), c(p10), c(p01), c(p11), fx, fy))
                    };
                    color::compose_rgb(
                        chan(color::RED_SHIFT) as u8,
                        chan(color::GREEN_SHIFT) as u8,
                        chan(color::BLUE_SHIFT) as u8,
                    )
                }
                _ => to_u8(lerp2(
                    p00 as f32, p10 as f32, p01 as f32, p11 as f32, fx, fy,
                )),
            };
            out.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(out.into())
}

/// Resample `pix` through the coordinate maps with nearest-neighbour lookup.
pub fn remap_sampled(
    pix: &Pix,
    xmap: &FPix,
    ymap: &FPix,
    fill: RemapFill,
) -> TransformResult<Pix> {
    check_maps(xmap, ymap)?;
    let (w, h) = (pix.width(), pix.height());
    let (ow, oh) = xmap.dimensions();
    let fill_val = fill.to_value(pix.depth());
    let mut out = Pix::new(ow, oh, pix.depth())?.to_mut();
    out.set_spp(pix.spp());

    for y in 0..oh {
        for x in 0..ow {
            let xs = xmap.get_pixel_unchecked(x, y);
            let ys = ymap.get_pixel_unchecked(x, y);
            let val = if inside(xs, w) && inside(ys, h) {
                let sx = (xs.round().max(0.0) as u32).min(w - 1);
                let sy = (ys.round().max(0.0) as u32).min(h - 1);
                pix.get_pixel_unchecked(sx, sy)
            } else {
                fill_val
            };
            out.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_maps(w: u32, h: u32) -> (FPix, FPix) {
        let mut xm = FPix::new(w, h).unwrap();
        let mut ym = FPix::new(w, h).unwrap();
        for y in 0..h {
            for x in 0..w {
                xm.set_pixel(x, y, x as f32).unwrap();
                ym.set_pixel(x, y, y as f32).unwrap();
            }
        }
        (xm, ym)
    }

    fn gradient(w: u32, h: u32) -> Pix {
        let mut pm = Pix::new(w, h, PixelDepth::Bit8).unwrap().to_mut();
        for y in 0..h {
            for x in 0..w {
                pm.set_pixel(x, y, (x * 10 + y) % 256).unwrap();
            }
        }
        pm.into()
    }

    #[test]
    fn test_identity_remap_is_exact() {
        let pix = gradient(12, 7);
        let (xm, ym) = identity_maps(12, 7);
        let out = remap(&pix, &xm, &ym, RemapFill::White).unwrap();
        assert_eq!(out.data(), pix.data());
    }

    #[test]
    fn test_half_pixel_interpolates() {
        let pix = gradient(4, 1);
        let xm = FPix::new_with_value(1, 1, 1.5).unwrap();
        let ym = FPix::new_with_value(1, 1, 0.0).unwrap();
        let out = remap(&pix, &xm, &ym, RemapFill::White).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(15));
    }

    #[test]
    fn test_outside_gets_fill() {
        let pix = gradient(4, 4);
        let xm = FPix::new_with_value(2, 1, -3.0).unwrap();
        let mut ym = FPix::new_with_value(2, 1, 1.0).unwrap();
        ym.set_pixel(1, 0, f32::NAN).unwrap();
        let out = remap(&pix, &xm, &ym, RemapFill::Gray(77)).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(77));
        assert_eq!(out.get_pixel(1, 0), Some(77));
    }

    #[test]
    fn test_rgb_channels_interpolate_independently() {
        let mut pm = Pix::new(2, 1, PixelDepth::Bit32).unwrap().to_mut();
        pm.set_rgb(0, 0, 0, 100, 200).unwrap();
        pm.set_rgb(1, 0, 100, 100, 0).unwrap();
        let pix: Pix = pm.into();
        let xm = FPix::new_with_value(1, 1, 0.5).unwrap();
        let ym = FPix::new(1, 1).unwrap();
        let out = remap(&pix, &xm, &ym, RemapFill::White).unwrap();
        assert_eq!(out.get_rgb(0, 0), Some((50, 100, 100)));
    }

    #[test]
    fn test_binary_uses_nearest() {
        let mut pm = Pix::new(3, 1, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_pixel(2, 0, 1).unwrap();
        let pix: Pix = pm.into();
        let xm = FPix::new_with_value(2, 1, 1.6).unwrap();
        let ym = FPix::new(2, 1).unwrap();
        let out = remap(&pix, &xm, &ym, RemapFill::White).unwrap();
        assert_eq!(out.get_pixel(0, 0), Some(1));
    }

    #[test]
    fn test_mismatched_maps() {
        let pix = gradient(4, 4);
        let xm = FPix::new(2, 2).unwrap();
        let ym = FPix::new(3, 2).unwrap();
        assert!(remap(&pix, &xm, &ym, RemapFill::White).is_err());
    }
}
