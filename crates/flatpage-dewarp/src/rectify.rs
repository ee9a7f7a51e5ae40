//! Resampling through a fitted page model
//!
//! The output image is a regular grid over the flat page. Column `j` of a
//! `W`-wide output sits at source `x = (j + 0.5)·w/W - 0.5`; rows are spread
//! evenly over `[v_min, v_max]`, the part of the flat page whose image falls
//! inside the source. Every output pixel `(u, v)` is looked up at the image
//! point `(u, v + S(u, v))` with bilinear interpolation.

use crate::types::FitResult;
use crate::{DewarpError, DewarpResult};
use flatpage_core::{FPix, Pix};
use flatpage_transform::{RemapFill, remap};

/// Output height may not exceed this multiple of the input height.
const MAX_HEIGHT_RATIO: f64 = 16.0;

/// Bracket half-widths are doubled up to this many normalized units.
const MAX_BRACKET: f64 = 64.0;

const BISECTION_STEPS: usize = 60;

/// Surface restricted to one column, `S(u, v) = Σ a[q] v^q`
struct ColumnPoly {
    a: Vec<f64>,
}

impl ColumnPoly {
    fn eval(&self, v: f64) -> f64 {
        self.a.iter().rev().fold(0.0, |acc, c| acc * v + c)
    }

    fn eval_dv(&self, v: f64) -> f64 {
        self.a
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (q, c)| acc * v + q as f64 * c)
    }

    /// Solve `v + S(u, v) = target` by bracketed bisection.
    fn invert(&self, target: f64) -> Option<f64> {
        let f = |v: f64| v + self.eval(v) - target;
        let mut radius = 0.25;
        let (mut lo, mut hi) = loop {
            let (lo, hi) = (target - radius, target + radius);
            if f(lo) < 0.0 && f(hi) > 0.0 {
                break (lo, hi);
            }
            radius *= 2.0;
            if radius > MAX_BRACKET {
                return None;
            }
        };
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (lo + hi);
            if f(mid) < 0.0 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(0.5 * (lo + hi))
    }
}

/// The flat-page region covered by a rectified image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputDomain {
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// Normalized `v` of the top edge
    pub v_min: f64,
    /// Normalized `v` of the bottom edge
    pub v_max: f64,
    /// Source pixels per output pixel, horizontally
    x_step: f64,
}

impl OutputDomain {
    /// Source `x` sampled by output column `j`
    pub fn column_x(&self, j: u32) -> f64 {
        (j as f64 + 0.5) * self.x_step - 0.5
    }

    /// Normalized `v` of output row `i`
    pub fn row_v(&self, i: u32) -> f64 {
        self.v_min + (i as f64 + 0.5) * (self.v_max - self.v_min) / self.height as f64
    }
}

/// Work out the output grid for a rectification at `output_width`.
///
/// The height keeps the aspect ratio of the flat page.
///
/// # Errors
///
/// - [`DewarpError::InvalidArgument`] if `output_width` is zero
/// - [`DewarpError::DegenerateMapping`] if an image edge cannot be traced
///   back onto the flat page, or the result would be unreasonably tall
pub fn output_domain(fit: &FitResult, output_width: u32) -> DewarpResult<OutputDomain> {
    if output_width == 0 {
        return Err(DewarpError::InvalidArgument(
            "output width must be positive".to_string(),
        ));
    }
    let frame = fit.frame();
    let (w, h) = (frame.width() as f64, frame.height() as f64);
    let s = frame.scale();
    let x_step = w / output_width as f64;
    let (_, top) = frame.to_norm(0.0, -0.5);
    let (_, bottom) = frame.to_norm(0.0, h - 0.5);

    let mut v_min = f64::INFINITY;
    let mut v_max = f64::NEG_INFINITY;
    for j in 0..output_width {
        let x = (j as f64 + 0.5) * x_step - 0.5;
        let (u, _) = frame.to_norm(x, 0.0);
        let col = ColumnPoly {
            a: fit.surface().column(u),
        };
        let (Some(t), Some(b)) = (col.invert(top), col.invert(bottom)) else {
            return Err(DewarpError::DegenerateMapping(format!(
                "page edge cannot be traced at column {j}"
            )));
        };
        v_min = v_min.min(t);
        v_max = v_max.max(b);
    }

    let height = (v_max - v_min) * s / x_step;
    if !height.is_finite() || height <= 0.0 || height > MAX_HEIGHT_RATIO * h {
        return Err(DewarpError::DegenerateMapping(format!(
            "output height {height:.1} out of range for a {h}-pixel input"
        )));
    }

    Ok(OutputDomain {
        width: output_width,
        height: (height.round() as u32).max(1),
        v_min,
        v_max,
        x_step,
    })
}

/// Resample `pix` onto the flat page described by `fit`.
///
/// The result is exactly `output_width` pixels wide and has the depth of
/// `pix`; pixels whose source falls outside the image get `gray_in`.
///
/// # Errors
///
/// - [`DewarpError::InvalidArgument`] if `output_width` is zero or `pix` is
///   not the size the model was fitted on
/// - [`DewarpError::DegenerateMapping`] if the model folds over itself
///   (`1 + ∂S/∂v <= 0`) or produces non-finite coordinates anywhere on the
///   output grid
pub fn rectify(pix: &Pix, fit: &FitResult, output_width: u32, gray_in: u8) -> DewarpResult<Pix> {
    let frame = fit.frame();
    if pix.width() != frame.width() || pix.height() != frame.height() {
        return Err(DewarpError::InvalidArgument(format!(
            "model fitted on {}x{}, image is {}x{}",
            frame.width(),
            frame.height(),
            pix.width(),
            pix.height()
        )));
    }
    let domain = output_domain(fit, output_width)?;
    let (ow, oh) = (domain.width, domain.height);
    let s = frame.scale();
    let (_, cy) = frame.center();

    let mut xmap = FPix::new(ow, oh)?;
    let mut ymap = FPix::new(ow, oh)?;
    let rows: Vec<f64> = (0..oh).map(|i| domain.row_v(i)).collect();

    for j in 0..ow {
        let x = domain.column_x(j);
        let (u, _) = frame.to_norm(x, 0.0);
        let col = ColumnPoly {
            a: fit.surface().column(u),
        };
        for (i, &v) in rows.iter().enumerate() {
            let slope = 1.0 + col.eval_dv(v);
            let y = cy + s * (v + col.eval(v));
            if slope.is_nan() || slope <= 0.0 || !y.is_finite() {
                return Err(DewarpError::DegenerateMapping(format!(
                    "surface folds at output pixel ({j}, {i})"
                )));
            }
            xmap.set_pixel_unchecked(j, i as u32, x as f32);
            ymap.set_pixel_unchecked(j, i as u32, y as f32);
        }
    }

    Ok(remap(pix, &xmap, &ymap, RemapFill::Gray(gray_in))?)
}
