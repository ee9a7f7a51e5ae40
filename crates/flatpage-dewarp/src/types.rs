//! Dewarp type definitions
//!
//! This module defines the data passed between the dewarping stages.

use crate::poly::{LinePolynomial, SurfacePolynomial};
use crate::{DewarpError, DewarpResult};

/// A point in source-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The points sampled along one printed text line
///
/// Never empty. Points are usually ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    points: Vec<Point>,
}

impl TextLine {
    /// Create a text line from its points.
    ///
    /// # Errors
    ///
    /// Returns [`DewarpError::InvalidArgument`] if `points` is empty.
    pub fn new(points: Vec<Point>) -> DewarpResult<Self> {
        if points.is_empty() {
            return Err(DewarpError::InvalidArgument(
                "a text line needs at least one point".to_string(),
            ));
        }
        Ok(Self { points })
    }

    /// Get the points of this line
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Get the number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Horizontal extent (max x - min x)
    pub fn horizontal_extent(&self) -> f64 {
        let (min_x, max_x) = self
            .points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.x), hi.max(p.x))
            });
        max_x - min_x
    }

    /// Mean y coordinate of the line
    pub fn mid_y(&self) -> f64 {
        self.points.iter().map(|p| p.y).sum::<f64>() / self.points.len() as f64
    }
}

/// Mapping between pixel coordinates and the normalized model domain
///
/// `u = (x - cx) / s`, `v = (y - cy) / s` with `(cx, cy)` the image centre
/// and `s = max(w, h) / 2`, so the whole image lies in `[-1, 1]^2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormFrame {
    width: u32,
    height: u32,
    cx: f64,
    cy: f64,
    scale: f64,
}

impl NormFrame {
    /// Create the frame for a `width` x `height` image.
    ///
    /// # Errors
    ///
    /// Returns [`DewarpError::InvalidArgument`] if either dimension is zero.
    pub fn new(width: u32, height: u32) -> DewarpResult<Self> {
        if width == 0 || height == 0 {
            return Err(DewarpError::InvalidArgument(format!(
                "image dimensions must be positive, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            cx: (width as f64 - 1.0) / 2.0,
            cy: (height as f64 - 1.0) / 2.0,
            scale: width.max(height) as f64 / 2.0,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per normalized unit
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Image centre in pixel coordinates
    pub fn center(&self) -> (f64, f64) {
        (self.cx, self.cy)
    }

    #[inline]
    pub fn to_norm(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.cx) / self.scale, (y - self.cy) / self.scale)
    }

    #[inline]
    pub fn to_pixel(&self, u: f64, v: f64) -> (f64, f64) {
        (self.cx + u * self.scale, self.cy + v * self.scale)
    }
}

/// A fitted page model
///
/// The surface maps a flat-page point `(u, v)` to the image point
/// `(u, v + S(u, v))`; each text line follows `v = L_k(u)` on the flat page.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub(crate) frame: NormFrame,
    pub(crate) surface: SurfacePolynomial,
    pub(crate) lines: Vec<LinePolynomial>,
    pub(crate) residual: f64,
    pub(crate) iterations: usize,
}

impl FitResult {
    /// Assemble a model from its parts.
    ///
    /// `residual` is the RMS fitting error in pixels.
    pub fn new(
        frame: NormFrame,
        surface: SurfacePolynomial,
        lines: Vec<LinePolynomial>,
        residual: f64,
        iterations: usize,
    ) -> Self {
        Self {
            frame,
            surface,
            lines,
            residual,
            iterations,
        }
    }

    pub fn frame(&self) -> &NormFrame {
        &self.frame
    }

    pub fn surface(&self) -> &SurfacePolynomial {
        &self.surface
    }

    /// Line polynomials, in the order of the input text lines
    pub fn lines(&self) -> &[LinePolynomial] {
        &self.lines
    }

    /// RMS fitting error in pixels
    pub fn residual(&self) -> f64 {
        self.residual
    }

    /// Number of solver iterations used
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Image position of the flat-page point `(u, v)`, in pixels
    pub fn project(&self, u: f64, v: f64) -> (f64, f64) {
        self.frame.to_pixel(u, v + self.surface.eval(u, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(y: f64, x_start: f64, x_end: f64) -> TextLine {
        let mut points = Vec::new();
        let mut x = x_start;
        while x <= x_end {
            points.push(Point::new(x, y));
            x += 10.0;
        }
        TextLine::new(points).unwrap()
    }

    #[test]
    fn test_textline_rejects_empty() {
        assert!(TextLine::new(vec![]).is_err());
    }

    #[test]
    fn test_textline_extent_and_mid_y() {
        let l = line(42.0, 10.0, 110.0);
        assert_eq!(l.horizontal_extent(), 100.0);
        assert_eq!(l.mid_y(), 42.0);
        assert_eq!(l.len(), 11);
    }

    #[test]
    fn test_norm_frame_round_trip() {
        let frame = NormFrame::new(400, 300).unwrap();
        assert_eq!(frame.scale(), 200.0);
        assert_eq!(frame.center(), (199.5, 149.5));
        let (u, v) = frame.to_norm(399.5, 149.5);
        assert_eq!((u, v), (1.0, 0.0));
        let (x, y) = frame.to_pixel(u, v);
        assert!((x - 399.5).abs() < 1e-12 && (y - 149.5).abs() < 1e-12);
    }

    #[test]
    fn test_norm_frame_rejects_empty_image() {
        assert!(NormFrame::new(0, 10).is_err());
    }
}
