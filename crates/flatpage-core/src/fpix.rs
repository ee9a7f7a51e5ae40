//! FPix - Floating-point image
//!
//! `FPix` is a 2D array of `f32` values. The dewarper uses a pair of them as
//! per-pixel source-coordinate maps.
//!
//! # Examples
//!
//! ```
//! use flatpage_core::FPix;
//!
//! let mut fpix = FPix::new(100, 100).unwrap();
//! fpix.set_pixel(10, 20, 0.5).unwrap();
//! assert_eq!(fpix.get_pixel(10, 20).unwrap(), 0.5);
//! ```

use crate::error::{Error, Result};

/// Floating-point image
///
/// # Memory Layout
///
/// Data is stored in row-major order with no padding. The pixel at (x, y)
/// is at index `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct FPix {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl FPix {
    /// Create a new FPix with all pixels set to zero
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Self::new_with_value(width, height, 0.0)
    }

    /// Create a new FPix with all pixels set to the specified value
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidDimension` if width or height is 0.
    pub fn new_with_value(width: u32, height: u32, value: f32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }
        let size = (width as usize) * (height as usize);
        Ok(FPix {
            width,
            height,
            data: vec![value; size],
        })
    }

    /// Get the width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get the dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the pixel value at (x, y)
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if coordinates are out of range.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<f32> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width as usize) + (x as usize),
                len: self.data.len(),
            });
        }
        Ok(self.get_pixel_unchecked(x, y))
    }

    /// Set the pixel value at (x, y)
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexOutOfBounds` if coordinates are out of range.
    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, value: f32) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::IndexOutOfBounds {
                index: (y as usize) * (self.width as usize) + (x as usize),
                len: self.data.len(),
            });
        }
        self.set_pixel_unchecked(x, y, value);
        Ok(())
    }

    /// Get the pixel value at (x, y) without bounds checking
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> f32 {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    /// Set the pixel value at (x, y) without bounds checking
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, value: f32) {
        let idx = (y as usize) * (self.width as usize) + (x as usize);
        self.data[idx] = value;
    }

    /// Get raw access to the pixel data
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get mutable access to the pixel data
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Get row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[f32] {
        let start = (y as usize) * (self.width as usize);
        &self.data[start..start + self.width as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fpix_new_and_access() {
        let mut fpix = FPix::new(3, 2).unwrap();
        assert_eq!(fpix.dimensions(), (3, 2));
        fpix.set_pixel(2, 1, -1.5).unwrap();
        assert_eq!(fpix.get_pixel(2, 1).unwrap(), -1.5);
        assert_eq!(fpix.row(1), &[0.0, 0.0, -1.5]);
        assert!(fpix.get_pixel(3, 0).is_err());
        assert!(fpix.set_pixel(0, 2, 1.0).is_err());
    }

    #[test]
    fn test_fpix_invalid_dimensions() {
        assert!(FPix::new(0, 5).is_err());
        assert!(FPix::new_with_value(5, 0, 1.0).is_err());
    }

    #[test]
    fn test_fpix_fill_value() {
        let mut fpix = FPix::new_with_value(2, 2, 1.0).unwrap();
        fpix.data_mut()[3] = -4.0;
        assert_eq!(fpix.data(), &[1.0, 1.0, 1.0, -4.0]);
        assert_eq!(fpix.get_pixel_unchecked(1, 1), -4.0);
    }
}
