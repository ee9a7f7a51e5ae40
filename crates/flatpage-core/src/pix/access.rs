//! Pixel access functions
//!
//! Low-level functions for getting and setting individual pixels.
//!
//! # Pixel packing
//!
//! Pixels are packed MSB-to-LSB within each 32-bit word. For example,
//! in a 1-bit image, pixel 0 occupies bit 31 (MSB) of the first word.

use super::{Pix, PixMut, PixelDepth};
use crate::color;
use crate::error::{Error, Result};

#[inline]
fn read_word(line: &[u32], x: u32, depth: PixelDepth) -> u32 {
    match depth {
        PixelDepth::Bit1 => get_data_bit(line, x),
        PixelDepth::Bit8 => get_data_byte(line, x),
        PixelDepth::Bit32 => line[x as usize],
    }
}

#[inline]
fn write_word(line: &mut [u32], x: u32, depth: PixelDepth, val: u32) {
    match depth {
        PixelDepth::Bit1 => set_data_bit(line, x, val),
        PixelDepth::Bit8 => set_data_byte(line, x, val),
        PixelDepth::Bit32 => line[x as usize] = val,
    }
}

impl Pix {
    /// Get a pixel value at (x, y).
    ///
    /// Returns `None` if coordinates are out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.get_pixel_unchecked(x, y))
    }

    /// Get a pixel value without bounds checking.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`, or may return padding bits if `x >= width`.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u32 {
        read_word(self.row_data(y), x, self.depth())
    }

    /// Get RGB values at (x, y).
    ///
    /// Only valid for 32-bit images.
    pub fn get_rgb(&self, x: u32, y: u32) -> Option<(u8, u8, u8)> {
        if self.depth() != PixelDepth::Bit32 {
            return None;
        }
        self.get_pixel(x, y).map(color::extract_rgb)
    }
}

impl PixMut {
    /// Get a pixel value at (x, y).
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some(self.get_pixel_unchecked(x, y))
    }

    /// Get a pixel value without bounds checking.
    #[inline]
    pub fn get_pixel_unchecked(&self, x: u32, y: u32) -> u32 {
        read_word(self.row_data(y), x, self.depth())
    }

    /// Set a pixel value at (x, y).
    ///
    /// The value is masked to the image depth.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if coordinates are out of bounds.
    pub fn set_pixel(&mut self, x: u32, y: u32, val: u32) -> Result<()> {
        if x >= self.width() {
            return Err(Error::IndexOutOfBounds {
                index: x as usize,
                len: self.width() as usize,
            });
        }
        if y >= self.height() {
            return Err(Error::IndexOutOfBounds {
                index: y as usize,
                len: self.height() as usize,
            });
        }
        self.set_pixel_unchecked(x, y, val);
        Ok(())
    }

    /// Set a pixel value without bounds checking.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`; writing past `width` corrupts padding bits.
    #[inline]
    pub fn set_pixel_unchecked(&mut self, x: u32, y: u32, val: u32) {
        let depth = self.depth();
        let val = val & depth.max_value();
        write_word(self.row_data_mut(y), x, depth, val);
    }

    /// Set an RGB pixel at (x, y).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDepth`] unless the image is 32 bpp.
    pub fn set_rgb(&mut self, x: u32, y: u32, r: u8, g: u8, b: u8) -> Result<()> {
        if self.depth() != PixelDepth::Bit32 {
            return Err(Error::UnsupportedDepth(self.depth().bits()));
        }
        self.set_pixel(x, y, color::compose_rgb(r, g, b))
    }
}

/// Get a 1-bit pixel value.
#[inline]
pub fn get_data_bit(line: &[u32], x: u32) -> u32 {
    (line[(x >> 5) as usize] >> (31 - (x & 31))) & 1
}

/// Set a 1-bit pixel value.
#[inline]
pub fn set_data_bit(line: &mut [u32], x: u32, val: u32) {
    let word = &mut line[(x >> 5) as usize];
    let mask = 0x8000_0000u32 >> (x & 31);
    if val & 1 != 0 {
        *word |= mask;
    } else {
        *word &= !mask;
    }
}

/// Get an 8-bit pixel value.
#[inline]
pub fn get_data_byte(line: &[u32], x: u32) -> u32 {
    (line[(x >> 2) as usize] >> (24 - 8 * (x & 3))) & 0xff
}

/// Set an 8-bit pixel value.
#[inline]
pub fn set_data_byte(line: &mut [u32], x: u32, val: u32) {
    let shift = 24 - 8 * (x & 3);
    let word = &mut line[(x >> 2) as usize];
    *word = (*word & !(0xff << shift)) | ((val & 0xff) << shift);
}
