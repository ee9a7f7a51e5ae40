//! PIX - The main image container
//!
//! `Pix` holds a raster image at 1, 8 or 32 bits per pixel.
//!
//! # Pixel layout
//!
//! - Image data is stored in 32-bit words
//! - Every row starts on a 32-bit boundary
//! - Pixels are packed MSB to LSB within each word
//! - For 32-bit images, color order is RGBA (red in MSB)
//! - In 1-bit images a set bit is foreground (black ink)
//!
//! # Ownership model
//!
//! `Pix` uses `Arc` for cheap cloning (shared ownership).
//! To modify pixel data, convert to `PixMut` via [`Pix::try_into_mut`]
//! or [`Pix::to_mut`], then convert back with `Into<Pix>`.

mod access;

pub use access::*;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Pixel depth (bits per pixel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PixelDepth {
    /// 1-bit binary image
    Bit1 = 1,
    /// 8-bit grayscale
    Bit8 = 8,
    /// 32-bit RGB or RGBA
    Bit32 = 32,
}

impl PixelDepth {
    /// Get the number of bits per pixel.
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Get the maximum pixel value representable at this depth.
    pub fn max_value(self) -> u32 {
        match self {
            PixelDepth::Bit32 => u32::MAX,
            _ => (1u32 << self.bits()) - 1,
        }
    }
}

/// Image file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    /// Unknown format
    #[default]
    Unknown,
    /// JFIF JPEG format
    Jpeg,
    /// PNG format
    Png,
    /// Binary PNM (PBM / PGM / PPM)
    Pnm,
}

impl ImageFormat {
    /// Get the file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Unknown => "dat",
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Pnm => "pnm",
        }
    }

    /// Guess the format from a file extension (case-insensitive).
    ///
    /// Returns [`ImageFormat::Unknown`] for anything unrecognized.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Self::Jpeg,
            "png" => Self::Png,
            "pnm" | "pbm" | "pgm" | "ppm" => Self::Pnm,
            _ => Self::Unknown,
        }
    }
}

/// Internal PIX data
#[derive(Debug)]
struct PixData {
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    /// Depth in bits per pixel
    depth: PixelDepth,
    /// Samples per pixel (1 for grayscale, 3 for RGB, 4 for RGBA)
    spp: u32,
    /// 32-bit words per line
    wpl: u32,
    /// Input file format
    informat: ImageFormat,
    /// The image data (packed 32-bit words)
    data: Vec<u32>,
}

impl PixData {
    fn duplicate(&self) -> Self {
        PixData {
            width: self.width,
            height: self.height,
            depth: self.depth,
            spp: self.spp,
            wpl: self.wpl,
            informat: self.informat,
            data: self.data.clone(),
        }
    }
}

/// PIX - Main image container
///
/// # Examples
///
/// ```
/// use flatpage_core::{Pix, PixelDepth};
///
/// let pix = Pix::new(640, 480, PixelDepth::Bit8).unwrap();
/// assert_eq!(pix.width(), 640);
/// assert_eq!(pix.height(), 480);
/// ```
#[derive(Debug, Clone)]
pub struct Pix {
    inner: Arc<PixData>,
}

impl Pix {
    /// Create a new PIX with the specified dimensions and depth.
    ///
    /// The image data is initialized to zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if width or height is 0.
    pub fn new(width: u32, height: u32, depth: PixelDepth) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimension { width, height });
        }

        let wpl = Self::compute_wpl(width, depth)?;
        let data_size = (wpl as usize) * (height as usize);
        let spp = match depth {
            PixelDepth::Bit32 => 3,
            _ => 1,
        };

        let inner = PixData {
            width,
            height,
            depth,
            spp,
            wpl,
            informat: ImageFormat::Unknown,
            data: vec![0u32; data_size],
        };

        Ok(Pix {
            inner: Arc::new(inner),
        })
    }

    /// Compute words per line for given width and depth.
    #[inline]
    fn compute_wpl(width: u32, depth: PixelDepth) -> Result<u32> {
        let bits_per_line = u64::from(width) * u64::from(depth.bits());
        u32::try_from(bits_per_line.div_ceil(32)).map_err(|_| Error::InvalidDimension {
            width,
            height: 0,
        })
    }

    /// Get the image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Get the image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the pixel depth.
    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    /// Get the samples per pixel.
    #[inline]
    pub fn spp(&self) -> u32 {
        self.inner.spp
    }

    /// Get the words per line.
    #[inline]
    pub fn wpl(&self) -> u32 {
        self.inner.wpl
    }

    /// Get the input file format.
    #[inline]
    pub fn informat(&self) -> ImageFormat {
        self.inner.informat
    }

    /// Get raw access to the image data.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    /// Get the words of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_data(&self, y: u32) -> &[u32] {
        let start = (y * self.inner.wpl) as usize;
        let end = start + self.inner.wpl as usize;
        &self.inner.data[start..end]
    }

    /// Check if two PIX have the same width, height, and depth.
    pub fn sizes_equal(&self, other: &Pix) -> bool {
        self.inner.width == other.inner.width
            && self.inner.height == other.inner.height
            && self.inner.depth == other.inner.depth
    }

    /// Try to get mutable access to the image data.
    ///
    /// Succeeds only if there is exactly one reference to the data.
    pub fn try_into_mut(self) -> std::result::Result<PixMut, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(data) => Ok(PixMut { inner: data }),
            Err(arc) => Err(Pix { inner: arc }),
        }
    }

    /// Create a mutable copy of this PIX.
    pub fn to_mut(&self) -> PixMut {
        PixMut {
            inner: self.inner.duplicate(),
        }
    }
}

/// Mutable PIX
///
/// Allows modification of image data. Convert back to an immutable
/// [`Pix`] using `Into<Pix>`.
#[derive(Debug)]
pub struct PixMut {
    inner: PixData,
}

impl PixMut {
    /// Get the image width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Get the image height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Get the pixel depth.
    #[inline]
    pub fn depth(&self) -> PixelDepth {
        self.inner.depth
    }

    /// Get samples per pixel.
    #[inline]
    pub fn spp(&self) -> u32 {
        self.inner.spp
    }

    /// Get words per line.
    #[inline]
    pub fn wpl(&self) -> u32 {
        self.inner.wpl
    }

    /// Set the input file format.
    pub fn set_informat(&mut self, format: ImageFormat) {
        self.inner.informat = format;
    }

    /// Set samples per pixel (3 or 4 for 32 bpp, otherwise 1).
    pub fn set_spp(&mut self, spp: u32) {
        self.inner.spp = spp;
    }

    /// Get raw access to the image data.
    #[inline]
    pub fn data(&self) -> &[u32] {
        &self.inner.data
    }

    /// Get mutable raw access to the image data.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u32] {
        &mut self.inner.data
    }

    /// Get the words of row `y`.
    #[inline]
    pub fn row_data(&self, y: u32) -> &[u32] {
        let start = (y * self.inner.wpl) as usize;
        let end = start + self.inner.wpl as usize;
        &self.inner.data[start..end]
    }

    /// Get the words of row `y` for modification.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_data_mut(&mut self, y: u32) -> &mut [u32] {
        let start = (y * self.inner.wpl) as usize;
        let end = start + self.inner.wpl as usize;
        &mut self.inner.data[start..end]
    }

    /// Set every pixel of an 8 or 32 bpp image to a gray level.
    ///
    /// For 32 bpp the value is replicated into R, G and B.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDepth`] for 1 bpp images.
    pub fn set_all_gray(&mut self, grayval: u8) -> Result<()> {
        let word = match self.inner.depth {
            PixelDepth::Bit8 => u32::from_ne_bytes([grayval; 4]),
            PixelDepth::Bit32 => crate::color::compose_rgb(grayval, grayval, grayval),
            PixelDepth::Bit1 => return Err(Error::UnsupportedDepth(1)),
        };
        self.inner.data.fill(word);
        Ok(())
    }
}

impl From<PixMut> for Pix {
    fn from(pix_mut: PixMut) -> Self {
        Pix {
            inner: Arc::new(pix_mut.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pix_creation() {
        let pix = Pix::new(100, 200, PixelDepth::Bit8).unwrap();
        assert_eq!(pix.width(), 100);
        assert_eq!(pix.height(), 200);
        assert_eq!(pix.depth(), PixelDepth::Bit8);
        assert_eq!(pix.wpl(), 25);
        assert_eq!(pix.spp(), 1);
    }

    #[test]
    fn test_pix_invalid_dimensions() {
        assert!(Pix::new(0, 100, PixelDepth::Bit8).is_err());
        assert!(Pix::new(100, 0, PixelDepth::Bit8).is_err());
    }

    #[test]
    fn test_wpl_1bpp() {
        let pix = Pix::new(33, 2, PixelDepth::Bit1).unwrap();
        assert_eq!(pix.wpl(), 2);
        let pix = Pix::new(32, 2, PixelDepth::Bit1).unwrap();
        assert_eq!(pix.wpl(), 1);
    }

    #[test]
    fn test_try_into_mut_shared() {
        let pix = Pix::new(4, 4, PixelDepth::Bit8).unwrap();
        let shared = pix.clone();
        let pix = pix.try_into_mut().unwrap_err();
        drop(shared);
        assert!(pix.try_into_mut().is_ok());
    }

    #[test]
    fn test_set_all_gray() {
        let mut pm = Pix::new(5, 3, PixelDepth::Bit8).unwrap().to_mut();
        pm.set_all_gray(200).unwrap();
        let pix: Pix = pm.into();
        assert_eq!(pix.get_pixel(4, 2), Some(200));

        let mut pm = Pix::new(2, 2, PixelDepth::Bit32).unwrap().to_mut();
        pm.set_all_gray(10).unwrap();
        let pix: Pix = pm.into();
        assert_eq!(pix.get_rgb(1, 1), Some((10, 10, 10)));

        let mut pm = Pix::new(2, 2, PixelDepth::Bit1).unwrap().to_mut();
        assert!(pm.set_all_gray(0).is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("JPG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_extension("pgm"), ImageFormat::Pnm);
        assert_eq!(ImageFormat::from_extension("tif"), ImageFormat::Unknown);
    }
}
