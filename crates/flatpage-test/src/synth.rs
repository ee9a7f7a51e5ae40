//! Synthetic document pages
//!
//! Pages are 8 bpp: light paper with rows of dark rectangular "words".
//! Every geometric fact about them (line positions, word extents, the exact
//! warp applied) is known, which lets tests assert on recovered geometry.

use crate::{TestError, TestResult};
use flatpage_core::{FPix, Pix, PixelDepth, color};
use flatpage_transform::{RemapFill, remap};

/// Geometry of a synthetic text page
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    /// Left and right margin
    pub margin_x: u32,
    /// Top of the first line
    pub top: u32,
    pub n_lines: u32,
    /// Distance between the tops of consecutive lines
    pub line_pitch: u32,
    /// Height of every word box
    pub line_height: u32,
    /// Nominal word width; actual widths vary by up to +-8 px
    pub word_width: u32,
    /// Gap between words on a line
    pub word_gap: u32,
    pub ink: u8,
    pub paper: u8,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            margin_x: 30,
            top: 40,
            n_lines: 8,
            line_pitch: 28,
            line_height: 8,
            word_width: 36,
            word_gap: 6,
            ink: 20,
            paper: 240,
        }
    }
}

impl PageLayout {
    /// Vertical centre of line `i` in pixel coordinates
    pub fn line_center(&self, i: u32) -> f32 {
        (self.top + i * self.line_pitch) as f32 + (self.line_height as f32 - 1.0) / 2.0
    }
}

fn synth_err(e: impl std::fmt::Display) -> TestError {
    TestError::Synthesis(e.to_string())
}

/// Render the page described by `layout`.
pub fn make_text_page(layout: &PageLayout) -> TestResult<Pix> {
    let mut pm = Pix::new(layout.width, layout.height, PixelDepth::Bit8)
        .map_err(synth_err)?
        .to_mut();
    pm.set_all_gray(layout.paper).map_err(synth_err)?;

    let right = layout.width.saturating_sub(layout.margin_x);
    for i in 0..layout.n_lines {
        let y0 = layout.top + i * layout.line_pitch;
        let y1 = (y0 + layout.line_height).min(layout.height);
        let mut x = layout.margin_x;
        let mut k = 0u32;
        while x < right {
            let jitter = (i * 7 + k * 11) % 5;
            let w = (layout.word_width + jitter * 4).saturating_sub(8).max(1);
            let x1 = (x + w).min(right);
            for y in y0..y1 {
                for xx in x..x1 {
                    pm.set_pixel_unchecked(xx, y, layout.ink as u32);
                }
            }
            x = x1 + layout.word_gap;
            k += 1;
        }
    }
    Ok(pm.into())
}

/// A uniform page with no ink.
pub fn blank_page(width: u32, height: u32, gray: u8) -> TestResult<Pix> {
    let mut pm = Pix::new(width, height, PixelDepth::Bit8)
        .map_err(synth_err)?
        .to_mut();
    pm.set_all_gray(gray).map_err(synth_err)?;
    Ok(pm.into())
}

/// Shift every column of `pix` down by `disp(x)` pixels.
///
/// The output pixel `(x, y)` samples the input at `(x, y - disp(x))` with
/// bilinear interpolation; uncovered pixels are white.
pub fn warp_page_vertically(pix: &Pix, disp: impl Fn(f32) -> f32) -> TestResult<Pix> {
    let (w, h) = (pix.width(), pix.height());
    let mut xmap = FPix::new(w, h).map_err(synth_err)?;
    let mut ymap = FPix::new(w, h).map_err(synth_err)?;
    for x in 0..w {
        let d = disp(x as f32);
        for y in 0..h {
            xmap.set_pixel_unchecked(x, y, x as f32);
            ymap.set_pixel_unchecked(x, y, y as f32 - d);
        }
    }
    remap(pix, &xmap, &ymap, RemapFill::White).map_err(synth_err)
}

/// Replicate an 8 bpp image into 32 bpp RGB.
pub fn gray_to_rgb(pix: &Pix) -> TestResult<Pix> {
    let mut pm = Pix::new(pix.width(), pix.height(), PixelDepth::Bit32)
        .map_err(synth_err)?
        .to_mut();
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            let g = pix.get_pixel_unchecked(x, y) as u8;
            pm.set_pixel_unchecked(x, y, color::compose_rgb(g, g, g));
        }
    }
    Ok(pm.into())
}
