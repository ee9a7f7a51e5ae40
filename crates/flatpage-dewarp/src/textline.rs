//! Text line detection for dewarping
//!
//! Text is solidified into one blob per printed line with binary
//! morphology; every sufficiently long, flat blob becomes a [`TextLine`]
//! made of the per-column centroids of its pixels.

use crate::types::{Point, TextLine};
use crate::DewarpResult;
use flatpage_color::{gray_range, pix_convert_to_gray, threshold_otsu};
use flatpage_core::{Pix, PixelDepth};
use flatpage_morph::{close_brick, open_brick};
use flatpage_region::{ConnectivityType, label_with_components};

/// Gray ranges narrower than this are treated as a page without ink.
const MIN_CONTRAST: u8 = 32;

/// Upper bound on the number of points kept per line
const MAX_POINTS_PER_LINE: u32 = 48;

/// Minimum line width as a fraction of the image width
const MIN_WIDTH_FRACTION: f64 = 0.1;

/// Binarize an image for text line detection (1 = ink).
///
/// 1 bpp input is returned as is. Other depths are converted to gray and
/// split with Otsu's threshold, unless the page has too little contrast to
/// hold any text, in which case the result is empty.
pub fn binarize(pix: &Pix) -> DewarpResult<Pix> {
    if pix.depth() == PixelDepth::Bit1 {
        return Ok(pix.clone());
    }
    let gray = pix_convert_to_gray(pix)?;
    let (lo, hi) = gray_range(&gray)?;
    if hi - lo < MIN_CONTRAST {
        return Ok(Pix::new(pix.width(), pix.height(), PixelDepth::Bit1)?);
    }
    Ok(threshold_otsu(&gray)?)
}

/// Find text lines in an image of any depth.
///
/// Lines are returned top to bottom. A page without text yields an empty
/// vector.
pub fn find_textlines(pix: &Pix) -> DewarpResult<Vec<TextLine>> {
    let binary = binarize(pix)?;
    find_textline_centers(&binary)
}

/// Find the centers of text lines in a binary image
///
/// Every returned point lies inside the image and every line has at least
/// one point.
pub fn find_textline_centers(pix: &Pix) -> DewarpResult<Vec<TextLine>> {
    let w = pix.width();

    // Remove specks, then merge letters and words into one blob per line.
    let pix1 = open_brick(pix, 1, 3)?;
    let csize = (w / 40).clamp(5, 40);
    let pix2 = close_brick(&pix1, csize, 1)?;
    let pix3 = open_brick(&pix2, csize, 1)?;

    let (labels, components) = label_with_components(&pix3, ConnectivityType::EightWay)?;

    let min_width = (w as f64 * MIN_WIDTH_FRACTION).max(8.0);
    let mut lines = Vec::new();
    for comp in &components {
        let b = comp.bounds;
        if (b.w as f64) < min_width || b.h < 2 || b.w < 2 * b.h {
            continue;
        }
        let points = column_centroids(
            &labels,
            comp.label,
            b.x as u32,
            b.y as u32,
            b.w as u32,
            b.h as u32,
        );
        if let Ok(line) = TextLine::new(points) {
            lines.push(line);
        }
    }

    sort_lines_by_y(&mut lines);
    Ok(lines)
}

/// Mean y of the pixels labelled `label`, for evenly spaced columns of the box.
fn column_centroids(labels: &Pix, label: u32, bx: u32, by: u32, bw: u32, bh: u32) -> Vec<Point> {
    let step = bw.div_ceil(MAX_POINTS_PER_LINE).max(1);
    let mut centers = Vec::with_capacity((bw / step + 1) as usize);

    let mut x = bx + (bw - 1) % step / 2;
    while x < bx + bw {
        let mut sum_y = 0u64;
        let mut count = 0u64;
        for y in by..by + bh {
            if labels.get_pixel_unchecked(x, y) == label {
                sum_y += y as u64;
                count += 1;
            }
        }
        if count > 0 {
            centers.push(Point::new(x as f64, sum_y as f64 / count as f64));
        }
        x += step;
    }
    centers
}

/// Remove short lines from the list
///
/// Lines shorter than `min_fraction` of the longest line are removed.
pub fn remove_short_lines(lines: Vec<TextLine>, min_fraction: f64) -> Vec<TextLine> {
    let max_extent = lines
        .iter()
        .map(TextLine::horizontal_extent)
        .fold(0.0f64, f64::max);
    let min_extent = max_extent * min_fraction;

    lines
        .into_iter()
        .filter(|l| l.horizontal_extent() >= min_extent)
        .collect()
}

/// Sort lines by their vertical position (top to bottom)
pub fn sort_lines_by_y(lines: &mut [TextLine]) {
    lines.sort_by(|a, b| a.mid_y().total_cmp(&b.mid_y()));
}
