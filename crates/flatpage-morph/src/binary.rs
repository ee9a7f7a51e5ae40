//! Binary morphological operations
//!
//! A brick of size `n` along one axis covers offsets `-(n/2) ..= n - 1 - n/2`
//! relative to the origin. Dilation treats pixels outside the image as OFF;
//! erosion treats them as ON, so closing never eats foreground touching the
//! border and `close(A) ⊇ A` holds everywhere.
//!
//! Each pass unpacks the image to one byte per pixel, runs a prefix-sum
//! window along rows or columns, and packs the result back.

use crate::{MorphError, MorphResult};
use flatpage_core::{Pix, PixelDepth};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Dilate,
    Erode,
}

fn check_binary(pix: &Pix) -> MorphResult<()> {
    if pix.depth() != PixelDepth::Bit1 {
        return Err(MorphError::UnsupportedDepth {
            expected: "1-bpp binary",
            actual: pix.depth().bits(),
        });
    }
    Ok(())
}

fn check_size(width: u32, height: u32) -> MorphResult<()> {
    if width == 0 || height == 0 {
        return Err(MorphError::InvalidParameters(format!(
            "brick size must be positive: {width}x{height}"
        )));
    }
    Ok(())
}

fn unpack(pix: &Pix) -> Vec<u8> {
    let (w, h) = (pix.width(), pix.height());
    let mut buf = Vec::with_capacity((w as usize) * (h as usize));
    for y in 0..h {
        for x in 0..w {
            buf.push(pix.get_pixel_unchecked(x, y) as u8);
        }
    }
    buf
}

fn pack(buf: &[u8], w: u32, h: u32) -> MorphResult<Pix> {
    let mut out = Pix::new(w, h, PixelDepth::Bit1)?.to_mut();
    for y in 0..h {
        for x in 0..w {
            if buf[(y * w + x) as usize] != 0 {
                out.set_pixel_unchecked(x, y, 1);
            }
        }
    }
    Ok(out.into())
}

/// Apply a 1D brick of `size` to `len` samples read through `get`.
///
/// `prefix` is scratch space of at least `len + 1` entries.
fn window_1d(
    src: impl Fn(usize) -> u8,
    len: usize,
    size: u32,
    op: Op,
    prefix: &mut [u32],
    mut put: impl FnMut(usize, u8),
) {
    prefix[0] = 0;
    for i in 0..len {
        prefix[i + 1] = prefix[i] + src(i) as u32;
    }
    let before = (size / 2) as isize;
    let after = (size - 1) as isize - before;
    for i in 0..len as isize {
        // Dilation reads src[i + o]; erosion reads the reflected src[i - o].
        let (lo, hi) = match op {
            Op::Dilate => (i - before, i + after),
            Op::Erode => (i - after, i + before),
        };
        let a = lo.max(0) as usize;
        let b = (hi.min(len as isize - 1)) as usize;
        let ones = prefix[b + 1] - prefix[a];
        let val = match op {
            Op::Dilate => ones > 0,
            Op::Erode => ones as usize == b + 1 - a,
        };
        put(i as usize, val as u8);
    }
}

fn brick_pass(pix: &Pix, width: u32, height: u32, op: Op) -> MorphResult<Pix> {
    check_binary(pix)?;
    check_size(width, height)?;
    if width == 1 && height == 1 {
        return Ok(pix.clone());
    }
    let (w, h) = (pix.width() as usize, pix.height() as usize);
    let mut buf = unpack(pix);
    let mut prefix = vec![0u32; w.max(h) + 1];

    if width > 1 {
        let mut row = vec![0u8; w];
        for y in 0..h {
            row.copy_from_slice(&buf[y * w..(y + 1) * w]);
            let dst = &mut buf[y * w..(y + 1) * w];
            window_1d(|i| row[i], w, width, op, &mut prefix, |i, v| dst[i] = v);
        }
    }
    if height > 1 {
        let mut col = vec![0u8; h];
        for x in 0..w {
            for (y, c) in col.iter_mut().enumerate() {
                *c = buf[y * w + x];
            }
            window_1d(|i| col[i], h, height, op, &mut prefix, |i, v| {
                buf[i * w + x] = v
            });
        }
    }
    pack(&buf, pix.width(), pix.height())
}

/// Dilate with a brick (rectangular) structuring element
///
/// # Errors
///
/// Returns [`MorphError::UnsupportedDepth`] for non-binary input and
/// [`MorphError::InvalidParameters`] for a zero brick dimension.
pub fn dilate_brick(pix: &Pix, width: u32, height: u32) -> MorphResult<Pix> {
    brick_pass(pix, width, height, Op::Dilate)
}

/// Erode with a brick (rectangular) structuring element
pub fn erode_brick(pix: &Pix, width: u32, height: u32) -> MorphResult<Pix> {
    brick_pass(pix, width, height, Op::Erode)
}

/// Open with a brick structuring element
///
/// Opening = erosion followed by dilation. Removes foreground narrower than
/// the brick.
pub fn open_brick(pix: &Pix, width: u32, height: u32) -> MorphResult<Pix> {
    let eroded = erode_brick(pix, width, height)?;
    dilate_brick(&eroded, width, height)
}

/// Close with a brick structuring element
///
/// Closing = dilation followed by erosion. Bridges background gaps narrower
/// than the brick.
pub fn close_brick(pix: &Pix, width: u32, height: u32) -> MorphResult<Pix> {
    let dilated = dilate_brick(pix, width, height)?;
    erode_brick(&dilated, width, height)
}
