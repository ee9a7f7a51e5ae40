//! PNG image format support
//!
//! Decoding expands palettes and sub-byte gray to 8 bits per sample, so the
//! reader only ever produces 8 bpp gray or 32 bpp RGB(A). 16-bit samples
//! keep their high byte.

use crate::{IoError, IoResult};
use flatpage_core::{Pix, PixelDepth, color};
use png::{BitDepth, ColorType, Decoder, Encoder, Transformations};
use std::io::{BufRead, Seek, Write};

/// Read a PNG image
pub fn read_png<R: BufRead + Seek>(reader: R) -> IoResult<Pix> {
    let mut decoder = Decoder::new(reader);
    decoder.set_transformations(Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e| IoError::DecodeError(format!("PNG decode error: {e}")))?;

    let (color_type, bit_depth) = reader.output_color_type();
    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let (depth, spp, samples) = match color_type {
        ColorType::Grayscale => (PixelDepth::Bit8, 1, 1),
        ColorType::GrayscaleAlpha => (PixelDepth::Bit32, 4, 2),
        ColorType::Rgb => (PixelDepth::Bit32, 3, 3),
        ColorType::Rgba => (PixelDepth::Bit32, 4, 4),
        ColorType::Indexed => {
            return Err(IoError::UnsupportedFormat(
                "PNG palette was not expanded".to_string(),
            ));
        }
    };
    let bytes_per_sample = match bit_depth {
        BitDepth::Eight => 1,
        BitDepth::Sixteen => 2,
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "unexpected PNG output depth {other:?}"
            )));
        }
    };

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("failed to get output buffer size".to_string()))?;
    let mut buf = vec![0; buf_size];
    let output_info = reader
        .next_frame(&mut buf)
        .map_err(|e| IoError::DecodeError(format!("PNG frame error: {e}")))?;
    let line_size = output_info.line_size;

    let mut pix_mut = Pix::new(width, height, depth)?.to_mut();
    pix_mut.set_spp(spp);
    pix_mut.set_informat(flatpage_core::ImageFormat::Png);

    let stride = samples * bytes_per_sample;
    for y in 0..height {
        let row = &buf[y as usize * line_size..];
        for x in 0..width {
            let px = &row[x as usize * stride..];
            let s = |i: usize| px[i * bytes_per_sample];
            let val = match color_type {
                ColorType::Grayscale => s(0) as u32,
                ColorType::GrayscaleAlpha => color::compose_rgb(s(0), s(0), s(0)),
                _ => color::compose_rgb(s(0), s(1), s(2)),
            };
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(pix_mut.into())
}

/// Write a PNG image
///
/// 1 bpp images are written as 1-bit grayscale with foreground black.
pub fn write_png<W: Write>(pix: &Pix, writer: W) -> IoResult<()> {
    let width = pix.width();
    let height = pix.height();

    let (color_type, bit_depth, bytes_per_row) = match pix.depth() {
        PixelDepth::Bit1 => (ColorType::Grayscale, BitDepth::One, width.div_ceil(8)),
        PixelDepth::Bit8 => (ColorType::Grayscale, BitDepth::Eight, width),
        PixelDepth::Bit32 => (ColorType::Rgb, BitDepth::Eight, width * 3),
    };
    let bytes_per_row = bytes_per_row as usize;

    let mut encoder = Encoder::new(writer, width, height);
    encoder.set_color(color_type);
    encoder.set_depth(bit_depth);
    let mut writer = encoder
        .write_header()
        .map_err(|e| IoError::EncodeError(format!("PNG header error: {e}")))?;

    let mut data = vec![0u8; bytes_per_row * height as usize];
    for y in 0..height {
        let row = &mut data[y as usize * bytes_per_row..(y as usize + 1) * bytes_per_row];
        for x in 0..width {
            let val = pix.get_pixel_unchecked(x, y);
            match pix.depth() {
                PixelDepth::Bit1 => {
                    // PNG gray 0 is black; our foreground bit is black.
                    if val == 0 {
                        row[(x / 8) as usize] |= 1 << (7 - (x % 8));
                    }
                }
                PixelDepth::Bit8 => row[x as usize] = val as u8,
                PixelDepth::Bit32 => {
                    let (r, g, b) = color::extract_rgb(val);
                    let i = x as usize * 3;
                    row[i..i + 3].copy_from_slice(&[r, g, b]);
                }
            }
        }
    }

    writer
        .write_image_data(&data)
        .map_err(|e| IoError::EncodeError(format!("PNG write error: {e}")))?;
    writer
        .finish()
        .map_err(|e| IoError::EncodeError(format!("PNG finish error: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_png_gray_roundtrip() {
        let mut pm = Pix::new(9, 4, PixelDepth::Bit8).unwrap().to_mut();
        for y in 0..4 {
            for x in 0..9 {
                pm.set_pixel(x, y, x * 20 + y).unwrap();
            }
        }
        let pix: Pix = pm.into();
        let mut bytes = Vec::new();
        write_png(&pix, &mut bytes).unwrap();
        let back = read_png(Cursor::new(bytes)).unwrap();
        assert_eq!(back.depth(), PixelDepth::Bit8);
        assert_eq!(back.get_pixel(8, 3), Some(163));
    }

    #[test]
    fn test_png_binary_reads_back_as_gray() {
        let mut pm = Pix::new(10, 2, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_pixel(3, 1, 1).unwrap();
        let pix: Pix = pm.into();
        let mut bytes = Vec::new();
        write_png(&pix, &mut bytes).unwrap();
        let back = read_png(Cursor::new(bytes)).unwrap();
        assert_eq!(back.depth(), PixelDepth::Bit8);
        assert_eq!(back.get_pixel(3, 1), Some(0));
        assert_eq!(back.get_pixel(4, 1), Some(255));
    }

    #[test]
    fn test_png_rejects_garbage() {
        assert!(read_png(Cursor::new(vec![1u8, 2, 3, 4])).is_err());
    }
}
