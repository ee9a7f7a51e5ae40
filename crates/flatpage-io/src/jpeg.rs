//! JPEG image format support
//!
//! Decoding uses `jpeg-decoder`; 8-bit gray and 24-bit RGB are supported.
//! Encoding uses `jpeg-encoder` at a caller-chosen quality.

use crate::{IoError, IoResult};
use flatpage_core::{ImageFormat, Pix, PixelDepth, color};
use jpeg_decoder::PixelFormat;
use std::io::{Read, Write};

/// Default quality used by [`crate::write_image`].
pub const DEFAULT_QUALITY: u8 = 90;

/// Read a JPEG image from a reader.
///
/// Returns a `Pix` at 8 bpp (grayscale) or 32 bpp (RGB).
pub fn read_jpeg<R: Read>(reader: R) -> IoResult<Pix> {
    let mut decoder = jpeg_decoder::Decoder::new(reader);
    let data = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(format!("JPEG decode error: {e}")))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("JPEG header missing".to_string()))?;
    let (width, height) = (info.width as u32, info.height as u32);

    let (depth, samples) = match info.pixel_format {
        PixelFormat::L8 => (PixelDepth::Bit8, 1usize),
        PixelFormat::RGB24 => (PixelDepth::Bit32, 3usize),
        other => {
            return Err(IoError::UnsupportedFormat(format!(
                "JPEG pixel format {other:?}"
            )));
        }
    };
    let expected = width as usize * height as usize * samples;
    if data.len() < expected {
        return Err(IoError::InvalidData(format!(
            "JPEG data too short: {} < {expected}",
            data.len()
        )));
    }

    let mut pix_mut = Pix::new(width, height, depth)?.to_mut();
    pix_mut.set_informat(ImageFormat::Jpeg);
    for y in 0..height {
        for x in 0..width {
            let i = (y as usize * width as usize + x as usize) * samples;
            let val = if samples == 1 {
                data[i] as u32
            } else {
                color::compose_rgb(data[i], data[i + 1], data[i + 2])
            };
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(pix_mut.into())
}

/// Write a JPEG image.
///
/// 1 bpp images are expanded to 8-bit gray (foreground black).
pub fn write_jpeg<W: Write>(pix: &Pix, writer: W, quality: u8) -> IoResult<()> {
    let too_big = || {
        IoError::EncodeError(format!(
            "JPEG dimensions limited to 65535: {}x{}",
            pix.width(),
            pix.height()
        ))
    };
    let width = u16::try_from(pix.width()).map_err(|_| too_big())?;
    let height = u16::try_from(pix.height()).map_err(|_| too_big())?;

    let (color_type, samples) = match pix.depth() {
        PixelDepth::Bit32 => (jpeg_encoder::ColorType::Rgb, 3),
        _ => (jpeg_encoder::ColorType::Luma, 1),
    };
    let mut data = Vec::with_capacity(pix.width() as usize * pix.height() as usize * samples);
    for y in 0..pix.height() {
        for x in 0..pix.width() {
            let val = pix.get_pixel_unchecked(x, y);
            match pix.depth() {
                PixelDepth::Bit1 => data.push(if val != 0 { 0 } else { 255 }),
                PixelDepth::Bit8 => data.push(val as u8),
                PixelDepth::Bit32 => {
                    let (r, g, b) = color::extract_rgb(val);
                    data.extend_from_slice(&[r, g, b]);
                }
            }
        }
    }

    let encoder = jpeg_encoder::Encoder::new(writer, quality.clamp(1, 100));
    encoder
        .encode(&data, width, height, color_type)
        .map_err(|e| IoError::EncodeError(format!("JPEG encode error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_jpeg_gray_roundtrip_is_close() {
        let mut pm = Pix::new(16, 16, PixelDepth::Bit8).unwrap().to_mut();
        pm.set_all_gray(180).unwrap();
        let pix: Pix = pm.into();
        let mut bytes = Vec::new();
        write_jpeg(&pix, &mut bytes, 95).unwrap();
        let back = read_jpeg(Cursor::new(bytes)).unwrap();
        assert_eq!((back.width(), back.height()), (16, 16));
        let v = back.get_pixel(8, 8).unwrap() as i32;
        assert!((v - 180).abs() <= 3, "got {v}");
    }

    #[test]
    fn test_jpeg_rejects_garbage() {
        assert!(read_jpeg(Cursor::new(vec![0u8; 8])).is_err());
    }
}
