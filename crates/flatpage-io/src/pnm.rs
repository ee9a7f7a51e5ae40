//! PNM image format support
//!
//! Reads binary PBM (P4), PGM (P5) and PPM (P6); ASCII variants are
//! rejected. Writes P4 for 1 bpp, P5 for 8 bpp and P6 for 32 bpp.

use crate::{IoError, IoResult};
use flatpage_core::{ImageFormat, Pix, PixelDepth, color};
use std::io::{Read, Write};

struct Header {
    kind: u8,
    width: u32,
    height: u32,
    maxval: u32,
    data_start: usize,
}

/// Read whitespace- and comment-separated header tokens.
fn parse_header(bytes: &[u8]) -> IoResult<Header> {
    if bytes.len() < 2 || bytes[0] != b'P' {
        return Err(IoError::InvalidData("missing PNM magic".to_string()));
    }
    let kind = bytes[1];
    if !matches!(kind, b'4' | b'5' | b'6') {
        return Err(IoError::UnsupportedFormat(format!(
            "PNM variant P{}",
            kind as char
        )));
    }
    let ntokens = if kind == b'4' { 2 } else { 3 };
    let mut values = Vec::with_capacity(ntokens);
    let mut pos = 2;
    while values.len() < ntokens {
        while pos < bytes.len() && (bytes[pos].is_ascii_whitespace() || bytes[pos] == b'#') {
            if bytes[pos] == b'#' {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            } else {
                pos += 1;
            }
        }
        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        if start == pos {
            return Err(IoError::InvalidData("truncated PNM header".to_string()));
        }
        let text = std::str::from_utf8(&bytes[start..pos])
            .map_err(|_| IoError::InvalidData("bad PNM header".to_string()))?;
        let value = text
            .parse::<u32>()
            .map_err(|e| IoError::InvalidData(format!("bad PNM header value: {e}")))?;
        values.push(value);
    }
    // Exactly one whitespace byte separates the header from the raster.
    if pos >= bytes.len() || !bytes[pos].is_ascii_whitespace() {
        return Err(IoError::InvalidData("truncated PNM header".to_string()));
    }
    let maxval = if kind == b'4' { 1 } else { values[2] };
    if maxval == 0 || maxval > 65535 {
        return Err(IoError::InvalidData(format!("bad PNM maxval {maxval}")));
    }
    Ok(Header {
        kind,
        width: values[0],
        height: values[1],
        maxval,
        data_start: pos + 1,
    })
}

/// Read a binary PNM image.
pub fn read_pnm<R: Read>(mut reader: R) -> IoResult<Pix> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let header = parse_header(&bytes)?;
    let (w, h) = (header.width, header.height);
    let raster = &bytes[header.data_start..];

    let sample_bytes = if header.maxval > 255 { 2 } else { 1 };
    let (depth, row_bytes) = match header.kind {
        b'4' => (PixelDepth::Bit1, w.div_ceil(8) as usize),
        b'5' => (PixelDepth::Bit8, w as usize * sample_bytes),
        _ => (PixelDepth::Bit32, w as usize * 3 * sample_bytes),
    };
    if raster.len() < row_bytes * h as usize {
        return Err(IoError::InvalidData(format!(
            "PNM raster too short: {} < {}",
            raster.len(),
            row_bytes * h as usize
        )));
    }

    let scale = |v: u32| (v * 255 / header.maxval) as u8;
    let sample = |row: &[u8], i: usize| -> u8 {
        if sample_bytes == 2 {
            scale(((row[2 * i] as u32) << 8) | row[2 * i + 1] as u32)
        } else {
            scale(row[i] as u32)
        }
    };

    let mut pix_mut = Pix::new(w, h, depth)?.to_mut();
    pix_mut.set_informat(ImageFormat::Pnm);
    for y in 0..h {
        let row = &raster[y as usize * row_bytes..(y as usize + 1) * row_bytes];
        for x in 0..w {
            let val = match depth {
                PixelDepth::Bit1 => ((row[(x / 8) as usize] >> (7 - (x % 8))) & 1) as u32,
                PixelDepth::Bit8 => sample(row, x as usize) as u32,
                PixelDepth::Bit32 => {
                    let i = x as usize * 3;
                    color::compose_rgb(sample(row, i), sample(row, i + 1), sample(row, i + 2))
                }
            };
            pix_mut.set_pixel_unchecked(x, y, val);
        }
    }
    Ok(pix_mut.into())
}

/// Write a binary PNM image.
pub fn write_pnm<W: Write>(pix: &Pix, mut writer: W) -> IoResult<()> {
    let (w, h) = (pix.width(), pix.height());
    match pix.depth() {
        PixelDepth::Bit1 => write!(writer, "P4\n{w} {h}\n")?,
        PixelDepth::Bit8 => write!(writer, "P5\n{w} {h}\n255\n")?,
        PixelDepth::Bit32 => write!(writer, "P6\n{w} {h}\n255\n")?,
    }
    let mut row = Vec::new();
    for y in 0..h {
        row.clear();
        match pix.depth() {
            PixelDepth::Bit1 => {
                row.resize(w.div_ceil(8) as usize, 0);
                for x in 0..w {
                    if pix.get_pixel_unchecked(x, y) != 0 {
                        row[(x / 8) as usize] |= 1 << (7 - (x % 8));
                    }
                }
            }
            PixelDepth::Bit8 => row.extend((0..w).map(|x| pix.get_pixel_unchecked(x, y) as u8)),
            PixelDepth::Bit32 => {
                for x in 0..w {
                    let (r, g, b) = color::extract_rgb(pix.get_pixel_unchecked(x, y));
                    row.extend_from_slice(&[r, g, b]);
                }
            }
        }
        writer.write_all(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_pgm_with_comment() {
        let mut bytes = b"P5\n# made by hand\n3 2\n255\n".to_vec();
        bytes.extend_from_slice(&[0, 10, 20, 30, 40, 250]);
        let pix = read_pnm(Cursor::new(bytes)).unwrap();
        assert_eq!(pix.depth(), PixelDepth::Bit8);
        assert_eq!((pix.width(), pix.height()), (3, 2));
        assert_eq!(pix.get_pixel(2, 1), Some(250));
    }

    #[test]
    fn test_pbm_and_ppm_roundtrip() {
        let mut pm = Pix::new(11, 3, PixelDepth::Bit1).unwrap().to_mut();
        pm.set_pixel(10, 2, 1).unwrap();
        let pix: Pix = pm.into();
        let mut bytes = Vec::new();
        write_pnm(&pix, &mut bytes).unwrap();
        let back = read_pnm(Cursor::new(bytes)).unwrap();
        assert_eq!(back.data(), pix.data());

        let mut pm = Pix::new(2, 2, PixelDepth::Bit32).unwrap().to_mut();
        pm.set_rgb(1, 1, 9, 8, 7).unwrap();
        let pix: Pix = pm.into();
        let mut bytes = Vec::new();
        write_pnm(&pix, &mut bytes).unwrap();
        let back = read_pnm(Cursor::new(bytes)).unwrap();
        assert_eq!(back.get_rgb(1, 1), Some((9, 8, 7)));
    }

    #[test]
    fn test_rejects_ascii_and_truncated() {
        assert!(read_pnm(Cursor::new(b"P2\n1 1\n255\n0\n".to_vec())).is_err());
        assert!(read_pnm(Cursor::new(b"P5\n4 4\n255\n\x00".to_vec())).is_err());
    }
}
