//! Image format detection
//!
//! Detects image formats by examining magic numbers in the file header,
//! or by file extension when writing.

use crate::{IoError, IoResult};
use flatpage_core::ImageFormat;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Magic numbers for image format detection
mod magic {
    /// PNG: 89 50 4E 47 0D 0A 1A 0A
    pub const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    /// JPEG: FF D8 FF
    pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];

    /// Binary PNM: P4 (bitmap), P5 (graymap), P6 (pixmap)
    pub const PNM_BINARY: [&[u8]; 3] = [b"P4", b"P5", b"P6"];

    /// ASCII PNM: P1, P2, P3
    pub const PNM_ASCII: [&[u8]; 3] = [b"P1", b"P2", b"P3"];
}

/// Detect image format from a file path
pub fn detect_format<P: AsRef<Path>>(path: P) -> IoResult<ImageFormat> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 12];
    let bytes_read = file.read(&mut header)?;
    detect_format_from_bytes(&header[..bytes_read])
}

/// Detect image format from bytes
pub fn detect_format_from_bytes(data: &[u8]) -> IoResult<ImageFormat> {
    if data.len() < 2 {
        return Err(IoError::InvalidData(
            "not enough data to detect format".to_string(),
        ));
    }
    if data.starts_with(magic::PNG) {
        return Ok(ImageFormat::Png);
    }
    if data.starts_with(magic::JPEG) {
        return Ok(ImageFormat::Jpeg);
    }
    let first_two = &data[..2];
    if magic::PNM_BINARY.contains(&first_two) || magic::PNM_ASCII.contains(&first_two) {
        return Ok(ImageFormat::Pnm);
    }
    Ok(ImageFormat::Unknown)
}

/// Choose an output format from a path's extension.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] if the extension is missing or
/// not one of the supported formats.
pub fn format_from_path<P: AsRef<Path>>(path: P) -> IoResult<ImageFormat> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            IoError::UnsupportedFormat(format!("no file extension: {}", path.display()))
        })?;
    match ImageFormat::from_extension(ext) {
        ImageFormat::Unknown => Err(IoError::UnsupportedFormat(format!(
            "unknown extension: .{ext}"
        ))),
        format => Ok(format),
    }
}
