//! flatpage-io - Image file I/O
//!
//! Reads and writes PNG, JPEG and binary PNM. Reading detects the format
//! from magic bytes; writing takes an explicit [`ImageFormat`] or infers it
//! from the file extension.
//!
//! Each codec sits behind a cargo feature (`png-format`, `jpeg`, `pnm`),
//! all enabled by default.

mod error;
pub mod format;
#[cfg(feature = "jpeg")]
pub mod jpeg;
#[cfg(feature = "png-format")]
pub mod png;
#[cfg(feature = "pnm")]
pub mod pnm;

pub use error::{IoError, IoResult};
pub use flatpage_core::ImageFormat;
pub use format::{detect_format, detect_format_from_bytes, format_from_path};

use flatpage_core::Pix;
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Read an image from a file path.
///
/// # Errors
///
/// Returns [`IoError::UnsupportedFormat`] if the content is not a format
/// compiled into this crate.
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<Pix> {
    let bytes = std::fs::read(path)?;
    read_image_mem(&bytes)
}

/// Decode an image held in memory.
pub fn read_image_mem(data: &[u8]) -> IoResult<Pix> {
    match detect_format_from_bytes(data)? {
        #[cfg(feature = "png-format")]
        ImageFormat::Png => png::read_png(Cursor::new(data)),
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => jpeg::read_jpeg(Cursor::new(data)),
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => pnm::read_pnm(Cursor::new(data)),
        other => Err(IoError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Encode an image into a writer in the given format.
pub fn write_image_to<W: Write>(pix: &Pix, writer: W, format: ImageFormat) -> IoResult<()> {
    match format {
        #[cfg(feature = "png-format")]
        ImageFormat::Png => png::write_png(pix, writer),
        #[cfg(feature = "jpeg")]
        ImageFormat::Jpeg => jpeg::write_jpeg(pix, writer, jpeg::DEFAULT_QUALITY),
        #[cfg(feature = "pnm")]
        ImageFormat::Pnm => pnm::write_pnm(pix, writer),
        other => Err(IoError::UnsupportedFormat(format!("{other:?}"))),
    }
}

/// Encode an image into a byte buffer.
pub fn write_image_mem(pix: &Pix, format: ImageFormat) -> IoResult<Vec<u8>> {
    let mut buf = Vec::new();
    write_image_to(pix, &mut buf, format)?;
    Ok(buf)
}

/// Write an image to a file path in the given format.
pub fn write_image<P: AsRef<Path>>(pix: &Pix, path: P, format: ImageFormat) -> IoResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_image_to(pix, &mut writer, format)?;
    writer.flush()?;
    Ok(())
}

/// Write an image, choosing the format from the path's extension.
pub fn write_image_auto<P: AsRef<Path>>(pix: &Pix, path: P) -> IoResult<()> {
    let format = format_from_path(&path)?;
    write_image(pix, path, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatpage_core::PixelDepth;
    use std::error::Error as _;

    #[test]
    fn test_missing_file_keeps_cause_as_source() {
        let err = read_image("/nonexistent/flatpage/page.png").unwrap_err();
        assert!(matches!(err, IoError::Io(_)));
        assert_eq!(err.to_string(), "I/O error");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_mem_roundtrip_detects_format() {
        let mut pm = Pix::new(5, 5, PixelDepth::Bit8).unwrap().to_mut();
        pm.set_pixel(2, 2, 77).unwrap();
        let pix: Pix = pm.into();
        for format in [ImageFormat::Png, ImageFormat::Pnm] {
            let bytes = write_image_mem(&pix, format).unwrap();
            assert_eq!(detect_format_from_bytes(&bytes).unwrap(), format);
            let back = read_image_mem(&bytes).unwrap();
            assert_eq!(back.get_pixel(2, 2), Some(77));
        }
    }

    #[test]
    fn test_unknown_format_errors() {
        let pix = Pix::new(2, 2, PixelDepth::Bit8).unwrap();
        assert!(write_image_mem(&pix, ImageFormat::Unknown).is_err());
        assert!(read_image_mem(b"GIF89a....").is_err());
    }
}
