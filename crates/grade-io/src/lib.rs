//! # grade-io
//!
//! Image I/O for the grading engine.
//!
//! Works in an 8-bit-per-channel sRGB-like model: PNG and JPEG byte streams
//! decode into [`ImageData`] (RGB or RGBA) and encode back out as JPEG
//! (default) or PNG (when alpha or lossless output is wanted).
//!
//! # Example
//!
//! ```rust
//! use grade_io::{ImageData, OutputFormat};
//!
//! let img = ImageData::new(2, 1, 3, vec![255, 0, 0, 0, 0, 255]).unwrap();
//! let bytes = grade_io::encode(&img, OutputFormat::Png).unwrap();
//! let back = grade_io::decode(&bytes).unwrap();
//! assert_eq!(back.data, img.data);
//! ```

#![warn(missing_docs)]

mod error;
mod detect;
mod image;
pub mod png;
pub mod jpeg;

pub use error::{IoError, IoResult};
pub use detect::Format;
pub use image::ImageData;

use serde::Deserialize;
use tracing::trace;

/// Default JPEG quality.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase", tag = "format")]
pub enum OutputFormat {
    /// Lossy JPEG at the given quality (1-100). Alpha is dropped.
    Jpeg {
        /// Encoder quality.
        #[serde(default = "default_quality")]
        quality: u8,
    },
    /// Lossless PNG; keeps alpha.
    Png,
}

fn default_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Jpeg { quality: DEFAULT_JPEG_QUALITY }
    }
}

impl OutputFormat {
    /// MIME type of the encoded bytes.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "image/jpeg",
            Self::Png => "image/png",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg { .. } => "jpg",
            Self::Png => "png",
        }
    }
}

/// Decodes PNG or JPEG bytes.
pub fn decode(bytes: &[u8]) -> IoResult<ImageData> {
    if bytes.is_empty() {
        return Err(IoError::EmptyInput);
    }
    let format = Format::from_magic_bytes(bytes);
    trace!(?format, len = bytes.len(), "decoding image");
    match format {
        Format::Png => png::decode(bytes),
        Format::Jpeg => jpeg::decode(bytes),
        Format::Unknown => Err(IoError::UnsupportedFormat(
            "expected PNG or JPEG data".into(),
        )),
    }
}

/// Reads `(width, height, channels)` of PNG or JPEG bytes without decoding
/// pixel data. Fails the same way [`decode`] does on empty or unknown input.
pub fn probe(bytes: &[u8]) -> IoResult<(u32, u32, u32)> {
    if bytes.is_empty() {
        return Err(IoError::EmptyInput);
    }
    match Format::from_magic_bytes(bytes) {
        Format::Png => png::probe(bytes),
        Format::Jpeg => jpeg::probe(bytes),
        Format::Unknown => Err(IoError::UnsupportedFormat(
            "expected PNG or JPEG data".into(),
        )),
    }
}

/// Encodes an image in the requested format.
pub fn encode(image: &ImageData, format: OutputFormat) -> IoResult<Vec<u8>> {
    match format {
        OutputFormat::Jpeg { quality } => jpeg::encode(image, quality),
        OutputFormat::Png => png::encode(image),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bytes_rejected() {
        assert!(matches!(decode(&[]), Err(IoError::EmptyInput)));
    }

    #[test]
    fn unknown_magic_rejected() {
        assert!(matches!(decode(b"GIF89a...."), Err(IoError::UnsupportedFormat(_))));
        assert!(matches!(probe(b"GIF89a...."), Err(IoError::UnsupportedFormat(_))));
        assert!(matches!(probe(&[]), Err(IoError::EmptyInput)));
    }

    #[test]
    fn output_format_from_yaml() {
        let jpeg: OutputFormat = serde_yaml::from_str("format: jpeg").unwrap();
        assert_eq!(jpeg, OutputFormat::Jpeg { quality: 92 });
        let png: OutputFormat = serde_yaml::from_str("format: png").unwrap();
        assert_eq!(png, OutputFormat::Png);
        assert_eq!(png.content_type(), "image/png");
    }

    #[test]
    fn dispatch_by_magic() {
        let img = ImageData::new(4, 4, 3, vec![128; 48]).unwrap();
        let jpg = encode(&img, OutputFormat::default()).unwrap();
        assert_eq!(Format::from_magic_bytes(&jpg), Format::Jpeg);
        assert_eq!(decode(&jpg).unwrap().width, 4);
        assert_eq!(probe(&jpg).unwrap(), (4, 4, 3));
    }
}
