//! PNG codec.
//!
//! Decodes any PNG the `png` crate understands into 8-bit RGB/RGBA:
//! palettes are expanded, 16-bit samples are stripped to their high byte
//! and grayscale is widened to RGB. Encoding writes 8-bit RGB or RGBA
//! with an sRGB chunk.

use std::io::Cursor;

use crate::{ImageData, IoError, IoResult};

/// Decodes a PNG byte stream.
pub fn decode(bytes: &[u8]) -> IoResult<ImageData> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;

    let buf_size = reader
        .output_buffer_size()
        .ok_or_else(|| IoError::DecodeError("cannot determine output buffer size".into()))?;
    let mut buf = vec![0u8; buf_size];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let raw = &buf[..info.buffer_size()];

    if info.bit_depth != png::BitDepth::Eight {
        return Err(IoError::DecodeError(format!(
            "unexpected bit depth after normalization: {:?}",
            info.bit_depth
        )));
    }

    let (channels, data) = match info.color_type {
        png::ColorType::Rgb => (3, raw.to_vec()),
        png::ColorType::Rgba => (4, raw.to_vec()),
        png::ColorType::Grayscale => (3, raw.iter().flat_map(|&g| [g, g, g]).collect()),
        png::ColorType::GrayscaleAlpha => (
            4,
            raw.chunks_exact(2)
                .flat_map(|ga| [ga[0], ga[0], ga[0], ga[1]])
                .collect(),
        ),
        other => {
            return Err(IoError::UnsupportedFormat(format!("PNG color type {other:?}")));
        }
    };

    ImageData::new(info.width, info.height, channels, data)
}

/// Reads only the header, returning `(width, height, channels)` as
/// [`decode`] would produce them.
pub fn probe(bytes: &[u8]) -> IoResult<(u32, u32, u32)> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let reader = decoder
        .read_info()
        .map_err(|e: png::DecodingError| IoError::DecodeError(e.to_string()))?;
    let channels = match reader.output_color_type().0 {
        png::ColorType::Rgba | png::ColorType::GrayscaleAlpha => 4,
        _ => 3,
    };
    let info = reader.info();
    Ok((info.width, info.height, channels))
}

/// Encodes an image as an 8-bit PNG, keeping alpha when present.
pub fn encode(image: &ImageData) -> IoResult<Vec<u8>> {
    let color_type = match image.channels {
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        n => return Err(IoError::EncodeError(format!("unsupported channel count: {n}"))),
    };

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, image.width, image.height);
        encoder.set_color(color_type);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::default());
        encoder.set_source_srgb(png::SrgbRenderingIntent::Perceptual);

        let mut writer = encoder
            .write_header()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .write_image_data(&image.data)
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| IoError::EncodeError(e.to_string()))?;
    }
    Ok(out)
}
