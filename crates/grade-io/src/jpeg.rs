//! JPEG codec.
//!
//! Decoding goes through `jpeg-decoder` and always yields 8-bit RGB;
//! encoding goes through `jpeg-encoder`. JPEG has no alpha, so RGBA input
//! is flattened to RGB on the way out.

use std::io::Cursor;

use crate::{ImageData, IoError, IoResult};

/// Largest dimension a baseline JPEG header can carry.
const MAX_DIMENSION: u32 = u16::MAX as u32;

/// Decodes a JPEG byte stream to RGB.
pub fn decode(bytes: &[u8]) -> IoResult<ImageData> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    let pixels = decoder
        .decode()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;

    let data = match info.pixel_format {
        jpeg_decoder::PixelFormat::RGB24 => pixels,
        jpeg_decoder::PixelFormat::L8 => pixels.iter().flat_map(|&g| [g, g, g]).collect(),
        jpeg_decoder::PixelFormat::L16 => pixels
            .chunks_exact(2)
            .flat_map(|l16| [l16[0], l16[0], l16[0]])
            .collect(),
        jpeg_decoder::PixelFormat::CMYK32 => pixels
            .chunks_exact(4)
            .flat_map(|cmyk| {
                let k = 1.0 - cmyk[3] as f32 / 255.0;
                let ch = |v: u8| ((1.0 - v as f32 / 255.0) * k * 255.0).round() as u8;
                [ch(cmyk[0]), ch(cmyk[1]), ch(cmyk[2])]
            })
            .collect(),
    };

    ImageData::new(info.width as u32, info.height as u32, 3, data)
}

/// Reads only the header, returning `(width, height, 3)`.
pub fn probe(bytes: &[u8]) -> IoResult<(u32, u32, u32)> {
    let mut decoder = jpeg_decoder::Decoder::new(Cursor::new(bytes));
    decoder
        .read_info()
        .map_err(|e| IoError::DecodeError(e.to_string()))?;
    let info = decoder
        .info()
        .ok_or_else(|| IoError::DecodeError("missing JPEG info".into()))?;
    Ok((info.width as u32, info.height as u32, 3))
}

/// Encodes an image as baseline JPEG at `quality` (clamped to 1-100).
pub fn encode(image: &ImageData, quality: u8) -> IoResult<Vec<u8>> {
    use jpeg_encoder::{ColorType, Encoder};

    if image.width > MAX_DIMENSION || image.height > MAX_DIMENSION {
        return Err(IoError::EncodeError(format!(
            "{}x{} exceeds JPEG limit of {MAX_DIMENSION}",
            image.width, image.height
        )));
    }
    let rgb = image.to_rgb8();

    let mut buffer = Vec::new();
    let encoder = Encoder::new(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode(&rgb, image.width as u16, image.height as u16, ColorType::Rgb)
        .map_err(|e: jpeg_encoder::EncodingError| IoError::EncodeError(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, channels: u32, px: &[u8]) -> ImageData {
        let data = px.iter().copied().cycle().take((w * h * channels) as usize).collect();
        ImageData::new(w, h, channels, data).unwrap()
    }

    #[test]
    fn roundtrip_flat_color() {
        let img = flat(32, 16, 3, &[200, 100, 50]);
        let back = decode(&encode(&img, 95).unwrap()).unwrap();
        assert_eq!((back.width, back.height, back.channels), (32, 16, 3));
        for px in back.data.chunks_exact(3) {
            assert!((px[0] as i32 - 200).abs() <= 3);
            assert!((px[1] as i32 - 100).abs() <= 3);
            assert!((px[2] as i32 - 50).abs() <= 3);
        }
    }

    #[test]
    fn rgba_is_flattened() {
        let img = flat(8, 8, 4, &[10, 20, 30, 128]);
        let back = decode(&encode(&img, 90).unwrap()).unwrap();
        assert_eq!(back.channels, 3);
    }

    #[test]
    fn quality_affects_size() {
        let data = (0..64 * 64 * 3).map(|i| ((i * 31) % 251) as u8).collect();
        let img = ImageData::new(64, 64, 3, data).unwrap();
        let low = encode(&img, 10).unwrap();
        let high = encode(&img, 100).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn probe_reads_header() {
        let bytes = encode(&flat(24, 10, 4, &[1, 2, 3, 4]), 80).unwrap();
        assert_eq!(probe(&bytes).unwrap(), (24, 10, 3));
    }

    #[test]
    fn garbage_fails() {
        assert!(decode(&[0xFF, 0xD8, 0xFF, 0x00, 0x01]).is_err());
        assert!(probe(&[0xFF, 0xD8, 0xFF, 0x00, 0x01]).is_err());
    }
}
