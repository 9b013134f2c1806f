//! 8-bit image buffer.

use crate::{IoError, IoResult};

/// Decoded 8-bit image with 3 (RGB) or 4 (RGBA) interleaved channels.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channel count (3 or 4).
    pub channels: u32,
    /// Row-major interleaved samples.
    pub data: Vec<u8>,
}

impl ImageData {
    /// Creates an image, validating the buffer length.
    pub fn new(width: u32, height: u32, channels: u32, data: Vec<u8>) -> IoResult<Self> {
        if channels != 3 && channels != 4 {
            return Err(IoError::UnsupportedFormat(format!("{channels} channels")));
        }
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(IoError::DimensionMismatch { expected, actual: data.len() });
        }
        Ok(Self { width, height, channels, data })
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Whether the image carries an alpha channel.
    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.channels == 4
    }

    /// Converts samples to normalized `[0, 1]` floats.
    pub fn to_f32(&self) -> Vec<f32> {
        self.data.iter().map(|&v| v as f32 / 255.0).collect()
    }

    /// Builds an image from normalized floats, clamping and rounding to 8 bits.
    pub fn from_f32(width: u32, height: u32, channels: u32, data: &[f32]) -> IoResult<Self> {
        let bytes = data.iter().map(|&v| quantize(v)).collect();
        Self::new(width, height, channels, bytes)
    }

    /// Drops alpha, returning interleaved RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        if self.channels == 3 {
            return self.data.clone();
        }
        self.data
            .chunks_exact(self.channels as usize)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    }

    /// Nearest-neighbor downscale so the longer side is at most `max_side`.
    ///
    /// Aspect ratio is preserved and no new sample values are introduced,
    /// so the per-channel distribution is only subsampled. Images already
    /// within the bound are returned unchanged.
    pub fn downscale(&self, max_side: u32) -> Self {
        let longer = self.width.max(self.height);
        if max_side == 0 || longer <= max_side {
            return self.clone();
        }
        let scale = max_side as f64 / longer as f64;
        let w = ((self.width as f64 * scale).round() as u32).clamp(1, max_side);
        let h = ((self.height as f64 * scale).round() as u32).clamp(1, max_side);
        let c = self.channels as usize;

        let mut data = Vec::with_capacity((w as usize) * (h as usize) * c);
        for y in 0..h {
            let sy = ((y as u64 * self.height as u64) / h as u64) as usize;
            for x in 0..w {
                let sx = ((x as u64 * self.width as u64) / w as u64) as usize;
                let i = (sy * self.width as usize + sx) * c;
                data.extend_from_slice(&self.data[i..i + c]);
            }
        }
        Self { width: w, height: h, channels: self.channels, data }
    }
}

/// Clamps to `[0, 1]` and rounds to the nearest 8-bit level.
#[inline]
pub(crate) fn quantize(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("bytes", &self.data.len())
            .finish()
    }
}
