//! Normalized image tensor.

use crate::{ComputeError, ComputeResult};

/// Interleaved `[0, 1]` float image handed to samplers.
#[derive(Clone, PartialEq)]
pub struct ComputeImage {
    pub(crate) data: Vec<f32>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of channels (3 or 4).
    pub channels: u32,
}

impl ComputeImage {
    /// Create from f32 data.
    pub fn from_f32(data: Vec<f32>, width: u32, height: u32, channels: u32) -> ComputeResult<Self> {
        if channels != 3 && channels != 4 {
            return Err(ComputeError::OperationFailed(format!(
                "expected 3 or 4 channels, got {channels}"
            )));
        }
        let expected = (width as usize) * (height as usize) * (channels as usize);
        if data.len() != expected {
            return Err(ComputeError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height, channels })
    }

    /// Create an image filled with zeros.
    pub fn new(width: u32, height: u32, channels: u32) -> Self {
        let size = (width as usize) * (height as usize) * (channels as usize);
        Self {
            data: vec![0.0; size],
            width,
            height,
            channels,
        }
    }

    /// Get pixel data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Get mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the image, returning its samples.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Image dimensions.
    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width, self.height, self.channels)
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.data.len() * 4
    }

    /// Clamps every sample into `[0, 1]`, mapping NaN to 0.
    pub fn clamp_unit(&mut self) {
        for v in &mut self.data {
            *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
    }

    /// Copies this image into the top-left corner of `dst` rows starting at `row_offset`.
    ///
    /// Missing channels are filled with opaque alpha, extra columns and rows
    /// of `dst` are left untouched.
    pub(crate) fn blit_into(&self, dst: &mut ComputeImage, row_offset: u32) {
        let (sc, dc) = (self.channels as usize, dst.channels as usize);
        for y in 0..self.height as usize {
            let dst_row = (row_offset as usize + y) * dst.width as usize;
            for x in 0..self.width as usize {
                let s = (y * self.width as usize + x) * sc;
                let d = (dst_row + x) * dc;
                dst.data[d..d + 3].copy_from_slice(&self.data[s..s + 3]);
                if dc == 4 {
                    dst.data[d + 3] = if sc == 4 { self.data[s + 3] } else { 1.0 };
                }
            }
        }
    }

    /// Crops a `width x height` region starting at row `row_offset`, converting
    /// to `channels`.
    pub(crate) fn crop_rows(&self, row_offset: u32, width: u32, height: u32, channels: u32) -> Self {
        let (sc, dc) = (self.channels as usize, channels as usize);
        let mut data = Vec::with_capacity((width as usize) * (height as usize) * dc);
        for y in 0..height as usize {
            let src_row = (row_offset as usize + y) * self.width as usize;
            for x in 0..width as usize {
                let s = (src_row + x) * sc;
                data.extend_from_slice(&self.data[s..s + dc.min(sc)]);
                if dc == 4 && sc == 3 {
                    data.push(1.0);
                }
            }
        }
        Self { data, width, height, channels }
    }
}

impl std::fmt::Debug for ComputeImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("channels", &self.channels)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}
