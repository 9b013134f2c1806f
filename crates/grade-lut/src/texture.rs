//! 2D tile texture export.
//!
//! Flattens an `N x N x N` volume into a single `N`-row, `N²`-column image
//! for shader-side sampling:
//!
//! ```text
//!  x = r*N + b          (red selects the column band, blue the column in it)
//!  y = g                (green selects the row)
//!
//!  | r = 0 band | r = 1 band | ... | r = N-1 band |
//!  |  N columns |  N columns |     |  N columns   |
//! ```
//!
//! A client recovers the 3D index from texel `(x, y)` as
//! `(x / N, y, x % N)`.

use crate::LutVolume;

/// A flattened LUT texture with normalized RGB texels.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    /// Width in texels (`N²`).
    pub width: u32,
    /// Height in texels (`N`).
    pub height: u32,
    /// Row-major interleaved RGB data.
    pub data: Vec<f32>,
}

impl Texture {
    /// Quantizes texels to interleaved 8-bit RGB.
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
            .collect()
    }

    /// Reads the texel at `(x, y)`.
    pub fn texel(&self, x: u32, y: u32) -> [f32; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Rebuilds the volume the way a shader would address it.
    pub fn to_volume(&self) -> crate::LutResult<LutVolume> {
        let n = self.height as usize;
        let mut data = vec![[0.0f32; 3]; n * n * n];
        for y in 0..self.height {
            for x in 0..self.width {
                let (r, g, b) = ((x as usize) / n, y as usize, (x as usize) % n);
                data[(b * n + g) * n + r] = self.texel(x, y);
            }
        }
        LutVolume::from_data(data, n)
    }
}

/// Flattens `lut` into an `N x N²` tile texture.
pub fn export_texture(lut: &LutVolume) -> Texture {
    let n = lut.size();
    let width = n * n;
    let mut data = vec![0.0f32; width * n * 3];
    for r in 0..n {
        for g in 0..n {
            for b in 0..n {
                let x = r * n + b;
                let i = (g * width + x) * 3;
                data[i..i + 3].copy_from_slice(&lut.get(r, g, b));
            }
        }
    }
    Texture {
        width: width as u32,
        height: n as u32,
        data,
    }
}
