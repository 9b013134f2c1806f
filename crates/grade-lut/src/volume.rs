//! 3-dimensional lookup table volume.
//!
//! A [`LutVolume`] maps RGB input to RGB output through a cube of color
//! values. Grid values are held in `[0, 1]`; the input domain is mapped onto
//! the grid index space through `domain_min`/`domain_max`.

use crate::{LutError, LutResult};

/// Grid sizes accepted by procedural synthesis.
pub const SUPPORTED_SIZES: [usize; 3] = [17, 33, 65];

/// Largest grid size accepted from any source.
pub const MAX_SIZE: usize = 256;

/// A color axis of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Red input channel.
    Red,
    /// Green input channel.
    Green,
    /// Blue input channel.
    Blue,
}

/// Storage order of the grid, fastest-varying axis first.
///
/// Flat index of node `(r, g, b)` is `r + g*N + b*N²`. `.cube` rows are read
/// and written in exactly this order and the WGSL sampler indexes the uploaded
/// buffer with the same formula.
pub const AXIS_ORDER: [Axis; 3] = [Axis::Red, Axis::Green, Axis::Blue];

/// A cubic RGB lookup grid.
///
/// # Structure
///
/// - `size^3` entries, each an RGB output triple clamped into `[0, 1]`
/// - Red varies fastest, then green, then blue (see [`AXIS_ORDER`])
/// - Nearest or trilinear lookup
///
/// # Example
///
/// ```rust
/// use grade_lut::LutVolume;
///
/// let lut = LutVolume::identity(33).unwrap();
/// let out = lut.sample_trilinear([0.5, 0.3, 0.2]);
/// assert!((out[0] - 0.5).abs() < 1e-5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LutVolume {
    data: Vec<[f32; 3]>,
    size: usize,
    /// Input domain minimum (per channel).
    pub domain_min: [f32; 3],
    /// Input domain maximum (per channel).
    pub domain_max: [f32; 3],
}

impl LutVolume {
    /// Creates an identity (pass-through) volume.
    pub fn identity(size: usize) -> LutResult<Self> {
        Self::from_fn(size, |rgb| rgb)
    }

    /// Creates a volume from raw data in [`AXIS_ORDER`].
    ///
    /// Values are clamped into `[0, 1]`.
    pub fn from_data(mut data: Vec<[f32; 3]>, size: usize) -> LutResult<Self> {
        let expected = grid_entries(size)?;
        if data.len() != expected {
            return Err(LutError::malformed(format!(
                "expected {} entries for size {}, got {}",
                expected, size, data.len()
            )));
        }
        for rgb in &mut data {
            for v in rgb.iter_mut() {
                // NaN rows collapse to 0 rather than poisoning interpolation
                *v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
            }
        }
        Ok(Self {
            data,
            size,
            domain_min: [0.0, 0.0, 0.0],
            domain_max: [1.0, 1.0, 1.0],
        })
    }

    /// Creates a volume by evaluating `f` at every normalized node coordinate.
    pub fn from_fn<F>(size: usize, f: F) -> LutResult<Self>
    where
        F: Fn([f32; 3]) -> [f32; 3],
    {
        let total = grid_entries(size)?;
        let data = (0..total).map(|i| f(node_coord(size, i))).collect();
        Self::from_data(data, size)
    }

    /// Sets the input domain.
    ///
    /// Every channel must satisfy `min < max`.
    pub fn with_domain(mut self, min: [f32; 3], max: [f32; 3]) -> LutResult<Self> {
        for c in 0..3 {
            if !(max[c] > min[c]) {
                return Err(LutError::malformed(format!(
                    "domain channel {} is empty: [{}, {}]",
                    c, min[c], max[c]
                )));
            }
        }
        self.domain_min = min;
        self.domain_max = max;
        Ok(self)
    }

    /// Grid size `N`.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Grid entries in [`AXIS_ORDER`].
    #[inline]
    pub fn data(&self) -> &[[f32; 3]] {
        &self.data
    }

    /// Returns the total number of entries (`N³`).
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    /// Whether the domain is the default unit cube.
    pub fn has_unit_domain(&self) -> bool {
        self.domain_min == [0.0, 0.0, 0.0] && self.domain_max == [1.0, 1.0, 1.0]
    }

    /// Returns the flat index for grid position `(r, g, b)`.
    #[inline]
    pub fn index(&self, r: usize, g: usize, b: usize) -> usize {
        (b * self.size + g) * self.size + r
    }

    /// Gets the value at grid position `(r, g, b)`.
    #[inline]
    pub fn get(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        self.data[self.index(r, g, b)]
    }

    /// Normalized input coordinate of the node stored at `index`.
    #[inline]
    pub fn node_coord(&self, index: usize) -> [f32; 3] {
        node_coord(self.size, index)
    }

    /// Grid data flattened to `[r, g, b, r, g, b, ...]` for upload.
    pub fn to_flat(&self) -> Vec<f32> {
        self.data.iter().flat_map(|rgb| rgb.iter().copied()).collect()
    }

    /// Normalizes input RGB into `[0, 1]` based on the domain.
    ///
    /// Values outside the domain clamp to the nearest edge.
    #[inline]
    pub fn normalize(&self, rgb: [f32; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let v = (rgb[c] - self.domain_min[c]) / (self.domain_max[c] - self.domain_min[c]);
            out[c] = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        }
        out
    }

    /// Nearest-node lookup: `round(value * (N-1))`, clamped to `[0, N-1]`.
    #[inline]
    pub fn sample_nearest(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [r, g, b] = self.normalize(rgb);
        let n = (self.size - 1) as f32;
        let last = self.size - 1;
        let ri = ((r * n).round() as usize).min(last);
        let gi = ((g * n).round() as usize).min(last);
        let bi = ((b * n).round() as usize).min(last);
        self.get(ri, gi, bi)
    }

    /// Trilinear interpolation across the 8 surrounding nodes.
    pub fn sample_trilinear(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [r, g, b] = self.normalize(rgb);
        let n = (self.size - 1) as f32;

        let ri = ((r * n).floor() as usize).min(self.size - 2);
        let gi = ((g * n).floor() as usize).min(self.size - 2);
        let bi = ((b * n).floor() as usize).min(self.size - 2);

        let rf = r * n - ri as f32;
        let gf = g * n - gi as f32;
        let bf = b * n - bi as f32;

        let c000 = self.get(ri, gi, bi);
        let c100 = self.get(ri + 1, gi, bi);
        let c010 = self.get(ri, gi + 1, bi);
        let c110 = self.get(ri + 1, gi + 1, bi);
        let c001 = self.get(ri, gi, bi + 1);
        let c101 = self.get(ri + 1, gi, bi + 1);
        let c011 = self.get(ri, gi + 1, bi + 1);
        let c111 = self.get(ri + 1, gi + 1, bi + 1);

        let mut result = [0.0f32; 3];
        for i in 0..3 {
            let c00 = c000[i] + rf * (c100[i] - c000[i]);
            let c10 = c010[i] + rf * (c110[i] - c010[i]);
            let c01 = c001[i] + rf * (c101[i] - c001[i]);
            let c11 = c011[i] + rf * (c111[i] - c011[i]);

            let c0 = c00 + gf * (c10 - c00);
            let c1 = c01 + gf * (c11 - c01);

            result[i] = c0 + bf * (c1 - c0);
        }
        result
    }
}

/// Number of entries (`N³`) in a grid of `size`.
///
/// Sizes outside `2..=MAX_SIZE` are rejected before multiplying.
pub fn grid_entries(size: usize) -> LutResult<usize> {
    if size < 2 {
        return Err(LutError::malformed(format!("grid size must be at least 2, got {size}")));
    }
    if size > MAX_SIZE {
        return Err(LutError::malformed(format!(
            "grid size {size} exceeds the maximum of {MAX_SIZE}"
        )));
    }
    size.checked_mul(size)
        .and_then(|s| s.checked_mul(size))
        .ok_or_else(|| LutError::malformed(format!("grid size {size} overflows")))
}

/// Normalized coordinate of flat `index` in a grid of `size`, in [`AXIS_ORDER`].
#[inline]
pub fn node_coord(size: usize, index: usize) -> [f32; 3] {
    let n = (size - 1) as f32;
    let r = index % size;
    let g = (index / size) % size;
    let b = index / (size * size);
    [r as f32 / n, g as f32 / n, b as f32 / n]
}
