//! Histogram color transfer.
//!
//! A [`HistogramTransferBuilder`] holds the reference image's CDFs. For each
//! source image it builds the source CDFs at working resolution and inverts
//! them through the reference:
//!
//! ```text
//! table[i] = interp(src_cdf[i], unique(ref_cdf), levels)
//! ```
//!
//! Only the first level reaching each reference CDF value is kept, so the
//! inverse lookup runs over a strictly increasing sequence. The resulting
//! 256-entry tables are applied to the full-resolution source.

use grade_compute::{ComputeImage, WorkerPool};
use grade_io::ImageData;
use tracing::{debug, trace, warn};

use crate::histogram::{BINS, HistogramCdf};
use crate::{OpsError, OpsResult};

/// Longest side of images used to build distributions.
pub const DEFAULT_WORKING_RESOLUTION: u32 = 512;

const CHANNEL_NAMES: [&str; 3] = ["red", "green", "blue"];

/// Per-channel 8-bit mapping tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferLut {
    tables: [[u8; BINS]; 3],
}

impl TransferLut {
    /// Identity mapping on all channels.
    pub fn identity() -> Self {
        Self {
            tables: [identity_table(); 3],
        }
    }

    /// Creates a transfer from explicit tables.
    pub fn from_tables(tables: [[u8; BINS]; 3]) -> Self {
        Self { tables }
    }

    /// Matches `source` onto `reference`, channel by channel.
    ///
    /// Channels whose reference distribution is degenerate keep the
    /// identity mapping.
    pub fn from_cdfs(source: &HistogramCdf, reference: &HistogramCdf) -> Self {
        let mut tables = [identity_table(); 3];
        for (c, table) in tables.iter_mut().enumerate() {
            match match_channel(source.channel(c), reference, c) {
                Ok(t) => *table = t,
                Err(e) => warn!(channel = CHANNEL_NAMES[c], error = %e, "using identity mapping"),
            }
        }
        Self { tables }
    }

    /// Table of channel `c`.
    pub fn table(&self, c: usize) -> &[u8; BINS] {
        &self.tables[c]
    }

    /// Whether every table maps each level to itself.
    pub fn is_identity(&self) -> bool {
        self.tables.iter().all(|t| *t == identity_table())
    }

    /// Maps one RGB triple.
    #[inline]
    pub fn map(&self, rgb: [u8; 3]) -> [u8; 3] {
        [
            self.tables[0][rgb[0] as usize],
            self.tables[1][rgb[1] as usize],
            self.tables[2][rgb[2] as usize],
        ]
    }

    /// Applies the tables to an 8-bit image; alpha passes through.
    pub fn apply(&self, image: &ImageData) -> ImageData {
        let mut out = image.clone();
        for px in out.data.chunks_exact_mut(image.channels as usize) {
            let [r, g, b] = self.map([px[0], px[1], px[2]]);
            px[0] = r;
            px[1] = g;
            px[2] = b;
        }
        out
    }

    /// Applies the tables to a normalized image, quantizing each sample to
    /// its nearest 8-bit level first, then blends with the original by
    /// `intensity`.
    pub fn apply_normalized(&self, image: &mut ComputeImage, intensity: f32) {
        let t = if intensity.is_nan() { 1.0 } else { intensity.clamp(0.0, 1.0) };
        let c = image.channels as usize;
        for px in image.data_mut().chunks_exact_mut(c) {
            for ch in 0..3 {
                let v = if px[ch].is_nan() { 0.0 } else { px[ch].clamp(0.0, 1.0) };
                let mapped = self.tables[ch][(v * 255.0).round() as usize] as f32 / 255.0;
                px[ch] = if t >= 1.0 { mapped } else { v + (mapped - v) * t };
            }
        }
    }
}

impl Default for TransferLut {
    fn default() -> Self {
        Self::identity()
    }
}

fn identity_table() -> [u8; BINS] {
    std::array::from_fn(|i| i as u8)
}

/// Inverts `src` through channel `c` of `reference`.
fn match_channel(src: &[f64; BINS], reference: &HistogramCdf, c: usize) -> OpsResult<[u8; BINS]> {
    if reference.is_degenerate(c) {
        return Err(OpsError::DegenerateDistribution(format!(
            "reference {} channel has a single level",
            CHANNEL_NAMES[c]
        )));
    }

    let ref_cdf = reference.channel(c);
    let mut xs: Vec<f64> = Vec::with_capacity(BINS);
    let mut ys: Vec<f64> = Vec::with_capacity(BINS);
    for (level, &v) in ref_cdf.iter().enumerate() {
        if xs.last().is_none_or(|&last| v > last) {
            xs.push(v);
            ys.push(level as f64);
        }
    }
    if xs.len() < 2 {
        return Err(OpsError::DegenerateDistribution(format!(
            "reference {} channel has fewer than 2 distinct CDF values",
            CHANNEL_NAMES[c]
        )));
    }

    Ok(std::array::from_fn(|i| {
        interp(src[i], &xs, &ys).round().clamp(0.0, 255.0) as u8
    }))
}

/// Linear interpolation over increasing `xs`, clamped to the end values.
fn interp(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    let hi = xs.partition_point(|&v| v <= x);
    let lo = hi - 1;
    if xs[lo] == x {
        return ys[lo];
    }
    let t = (x - xs[lo]) / (xs[hi] - xs[lo]);
    ys[lo] + t * (ys[hi] - ys[lo])
}

/// Matches source images to one reference image.
#[derive(Debug, Clone)]
pub struct HistogramTransferBuilder {
    reference: HistogramCdf,
    working_resolution: u32,
}

impl HistogramTransferBuilder {
    /// Builds reference CDFs at `working_resolution` (longest side).
    pub fn new(reference: &ImageData, working_resolution: u32) -> Self {
        let small = reference.downscale(working_resolution);
        trace!(
            width = small.width,
            height = small.height,
            "reference distribution built"
        );
        Self {
            reference: HistogramCdf::from_image(&small),
            working_resolution,
        }
    }

    /// Builder at the default working resolution.
    pub fn with_reference(reference: &ImageData) -> Self {
        Self::new(reference, DEFAULT_WORKING_RESOLUTION)
    }

    /// Reference distributions.
    pub fn reference(&self) -> &HistogramCdf {
        &self.reference
    }

    /// Transfer tables for `source`.
    pub fn build(&self, source: &ImageData) -> TransferLut {
        let small = source.downscale(self.working_resolution);
        let cdf = HistogramCdf::from_image(&small);
        TransferLut::from_cdfs(&cdf, &self.reference)
    }

    /// Matches `source` to the reference at full resolution.
    pub fn apply_to(&self, source: &ImageData) -> ImageData {
        self.build(source).apply(source)
    }

    /// Matches every source, one image per task, preserving input order.
    pub fn apply_batch(&self, sources: Vec<ImageData>, pool: &WorkerPool) -> Vec<ImageData> {
        let count = sources.len();
        let out = pool.map_ordered(sources, |src| self.apply_to(&src));
        debug!(images = count, threads = pool.threads(), "histogram batch matched");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32, f: impl Fn(u32, u32) -> [u8; 3]) -> ImageData {
        let mut bytes = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                bytes.extend_from_slice(&f(x, y));
            }
        }
        ImageData::new(w, h, 3, bytes).unwrap()
    }

    #[test]
    fn self_match_is_unchanged() {
        let img = gradient(64, 48, |x, y| [(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8]);
        let builder = HistogramTransferBuilder::with_reference(&img);
        let lut = builder.build(&img);
        assert_eq!(builder.apply_to(&img), img);

        // every occupied level maps to itself
        for px in img.data.chunks_exact(3) {
            assert_eq!(lut.map([px[0], px[1], px[2]]), [px[0], px[1], px[2]]);
        }
    }

    #[test]
    fn full_ramp_self_match_is_identity_table() {
        let img = gradient(256, 1, |x, _| [x as u8, x as u8, 255 - x as u8]);
        let lut = HistogramTransferBuilder::with_reference(&img).build(&img);
        assert!(lut.is_identity());
    }

    #[test]
    fn dark_source_brightened_toward_bright_reference() {
        let reference = gradient(32, 32, |x, y| {
            let v = 128 + ((x + y) * 2) as u8;
            [v, v, v]
        });
        let source = gradient(32, 32, |x, y| {
            let v = ((x + y) * 2) as u8;
            [v, v, v]
        });
        let out = HistogramTransferBuilder::with_reference(&reference).apply_to(&source);
        let mean = |img: &ImageData| img.data.iter().map(|&v| v as f64).sum::<f64>() / img.data.len() as f64;
        assert!(mean(&out) > mean(&source) + 100.0);
    }

    #[test]
    fn flat_reference_keeps_identity() {
        let reference = gradient(8, 8, |_, _| [40, 40, 40]);
        let source = gradient(8, 8, |x, y| [(x * 30) as u8, (y * 30) as u8, 7]);
        let lut = HistogramTransferBuilder::with_reference(&reference).build(&source);
        assert!(lut.is_identity());
    }

    #[test]
    fn alpha_untouched() {
        let lut = TransferLut::from_tables([[255; BINS], identity_table(), [0; BINS]]);
        let img = ImageData::new(1, 1, 4, vec![3, 4, 5, 77]).unwrap();
        assert_eq!(lut.apply(&img).data, vec![255, 4, 0, 77]);
    }

    #[test]
    fn normalized_application_quantizes() {
        let mut tables = [identity_table(); 3];
        tables[0][128] = 0;
        let lut = TransferLut::from_tables(tables);
        let mut img = ComputeImage::from_f32(vec![0.5, 0.5, 0.5, 0.3], 1, 1, 4).unwrap();
        lut.apply_normalized(&mut img, 1.0);
        assert_eq!(img.data()[0], 0.0);
        assert_eq!(img.data()[1], 128.0 / 255.0);
        assert_eq!(img.data()[3], 0.3);
    }

    #[test]
    fn normalized_application_blends() {
        let lut = TransferLut::from_tables([[255; BINS], identity_table(), identity_table()]);
        let mut img = ComputeImage::from_f32(vec![0.2, 0.0, 1.0], 1, 1, 3).unwrap();
        lut.apply_normalized(&mut img, 0.5);
        assert!((img.data()[0] - 0.6).abs() < 1e-6);

        let mut img = ComputeImage::from_f32(vec![0.2, 0.0, 1.0], 1, 1, 3).unwrap();
        lut.apply_normalized(&mut img, 0.0);
        assert_eq!(img.data(), &[0.2, 0.0, 1.0]);
    }

    #[test]
    fn batch_order_matches_input() {
        let reference = gradient(16, 16, |x, y| [(x * 16) as u8, (y * 16) as u8, 128]);
        let builder = HistogramTransferBuilder::with_reference(&reference);
        let sources: Vec<ImageData> = (1..=6)
            .map(|k| gradient(k * 3, 5, move |x, _| [(x * 10) as u8, 50, 60]))
            .collect();
        let widths: Vec<u32> = sources.iter().map(|s| s.width).collect();

        let seq = builder.apply_batch(sources.clone(), &WorkerPool::sequential());
        let par = builder.apply_batch(sources, &WorkerPool::with_threads(3).unwrap());
        assert_eq!(seq, par);
        assert_eq!(seq.iter().map(|s| s.width).collect::<Vec<_>>(), widths);
    }

    #[test]
    fn interp_clamps_and_hits_nodes() {
        let xs = [0.25, 0.5, 1.0];
        let ys = [10.0, 20.0, 30.0];
        assert_eq!(interp(0.0, &xs, &ys), 10.0);
        assert_eq!(interp(0.5, &xs, &ys), 20.0);
        assert_eq!(interp(0.75, &xs, &ys), 25.0);
        assert_eq!(interp(2.0, &xs, &ys), 30.0);
    }
}
