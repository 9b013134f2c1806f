//! Per-channel cumulative distributions.

use grade_io::ImageData;

/// Intensity levels per channel.
pub const BINS: usize = 256;

/// Per-channel CDFs of an 8-bit image.
///
/// Each channel is nondecreasing and ends at exactly 1.0. A channel with
/// no pixels or a single occupied level has no variance to invert; it holds
/// the identity ramp `i / 255` and is flagged [`degenerate`](Self::is_degenerate).
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramCdf {
    channels: [[f64; BINS]; 3],
    degenerate: [bool; 3],
}

impl HistogramCdf {
    /// Builds CDFs from the RGB channels of `image`; alpha is ignored.
    pub fn from_image(image: &ImageData) -> Self {
        let mut counts = [[0u64; BINS]; 3];
        for px in image.data.chunks_exact(image.channels as usize) {
            for c in 0..3 {
                counts[c][px[c] as usize] += 1;
            }
        }
        Self::from_counts(&counts)
    }

    /// Builds CDFs from raw per-channel histograms.
    pub fn from_counts(counts: &[[u64; BINS]; 3]) -> Self {
        let mut channels = [[0.0f64; BINS]; 3];
        let mut degenerate = [false; 3];

        for c in 0..3 {
            let hist = &counts[c];
            let total: u64 = hist.iter().sum();
            let occupied = hist.iter().filter(|&&n| n > 0).count();

            if total == 0 || occupied < 2 {
                degenerate[c] = true;
                channels[c] = identity_ramp();
                continue;
            }

            let mut running = 0u64;
            for (i, &n) in hist.iter().enumerate() {
                running += n;
                channels[c][i] = running as f64 / total as f64;
            }
            channels[c][BINS - 1] = 1.0;
        }

        Self { channels, degenerate }
    }

    /// CDF of channel `c` (0 = R, 1 = G, 2 = B).
    pub fn channel(&self, c: usize) -> &[f64; BINS] {
        &self.channels[c]
    }

    /// Whether channel `c` fell back to the identity ramp.
    pub fn is_degenerate(&self, c: usize) -> bool {
        self.degenerate[c]
    }
}

fn identity_ramp() -> [f64; BINS] {
    std::array::from_fn(|i| i as f64 / (BINS - 1) as f64)
}
