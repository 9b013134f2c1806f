//! CPU sampler using rayon for parallelization.

use grade_lut::LutVolume;
use rayon::prelude::*;
use tracing::trace;

use super::{Interpolation, Sampler, clamp_intensity};
use crate::{ComputeImage, ComputeResult, DeviceLimits};

/// Rayon-parallel LUT sampler.
#[derive(Debug, Clone)]
pub struct CpuSampler {
    interpolation: Interpolation,
    limits: DeviceLimits,
}

impl CpuSampler {
    /// Nearest-neighbor sampler.
    pub fn new() -> Self {
        Self::with_interpolation(Interpolation::Nearest)
    }

    /// Trilinear sampler, matching the GPU path.
    pub fn trilinear() -> Self {
        Self::with_interpolation(Interpolation::Trilinear)
    }

    /// Sampler with explicit interpolation.
    pub fn with_interpolation(interpolation: Interpolation) -> Self {
        Self {
            interpolation,
            limits: DeviceLimits::host(),
        }
    }

    /// Overrides the limits reported for batch planning.
    pub fn with_limits(mut self, limits: DeviceLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Active interpolation.
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }
}

impl Default for CpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for CpuSampler {
    fn apply(&self, image: &mut ComputeImage, volume: &LutVolume, intensity: f32) -> ComputeResult<()> {
        let c = image.channels as usize;
        let strength = clamp_intensity(intensity);
        let interpolation = self.interpolation;
        trace!(
            width = image.width,
            height = image.height,
            lut_size = volume.size(),
            ?interpolation,
            "cpu sample"
        );

        image.data.par_chunks_mut(c).for_each(|px| {
            let rgb = [px[0], px[1], px[2]];
            let sampled = match interpolation {
                Interpolation::Nearest => volume.sample_nearest(rgb),
                Interpolation::Trilinear => volume.sample_trilinear(rgb),
            };
            for ch in 0..3 {
                let orig = if rgb[ch].is_nan() { 0.0 } else { rgb[ch] };
                px[ch] = (orig + (sampled[ch] - orig) * strength).clamp(0.0, 1.0);
            }
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn limits(&self) -> &DeviceLimits {
        &self.limits
    }
}
