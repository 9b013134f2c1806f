//! LUT samplers.
//!
//! A [`Sampler`] applies a [`LutVolume`] to a [`ComputeImage`] in place,
//! blending the sampled color with the original by `intensity`:
//!
//! ```text
//! out = original + (sampled - original) * intensity
//! ```
//!
//! Output is clamped into `[0, 1]`; alpha (channel 4) passes through.
//!
//! Two quality tiers exist. [`CpuSampler`] defaults to nearest-node lookup
//! (`round(v * (N-1))`) and is visibly quantized on small grids; the GPU
//! sampler always interpolates trilinearly. `CpuSampler::trilinear()` gives
//! CPU output that matches the GPU path within float tolerance.

mod cpu;
mod detect;
mod fallback;
#[cfg(feature = "gpu")]
mod gpu;

use std::sync::Arc;

use grade_lut::LutVolume;
#[allow(unused_imports)]
use tracing::{debug, info, warn};

pub use cpu::CpuSampler;
pub use detect::{BackendInfo, describe_backends, detect_backends};
pub use fallback::FallbackSampler;
#[cfg(feature = "gpu")]
pub use gpu::{DeviceContext, GpuSampler};

use crate::{ComputeError, ComputeImage, ComputeResult, DeviceLimits, Engine};

/// Grid lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Nearest grid node.
    #[default]
    Nearest,
    /// Interpolate across the 8 surrounding nodes.
    Trilinear,
}

/// Applies a LUT volume to normalized images.
pub trait Sampler: Send + Sync {
    /// Samples `volume` for every pixel of `image`, blending by `intensity`.
    ///
    /// On error the image is left unmodified.
    fn apply(&self, image: &mut ComputeImage, volume: &LutVolume, intensity: f32) -> ComputeResult<()>;

    /// Backend name.
    fn name(&self) -> &'static str;

    /// Device limits used for batch planning.
    fn limits(&self) -> &DeviceLimits;

    /// Releases cached device memory. Called between batch chunks.
    fn release(&self) {}
}

/// Clamps an intensity into `[0, 1]`, mapping NaN to full strength.
#[inline]
pub(crate) fn clamp_intensity(intensity: f32) -> f32 {
    if intensity.is_nan() { 1.0 } else { intensity.clamp(0.0, 1.0) }
}

/// Resolves an [`Engine`] request to a sampler.
///
/// Holds the CPU sampler and, when a device was found, the GPU sampler
/// already wrapped in a CPU fallback.
#[derive(Clone)]
pub struct SamplerSelector {
    cpu: Arc<CpuSampler>,
    gpu: Option<Arc<dyn Sampler>>,
}

impl SamplerSelector {
    /// CPU only; `gpu` requests degrade to CPU (or fail in builds without GPU support).
    pub fn cpu_only() -> Self {
        Self {
            cpu: Arc::new(CpuSampler::new()),
            gpu: None,
        }
    }

    /// Uses `gpu` as the accelerated sampler, wrapped in a CPU fallback.
    pub fn with_gpu(gpu: Arc<dyn Sampler>) -> Self {
        let cpu = Arc::new(CpuSampler::new());
        let fallback: Arc<dyn Sampler> = Arc::new(FallbackSampler::new(gpu, cpu.clone()));
        Self { cpu, gpu: Some(fallback) }
    }

    /// Uses a caller-owned device context.
    #[cfg(feature = "gpu")]
    pub fn with_context(ctx: Arc<DeviceContext>) -> ComputeResult<Self> {
        Ok(Self::with_gpu(Arc::new(GpuSampler::new(ctx)?)))
    }

    /// Probes for a GPU; falls back to CPU-only when none is usable.
    pub fn detect() -> Self {
        if crate::memory::backend_override().is_some_and(|b| b.eq_ignore_ascii_case("cpu")) {
            debug!("GRADE_BACKEND=cpu, skipping device probe");
            return Self::cpu_only();
        }
        #[cfg(feature = "gpu")]
        {
            let selector = DeviceContext::new().and_then(|ctx| {
                info!(adapter = ctx.device_name(), "GPU sampler available");
                Self::with_context(Arc::new(ctx))
            });
            match selector {
                Ok(selector) => return selector,
                Err(e) => debug!(error = %e, "no usable GPU device, using CPU"),
            }
        }
        Self::cpu_only()
    }

    /// Whether an accelerated sampler is present.
    pub fn has_gpu(&self) -> bool {
        self.gpu.is_some()
    }

    /// The CPU sampler.
    pub fn cpu(&self) -> Arc<dyn Sampler> {
        self.cpu.clone()
    }

    /// Picks the sampler for `engine`.
    ///
    /// `Auto` prefers the GPU. An explicit `Gpu` request without a device
    /// degrades to CPU with a warning, unless this build has no GPU support
    /// at all, which is [`ComputeError::UnsupportedEngine`].
    pub fn select(&self, engine: Engine) -> ComputeResult<Arc<dyn Sampler>> {
        match (engine, &self.gpu) {
            (Engine::Cpu, _) => Ok(self.cpu.clone()),
            (Engine::Auto | Engine::Gpu, Some(gpu)) => Ok(gpu.clone()),
            (Engine::Auto, None) => Ok(self.cpu.clone()),
            (Engine::Gpu, None) if cfg!(feature = "gpu") => {
                warn!("GPU requested but no device is available, using CPU");
                Ok(self.cpu.clone())
            }
            (Engine::Gpu, None) => Err(ComputeError::UnsupportedEngine(
                "gpu (built without GPU support)".into(),
            )),
        }
    }
}

impl std::fmt::Debug for SamplerSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamplerSelector")
            .field("gpu", &self.gpu.as_ref().map(|g| g.name()))
            .finish()
    }
}
