//! GPU-to-CPU fallback decorator.

use std::sync::Arc;

use grade_lut::LutVolume;
use tracing::warn;

use super::{CpuSampler, Sampler};
use crate::{ComputeImage, ComputeResult, DeviceLimits};

/// Tries `primary`, retrying on the CPU when it reports a recoverable error.
///
/// Recoverable means resource exhaustion, a failed dispatch or a lost
/// adapter. Any other error is returned as-is.
pub struct FallbackSampler {
    primary: Arc<dyn Sampler>,
    fallback: Arc<CpuSampler>,
}

impl FallbackSampler {
    /// Wraps `primary` with `fallback`.
    pub fn new(primary: Arc<dyn Sampler>, fallback: Arc<CpuSampler>) -> Self {
        Self { primary, fallback }
    }

    /// The wrapped sampler's name.
    pub fn primary_name(&self) -> &'static str {
        self.primary.name()
    }
}

impl Sampler for FallbackSampler {
    fn apply(&self, image: &mut ComputeImage, volume: &LutVolume, intensity: f32) -> ComputeResult<()> {
        match self.primary.apply(image, volume, intensity) {
            Ok(()) => Ok(()),
            Err(e) if e.is_recoverable() => {
                warn!(
                    backend = self.primary.name(),
                    error = %e,
                    width = image.width,
                    height = image.height,
                    "sampler failed, falling back to CPU"
                );
                self.primary.release();
                self.fallback.apply(image, volume, intensity)
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }

    fn limits(&self) -> &DeviceLimits {
        self.primary.limits()
    }

    fn release(&self) {
        self.primary.release();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::ComputeError;

    struct Failing {
        error: fn() -> ComputeError,
        calls: AtomicUsize,
        limits: DeviceLimits,
    }

    impl Failing {
        fn new(error: fn() -> ComputeError) -> Self {
            Self {
                error,
                calls: AtomicUsize::new(0),
                limits: DeviceLimits::with_memory(64),
            }
        }
    }

    impl Sampler for Failing {
        fn apply(&self, _: &mut ComputeImage, _: &LutVolume, _: f32) -> ComputeResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.error)())
        }
        fn name(&self) -> &'static str {
            "failing"
        }
        fn limits(&self) -> &DeviceLimits {
            &self.limits
        }
    }

    fn invert() -> LutVolume {
        LutVolume::from_fn(2, |[r, g, b]| [1.0 - r, 1.0 - g, 1.0 - b]).unwrap()
    }

    #[test]
    fn resource_exhaustion_falls_back() {
        let primary = Arc::new(Failing::new(|| ComputeError::ResourceExhausted("oom".into())));
        let sampler = FallbackSampler::new(primary.clone(), Arc::new(CpuSampler::new()));

        let mut img = ComputeImage::from_f32(vec![0.0, 0.0, 1.0], 1, 1, 3).unwrap();
        sampler.apply(&mut img, &invert(), 1.0).unwrap();
        assert_eq!(img.data(), &[1.0, 1.0, 0.0]);
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(sampler.limits().total_memory, 64);
    }

    #[test]
    fn non_recoverable_error_propagates() {
        let primary = Arc::new(Failing::new(|| ComputeError::BufferSizeMismatch { expected: 3, actual: 2 }));
        let sampler = FallbackSampler::new(primary, Arc::new(CpuSampler::new()));
        let mut img = ComputeImage::from_f32(vec![0.0; 3], 1, 1, 3).unwrap();
        assert!(sampler.apply(&mut img, &invert(), 1.0).is_err());
    }
}
