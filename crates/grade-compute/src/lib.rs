//! # grade-compute
//!
//! Execution layer for color grading: applies a [`LutVolume`] to normalized
//! images on the CPU (rayon) or GPU (wgpu compute shaders, feature `gpu`),
//! batches heterogeneous images under a device memory budget and runs
//! CPU-bound work on an ordered worker pool.
//!
//! # Architecture
//!
//! ```text
//! SamplerSelector (auto | cpu | gpu)
//!     +-- CpuSampler       (rayon, nearest or trilinear)
//!     +-- FallbackSampler  (GpuSampler -> CpuSampler on failure)
//!             +-- GpuSampler (WGSL trilinear, owns Arc<DeviceContext>)
//!
//! BatchScheduler -> plan_batch -> pad / stack -> Sampler::apply -> crop
//! ```
//!
//! # Example
//!
//! ```rust
//! use grade_compute::{ComputeImage, CpuSampler, Sampler};
//! use grade_lut::LutVolume;
//!
//! let lut = LutVolume::identity(17).unwrap();
//! let mut img = ComputeImage::from_f32(vec![0.25, 0.5, 0.75], 1, 1, 3).unwrap();
//! CpuSampler::trilinear().apply(&mut img, &lut, 1.0).unwrap();
//! assert!((img.data()[1] - 0.5).abs() < 1e-5);
//! ```
//!
//! [`LutVolume`]: grade_lut::LutVolume

pub mod batch;
pub mod engine;
pub mod image;
pub mod limits;
pub mod memory;
pub mod pool;
pub mod sampler;
#[cfg(feature = "gpu")]
mod shaders;

pub use batch::{BatchPlan, BatchScheduler, plan_batch};
pub use engine::Engine;
pub use image::ComputeImage;
pub use limits::DeviceLimits;
pub use pool::WorkerPool;
pub use sampler::{
    BackendInfo, CpuSampler, FallbackSampler, Interpolation, Sampler, SamplerSelector,
    describe_backends, detect_backends,
};
#[cfg(feature = "gpu")]
pub use sampler::{DeviceContext, GpuSampler};

use thiserror::Error;

/// Compute errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Requested engine has no implementation in this build.
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),

    /// Device ran out of memory or the work exceeds a buffer limit.
    #[error("device resources exhausted: {0}")]
    ResourceExhausted(String),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    DeviceCreation(String),

    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    #[error("compute operation failed: {0}")]
    OperationFailed(String),
}

impl ComputeError {
    /// Whether a CPU retry may succeed where this error occurred.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted(_) | Self::OperationFailed(_) | Self::NoAdapter
        )
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;
