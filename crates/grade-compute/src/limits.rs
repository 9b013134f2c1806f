//! Device resource limits.
//!
//! Limits feed two decisions: the batch budget (`total_memory x fraction`)
//! and how many image rows a single GPU dispatch may bind.

use crate::memory;

/// Defaults when no device could be queried.
const DEFAULT_DEVICE_MEMORY: u64 = 2 * 1024 * 1024 * 1024; // 2 GB
const DEFAULT_MAX_BUFFER_BYTES: u64 = 128 * 1024 * 1024; // wgpu default binding size

/// Memory limits of an execution device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Largest single buffer a dispatch may bind, in bytes.
    pub max_buffer_bytes: u64,
    /// Total device memory in bytes (detected, overridden or estimated).
    pub total_memory: u64,
    /// Whether values came from a real device.
    pub detected: bool,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            total_memory: DEFAULT_DEVICE_MEMORY,
            detected: false,
        }
    }
}

impl DeviceLimits {
    /// Limits of a device with exactly `total_bytes` of memory.
    ///
    /// Used for CPU-only hosts and in tests to pin the batch budget.
    pub fn with_memory(total_bytes: u64) -> Self {
        Self {
            max_buffer_bytes: u64::MAX,
            total_memory: total_bytes,
            detected: true,
        }
    }

    /// Limits of the host, honoring `GRADE_GPU_MEMORY_MB`.
    pub fn host() -> Self {
        Self::with_memory(memory::gpu_memory_override().unwrap_or_else(memory::system_memory))
    }

    /// Creates limits from wgpu adapter limits.
    #[cfg(feature = "gpu")]
    pub fn from_wgpu(limits: &wgpu::Limits, info: &wgpu::AdapterInfo) -> Self {
        let max_buffer = limits
            .max_buffer_size
            .min(limits.max_storage_buffer_binding_size as u64);
        let total = memory::gpu_memory_override()
            .unwrap_or_else(|| estimate_vram(info.device_type, limits.max_buffer_size));
        Self {
            max_buffer_bytes: max_buffer,
            total_memory: total,
            detected: true,
        }
    }

    /// Bytes a batch may occupy at the given fraction of total memory.
    ///
    /// Never returns zero so that budget arithmetic stays well-defined.
    pub fn budget(&self, fraction: f64) -> u64 {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        ((self.total_memory as f64 * fraction) as u64).max(1)
    }
}

/// Rough device memory from adapter class and buffer limit.
#[cfg(feature = "gpu")]
fn estimate_vram(device_type: wgpu::DeviceType, max_buffer_bytes: u64) -> u64 {
    let from_buffer = max_buffer_bytes.saturating_mul(2);
    match device_type {
        wgpu::DeviceType::DiscreteGpu => from_buffer.clamp(2u64 << 30, 24u64 << 30),
        wgpu::DeviceType::IntegratedGpu => from_buffer.clamp(512u64 << 20, 4u64 << 30),
        wgpu::DeviceType::VirtualGpu => from_buffer.clamp(1u64 << 30, 8u64 << 30),
        _ => from_buffer.clamp(256u64 << 20, 2u64 << 30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_fraction_of_total() {
        let limits = DeviceLimits::with_memory(1000);
        assert_eq!(limits.budget(0.5), 500);
        assert_eq!(limits.budget(2.0), 1000);
    }

    #[test]
    fn budget_never_zero() {
        let limits = DeviceLimits::with_memory(10);
        assert_eq!(limits.budget(0.0), 1);
        assert_eq!(limits.budget(f64::NAN), 1);
    }

    #[test]
    fn default_is_not_detected() {
        assert!(!DeviceLimits::default().detected);
    }
}
