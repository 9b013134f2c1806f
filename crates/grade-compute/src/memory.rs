//! System memory detection and environment overrides.
//!
//! # Environment Variables
//!
//! - `GRADE_BACKEND` - `cpu` skips device probing
//! - `GRADE_GPU_MEMORY_MB` - Device memory in megabytes, replaces detection
//! - `GRADE_MEMORY_FRACTION` - Share of device memory a batch may use (0-1]

use std::env;
use std::sync::OnceLock;

/// Bytes per normalized sample (f32).
pub const BYTES_PER_SAMPLE: u64 = 4;

/// Default share of device memory a batch may occupy.
pub const DEFAULT_MEMORY_FRACTION: f64 = 0.5;

/// Cache for system memory detection.
static SYSTEM_MEMORY: OnceLock<u64> = OnceLock::new();

/// Detect total system RAM in bytes.
pub fn system_memory() -> u64 {
    *SYSTEM_MEMORY.get_or_init(|| {
        sys_info::mem_info()
            .map(|m| m.total * 1024) // KB to bytes
            .unwrap_or(8 * 1024 * 1024 * 1024) // 8 GB fallback
    })
}

/// Get backend override from environment.
pub fn backend_override() -> Option<String> {
    env::var("GRADE_BACKEND").ok().filter(|v| !v.trim().is_empty())
}

/// Device memory override in bytes.
pub fn gpu_memory_override() -> Option<u64> {
    env::var("GRADE_GPU_MEMORY_MB")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|&mb| mb > 0)
        .map(|mb| mb.saturating_mul(1024 * 1024))
}

/// Memory fraction override, accepted only inside `(0, 1]`.
pub fn memory_fraction_override() -> Option<f64> {
    env::var("GRADE_MEMORY_FRACTION")
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|&f| f > 0.0 && f <= 1.0)
}

/// Format bytes as human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{} KB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
