//! Backend detection.

use crate::Engine;

/// Information about a compute backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Engine that selects this backend.
    pub engine: Engine,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether backend is available.
    pub available: bool,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
    /// Description.
    pub description: String,
}

/// Detect all backends compiled into this build.
pub fn detect_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = vec![BackendInfo {
        engine: Engine::Cpu,
        name: "CPU",
        available: true,
        priority: 10,
        description: "CPU with rayon parallelization (nearest-neighbor)".to_string(),
    }];

    #[cfg(feature = "gpu")]
    {
        let adapter = super::DeviceContext::probe();
        let available = adapter.is_some();
        backends.push(BackendInfo {
            engine: Engine::Gpu,
            name: "GPU",
            available,
            priority: if available { 100 } else { 0 },
            description: match adapter {
                Some(name) => format!("wgpu trilinear on {name}"),
                None => "wgpu trilinear (no adapter found)".to_string(),
            },
        });
    }

    backends.sort_by(|a, b| b.priority.cmp(&a.priority));
    backends
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description));
    }
    desc
}
