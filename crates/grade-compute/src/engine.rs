//! Engine selection.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::{ComputeError, ComputeResult};

/// Requested execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum Engine {
    /// GPU when a device is available, otherwise CPU.
    #[default]
    Auto,
    /// CPU nearest-neighbor sampling.
    Cpu,
    /// GPU trilinear sampling, falling back to CPU on failure.
    Gpu,
}

impl Engine {
    /// Parses an engine name (case-insensitive).
    ///
    /// Names of accelerators that have no implementation here (`cuda`,
    /// `metal`, ...) fail with [`ComputeError::UnsupportedEngine`].
    pub fn parse(name: &str) -> ComputeResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "auto" | "" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "gpu" | "wgpu" => Ok(Self::Gpu),
            other => Err(ComputeError::UnsupportedEngine(other.to_string())),
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl FromStr for Engine {
    type Err = ComputeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Engine {
    type Error = ComputeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!(Engine::parse("AUTO").unwrap(), Engine::Auto);
        assert_eq!(Engine::parse("cpu").unwrap(), Engine::Cpu);
        assert_eq!("gpu".parse::<Engine>().unwrap(), Engine::Gpu);
    }

    #[test]
    fn unknown_accelerator_unsupported() {
        assert!(matches!(
            Engine::parse("cuda"),
            Err(ComputeError::UnsupportedEngine(name)) if name == "cuda"
        ));
    }
}
