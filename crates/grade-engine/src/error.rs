//! Engine error type.

use grade_compute::ComputeError;
use grade_io::IoError;
use grade_lut::LutError;
use grade_ops::OpsError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Lut(#[from] LutError),

    #[error(transparent)]
    Image(#[from] IoError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error(transparent)]
    Ops(#[from] OpsError),

    /// Caller already consumed their free use.
    #[error("caller is not entitled: {0}")]
    NotEntitled(String),

    /// Object store read or write failed.
    #[error("object store: {0}")]
    Store(String),

    /// Invalid configuration value.
    #[error("config: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Stable category name for error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lut(LutError::MalformedLutFormat(_)) => "MalformedLutFormat",
            Self::Lut(LutError::LutNotFound(_)) => "LutNotFound",
            Self::Lut(LutError::EmptyInput) | Self::Image(IoError::EmptyInput) => "EmptyInput",
            Self::Lut(LutError::Io(_)) | Self::Io(_) => "IoError",
            Self::Image(IoError::UnsupportedFormat(_)) => "UnsupportedFormat",
            Self::Image(_) => "InvalidImage",
            Self::Compute(ComputeError::UnsupportedEngine(_)) => "UnsupportedEngine",
            Self::Compute(ComputeError::ResourceExhausted(_)) => "ResourceExhausted",
            Self::Compute(_) => "ComputeFailed",
            Self::Ops(OpsError::DegenerateDistribution(_)) => "DegenerateDistribution",
            Self::Ops(OpsError::Lut(LutError::MalformedLutFormat(_))) => "MalformedLutFormat",
            Self::Ops(_) => "InvalidParameter",
            Self::NotEntitled(_) => "NotEntitled",
            Self::Store(_) => "StoreError",
            Self::Config(_) | Self::Yaml(_) => "ConfigError",
        }
    }

    /// Whether the caller sent something unusable, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Store(_) | Self::Io(_) | Self::Lut(LutError::Io(_)) | Self::Compute(_)
        ) || matches!(self, Self::Compute(ComputeError::UnsupportedEngine(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_names() {
        assert_eq!(EngineError::from(LutError::LutNotFound("x".into())).kind(), "LutNotFound");
        assert_eq!(EngineError::from(IoError::EmptyInput).kind(), "EmptyInput");
        assert_eq!(
            EngineError::from(ComputeError::UnsupportedEngine("cuda".into())).kind(),
            "UnsupportedEngine"
        );
        assert_eq!(EngineError::NotEntitled("bob".into()).kind(), "NotEntitled");
    }

    #[test]
    fn client_vs_server() {
        assert!(EngineError::from(LutError::MalformedLutFormat("rows".into())).is_client_error());
        assert!(EngineError::from(ComputeError::UnsupportedEngine("cuda".into())).is_client_error());
        assert!(!EngineError::Store("disk full".into()).is_client_error());
        assert!(!EngineError::from(ComputeError::NoAdapter).is_client_error());
    }
}
