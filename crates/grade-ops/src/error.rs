//! Error types for transform synthesis.

use thiserror::Error;

/// Error type for transform synthesis.
#[derive(Error, Debug)]
pub enum OpsError {
    /// A histogram has no variance to match against.
    ///
    /// Absorbed by the transfer builder, which substitutes the identity
    /// mapping for the affected channel.
    #[error("degenerate distribution: {0}")]
    DegenerateDistribution(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// LUT construction failed.
    #[error(transparent)]
    Lut(#[from] grade_lut::LutError),

    /// Image buffer construction failed.
    #[error(transparent)]
    Image(#[from] grade_io::IoError),
}

/// Result type for transform synthesis.
pub type OpsResult<T> = Result<T, OpsError>;
