//! LUT error types.

use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur during LUT operations.
#[derive(Debug, Error)]
pub enum LutError {
    /// Bad size declaration, row-count mismatch or unreadable row.
    #[error("malformed LUT: {0}")]
    MalformedLutFormat(String),

    /// Named preset is not present in the registry.
    #[error("LUT not found: {0}")]
    LutNotFound(String),

    /// Zero-byte LUT upload.
    #[error("empty LUT input")]
    EmptyInput,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LutError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedLutFormat(msg.into())
    }
}
