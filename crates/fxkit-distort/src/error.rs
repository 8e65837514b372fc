//! Error types for distortion models.

use thiserror::Error;

/// Errors raised when building a model or warping an image.
///
/// Mapping points never fails: the Newton inverse returns its best estimate.
#[derive(Error, Debug)]
pub enum DistortError {
    /// A model parameter the math cannot accept.
    #[error("invalid lens parameter: {0}")]
    InvalidParameter(String),

    /// Image boundary violation while warping.
    #[error(transparent)]
    Core(#[from] fxkit_core::Error),
}

impl DistortError {
    /// Creates an [`DistortError::InvalidParameter`] error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}

/// Result type for distortion operations.
pub type DistortResult<T> = Result<T, DistortError>;
