//! Error types for kernel construction and rendering.

use thiserror::Error;

/// Error type for kernel construction and rendering.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Format or contract violation reported by the image layer.
    #[error(transparent)]
    Core(#[from] fxkit_core::Error),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A channel expression failed to compile.
    #[error("expression error in {channel}: {message}")]
    Expression {
        /// Name of the expression (`r`, `expr1`, ...)
        channel: String,
        /// What went wrong
        message: String,
    },

    /// A source frame could not be obtained.
    #[error("cannot fetch source at time {time}: {reason}")]
    SourceFetch {
        /// Requested frame time
        time: f64,
        /// Host-supplied reason
        reason: String,
    },
}

impl OpsError {
    /// Builds an [`OpsError::InvalidParameter`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Builds an [`OpsError::SourceFetch`].
    pub fn source_fetch(time: f64, reason: impl Into<String>) -> Self {
        Self::SourceFetch { time, reason: reason.into() }
    }

    /// True for bit-depth / component errors the host reports as
    /// "unsupported format" rather than a generic failure.
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_unsupported_format())
    }
}

/// Result type for kernel construction and rendering.
pub type OpsResult<T> = Result<T, OpsError>;
