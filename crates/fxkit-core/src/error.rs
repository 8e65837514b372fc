//! Error types for fxkit-core operations.
//!
//! Render calls fail only for genuine format or contract violations:
//! mismatched bit depths, unsupported component layouts, a missing output
//! image, or inconsistent render scale / field between participating images.
//! Degenerate pixel data never produces an error; kernels guard their
//! divisions inline and substitute documented constants instead.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::{BitDepth, Error, Result};
//!
//! fn check_depth(src: BitDepth, dst: BitDepth) -> Result<()> {
//!     if src != dst {
//!         return Err(Error::depth_mismatch(dst, src));
//!     }
//!     Ok(())
//! }
//!
//! let err = check_depth(BitDepth::U8, BitDepth::F32).unwrap_err();
//! assert!(err.is_unsupported_format());
//! ```
//!
//! # Dependencies
//!
//! - [`thiserror`] - derive for [`std::error::Error`] and [`std::fmt::Display`]

use thiserror::Error;

use crate::{BitDepth, Components, Field, Rect};

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a render call.
///
/// # Categories
///
/// - **Format errors** (reported to the host as "unsupported format"):
///   [`UnsupportedBitDepth`](Error::UnsupportedBitDepth),
///   [`UnsupportedComponents`](Error::UnsupportedComponents),
///   [`BitDepthMismatch`](Error::BitDepthMismatch),
///   [`ComponentsMismatch`](Error::ComponentsMismatch)
/// - **Contract errors** (generic failure):
///   [`MissingOutput`](Error::MissingOutput),
///   [`RenderScaleMismatch`](Error::RenderScaleMismatch),
///   [`FieldMismatch`](Error::FieldMismatch),
///   [`InvalidRegion`](Error::InvalidRegion),
///   [`InvalidDimensions`](Error::InvalidDimensions)
#[derive(Debug, Error)]
pub enum Error {
    /// The operation has no implementation for this bit depth.
    #[error("unsupported bit depth: {0}")]
    UnsupportedBitDepth(BitDepth),

    /// The operation has no implementation for this component layout.
    #[error("unsupported pixel components: {0}")]
    UnsupportedComponents(Components),

    /// Two images that must share a bit depth do not.
    #[error("bit depth mismatch: expected {expected}, got {got}")]
    BitDepthMismatch {
        /// Depth of the reference (usually destination) image
        expected: BitDepth,
        /// Depth of the offending image
        got: BitDepth,
    },

    /// Two images that must share a component layout do not.
    #[error("components mismatch: expected {expected}, got {got}")]
    ComponentsMismatch {
        /// Layout of the reference image
        expected: Components,
        /// Layout of the offending image
        got: Components,
    },

    /// The mandatory output image was not supplied.
    #[error("missing output image")]
    MissingOutput,

    /// Participating images were produced at different render scales.
    #[error("render scale mismatch: expected {expected:?}, got {got:?}")]
    RenderScaleMismatch {
        /// Render scale of the destination
        expected: (f64, f64),
        /// Render scale of the offending image
        got: (f64, f64),
    },

    /// Participating images carry different field orders.
    #[error("field mismatch: expected {expected:?}, got {got:?}")]
    FieldMismatch {
        /// Field of the destination
        expected: Field,
        /// Field of the offending image
        got: Field,
    },

    /// A render window is empty or reaches outside the destination.
    #[error("render window {window} is not inside image bounds {bounds}")]
    InvalidRegion {
        /// Requested window
        window: Rect,
        /// Bounds of the destination image
        bounds: Rect,
    },

    /// Buffer size does not match the declared geometry.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Declared width
        width: i32,
        /// Declared height
        height: i32,
        /// Why the geometry was rejected
        reason: String,
    },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates an [`Error::BitDepthMismatch`] error.
    #[inline]
    pub fn depth_mismatch(expected: BitDepth, got: BitDepth) -> Self {
        Self::BitDepthMismatch { expected, got }
    }

    /// Creates an [`Error::ComponentsMismatch`] error.
    #[inline]
    pub fn components_mismatch(expected: Components, got: Components) -> Self {
        Self::ComponentsMismatch { expected, got }
    }

    /// Creates an [`Error::InvalidRegion`] error.
    #[inline]
    pub fn invalid_region(window: Rect, bounds: Rect) -> Self {
        Self::InvalidRegion { window, bounds }
    }

    /// Creates an [`Error::InvalidDimensions`] error.
    #[inline]
    pub fn invalid_dimensions(width: i32, height: i32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::Other`] error.
    #[inline]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` for errors the host should report as "unsupported format"
    /// rather than as a generic failure.
    #[inline]
    pub fn is_unsupported_format(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedBitDepth(_)
                | Self::UnsupportedComponents(_)
                | Self::BitDepthMismatch { .. }
                | Self::ComponentsMismatch { .. }
        )
    }
}
