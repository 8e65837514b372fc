//! # fxkit-core
//!
//! Core types shared by every fxkit kernel.
//!
//! - [`BitDepth`], [`Components`], [`PremultState`], [`Field`] - runtime clip descriptors
//! - [`Sample`] - native sample types and the exact bit-depth conversion table
//! - [`Rect`] - half-open render windows and image bounds
//! - [`ImageRef`], [`ImageMut`], [`Image`] - borrowed host images and owned buffers
//! - [`AbortSignal`], [`RenderStatus`] - cooperative cancellation polled once per row
//! - [`Error`] - render-call failures ("unsupported format" vs generic)
//!
//! ## Crate Structure
//!
//! ```text
//! fxkit-core (this crate)
//!    ^
//!    |
//!    +-- fxkit-math (colour conversions, premultiply / mask / mix)
//!    +-- fxkit-transfer (transfer functions, LUT manager)
//!    +-- fxkit-distort (lens models, Newton inverse, warp)
//!    +-- fxkit-ops (tile dispatcher and kernels)
//! ```
//!
//! ## Ownership
//!
//! Images belong to the host. Views borrow them for one render call and
//! are never retained afterwards.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod abort;
pub mod error;
pub mod format;
pub mod image;
pub mod pixel;
pub mod rect;

pub use abort::*;
pub use error::*;
pub use format::*;
pub use image::*;
pub use pixel::{convert, luminance_rec709, Sample, SampleValue, REC709_LUMA_B, REC709_LUMA_G, REC709_LUMA_R};
pub use rect::*;

/// Prelude module for convenient imports.
///
/// ```
/// use fxkit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::abort::{AbortSignal, NeverAbort, RenderStatus};
    pub use crate::error::{Error, Result};
    pub use crate::format::{BitDepth, Components, Field, PremultState};
    pub use crate::image::{Image, ImageDesc, ImageMut, ImageRef, ImageView, ImageViewMut};
    pub use crate::pixel::{Sample, SampleValue};
    pub use crate::rect::Rect;
}
