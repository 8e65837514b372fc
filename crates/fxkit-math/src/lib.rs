//! # fxkit-math
//!
//! Numeric primitives shared by the compositing kernels:
//!
//! - scalar helpers ([`lerp`], [`clamp`], [`remap`], [`fract`], [`wrap_index`])
//! - colour-space conversions ([`YPbPrStandard`], [`rgb_to_hsv`], [`hsv_to_rgb`])
//! - the luminance selector ([`LuminanceMath`])
//! - premultiplication, masking and mix ([`unpremultiply`], [`premultiply_mask_mix`])
//!
//! # Dependencies
//!
//! - [`glam`] - vector math
//! - `fxkit-core` - sample types and component layouts
//!
//! # Used By
//!
//! - `fxkit-transfer` - curve helpers
//! - `fxkit-distort` - coordinate helpers
//! - `fxkit-ops` - every kernel
//!
//! # Feature Flags
//!
//! - `serde` - derive `Serialize`/`Deserialize` on the selector enums

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod colorspace;
mod interp;
mod premult;

pub use colorspace::*;
pub use interp::*;
pub use premult::*;

/// Re-export of the glam types used in public signatures.
pub mod glam {
    pub use ::glam::{DMat2, DVec2, Vec3};
}
