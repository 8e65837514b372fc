//! # fxkit-ops
//!
//! Per-pixel compositing kernels and the tile dispatcher that runs them.
//!
//! A kernel implements [`PixelKernel`]: it sees one unpremultiplied,
//! normalised RGBA pixel at a time. [`render_kernel`] walks a window of the
//! destination at any bit depth and layout, handles premultiplication,
//! mix, masking and per-channel enables, and polls a cancellation signal
//! once per row.
//!
//! # Modules
//!
//! - [`basic`] - invert, clamp, saturation
//! - [`grade`] - black / white points, lift, gain, gamma
//! - [`color_correct`] - shadow / midtone / highlight correction
//! - [`hsv_tool`] - HSV range keying and adjustment
//! - [`channel_math`] - per-channel expressions
//! - [`log2lin`] - Cineon log / linear
//! - [`quantize`] - posterise with ordered or random dithering
//! - [`chroma_keyer`], [`ink_keyer`] - keyers
//! - [`shuffle`] - channel routing across bit depths
//! - [`time_blur`] - accumulation motion blur
//!
//! # Example
//!
//! ```rust
//! use fxkit_core::{BitDepth, Components, Image, NeverAbort, Rect};
//! use fxkit_ops::{render_kernel, Grade, GradeParams, MaskMix, RenderArgs};
//!
//! let bounds = Rect::new(0, 0, 8, 8);
//! let src = Image::filled(bounds, Components::Rgba, BitDepth::U16, [0.5, 0.5, 0.5, 1.0]);
//! let mut dst = Image::new(bounds, Components::Rgba, BitDepth::U16);
//!
//! let grade = Grade::new(GradeParams { gamma: [2.2, 2.2, 2.2, 1.0], ..Default::default() })?;
//! let args = RenderArgs::new(bounds, dst.view_mut())
//!     .with_source(src.view())
//!     .with_mask_mix(MaskMix { premult: true, ..Default::default() });
//! render_kernel(args, &grade, &NeverAbort)?;
//! # Ok::<(), fxkit_ops::OpsError>(())
//! ```
//!
//! # Dependencies
//!
//! - `fxkit-core` - images, samples, cancellation
//! - `fxkit-math` - premultiplication, colour spaces
//! - `fxkit-transfer` - Cineon curve, Rec.709 tables
//! - [`rayon`] - row-parallel rendering (feature `parallel`)
//! - [`tracing`] - render logging
//!
//! # Feature Flags
//!
//! - `parallel` (default) - [`render_kernel_parallel`]
//! - `serde` - `Serialize`/`Deserialize` on every parameter type

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod dispatch;
mod error;

pub mod basic;
pub mod channel_math;
pub mod chroma_keyer;
pub mod color_correct;
pub mod grade;
pub mod hsv_tool;
pub mod ink_keyer;
pub mod log2lin;
pub mod quantize;
pub mod shuffle;
pub mod time_blur;

pub use dispatch::{render_kernel, ChannelMask, PixelKernel, RenderArgs};
#[cfg(feature = "parallel")]
pub use dispatch::render_kernel_parallel;
pub use error::{OpsError, OpsResult};

pub use basic::{Clamp, ClampParams, Invert, Saturation, SaturationParams};
pub use channel_math::{ChannelMath, ChannelMathParams};
pub use chroma_keyer::{ChromaKeyer, ChromaKeyerParams, KeyerOutput, KeyerSourceAlpha};
pub use color_correct::{ColorControls, ColorCorrect, ColorCorrectParams, Rgbm, ToneCurve};
pub use grade::{Grade, GradeParams};
pub use hsv_tool::{HsvAlphaOutput, HsvTool, HsvToolParams};
pub use ink_keyer::{InkKeyer, InkOutput, InkParams, InkSourceAlpha};
pub use log2lin::{Log2Lin, Log2LinDirection, Log2LinParams};
pub use quantize::{DitherMode, Quantize, QuantizeParams};
pub use shuffle::{render_shuffle, ShuffleArgs, ShuffleParams, ShuffleSelector};
pub use time_blur::{render_time_blur, ShutterOffset, TimeBlurAccumulator, TimeBlurParams};

pub use fxkit_core::RenderStatus;
pub use fxkit_math::MaskMix;
