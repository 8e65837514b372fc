//! # fxkit-distort
//!
//! Lens distortion models and their application to image tiles.
//!
//! Every model implements [`Distortion`]: one direction analytically, the
//! other through the bounded [`newton_inverse`] solver.
//!
//! | Model | Analytic direction | Normalisation |
//! |-------|--------------------|---------------|
//! | [`NukeRadial`] | undistort | half the larger dimension |
//! | [`PfBarrel`] | distort | half the diagonal, pixel corners |
//! | [`TdeModel`] (five polynomials) | undistort | filmback diagonal |
//! | [`PanoTools`] | distort | half the smaller dimension |
//!
//! [`warp()`] maps a tile through a model, producing either a resampled
//! image or an STMap.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_distort::{Distortion, Format, NukeRadial, NukeRadialParams};
//! use glam::DVec2;
//!
//! let params = NukeRadialParams { k1: -0.04, k2: 0.005, ..Default::default() };
//! let lens = NukeRadial::new(Format::new(1920.0, 1080.0), params)?;
//!
//! let p = DVec2::new(1800.0, 950.0);
//! let roundtrip = lens.undistort(lens.distort(p));
//! assert!((roundtrip - p).length() < 1e-2);
//! # Ok::<(), fxkit_distort::DistortError>(())
//! ```
//!
//! # Dependencies
//!
//! - [`glam`] - `DVec2` / `DMat2` for points and the Jacobian solve
//! - [`rayon`] - row-parallel warp (feature `parallel`, on by default)
//! - [`tracing`] - render logging
//!
//! # Feature Flags
//!
//! - `parallel` - render warp rows with rayon
//! - `serde` - derive `Serialize`/`Deserialize` on parameter structs

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod format;
mod model;
pub mod nuke;
pub mod panotools;
pub mod pfbarrel;
pub mod solver;
pub mod tde4;
pub mod warp;

pub use error::{DistortError, DistortResult};
pub use format::Format;
pub use model::{Direction, Distortion};
pub use nuke::{NukeRadial, NukeRadialParams};
pub use panotools::{PanoTools, PanoToolsParams};
pub use pfbarrel::{PfBarrel, PfBarrelParams};
pub use solver::newton_inverse;
pub use tde4::{
    DnModel, TdeAnamorphic4Rotated, TdeAnamorphic6, TdeClassic, TdeFisheye8, TdeLens, TdeModel,
    TdeRadialDecentered,
};
pub use warp::{warp, WarpOutput, WarpParams};
