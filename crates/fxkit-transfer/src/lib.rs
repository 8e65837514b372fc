//! # fxkit-transfer
//!
//! Transfer functions and lookup tables.
//!
//! | Module | Curve |
//! |--------|-------|
//! | [`srgb`] | IEC 61966-2-1 |
//! | [`rec709`] | BT.709 camera curve |
//! | [`gamma`] | pure power (2.2, 1.8, any) |
//! | [`cineon`] | Cineon printing density, parameterised by black / white / gamma |
//!
//! [`LutManager`] tabulates these curves once per process for kernels that
//! linearise or re-encode many pixels.
//!
//! # Dependencies
//!
//! - `fxkit-math` - interpolation
//! - [`tracing`] - table build logging
//!
//! # Used By
//!
//! - `fxkit-ops` - ChromaKeyer linear input (Log2Lin evaluates [`CineonCurve`] directly)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cineon;
pub mod gamma;
pub mod lut;
pub mod rec709;
pub mod srgb;

pub use cineon::CineonCurve;
pub use lut::{Lut, LutManager, TransferCurve, DECODE_TABLE_SIZE, ENCODE_TABLE_SIZE};
