//! Transfer-function lookup tables and the process-wide [`LutManager`].
//!
//! A [`Lut`] caches one [`TransferCurve`] in both directions:
//!
//! - decode (encoded → linear): a 65536-entry table over [0, 1], exact at
//!   every 16-bit code and linearly interpolated between codes
//! - encode (linear → encoded): a 4096-entry table over [0, 1] with linear
//!   interpolation
//!
//! Values outside [0, 1] are evaluated directly in both directions.
//!
//! # Lifecycle
//!
//! Tables are built at most once per process, on first use, behind a
//! [`OnceLock`]. Call [`LutManager::init_all`] before concurrent renders
//! begin to move the build cost out of the render path; afterwards the
//! manager is read-only. Tables live until process exit.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_transfer::{LutManager, TransferCurve};
//!
//! let lut = LutManager::global().get(TransferCurve::Srgb);
//! let lin = lut.to_linear(0.5);
//! assert!((lut.from_linear(lin) - 0.5).abs() < 1e-3);
//! ```

use std::sync::OnceLock;

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cineon::CineonCurve, gamma, rec709, srgb};

/// Number of entries in the encode table.
pub const ENCODE_TABLE_SIZE: usize = 4096;

/// Number of entries in the decode table, one per 16-bit code.
pub const DECODE_TABLE_SIZE: usize = 65536;

/// A transfer curve the manager can tabulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransferCurve {
    /// Identity
    #[default]
    Linear,
    /// IEC 61966-2-1
    Srgb,
    /// BT.709 camera curve
    Rec709,
    /// Pure 2.2 power
    Gamma22,
    /// Pure 1.8 power
    Gamma18,
    /// Cineon with the standard 95 / 685 / 0.6 parameters
    Cineon,
}

impl TransferCurve {
    /// Every curve, in manager slot order.
    pub const ALL: [TransferCurve; 6] = [
        Self::Linear,
        Self::Srgb,
        Self::Rec709,
        Self::Gamma22,
        Self::Gamma18,
        Self::Cineon,
    ];

    /// Encoded to linear, evaluated directly.
    pub fn to_linear(self, v: f32) -> f32 {
        match self {
            Self::Linear => v,
            Self::Srgb => srgb::eotf(v),
            Self::Rec709 => rec709::eotf(v),
            Self::Gamma22 => gamma::eotf(v, 2.2),
            Self::Gamma18 => gamma::eotf(v, 1.8),
            Self::Cineon => CineonCurve::default().to_linear(v),
        }
    }

    /// Linear to encoded, evaluated directly.
    pub fn from_linear(self, l: f32) -> f32 {
        match self {
            Self::Linear => l,
            Self::Srgb => srgb::oetf(l),
            Self::Rec709 => rec709::oetf(l),
            Self::Gamma22 => gamma::oetf(l, 2.2),
            Self::Gamma18 => gamma::oetf(l, 1.8),
            Self::Cineon => CineonCurve::default().from_linear(l),
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Cached tables for one transfer curve.
#[derive(Debug, Clone)]
pub struct Lut {
    curve: TransferCurve,
    decode: Vec<f32>,
    encode: Vec<f32>,
}

impl Lut {
    /// Tabulates `curve`.
    pub fn build(curve: TransferCurve) -> Self {
        let last = (DECODE_TABLE_SIZE - 1) as f32;
        let decode = (0..DECODE_TABLE_SIZE)
            .map(|i| curve.to_linear(i as f32 / last))
            .collect();
        let last = (ENCODE_TABLE_SIZE - 1) as f32;
        let encode = (0..ENCODE_TABLE_SIZE)
            .map(|i| curve.from_linear(i as f32 / last))
            .collect();
        Self {
            curve,
            decode,
            encode,
        }
    }

    /// Curve this table caches.
    #[inline]
    pub fn curve(&self) -> TransferCurve {
        self.curve
    }

    /// Linear value of a 16-bit code.
    #[inline]
    pub fn to_linear_u16(&self, v: u16) -> f32 {
        self.decode[v as usize]
    }

    /// Linear value of a normalised float code.
    ///
    /// Inside [0, 1] the decode table is interpolated; outside it the curve
    /// is evaluated directly.
    #[inline]
    pub fn to_linear(&self, v: f32) -> f32 {
        if !(0.0..=1.0).contains(&v) {
            return self.curve.to_linear(v);
        }
        let pos = v * (DECODE_TABLE_SIZE - 1) as f32;
        let i = (pos as usize).min(DECODE_TABLE_SIZE - 2);
        let t = pos - i as f32;
        fxkit_math::lerp(self.decode[i], self.decode[i + 1], t)
    }

    /// Encoded value of a linear float.
    ///
    /// Inside [0, 1] the table is interpolated; outside it the curve is
    /// evaluated directly.
    #[inline]
    pub fn from_linear(&self, l: f32) -> f32 {
        if !(0.0..=1.0).contains(&l) {
            return self.curve.from_linear(l);
        }
        let pos = l * (ENCODE_TABLE_SIZE - 1) as f32;
        let i = (pos as usize).min(ENCODE_TABLE_SIZE - 2);
        let t = pos - i as f32;
        fxkit_math::lerp(self.encode[i], self.encode[i + 1], t)
    }

    /// RGB triplet to linear.
    #[inline]
    pub fn to_linear_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        rgb.map(|v| self.to_linear(v))
    }

    /// Linear RGB triplet to encoded.
    #[inline]
    pub fn from_linear_rgb(&self, rgb: [f32; 3]) -> [f32; 3] {
        rgb.map(|v| self.from_linear(v))
    }
}

/// Process-wide cache of transfer tables, one lazily built slot per curve.
#[derive(Debug, Default)]
pub struct LutManager {
    slots: [OnceLock<Lut>; 6],
}

impl LutManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide instance.
    pub fn global() -> &'static LutManager {
        static MANAGER: OnceLock<LutManager> = OnceLock::new();
        MANAGER.get_or_init(LutManager::new)
    }

    /// Table for `curve`, building it on first request.
    ///
    /// Concurrent first requests block until a single build finishes.
    pub fn get(&self, curve: TransferCurve) -> &Lut {
        self.slots[curve.slot()].get_or_init(|| {
            debug!(?curve, "building transfer lookup table");
            Lut::build(curve)
        })
    }

    /// Whether the table for `curve` has been built.
    pub fn is_built(&self, curve: TransferCurve) -> bool {
        self.slots[curve.slot()].get().is_some()
    }

    /// Builds every table.
    pub fn init_all(&self) {
        for curve in TransferCurve::ALL {
            self.get(curve);
        }
    }
}
