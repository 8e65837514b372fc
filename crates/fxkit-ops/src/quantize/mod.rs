//! Posterisation with optional dithering.
//!
//! Each slot is rounded to one of `colors` levels spread evenly over
//! `[0, 1]`. Without dithering the rounding is asymmetric around zero:
//!
//! ```text
//! v <= 0:  level = floor(v * colors)
//! v >  0:  level = ceil(v * colors - 1)
//! out     = level / (colors - 1)
//! ```
//!
//! Ordered modes scale `v` to `colors - 1` steps and round up when the
//! fractional part, scaled by the matrix's cell count, exceeds the cell's
//! rank. Random mode compares the fraction against a hash of
//! `(seed, x, y, channel)`, so the same frame always dithers the same way.
//!
//! Levels are not clamped: super-white input lands past the top level.

pub mod matrix;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult, PixelKernel};
use matrix::DitherMatrix;

/// Thomas Wang's 32-bit integer hash.
#[inline]
pub fn wang_hash(mut a: u32) -> u32 {
    a = (a ^ 61) ^ (a >> 16);
    a = a.wrapping_add(a << 3);
    a ^= a >> 4;
    a = a.wrapping_mul(0x27d4_eb2d);
    a ^= a >> 15;
    a
}

/// Threshold source used to choose between the two nearest levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DitherMode {
    /// Plain rounding
    #[default]
    None,
    /// 2×2 Bayer matrix
    Bayer2,
    /// 4×4 Bayer matrix
    Bayer4,
    /// 8×8 Bayer matrix
    Bayer8,
    /// 14×14 void-and-cluster matrix
    VoidCluster14,
    /// 25×25 void-and-cluster matrix
    VoidCluster25,
    /// Hashed per-pixel threshold
    Random,
}

impl DitherMode {
    /// Threshold matrix of an ordered mode.
    pub fn matrix(self) -> Option<&'static DitherMatrix> {
        match self {
            Self::Bayer2 => Some(matrix::bayer2()),
            Self::Bayer4 => Some(matrix::bayer4()),
            Self::Bayer8 => Some(matrix::bayer8()),
            Self::VoidCluster14 => Some(matrix::void_cluster14()),
            Self::VoidCluster25 => Some(matrix::void_cluster25()),
            Self::None | Self::Random => None,
        }
    }
}

/// Settings of [`Quantize`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QuantizeParams {
    /// Number of levels, at least 2
    pub colors: f32,
    /// Dithering
    pub dither: DitherMode,
    /// User seed for [`DitherMode::Random`]
    pub seed: u32,
    /// Keep the seed fixed over time
    pub static_seed: bool,
}

impl Default for QuantizeParams {
    fn default() -> Self {
        Self {
            colors: 16.0,
            dither: DitherMode::None,
            seed: 2000,
            static_seed: false,
        }
    }
}

impl QuantizeParams {
    /// Rejects fewer than two levels.
    pub fn validate(&self) -> OpsResult<()> {
        if !self.colors.is_finite() || self.colors < 2.0 {
            return Err(OpsError::invalid(format!("quantize needs at least 2 colors, got {}", self.colors)));
        }
        Ok(())
    }

    /// True when the output changes from frame to frame on a still input.
    pub fn is_frame_varying(&self) -> bool {
        self.dither == DitherMode::Random && !self.static_seed
    }

    /// Seed used at `time`.
    pub fn seed_at(&self, time: f64) -> u32 {
        if self.static_seed {
            self.seed
        } else {
            wang_hash(self.seed ^ wang_hash((time as f32).to_bits()))
        }
    }
}

/// The quantize kernel, resolved for one frame.
#[derive(Debug, Clone)]
pub struct Quantize {
    colors: f32,
    steps: f32,
    dither: DitherMode,
    matrix: Option<&'static DitherMatrix>,
    seed: u32,
}

impl Quantize {
    /// Resolves `params` for the frame at `time`.
    pub fn new(params: QuantizeParams, time: f64) -> OpsResult<Self> {
        params.validate()?;
        Ok(Self {
            colors: params.colors,
            steps: params.colors - 1.0,
            dither: params.dither,
            matrix: params.dither.matrix(),
            seed: params.seed_at(time),
        })
    }

    /// Threshold in `[0, 1)` for random dithering.
    #[inline]
    fn random_threshold(&self, x: i32, y: i32, c: usize) -> f32 {
        let h = wang_hash(self.seed ^ wang_hash(x as u32 ^ wang_hash(y as u32 ^ wang_hash(c as u32))));
        (h >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Quantizes value `v` of slot `c` at pixel `(x, y)`.
    #[inline]
    pub fn apply(&self, x: i32, y: i32, c: usize, v: f32) -> f32 {
        let level = match (self.dither, self.matrix) {
            (_, Some(m)) => {
                let q = v * self.steps;
                let base = q.floor();
                let cells = m.cells() as f32;
                let up = (q - base) * cells > m.rank(x, y) as f32;
                base + up as u8 as f32
            }
            (DitherMode::Random, None) => {
                let q = v * self.steps;
                let base = q.floor();
                let up = q - base > self.random_threshold(x, y, c);
                base + up as u8 as f32
            }
            _ => {
                if v <= 0.0 {
                    (v * self.colors).floor()
                } else {
                    (v * self.colors - 1.0).ceil()
                }
            }
        };
        level / self.steps
    }
}

impl PixelKernel for Quantize {
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
        for (c, v) in pix.iter_mut().enumerate() {
            *v = self.apply(x, y, c, *v);
        }
    }
}
