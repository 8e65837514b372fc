//! Two-coefficient barrel model.
//!
//! Radius 1.0 is half the frame diagonal. Positions are taken at pixel
//! corners: before mapping, a point is shifted by half a pixel at the
//! current render scale, and shifted back afterwards.
//!
//! ```text
//! d = u (1 + c3 r² + c5 r⁴)
//! ```
//!
//! `distort` is analytic; `undistort` uses the Newton inverse.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{newton_inverse, DistortError, DistortResult, Distortion, Format};

/// Coefficients of [`PfBarrel`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PfBarrelParams {
    /// Second-order coefficient
    pub c3: f64,
    /// Fourth-order coefficient
    pub c5: f64,
    /// Distortion centre, offset from the frame centre in normalised units
    pub center: [f64; 2],
}

/// Barrel model normalised by half the format diagonal.
#[derive(Debug, Clone)]
pub struct PfBarrel {
    format: Format,
    params: PfBarrelParams,
    unit: f64,
    shift: DVec2,
}

impl PfBarrel {
    /// Builds the model at render scale 1.
    pub fn new(format: Format, params: PfBarrelParams) -> DistortResult<Self> {
        format.validate()?;
        Ok(Self {
            format,
            params,
            unit: format.half_diagonal(),
            shift: DVec2::splat(0.5),
        })
    }

    /// Sets the render scale the pixel-corner shift refers to.
    pub fn with_render_scale(mut self, sx: f64, sy: f64) -> DistortResult<Self> {
        if !(sx > 0.0 && sy > 0.0) {
            return Err(DistortError::invalid(format!("render scale must be positive, got ({sx}, {sy})")));
        }
        self.shift = DVec2::new(0.5 / sx, 0.5 / sy);
        Ok(self)
    }
}

impl Distortion for PfBarrel {
    fn format(&self) -> &Format {
        &self.format
    }

    fn distort(&self, p: DVec2) -> DVec2 {
        let center = DVec2::from_array(self.params.center);
        let n = self.format.to_centered(p + self.shift, self.unit) - center;
        let r2 = n.length_squared();
        let d = n * (1.0 + r2 * (self.params.c3 + self.params.c5 * r2));
        self.format.from_centered(d + center, self.unit) - self.shift
    }

    fn undistort(&self, p: DVec2) -> DVec2 {
        newton_inverse(|q| self.distort(q), p)
    }
}
