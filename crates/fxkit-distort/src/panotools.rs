//! Panorama-stitcher polynomial with shift and shear.
//!
//! Radius 1.0 is half the smaller frame dimension. For a destination
//! (undistorted) point at radius `r` the source radius is
//!
//! ```text
//! r_src = (a r³ + b r² + c r + d) r,   d = 1 - a - b - c
//! ```
//!
//! followed by shear (`g` horizontal, `t` vertical, in normalised units)
//! and a horizontal / vertical shift (`d_shift`, `e_shift`, in pixels).
//!
//! `distort` is analytic; `undistort` uses the Newton inverse.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{newton_inverse, DistortResult, Distortion, Format};

/// Coefficients of [`PanoTools`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PanoToolsParams {
    /// Cubic coefficient
    pub a: f64,
    /// Quadratic coefficient
    pub b: f64,
    /// Linear coefficient
    pub c: f64,
    /// Horizontal shift in pixels
    pub d_shift: f64,
    /// Vertical shift in pixels
    pub e_shift: f64,
    /// Horizontal shear
    pub g_shear: f64,
    /// Vertical shear
    pub t_shear: f64,
}

/// Radial polynomial normalised by half the smaller frame dimension.
#[derive(Debug, Clone)]
pub struct PanoTools {
    format: Format,
    params: PanoToolsParams,
    unit: f64,
}

impl PanoTools {
    /// Builds the model.
    pub fn new(format: Format, params: PanoToolsParams) -> DistortResult<Self> {
        format.validate()?;
        Ok(Self {
            format,
            params,
            unit: format.half_min(),
        })
    }

    /// Implied constant term `1 - a - b - c`.
    pub fn d(&self) -> f64 {
        1.0 - self.params.a - self.params.b - self.params.c
    }
}

impl Distortion for PanoTools {
    fn format(&self) -> &Format {
        &self.format
    }

    fn distort(&self, p: DVec2) -> DVec2 {
        let PanoToolsParams { a, b, c, d_shift, e_shift, g_shear, t_shear } = self.params;
        let n = self.format.to_centered(p, self.unit);
        let r = n.length();
        let scale = ((a * r + b) * r + c) * r + self.d();
        let q = n * scale;
        let sheared = DVec2::new(q.x + g_shear * q.y, q.y + t_shear * q.x);
        self.format.from_centered(sheared, self.unit) + DVec2::new(d_shift, e_shift)
    }

    fn undistort(&self, p: DVec2) -> DVec2 {
        newton_inverse(|q| self.distort(q), p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unit_radius_is_fixed_without_shift() {
        let params = PanoToolsParams { a: 0.01, b: -0.03, c: 0.02, ..Default::default() };
        let m = PanoTools::new(Format::new(400.0, 200.0), params).unwrap();
        // r = 1 maps to itself because a + b + c + d = 1
        let p = DVec2::new(200.0, 200.0);
        assert_abs_diff_eq!(m.distort(p).distance(p), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shift_is_in_pixels() {
        let params = PanoToolsParams { d_shift: 3.0, e_shift: -2.0, ..Default::default() };
        let m = PanoTools::new(Format::new(400.0, 200.0), params).unwrap();
        let p = DVec2::new(17.0, 33.0);
        assert_abs_diff_eq!(m.distort(p).distance(p + DVec2::new(3.0, -2.0)), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.undistort(m.distort(p)).distance(p), 0.0, epsilon = 1e-2);
    }
}
