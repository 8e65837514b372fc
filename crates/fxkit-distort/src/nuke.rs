//! Simple radial model with anamorphic squeeze and decentering.
//!
//! Coordinates are centred on `center` and scaled so that 1.0 is half the
//! larger frame dimension. The squeeze divides the vertical axis before the
//! radial term and multiplies it back afterwards.
//!
//! ```text
//! r² = x² + y²
//! f  = 1 + k1 r² + k2 r⁴
//! xu = x f + 2 ax x y + ay (r² + 2 x²)
//! yu = y f + ax (r² + 2 y²) + 2 ay x y
//! ```
//!
//! `undistort` is analytic; `distort` uses the Newton inverse.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{newton_inverse, DistortError, DistortResult, Distortion, Format};

/// Coefficients of [`NukeRadial`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NukeRadialParams {
    /// Second-order radial coefficient
    pub k1: f64,
    /// Fourth-order radial coefficient
    pub k2: f64,
    /// Distortion centre, offset from the frame centre in normalised units
    pub center: [f64; 2],
    /// Anamorphic squeeze of the vertical axis
    pub squeeze: f64,
    /// Decentering terms `(ax, ay)`
    pub asymmetric: [f64; 2],
}

impl Default for NukeRadialParams {
    fn default() -> Self {
        Self {
            k1: 0.0,
            k2: 0.0,
            center: [0.0, 0.0],
            squeeze: 1.0,
            asymmetric: [0.0, 0.0],
        }
    }
}

/// Radial lens model normalised by half the larger frame dimension.
#[derive(Debug, Clone)]
pub struct NukeRadial {
    format: Format,
    params: NukeRadialParams,
    unit: f64,
}

impl NukeRadial {
    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Fails for an invalid format or a zero / non-finite squeeze.
    pub fn new(format: Format, params: NukeRadialParams) -> DistortResult<Self> {
        format.validate()?;
        if !params.squeeze.is_finite() || params.squeeze.abs() < f64::EPSILON {
            return Err(DistortError::invalid(format!("squeeze must be non-zero, got {}", params.squeeze)));
        }
        Ok(Self {
            format,
            params,
            unit: format.half_max(),
        })
    }

    /// Model coefficients.
    pub fn params(&self) -> &NukeRadialParams {
        &self.params
    }

    fn normalize(&self, p: DVec2) -> DVec2 {
        let n = self.format.to_centered(p, self.unit) - DVec2::from_array(self.params.center);
        DVec2::new(n.x, n.y / self.params.squeeze)
    }

    fn denormalize(&self, n: DVec2) -> DVec2 {
        let n = DVec2::new(n.x, n.y * self.params.squeeze) + DVec2::from_array(self.params.center);
        self.format.from_centered(n, self.unit)
    }
}

impl Distortion for NukeRadial {
    fn format(&self) -> &Format {
        &self.format
    }

    fn undistort(&self, p: DVec2) -> DVec2 {
        let NukeRadialParams { k1, k2, asymmetric: [ax, ay], .. } = self.params;
        let n = self.normalize(p);
        let (x, y) = (n.x, n.y);
        let r2 = n.length_squared();
        let f = 1.0 + r2 * (k1 + k2 * r2);
        let u = DVec2::new(
            x * f + 2.0 * ax * x * y + ay * (r2 + 2.0 * x * x),
            y * f + ax * (r2 + 2.0 * y * y) + 2.0 * ay * x * y,
        );
        self.denormalize(u)
    }

    fn distort(&self, p: DVec2) -> DVec2 {
        newton_inverse(|q| self.undistort(q), p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_zero_coefficients_are_identity() {
        let m = NukeRadial::new(Format::new(1000.0, 500.0), NukeRadialParams::default()).unwrap();
        let p = DVec2::new(12.5, 400.0);
        assert_abs_diff_eq!(m.undistort(p).distance(p), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(m.distort(p).distance(p), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_barrel_pushes_corners_out() {
        let params = NukeRadialParams { k1: 0.1, ..Default::default() };
        let m = NukeRadial::new(Format::new(1000.0, 1000.0), params).unwrap();
        // corner at r = sqrt(2) in normalised units
        let u = m.undistort(DVec2::new(1000.0, 1000.0));
        assert!(u.x > 1000.0 && u.y > 1000.0);
        // centre is fixed
        let centre = DVec2::new(500.0, 500.0);
        assert_abs_diff_eq!(m.undistort(centre).distance(centre), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_squeeze_rejected() {
        let params = NukeRadialParams { squeeze: 0.0, ..Default::default() };
        assert!(NukeRadial::new(Format::default(), params).is_err());
    }
}
