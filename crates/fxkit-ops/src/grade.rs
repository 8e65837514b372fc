//! Grade: black / white points, lift, gain, multiply, offset and gamma.
//!
//! Per RGBA slot:
//!
//! ```text
//! A   = multiply * (white - black) / (white_point - black_point)
//! B   = offset + black - A * black_point
//! out = (A * in + B) ^ (1 / gamma)
//! ```
//!
//! Guards: `gamma <= 0` gives 0, and a negative base raised to a
//! non-integer exponent gives 0 instead of NaN. When
//! `white_point == black_point` the slope is 0 and the output is `B`.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_ops::{Grade, GradeParams, PixelKernel};
//!
//! let grade = Grade::new(GradeParams {
//!     multiply: [2.0, 2.0, 2.0, 1.0],
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! let mut px = [0.5, 0.5, 0.5, 1.0];
//! grade.process(0, 0, &mut px);
//! assert_eq!(px, [1.0, 1.0, 1.0, 1.0]);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult, PixelKernel};

/// Grade settings, one value per RGBA slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GradeParams {
    /// Input value mapped to `black`
    pub black_point: [f32; 4],
    /// Input value mapped to `white`
    pub white_point: [f32; 4],
    /// Lift
    pub black: [f32; 4],
    /// Gain
    pub white: [f32; 4],
    /// Multiplier applied to the slope
    pub multiply: [f32; 4],
    /// Added after the slope
    pub offset: [f32; 4],
    /// Output gamma
    pub gamma: [f32; 4],
    /// Clamp negative results to 0
    pub clamp_black: bool,
    /// Clamp results above 1 to 1
    pub clamp_white: bool,
}

impl Default for GradeParams {
    fn default() -> Self {
        Self {
            black_point: [0.0; 4],
            white_point: [1.0; 4],
            black: [0.0; 4],
            white: [1.0; 4],
            multiply: [1.0; 4],
            offset: [0.0; 4],
            gamma: [1.0; 4],
            clamp_black: true,
            clamp_white: false,
        }
    }
}

impl GradeParams {
    /// True when every slot maps input to itself.
    pub fn is_identity(&self) -> bool {
        (0..4).all(|c| {
            self.black_point[c] == 0.0
                && self.white_point[c] == 1.0
                && self.black[c] == 0.0
                && self.white[c] == 1.0
                && self.multiply[c] == 1.0
                && self.offset[c] == 0.0
                && self.gamma[c] == 1.0
        })
    }

    /// Rejects non-finite values.
    pub fn validate(&self) -> OpsResult<()> {
        let all = [
            &self.black_point,
            &self.white_point,
            &self.black,
            &self.white,
            &self.multiply,
            &self.offset,
            &self.gamma,
        ];
        if all.iter().any(|v| v.iter().any(|x| !x.is_finite())) {
            return Err(OpsError::invalid("grade values must be finite"));
        }
        Ok(())
    }
}

/// Raises `base` to `exponent`, returning 0 where the result would be NaN
/// for a negative base.
#[inline]
pub(crate) fn safe_pow(base: f32, exponent: f32) -> f32 {
    if base < 0.0 && exponent.fract() != 0.0 {
        return 0.0;
    }
    base.powf(exponent)
}

/// The grade kernel with slope and intercept resolved per slot.
#[derive(Debug, Clone)]
pub struct Grade {
    a: [f32; 4],
    b: [f32; 4],
    inv_gamma: [Option<f32>; 4],
    clamp_black: bool,
    clamp_white: bool,
    identity: bool,
}

impl Grade {
    /// Resolves `params` into slope / intercept form.
    pub fn new(params: GradeParams) -> OpsResult<Self> {
        params.validate()?;
        let mut a = [0.0; 4];
        let mut b = [0.0; 4];
        let mut inv_gamma = [None; 4];
        for c in 0..4 {
            let range = params.white_point[c] - params.black_point[c];
            a[c] = if range == 0.0 {
                0.0
            } else {
                params.multiply[c] * (params.white[c] - params.black[c]) / range
            };
            b[c] = params.offset[c] + params.black[c] - a[c] * params.black_point[c];
            let g = params.gamma[c];
            inv_gamma[c] = (g > 0.0).then(|| 1.0 / g);
        }
        Ok(Self {
            a,
            b,
            inv_gamma,
            clamp_black: params.clamp_black,
            clamp_white: params.clamp_white,
            identity: params.is_identity(),
        })
    }

    /// True when the kernel leaves pixels unchanged.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Grades one value of slot `c`.
    #[inline]
    pub fn apply(&self, c: usize, v: f32) -> f32 {
        let lin = self.a[c] * v + self.b[c];
        let mut out = match self.inv_gamma[c] {
            None => 0.0,
            Some(e) if e == 1.0 => lin,
            Some(e) => safe_pow(lin, e),
        };
        if self.clamp_black && out < 0.0 {
            out = 0.0;
        }
        if self.clamp_white && out > 1.0 {
            out = 1.0;
        }
        out
    }
}

impl PixelKernel for Grade {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        if self.identity {
            return;
        }
        for (c, v) in pix.iter_mut().enumerate() {
            *v = self.apply(c, *v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity_detection() {
        assert!(Grade::new(GradeParams::default()).unwrap().is_identity());
        let p = GradeParams { offset: [0.0, 0.0, 0.1, 0.0], ..Default::default() };
        assert!(!Grade::new(p).unwrap().is_identity());
    }

    #[test]
    fn test_identity_keeps_negative_values() {
        let g = Grade::new(GradeParams::default()).unwrap();
        let mut px = [-0.5, 2.0, 0.3, 1.0];
        g.process(0, 0, &mut px);
        assert_eq!(px, [-0.5, 2.0, 0.3, 1.0]);
    }

    #[test]
    fn test_points_remap() {
        let g = Grade::new(GradeParams {
            black_point: [0.1; 4],
            white_point: [0.9; 4],
            ..Default::default()
        })
        .unwrap();
        assert_abs_diff_eq!(g.apply(0, 0.1), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g.apply(0, 0.9), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(g.apply(0, 0.5), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_gamma() {
        let g = Grade::new(GradeParams { gamma: [2.0; 4], ..Default::default() }).unwrap();
        assert_abs_diff_eq!(g.apply(1, 0.25), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_gamma_outputs_zero() {
        let g = Grade::new(GradeParams { gamma: [0.0; 4], ..Default::default() }).unwrap();
        assert_eq!(g.apply(0, 0.7), 0.0);
    }

    #[test]
    fn test_negative_base_non_integer_exponent() {
        let g = Grade::new(GradeParams {
            gamma: [2.0; 4],
            clamp_black: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(g.apply(0, -0.25), 0.0);

        // 1 / 0.5 = 2 is an integer exponent
        let g = Grade::new(GradeParams {
            gamma: [0.5; 4],
            clamp_black: false,
            ..Default::default()
        })
        .unwrap();
        assert_abs_diff_eq!(g.apply(0, -0.5), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_points_give_constant() {
        let g = Grade::new(GradeParams {
            black_point: [0.5; 4],
            white_point: [0.5; 4],
            black: [0.2; 4],
            ..Default::default()
        })
        .unwrap();
        assert_abs_diff_eq!(g.apply(0, 0.0), 0.2, epsilon = 1e-6);
        assert_abs_diff_eq!(g.apply(0, 1.0), 0.2, epsilon = 1e-6);
    }

    #[test]
    fn test_clamps() {
        let p = GradeParams { multiply: [4.0; 4], offset: [-1.0; 4], ..Default::default() };
        let g = Grade::new(p).unwrap();
        assert_eq!(g.apply(0, 0.0), 0.0);
        assert_eq!(g.apply(0, 1.0), 3.0);

        let g = Grade::new(GradeParams { clamp_white: true, ..p }).unwrap();
        assert_eq!(g.apply(0, 1.0), 1.0);
    }
}
