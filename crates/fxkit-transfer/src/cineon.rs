//! Cineon printing-density log encoding.
//!
//! Code values are 10-bit (`0..=1023`) stored normalised to [0, 1]. The
//! curve is fixed by a black point, a white point and a negative gamma:
//!
//! ```text
//! offset = 10^((black - white) * 0.002 / gamma)
//! gain   = 1 / (1 - offset)
//! lin    = gain * (10^((1023 x - white) * 0.002 / gamma) - offset)
//! log    = (log10(lin / gain + offset) * gamma / 0.002 + white) / 1023
//! ```
//!
//! [`CineonCurve::to_linear`] and [`CineonCurve::from_linear`] are exact
//! algebraic inverses.
//!
//! ```rust
//! use fxkit_transfer::cineon::CineonCurve;
//!
//! let c = CineonCurve::default();
//! assert!(c.to_linear(95.0 / 1023.0).abs() < 1e-6);
//! assert!((c.to_linear(685.0 / 1023.0) - 1.0).abs() < 1e-5);
//! ```

/// Log to linear film step per code value.
const DENSITY_STEP: f32 = 0.002;

/// Highest 10-bit code value.
const CODE_MAX: f32 = 1023.0;

/// Resolved Cineon curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CineonCurve {
    /// Black point in code values
    pub black: f32,
    /// White point in code values
    pub white: f32,
    /// Negative gamma
    pub gamma: f32,
    offset: f32,
    gain: f32,
}

impl Default for CineonCurve {
    fn default() -> Self {
        Self::new(95.0, 685.0, 0.6)
    }
}

impl CineonCurve {
    /// Derives offset and gain from black, white and gamma.
    ///
    /// `gamma <= 0` falls back to 1. When `white == black` the gain would be
    /// infinite and falls back to 1.
    pub fn new(black: f32, white: f32, gamma: f32) -> Self {
        let gamma = if gamma > 0.0 { gamma } else { 1.0 };
        let offset = 10f32.powf((black - white) * DENSITY_STEP / gamma);
        let denom = 1.0 - offset;
        let gain = if denom.abs() > f32::EPSILON { 1.0 / denom } else { 1.0 };
        Self {
            black,
            white,
            gamma,
            offset,
            gain,
        }
    }

    /// Offset subtracted after exponentiation.
    #[inline]
    pub fn offset(&self) -> f32 {
        self.offset
    }

    /// Gain applied after exponentiation.
    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Normalised log code value to linear.
    #[inline]
    pub fn to_linear(&self, x: f32) -> f32 {
        self.gain * (10f32.powf((CODE_MAX * x - self.white) * DENSITY_STEP / self.gamma) - self.offset)
    }

    /// Linear to normalised log code value.
    ///
    /// Arguments of the logarithm at or below zero clamp to
    /// `f32::MIN_POSITIVE`.
    #[inline]
    pub fn from_linear(&self, lin: f32) -> f32 {
        let arg = (lin / self.gain + self.offset).max(f32::MIN_POSITIVE);
        (arg.log10() * self.gamma / DENSITY_STEP + self.white) / CODE_MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_inverse_law() {
        for (black, white, gamma) in [(95.0, 685.0, 0.6), (0.0, 1023.0, 1.0), (64.0, 940.0, 0.45), (300.0, 200.0, 0.8)] {
            let c = CineonCurve::new(black, white, gamma);
            for i in 0..=40 {
                let x = i as f32 / 40.0;
                let back = c.from_linear(c.to_linear(x));
                assert_abs_diff_eq!(back, x, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn test_degenerate_parameters() {
        let c = CineonCurve::new(500.0, 500.0, 0.6);
        assert_eq!(c.gain(), 1.0);
        let c = CineonCurve::new(95.0, 685.0, 0.0);
        assert_eq!(c.gamma, 1.0);
        assert!(CineonCurve::default().from_linear(-100.0).is_finite());
    }
}
