//! Small per-pixel kernels: invert, clamp and saturation.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_math::LuminanceMath;

use crate::{OpsError, OpsResult, PixelKernel};

/// `1 - v` on every slot; pick slots with the render's channel mask.
#[derive(Debug, Clone, Copy, Default)]
pub struct Invert;

impl PixelKernel for Invert {
    #[inline]
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        for v in pix.iter_mut() {
            *v = 1.0 - *v;
        }
    }
}

/// Settings of [`Clamp`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClampParams {
    /// Lower limit per RGBA slot
    pub minimum: [f32; 4],
    /// Upper limit per RGBA slot
    pub maximum: [f32; 4],
    /// Apply the lower limit
    pub clamp_minimum: bool,
    /// Apply the upper limit
    pub clamp_maximum: bool,
    /// Replacement for values below the minimum (instead of the minimum)
    pub minimum_clamp_to: Option<[f32; 4]>,
    /// Replacement for values above the maximum (instead of the maximum)
    pub maximum_clamp_to: Option<[f32; 4]>,
}

impl Default for ClampParams {
    fn default() -> Self {
        Self {
            minimum: [0.0; 4],
            maximum: [1.0; 4],
            clamp_minimum: true,
            clamp_maximum: true,
            minimum_clamp_to: None,
            maximum_clamp_to: None,
        }
    }
}

/// Clamps each slot to `[minimum, maximum]`, optionally replacing
/// out-of-range values by a fixed colour.
#[derive(Debug, Clone)]
pub struct Clamp {
    params: ClampParams,
}

impl Clamp {
    /// Builds the kernel.
    pub fn new(params: ClampParams) -> Self {
        Self { params }
    }
}

impl PixelKernel for Clamp {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        let p = &self.params;
        for (c, v) in pix.iter_mut().enumerate() {
            if p.clamp_minimum && *v < p.minimum[c] {
                *v = p.minimum_clamp_to.map_or(p.minimum[c], |to| to[c]);
            } else if p.clamp_maximum && *v > p.maximum[c] {
                *v = p.maximum_clamp_to.map_or(p.maximum[c], |to| to[c]);
            }
        }
    }
}

/// Settings of [`Saturation`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SaturationParams {
    /// 0 = greyscale, 1 = unchanged
    pub saturation: f32,
    /// Luminance weighting
    pub luminance_math: LuminanceMath,
    /// Clamp negative results to 0
    pub clamp_black: bool,
    /// Clamp results above 1 to 1
    pub clamp_white: bool,
}

impl Default for SaturationParams {
    fn default() -> Self {
        Self {
            saturation: 1.0,
            luminance_math: LuminanceMath::Rec709,
            clamp_black: true,
            clamp_white: false,
        }
    }
}

/// Luminance-preserving saturation.
#[derive(Debug, Clone)]
pub struct Saturation {
    params: SaturationParams,
}

impl Saturation {
    /// Builds the kernel.
    pub fn new(params: SaturationParams) -> OpsResult<Self> {
        if !params.saturation.is_finite() {
            return Err(OpsError::invalid("saturation must be finite"));
        }
        Ok(Self { params })
    }
}

impl PixelKernel for Saturation {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        let p = &self.params;
        let lum = p.luminance_math.luminance(pix[0], pix[1], pix[2]);
        for v in &mut pix[..3] {
            *v = lum + (*v - lum) * p.saturation;
            if p.clamp_black && *v < 0.0 {
                *v = 0.0;
            }
            if p.clamp_white && *v > 1.0 {
                *v = 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_invert() {
        let mut px = [0.0, 0.25, 1.0, 0.5];
        Invert.process(0, 0, &mut px);
        assert_eq!(px, [1.0, 0.75, 0.0, 0.5]);
    }

    #[test]
    fn test_clamp_to_color() {
        let k = Clamp::new(ClampParams {
            minimum_clamp_to: Some([0.1, 0.2, 0.3, 0.4]),
            ..Default::default()
        });
        let mut px = [-1.0, 0.5, 2.0, -0.5];
        k.process(0, 0, &mut px);
        assert_eq!(px, [0.1, 0.5, 1.0, 0.4]);
    }

    #[test]
    fn test_clamp_disabled_max() {
        let k = Clamp::new(ClampParams { clamp_maximum: false, ..Default::default() });
        let mut px = [-1.0, 0.5, 2.0, 1.0];
        k.process(0, 0, &mut px);
        assert_eq!(px, [0.0, 0.5, 2.0, 1.0]);
    }

    #[test]
    fn test_zero_saturation_is_luminance() {
        let k = Saturation::new(SaturationParams { saturation: 0.0, ..Default::default() }).unwrap();
        let mut px = [1.0, 0.0, 0.0, 1.0];
        k.process(0, 0, &mut px);
        assert_abs_diff_eq!(px[0], 0.2126, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 0.2126, epsilon = 1e-6);
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn test_unit_saturation_is_identity() {
        let k = Saturation::new(SaturationParams::default()).unwrap();
        let mut px = [0.3, 0.6, 0.9, 1.0];
        k.process(0, 0, &mut px);
        assert_abs_diff_eq!(px[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.9, epsilon = 1e-6);
    }
}
