//! Multi-range colour correction.
//!
//! Each of four control groups (master, shadows, midtones, highlights)
//! applies, in order:
//!
//! 1. saturation around the pixel's luminance (skipped when neutral)
//! 2. contrast `0.18 * (v / 0.18)^contrast` for `v > 0`
//! 3. gamma `v^(1 / gamma)` for `v > 0`
//! 4. gain `v * gain`
//! 5. offset `v + offset`
//!
//! The shadow, midtone and highlight results are blended by weights read
//! from two [`ToneCurve`]s of the input luminance:
//!
//! ```text
//! s = shadow_curve(lum)
//! h = highlight_curve(lum)
//! m = 1 - s - h            (not clamped)
//! out = master(s * shadows(in) + m * midtones(in) + h * highlights(in))
//! ```
//!
//! The curve weights are tabulated once per kernel over
//! [`ColorCorrectParams::range`] with [`LUT_VALUES`]` + 1` entries; luminance
//! outside the range evaluates the curves directly.
//!
//! # Dependencies
//!
//! - [`fxkit_math::LuminanceMath`] for the luminance used by saturation and
//!   by the range weights

mod curve;

pub use curve::ToneCurve;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_math::{lerp, LuminanceMath};

use crate::grade::safe_pow;
use crate::{OpsError, OpsResult, PixelKernel};

/// Intervals in the weight lookup table.
pub const LUT_VALUES: usize = 255;

/// Contrast pivot.
const CONTRAST_PIVOT: f32 = 0.18;

/// Red, green, blue and a master value shared by all three.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rgbm {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Master
    pub m: f32,
}

impl Rgbm {
    /// Same value in every field.
    pub const fn uniform(v: f32) -> Self {
        Self { r: v, g: v, b: v, m: v }
    }

    /// Replaces the master value.
    pub const fn with_master(mut self, m: f32) -> Self {
        self.m = m;
        self
    }

    /// Effective per-channel value for multiplicative controls.
    #[inline]
    pub fn mul(&self) -> [f32; 3] {
        [self.r * self.m, self.g * self.m, self.b * self.m]
    }

    /// Effective per-channel value for additive controls.
    #[inline]
    pub fn add(&self) -> [f32; 3] {
        [self.r + self.m, self.g + self.m, self.b + self.m]
    }

    fn is_finite(&self) -> bool {
        [self.r, self.g, self.b, self.m].iter().all(|v| v.is_finite())
    }
}

/// The five controls of one tone range.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ColorControls {
    /// Saturation (1 = neutral)
    pub saturation: Rgbm,
    /// Contrast around 0.18 (1 = neutral)
    pub contrast: Rgbm,
    /// Gamma (1 = neutral)
    pub gamma: Rgbm,
    /// Gain (1 = neutral)
    pub gain: Rgbm,
    /// Offset (0 = neutral)
    pub offset: Rgbm,
}

impl Default for ColorControls {
    fn default() -> Self {
        Self {
            saturation: Rgbm::uniform(1.0),
            contrast: Rgbm::uniform(1.0),
            gamma: Rgbm::uniform(1.0),
            gain: Rgbm::uniform(1.0),
            offset: Rgbm { r: 0.0, g: 0.0, b: 0.0, m: 0.0 },
        }
    }
}

/// A [`ColorControls`] with its effective values resolved.
#[derive(Debug, Clone, Copy)]
struct ResolvedControls {
    saturation: [f32; 3],
    contrast: [f32; 3],
    gamma: [f32; 3],
    gain: [f32; 3],
    offset: [f32; 3],
    neutral_saturation: bool,
}

impl ResolvedControls {
    fn new(c: &ColorControls) -> Self {
        let saturation = c.saturation.mul();
        Self {
            saturation,
            contrast: c.contrast.mul(),
            gamma: c.gamma.mul(),
            gain: c.gain.mul(),
            offset: c.offset.add(),
            neutral_saturation: saturation.iter().all(|&s| s == 1.0),
        }
    }

    #[inline]
    fn apply(&self, rgb: [f32; 3], luminance_math: LuminanceMath) -> [f32; 3] {
        let mut out = rgb;
        if !self.neutral_saturation {
            let lum = luminance_math.luminance(rgb[0], rgb[1], rgb[2]);
            for (v, s) in out.iter_mut().zip(self.saturation) {
                *v = lum + (*v - lum) * s;
            }
        }
        for c in 0..3 {
            let mut v = out[c];
            let contrast = self.contrast[c];
            if v > 0.0 && contrast != 1.0 {
                v = safe_pow(v / CONTRAST_PIVOT, contrast) * CONTRAST_PIVOT;
            }
            let gamma = self.gamma[c];
            if v > 0.0 && gamma > 0.0 && gamma != 1.0 {
                v = v.powf(1.0 / gamma);
            }
            out[c] = v * self.gain[c] + self.offset[c];
        }
        out
    }
}

/// Colour-correct settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ColorCorrectParams {
    /// Applied after the range blend
    pub master: ColorControls,
    /// Dark range
    pub shadows: ColorControls,
    /// Middle range
    pub midtones: ColorControls,
    /// Bright range
    pub highlights: ColorControls,
    /// Shadow weight as a function of luminance
    pub shadow_curve: ToneCurve,
    /// Highlight weight as a function of luminance
    pub highlight_curve: ToneCurve,
    /// Luminance weighting
    pub luminance_math: LuminanceMath,
    /// Clamp negative results to 0
    pub clamp_black: bool,
    /// Clamp results above 1 to 1
    pub clamp_white: bool,
    /// Luminance range covered by the weight lookup table
    pub range: [f32; 2],
}

impl Default for ColorCorrectParams {
    fn default() -> Self {
        Self {
            master: ColorControls::default(),
            shadows: ColorControls::default(),
            midtones: ColorControls::default(),
            highlights: ColorControls::default(),
            shadow_curve: ToneCurve::default_shadows(),
            highlight_curve: ToneCurve::default_highlights(),
            luminance_math: LuminanceMath::Rec709,
            clamp_black: false,
            clamp_white: false,
            range: [0.0, 1.0],
        }
    }
}

impl ColorCorrectParams {
    /// Rejects non-finite controls and an empty lookup range.
    pub fn validate(&self) -> OpsResult<()> {
        let groups = [&self.master, &self.shadows, &self.midtones, &self.highlights];
        for g in groups {
            let all = [g.saturation, g.contrast, g.gamma, g.gain, g.offset];
            if !all.iter().all(Rgbm::is_finite) {
                return Err(OpsError::invalid("colour controls must be finite"));
            }
        }
        let [lo, hi] = self.range;
        if !(lo.is_finite() && hi.is_finite() && hi > lo) {
            return Err(OpsError::invalid(format!("lookup range [{lo}, {hi}] is empty")));
        }
        Ok(())
    }
}

/// The colour-correct kernel.
#[derive(Debug, Clone)]
pub struct ColorCorrect {
    master: ResolvedControls,
    shadows: ResolvedControls,
    midtones: ResolvedControls,
    highlights: ResolvedControls,
    shadow_curve: ToneCurve,
    highlight_curve: ToneCurve,
    luminance_math: LuminanceMath,
    clamp_black: bool,
    clamp_white: bool,
    range_min: f32,
    range_max: f32,
    /// `(shadow, highlight)` weights at `LUT_VALUES + 1` evenly spaced lums
    lut: Vec<[f32; 2]>,
}

impl ColorCorrect {
    /// Resolves the controls and builds the weight table.
    pub fn new(params: ColorCorrectParams) -> OpsResult<Self> {
        params.validate()?;
        let [range_min, range_max] = params.range;
        let lut = (0..=LUT_VALUES)
            .map(|i| {
                let lum = range_min + (range_max - range_min) * i as f32 / LUT_VALUES as f32;
                [params.shadow_curve.eval(lum), params.highlight_curve.eval(lum)]
            })
            .collect();
        Ok(Self {
            master: ResolvedControls::new(&params.master),
            shadows: ResolvedControls::new(&params.shadows),
            midtones: ResolvedControls::new(&params.midtones),
            highlights: ResolvedControls::new(&params.highlights),
            shadow_curve: params.shadow_curve,
            highlight_curve: params.highlight_curve,
            luminance_math: params.luminance_math,
            clamp_black: params.clamp_black,
            clamp_white: params.clamp_white,
            range_min,
            range_max,
            lut,
        })
    }

    /// `(shadow, midtone, highlight)` weights for luminance `lum`.
    pub fn weights(&self, lum: f32) -> (f32, f32, f32) {
        let (s, h) = if lum >= self.range_min && lum <= self.range_max {
            let pos = (lum - self.range_min) / (self.range_max - self.range_min) * LUT_VALUES as f32;
            let i = (pos as usize).min(LUT_VALUES - 1);
            let t = pos - i as f32;
            let (a, b) = (self.lut[i], self.lut[i + 1]);
            (lerp(a[0], b[0], t), lerp(a[1], b[1], t))
        } else {
            (self.shadow_curve.eval(lum), self.highlight_curve.eval(lum))
        };
        (s, 1.0 - s - h, h)
    }

    /// Corrects one RGB triplet.
    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let lm = self.luminance_math;
        let lum = lm.luminance(rgb[0], rgb[1], rgb[2]);
        let (ws, wm, wh) = self.weights(lum);

        let s = self.shadows.apply(rgb, lm);
        let m = self.midtones.apply(rgb, lm);
        let h = self.highlights.apply(rgb, lm);
        let blended = std::array::from_fn(|c| ws * s[c] + wm * m[c] + wh * h[c]);

        let mut out = self.master.apply(blended, lm);
        for v in &mut out {
            if self.clamp_black && *v < 0.0 {
                *v = 0.0;
            }
            if self.clamp_white && *v > 1.0 {
                *v = 1.0;
            }
        }
        out
    }
}

impl PixelKernel for ColorCorrect {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        let [r, g, b] = self.apply([pix[0], pix[1], pix[2]]);
        pix[0] = r;
        pix[1] = g;
        pix[2] = b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn kernel(f: impl FnOnce(&mut ColorCorrectParams)) -> ColorCorrect {
        let mut p = ColorCorrectParams::default();
        f(&mut p);
        ColorCorrect::new(p).unwrap()
    }

    #[test]
    fn test_default_is_identity() {
        let cc = kernel(|_| {});
        for rgb in [[0.0, 0.0, 0.0], [0.02, 0.05, 0.01], [0.4, 0.5, 0.6], [1.5, 0.9, 2.0]] {
            let out = cc.apply(rgb);
            for c in 0..3 {
                assert_abs_diff_eq!(out[c], rgb[c], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        let cc = kernel(|_| {});
        for i in -10..=30 {
            let (s, m, h) = cc.weights(i as f32 / 20.0);
            assert_abs_diff_eq!(s + m + h, 1.0, epsilon = 1e-6);
        }
        assert_eq!(cc.weights(0.0), (1.0, 0.0, 0.0));
        assert_eq!(cc.weights(2.0), (0.0, 0.0, 1.0));
    }

    #[test]
    fn test_lut_matches_curves() {
        let cc = kernel(|_| {});
        let shadows = ToneCurve::default_shadows();
        let highs = ToneCurve::default_highlights();
        for i in 0..=200 {
            let lum = i as f32 / 200.0;
            let (s, _, h) = cc.weights(lum);
            // linear interpolation only departs from the curve across a kink
            assert_abs_diff_eq!(s, shadows.eval(lum), epsilon = 5e-3);
            assert_abs_diff_eq!(h, highs.eval(lum), epsilon = 5e-3);
        }
    }

    #[test]
    fn test_shadow_gain_only_touches_darks() {
        let cc = kernel(|p| p.shadows.gain = Rgbm::uniform(1.5).with_master(1.0));
        let dark = cc.apply([0.01, 0.01, 0.01]);
        assert!(dark[0] > 0.01);
        let mid = cc.apply([0.3, 0.3, 0.3]);
        assert_abs_diff_eq!(mid[0], 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_master_contrast_pivot() {
        let cc = kernel(|p| p.master.contrast = Rgbm::uniform(2.0).with_master(1.0));
        let out = cc.apply([0.18, 0.36, 0.0]);
        assert_abs_diff_eq!(out[0], 0.18, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.72, epsilon = 1e-5);
        assert_eq!(out[2], 0.0);
    }

    #[test]
    fn test_master_offset_is_additive() {
        let cc = kernel(|p| p.master.offset = Rgbm { r: 0.1, g: 0.0, b: 0.0, m: 0.05 });
        let out = cc.apply([0.5, 0.5, 0.5]);
        assert_abs_diff_eq!(out[0], 0.65, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 0.55, epsilon = 1e-6);
    }

    #[test]
    fn test_saturation_zero_is_grey() {
        let cc = kernel(|p| p.master.saturation = Rgbm::uniform(0.0).with_master(1.0));
        let out = cc.apply([1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(out[0], out[1], epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], out[2], epsilon = 1e-6);
    }

    #[test]
    fn test_clamps() {
        let cc = kernel(|p| {
            p.master.offset = Rgbm { r: 0.0, g: 0.0, b: 0.0, m: -0.5 };
            p.clamp_black = true;
        });
        assert_eq!(cc.apply([0.2, 0.2, 0.2]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invalid_range() {
        let p = ColorCorrectParams { range: [1.0, 1.0], ..Default::default() };
        assert!(ColorCorrect::new(p).is_err());
    }
}
