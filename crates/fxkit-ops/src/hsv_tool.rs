//! HSV range selection and adjustment.
//!
//! A pixel's hue, saturation and brightness are each tested against a
//! range with a rolloff band: inside the range the coefficient is 1, inside
//! the rolloff it falls linearly to 0, outside it is 0. The three
//! coefficients are combined by minimum; the combined coefficient scales
//! the hue rotation and the saturation / brightness adjustments:
//!
//! ```text
//! h' = h + k * (rotation + (rotation_gain - 1) * h)
//! s' = max(0, s + k * (saturation + (saturation_gain - 1) * s))
//! v' = v + k * (brightness + (brightness_gain - 1) * v)
//! ```
//!
//! # Hue ranges
//!
//! Hue ranges wrap around 360°. The two endpoints are normalised into
//! [0, 360) and the shorter of the two arcs joining them is selected. An
//! input span of 360° or more selects every hue.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_math::{hsv_to_rgb, normalize_hue, rgb_to_hsv};

use crate::{OpsError, OpsResult, PixelKernel};

/// What the kernel writes to alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HsvAlphaOutput {
    /// Source alpha unchanged
    #[default]
    Off,
    /// Hue coefficient
    Hue,
    /// Saturation coefficient
    Saturation,
    /// Brightness coefficient
    Brightness,
    /// `min(hue, saturation)`
    HueSaturation,
    /// `min(hue, saturation, brightness)`
    HueSaturationBrightness,
}

/// HSV tool settings. Angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HsvToolParams {
    /// Selected hue arc endpoints
    pub hue_range: [f32; 2],
    /// Hue rolloff width
    pub hue_rolloff: f32,
    /// Selected saturation range
    pub saturation_range: [f32; 2],
    /// Saturation rolloff width
    pub saturation_rolloff: f32,
    /// Selected brightness range
    pub brightness_range: [f32; 2],
    /// Brightness rolloff width
    pub brightness_rolloff: f32,
    /// Hue rotation
    pub hue_rotation: f32,
    /// Hue rotation gain (1 = neutral)
    pub hue_rotation_gain: f32,
    /// Saturation offset
    pub saturation_adjustment: f32,
    /// Saturation gain (1 = neutral)
    pub saturation_adjustment_gain: f32,
    /// Brightness offset
    pub brightness_adjustment: f32,
    /// Brightness gain (1 = neutral)
    pub brightness_adjustment_gain: f32,
    /// Clamp negative results to 0
    pub clamp_black: bool,
    /// Clamp results above 1 to 1
    pub clamp_white: bool,
    /// Alpha output
    pub output_alpha: HsvAlphaOutput,
}

impl Default for HsvToolParams {
    fn default() -> Self {
        Self {
            hue_range: [0.0, 360.0],
            hue_rolloff: 0.0,
            saturation_range: [0.0, 1.0],
            saturation_rolloff: 0.0,
            brightness_range: [0.0, 1.0],
            brightness_rolloff: 0.0,
            hue_rotation: 0.0,
            hue_rotation_gain: 1.0,
            saturation_adjustment: 0.0,
            saturation_adjustment_gain: 1.0,
            brightness_adjustment: 0.0,
            brightness_adjustment_gain: 1.0,
            clamp_black: true,
            clamp_white: false,
            output_alpha: HsvAlphaOutput::Off,
        }
    }
}

/// A hue arc `[start, start + span]` on the colour wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HueArc {
    start: f32,
    span: f32,
    rolloff: f32,
}

impl HueArc {
    fn new(range: [f32; 2], rolloff: f32) -> Self {
        let rolloff = rolloff.max(0.0);
        if (range[1] - range[0]).abs() >= 360.0 {
            return Self { start: 0.0, span: 360.0, rolloff };
        }
        let mut start = normalize_hue(range[0]);
        let end = normalize_hue(range[1]);
        let mut span = (end - start).rem_euclid(360.0);
        if span > 180.0 {
            start = end;
            span = 360.0 - span;
        }
        Self { start, span, rolloff }
    }

    fn coefficient(&self, h: f32) -> f32 {
        if self.span >= 360.0 {
            return 1.0;
        }
        let from_start = (h - self.start).rem_euclid(360.0);
        if from_start <= self.span {
            return 1.0;
        }
        let after = from_start - self.span;
        let before = 360.0 - from_start;
        ramp(after.min(before), self.rolloff)
    }
}

/// `1 - d / rolloff` inside the rolloff band, 0 beyond.
#[inline]
fn ramp(distance: f32, rolloff: f32) -> f32 {
    if rolloff > 0.0 && distance < rolloff {
        1.0 - distance / rolloff
    } else {
        0.0
    }
}

/// Coefficient of `v` for the linear range `[lo, hi]`.
#[inline]
fn range_coefficient(v: f32, range: [f32; 2], rolloff: f32) -> f32 {
    let lo = range[0].min(range[1]);
    let hi = range[0].max(range[1]);
    if v >= lo && v <= hi {
        1.0
    } else if v < lo {
        ramp(lo - v, rolloff)
    } else {
        ramp(v - hi, rolloff)
    }
}

/// The HSV tool kernel.
#[derive(Debug, Clone)]
pub struct HsvTool {
    params: HsvToolParams,
    hue: HueArc,
}

impl HsvTool {
    /// Builds the kernel.
    pub fn new(params: HsvToolParams) -> OpsResult<Self> {
        let values = [
            params.hue_range[0],
            params.hue_range[1],
            params.hue_rolloff,
            params.saturation_range[0],
            params.saturation_range[1],
            params.saturation_rolloff,
            params.brightness_range[0],
            params.brightness_range[1],
            params.brightness_rolloff,
            params.hue_rotation,
            params.hue_rotation_gain,
            params.saturation_adjustment,
            params.saturation_adjustment_gain,
            params.brightness_adjustment,
            params.brightness_adjustment_gain,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OpsError::invalid("HSV tool values must be finite"));
        }
        Ok(Self {
            hue: HueArc::new(params.hue_range, params.hue_rolloff),
            params,
        })
    }

    /// `(hue, saturation, brightness)` coefficients of an HSV triple.
    pub fn coefficients(&self, hsv: [f32; 3]) -> (f32, f32, f32) {
        let p = &self.params;
        (
            self.hue.coefficient(hsv[0]),
            range_coefficient(hsv[1], p.saturation_range, p.saturation_rolloff),
            range_coefficient(hsv[2], p.brightness_range, p.brightness_rolloff),
        )
    }
}

impl PixelKernel for HsvTool {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        let p = &self.params;
        let [h, s, v] = rgb_to_hsv([pix[0], pix[1], pix[2]]);
        let (kh, ks, kv) = self.coefficients([h, s, v]);
        let k = kh.min(ks).min(kv);

        if k > 0.0 {
            let h = h + k * (p.hue_rotation + (p.hue_rotation_gain - 1.0) * h);
            let s = (s + k * (p.saturation_adjustment + (p.saturation_adjustment_gain - 1.0) * s)).max(0.0);
            let v = v + k * (p.brightness_adjustment + (p.brightness_adjustment_gain - 1.0) * v);
            let rgb = hsv_to_rgb([h, s, v]);
            pix[..3].copy_from_slice(&rgb);
        }

        for c in &mut pix[..3] {
            if p.clamp_black && *c < 0.0 {
                *c = 0.0;
            }
            if p.clamp_white && *c > 1.0 {
                *c = 1.0;
            }
        }

        pix[3] = match p.output_alpha {
            HsvAlphaOutput::Off => pix[3],
            HsvAlphaOutput::Hue => kh,
            HsvAlphaOutput::Saturation => ks,
            HsvAlphaOutput::Brightness => kv,
            HsvAlphaOutput::HueSaturation => kh.min(ks),
            HsvAlphaOutput::HueSaturationBrightness => k,
        };
    }

    fn premultiply_output(&self, premult: bool) -> bool {
        premult && self.params.output_alpha == HsvAlphaOutput::Off
    }
}
