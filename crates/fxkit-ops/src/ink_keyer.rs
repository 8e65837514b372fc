//! Proportional colour-difference keyer.
//!
//! The key colour's channels are ranked max / mid / min. A pixel is read
//! as `fg + m × key`: the difference between its dominant channel and a
//! balance of its other two, relative to the same difference of the key,
//! gives the key amount `m`.
//!
//! ```text
//! ref(c) = balance * c[mid] + (1 - balance) * c[min]
//! m      = clamp(d(src) / d(key), 0, 1),   d(c) = c[max] - ref(c)
//! fg     = src - m * key
//! alpha  = 1 - m
//! ```
//!
//! Spill replacement adds `m * amount * replacement` back, optionally
//! rescaled to the despilled pixel's luminance. Core and garbage mattes
//! then force areas to foreground or background, and the final matte goes
//! through invert and black / white points.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_core::ImageRef;
use fxkit_math::{lerp, saturate, LuminanceMath};

use crate::{OpsError, OpsResult, PixelKernel};

/// What the keyer writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InkOutput {
    /// Despilled foreground, premultiplied by the matte
    #[default]
    Premultiplied,
    /// Despilled foreground divided by the matte
    Unpremultiplied,
    /// Matte, core and garbage as 0 / 0.5 / 1 in R, G, B
    MatteMonitor,
}

/// How the source alpha takes part in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InkSourceAlpha {
    /// Source alpha is not used
    #[default]
    Ignore,
    /// Source alpha is added to the core matte
    AddToCore,
    /// Result is multiplied by source alpha
    Multiply,
}

/// Settings of [`InkKeyer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InkParams {
    /// Background colour
    pub key_color: [f32; 3],
    /// Weight of the mid channel against the min channel
    pub key_balance: f32,
    /// Colour added where spill was removed
    pub replacement_color: [f32; 3],
    /// Strength of the replacement
    pub replacement_amount: f32,
    /// Scale the replacement to the despilled pixel's luminance
    pub match_luminance: bool,
    /// Luminance weights used by `match_luminance`
    pub luminance_math: LuminanceMath,
    /// Source alpha handling
    pub source_alpha: InkSourceAlpha,
    /// Invert the final matte
    pub invert: bool,
    /// Matte value mapped to 0
    pub black_point: f32,
    /// Matte value mapped to 1
    pub white_point: f32,
    /// Output
    pub output: InkOutput,
}

impl Default for InkParams {
    fn default() -> Self {
        Self {
            key_color: [0.0, 0.0, 1.0],
            key_balance: 0.5,
            replacement_color: [0.5, 0.5, 0.5],
            replacement_amount: 0.0,
            match_luminance: false,
            luminance_math: LuminanceMath::default(),
            source_alpha: InkSourceAlpha::Ignore,
            invert: false,
            black_point: 0.0,
            white_point: 1.0,
            output: InkOutput::Premultiplied,
        }
    }
}

impl InkParams {
    /// Rejects non-finite values.
    pub fn validate(&self) -> OpsResult<()> {
        let finite = self
            .key_color
            .iter()
            .chain(&self.replacement_color)
            .chain(&[self.key_balance, self.replacement_amount, self.black_point, self.white_point])
            .all(|v| v.is_finite());
        if !finite {
            return Err(OpsError::invalid("ink keyer values must be finite"));
        }
        Ok(())
    }
}

/// Indices of the largest, middle and smallest channel of `c`.
fn rank_channels(c: [f32; 3]) -> (usize, usize, usize) {
    let [r, g, b] = c;
    if r >= g && g >= b {
        (0, 1, 2)
    } else if r >= b && b >= g {
        (0, 2, 1)
    } else if g >= r && r >= b {
        (1, 0, 2)
    } else if g >= b && b >= r {
        (1, 2, 0)
    } else if b >= r && r >= g {
        (2, 0, 1)
    } else {
        (2, 1, 0)
    }
}

/// Maps `v` to {0, 0.5, 1}: none, partial, full.
#[inline]
fn monitor_level(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else if v >= 1.0 {
        1.0
    } else {
        0.5
    }
}

/// The colour-difference keyer, with its optional core and garbage
/// mattes.
#[derive(Debug, Clone)]
pub struct InkKeyer<'a> {
    params: InkParams,
    order: (usize, usize, usize),
    key_diff: f32,
    core: Option<ImageRef<'a>>,
    garbage: Option<ImageRef<'a>>,
}

impl<'a> InkKeyer<'a> {
    /// Ranks the key colour's channels.
    pub fn new(params: InkParams) -> OpsResult<Self> {
        params.validate()?;
        let order = rank_channels(params.key_color);
        let mut keyer = Self {
            params,
            order,
            key_diff: 0.0,
            core: None,
            garbage: None,
        };
        keyer.key_diff = keyer.difference(params.key_color);
        Ok(keyer)
    }

    /// Matte of areas that are always foreground.
    pub fn with_core_matte(mut self, matte: ImageRef<'a>) -> Self {
        self.core = Some(matte);
        self
    }

    /// Matte of areas that are always background.
    pub fn with_garbage_matte(mut self, matte: ImageRef<'a>) -> Self {
        self.garbage = Some(matte);
        self
    }

    #[inline]
    fn difference(&self, c: [f32; 3]) -> f32 {
        let (max, mid, min) = self.order;
        let b = self.params.key_balance;
        c[max] - (b * c[mid] + (1.0 - b) * c[min])
    }

    /// Key amount of `rgb`: 0 foreground, 1 pure key.
    #[inline]
    pub fn key_amount(&self, rgb: [f32; 3]) -> f32 {
        if self.key_diff.abs() <= f32::EPSILON {
            return 0.0;
        }
        saturate(self.difference(rgb) / self.key_diff)
    }

    fn replacement(&self, fg: [f32; 3]) -> [f32; 3] {
        let rep = self.params.replacement_color;
        if !self.params.match_luminance {
            return rep;
        }
        let lum = |c: [f32; 3]| self.params.luminance_math.luminance(c[0], c[1], c[2]);
        let rep_lum = lum(rep);
        if rep_lum.abs() <= f32::EPSILON {
            return [0.0; 3];
        }
        let scale = lum(fg) / rep_lum;
        rep.map(|v| v * scale)
    }

    fn post_process(&self, alpha: f32) -> f32 {
        let p = &self.params;
        let a = if p.invert { 1.0 - alpha } else { alpha };
        let range = p.white_point - p.black_point;
        if range.abs() <= f32::EPSILON {
            return if a >= p.white_point { 1.0 } else { 0.0 };
        }
        saturate((a - p.black_point) / range)
    }
}

fn matte_value(matte: Option<&ImageRef<'_>>, x: i32, y: i32) -> f32 {
    matte.and_then(|m| m.alpha_at(x, y)).map_or(0.0, saturate)
}

impl PixelKernel for InkKeyer<'_> {
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
        let p = &self.params;
        let src = [pix[0], pix[1], pix[2]];
        let src_alpha = saturate(pix[3]);
        let key = p.key_color;

        let m = self.key_amount(src);
        let mut fg = [src[0] - m * key[0], src[1] - m * key[1], src[2] - m * key[2]];
        let mut alpha = 1.0 - m;

        if p.replacement_amount != 0.0 && m > 0.0 {
            let rep = self.replacement(fg);
            let k = m * p.replacement_amount;
            for (v, r) in fg.iter_mut().zip(rep) {
                *v += k * r;
            }
        }

        let mut core = matte_value(self.core.as_ref(), x, y);
        if p.source_alpha == InkSourceAlpha::AddToCore {
            core = saturate(core + src_alpha);
        }
        if core > 0.0 {
            alpha = alpha.max(core);
            for (v, s) in fg.iter_mut().zip(src) {
                *v = lerp(*v, s, core);
            }
        }

        let garbage = matte_value(self.garbage.as_ref(), x, y);
        if garbage > 0.0 {
            alpha = alpha.min(1.0 - garbage);
            fg = fg.map(|v| v * (1.0 - garbage));
        }

        if p.source_alpha == InkSourceAlpha::Multiply {
            alpha *= src_alpha;
            fg = fg.map(|v| v * src_alpha);
        }

        let alpha = self.post_process(saturate(alpha));

        *pix = match p.output {
            InkOutput::Premultiplied => [fg[0], fg[1], fg[2], alpha],
            InkOutput::Unpremultiplied => {
                if alpha > 0.0 {
                    [fg[0] / alpha, fg[1] / alpha, fg[2] / alpha, alpha]
                } else {
                    [0.0, 0.0, 0.0, 0.0]
                }
            }
            InkOutput::MatteMonitor => [monitor_level(alpha), monitor_level(core), monitor_level(garbage), 1.0],
        };
    }

    fn premultiply_output(&self, _premult: bool) -> bool {
        false
    }
}
