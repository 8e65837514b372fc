//! Angle-based chroma keyer.
//!
//! Pixels are moved to Rec.709 YPbPr and their chrominance is rotated so
//! the key colour lies on the positive X axis. A pixel whose chrominance
//! falls inside the acceptance wedge around that axis is keyed:
//!
//! ```text
//! Kfg = max(0, x - |z| / tan(acceptance / 2)) / |key chroma|
//! Kbg = clamp((Kfg * gain - lift) / (1 - lift), 0, 1)
//! Kbg = max(min(Kbg, 1 - inside), outside)
//! a   = 1 - Kbg
//! ```
//!
//! Outside the intermediate mode the foreground is despilled by removing
//! `Ks × key` where `Ks` is the same wedge test at the suppression angle.
//! A key colour with no chrominance (grey) is treated as pure blue
//! (`Pb = 1`).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_core::ImageRef;
use fxkit_math::{saturate, YPbPrStandard};
use fxkit_transfer::{Lut, LutManager, TransferCurve};

use crate::{OpsError, OpsResult, PixelKernel};

const STANDARD: YPbPrStandard = YPbPrStandard::Rec709;

/// What the keyer writes to RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyerOutput {
    /// Source colour with the key in alpha
    #[default]
    Intermediate,
    /// Despilled foreground, premultiplied by the key
    Premultiplied,
    /// Despilled foreground divided by alpha
    Unpremultiplied,
    /// Despilled foreground over the background input
    Composite,
}

/// How the source alpha takes part in the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum KeyerSourceAlpha {
    /// Source alpha is not used
    #[default]
    Ignore,
    /// Source alpha is added to the inside mask
    AddToInsideMask,
    /// Output alpha is multiplied by source alpha
    Normal,
}

/// Settings of [`ChromaKeyer`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChromaKeyerParams {
    /// Background colour to key out
    pub key_color: [f32; 3],
    /// Full width of the keyed wedge, degrees
    pub acceptance_angle: f32,
    /// Full width of the despill wedge, degrees
    pub suppression_angle: f32,
    /// Key lift
    pub key_lift: f32,
    /// Key gain
    pub key_gain: f32,
    /// RGB output
    pub output_mode: KeyerOutput,
    /// Source alpha handling
    pub source_alpha: KeyerSourceAlpha,
    /// Input and key colour are linear; key in Rec.709 encoded space
    pub linear_input: bool,
}

impl Default for ChromaKeyerParams {
    fn default() -> Self {
        Self {
            key_color: [0.0, 0.0, 1.0],
            acceptance_angle: 120.0,
            suppression_angle: 160.0,
            key_lift: 0.0,
            key_gain: 1.0,
            output_mode: KeyerOutput::Intermediate,
            source_alpha: KeyerSourceAlpha::Ignore,
            linear_input: false,
        }
    }
}

impl ChromaKeyerParams {
    /// Rejects non-finite values and non-positive angles.
    pub fn validate(&self) -> OpsResult<()> {
        let values = [
            self.key_color[0],
            self.key_color[1],
            self.key_color[2],
            self.acceptance_angle,
            self.suppression_angle,
            self.key_lift,
            self.key_gain,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OpsError::invalid("chroma keyer values must be finite"));
        }
        if self.acceptance_angle <= 0.0 || self.suppression_angle <= 0.0 {
            return Err(OpsError::invalid("keyer angles must be positive"));
        }
        Ok(())
    }
}

/// Wedge test around the key axis. `None` accepts the whole half plane.
#[derive(Debug, Clone, Copy)]
struct Wedge {
    inv_tan_half: Option<f32>,
}

impl Wedge {
    fn new(angle_deg: f32) -> Self {
        let inv_tan_half = (angle_deg < 180.0).then(|| 1.0 / (angle_deg.to_radians() / 2.0).tan());
        Self { inv_tan_half }
    }

    #[inline]
    fn distance(self, x: f32, z: f32) -> f32 {
        match self.inv_tan_half {
            Some(k) => (x - z.abs() * k).max(0.0),
            None => x.max(0.0),
        }
    }
}

/// The chroma keyer, with its optional mask and background inputs.
#[derive(Debug, Clone)]
pub struct ChromaKeyer<'a> {
    params: ChromaKeyerParams,
    key: [f32; 3],
    cos: f32,
    sin: f32,
    norm: f32,
    acceptance: Wedge,
    suppression: Wedge,
    lut: Option<&'static Lut>,
    inside: Option<ImageRef<'a>>,
    outside: Option<ImageRef<'a>>,
    background: Option<ImageRef<'a>>,
}

impl<'a> ChromaKeyer<'a> {
    /// Resolves the key colour and angles.
    pub fn new(params: ChromaKeyerParams) -> OpsResult<Self> {
        params.validate()?;
        let lut = params.linear_input.then(|| LutManager::global().get(TransferCurve::Rec709));
        let key_rgb = match lut {
            Some(lut) => lut.from_linear_rgb(params.key_color),
            None => params.key_color,
        };
        let key = STANDARD.from_rgb(key_rgb);
        let chroma = (key[1] * key[1] + key[2] * key[2]).sqrt();
        let (cos, sin, norm) = if chroma > 1e-6 {
            (key[1] / chroma, key[2] / chroma, chroma)
        } else {
            (1.0, 0.0, 1.0)
        };

        Ok(Self {
            params,
            key,
            cos,
            sin,
            norm,
            acceptance: Wedge::new(params.acceptance_angle),
            suppression: Wedge::new(params.suppression_angle),
            lut,
            inside: None,
            outside: None,
            background: None,
        })
    }

    /// Mask of areas that are always foreground.
    pub fn with_inside_mask(mut self, mask: ImageRef<'a>) -> Self {
        self.inside = Some(mask);
        self
    }

    /// Mask of areas that are always background.
    pub fn with_outside_mask(mut self, mask: ImageRef<'a>) -> Self {
        self.outside = Some(mask);
        self
    }

    /// Image composited behind the foreground in [`KeyerOutput::Composite`].
    pub fn with_background(mut self, bg: ImageRef<'a>) -> Self {
        self.background = Some(bg);
        self
    }

    /// Rotates chrominance so the key lies on +X.
    #[inline]
    fn rotate(&self, pb: f32, pr: f32) -> (f32, f32) {
        (pb * self.cos + pr * self.sin, pr * self.cos - pb * self.sin)
    }

    /// Background key for colour `rgb` (encoded) and the given masks.
    ///
    /// The masks are merged by min / max, never multiplied: the resulting
    /// alpha is at least `inside` and at most `1 - outside`, with the
    /// outside mask applied last.
    #[inline]
    pub fn background_key(&self, rgb: [f32; 3], inside: f32, outside: f32) -> f32 {
        let [_, pb, pr] = STANDARD.from_rgb(rgb);
        let (x, z) = self.rotate(pb, pr);
        let kfg = self.acceptance.distance(x, z) / self.norm;
        self.ramp(kfg).min(1.0 - inside).max(outside)
    }

    #[inline]
    fn ramp(&self, kfg: f32) -> f32 {
        let lift = self.params.key_lift;
        let v = kfg * self.params.key_gain;
        if lift >= 1.0 {
            return if v >= 1.0 { 1.0 } else { 0.0 };
        }
        saturate((v - lift) / (1.0 - lift))
    }

    /// Despilled foreground of `rgb` (encoded).
    #[inline]
    fn suppress(&self, rgb: [f32; 3]) -> [f32; 3] {
        let [y, pb, pr] = STANDARD.from_rgb(rgb);
        let (x, z) = self.rotate(pb, pr);
        let ks = self.suppression.distance(x, z) / self.norm;
        let y = (y - ks * self.key[0]).max(0.0);
        STANDARD.to_rgb([y, pb - ks * self.key[1], pr - ks * self.key[2]])
    }
}

fn mask_value(mask: Option<&ImageRef<'_>>, x: i32, y: i32) -> f32 {
    mask.and_then(|m| m.alpha_at(x, y)).map_or(0.0, saturate)
}

impl PixelKernel for ChromaKeyer<'_> {
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
        let src = [pix[0], pix[1], pix[2]];
        let src_alpha = saturate(pix[3]);
        let encoded = match self.lut {
            Some(lut) => lut.from_linear_rgb(src),
            None => src,
        };

        let mut inside = mask_value(self.inside.as_ref(), x, y);
        if self.params.source_alpha == KeyerSourceAlpha::AddToInsideMask {
            inside = saturate(inside + src_alpha);
        }
        let outside = mask_value(self.outside.as_ref(), x, y);

        let kbg = self.background_key(encoded, inside, outside);
        let mut alpha = 1.0 - kbg;
        if self.params.source_alpha == KeyerSourceAlpha::Normal {
            alpha *= src_alpha;
        }

        let rgb = match self.params.output_mode {
            KeyerOutput::Intermediate => src,
            mode => {
                let fg = self.suppress(encoded);
                let fg = match self.lut {
                    Some(lut) => lut.to_linear_rgb(fg),
                    None => fg,
                };
                match mode {
                    KeyerOutput::Unpremultiplied => {
                        if alpha > 0.0 {
                            fg.map(|v| v / alpha)
                        } else {
                            [0.0; 3]
                        }
                    }
                    KeyerOutput::Composite => {
                        let bg = self
                            .background
                            .as_ref()
                            .and_then(|b| b.pixel_f32(x, y))
                            .unwrap_or([0.0; 4]);
                        alpha = saturate(alpha + kbg * bg[3]);
                        [fg[0] + kbg * bg[0], fg[1] + kbg * bg[1], fg[2] + kbg * bg[2]]
                    }
                    _ => fg,
                }
            }
        };
        *pix = [rgb[0], rgb[1], rgb[2], alpha];
    }

    fn premultiply_output(&self, premult: bool) -> bool {
        premult && self.params.output_mode == KeyerOutput::Intermediate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use fxkit_core::{BitDepth, Components, Image, Rect};

    // bluish grey at a quarter of the way into the key
    const PARTIAL: [f32; 4] = [0.3, 0.3, 0.55, 1.0];

    fn keyer(mode: KeyerOutput) -> ChromaKeyer<'static> {
        ChromaKeyer::new(ChromaKeyerParams { output_mode: mode, ..Default::default() }).unwrap()
    }

    fn matte(value: f32) -> Image {
        Image::filled(Rect::new(0, 0, 1, 1), Components::Alpha, BitDepth::F32, [0.0, 0.0, 0.0, value])
    }

    fn alpha_of(k: &ChromaKeyer<'_>, x: i32, rgba: [f32; 4]) -> f32 {
        let mut px = rgba;
        k.process(x, 0, &mut px);
        px[3]
    }

    #[test]
    fn test_key_colour_is_fully_transparent() {
        let k = keyer(KeyerOutput::Premultiplied);
        let mut px = [0.0, 0.0, 1.0, 1.0];
        k.process(0, 0, &mut px);
        assert_abs_diff_eq!(px[3], 0.0, epsilon = 1e-5);
        for v in &px[..3] {
            assert_abs_diff_eq!(*v, 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_off_key_colours_are_opaque() {
        let k = keyer(KeyerOutput::Intermediate);
        for rgb in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.5, 0.5, 0.5], [1.0, 1.0, 0.0]] {
            let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
            k.process(0, 0, &mut px);
            assert_eq!(px[3], 1.0, "{rgb:?}");
            assert_eq!(&px[..3], &rgb);
        }
    }

    #[test]
    fn test_grey_key_falls_back_to_blue() {
        let grey = ChromaKeyer::new(ChromaKeyerParams {
            key_color: [0.5, 0.5, 0.5],
            output_mode: KeyerOutput::Unpremultiplied,
            ..Default::default()
        })
        .unwrap();
        for rgb in [[0.0, 0.0, 1.0], [0.5, 0.5, 0.5], [0.2, 0.9, 0.1], [0.0, 0.0, 0.0]] {
            let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
            grey.process(0, 0, &mut px);
            assert!(px.iter().all(|v| v.is_finite()), "{rgb:?} -> {px:?}");
        }
        let mut px = [0.0, 0.0, 1.0, 1.0];
        grey.process(0, 0, &mut px);
        assert!(px[3] < 1.0);
    }

    #[test]
    fn test_masks() {
        let k = keyer(KeyerOutput::Intermediate);
        let blue = [0.0, 0.0, 1.0];
        assert_abs_diff_eq!(k.background_key(blue, 1.0, 0.0), 0.0);
        assert_abs_diff_eq!(k.background_key([1.0, 0.0, 0.0], 0.0, 1.0), 1.0);
        // the outside mask wins over the inside mask
        assert_abs_diff_eq!(k.background_key(blue, 1.0, 1.0), 1.0);
    }

    #[test]
    fn test_inside_mask_raises_partial_alpha_to_mask_value() {
        let unmasked = alpha_of(&keyer(KeyerOutput::Intermediate), 0, PARTIAL);
        assert_abs_diff_eq!(unmasked, 0.75, epsilon = 1e-3);

        // a weaker inside mask leaves the key alone
        let half = matte(0.5);
        let k = keyer(KeyerOutput::Intermediate).with_inside_mask(half.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, PARTIAL), unmasked, epsilon = 1e-6);

        let strong = matte(0.9);
        let k = keyer(KeyerOutput::Intermediate).with_inside_mask(strong.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, PARTIAL), 0.9, epsilon = 1e-6);
        // outside the mask bounds the mask reads as zero
        assert_abs_diff_eq!(alpha_of(&k, 5, PARTIAL), unmasked, epsilon = 1e-6);
    }

    #[test]
    fn test_outside_mask_caps_alpha_after_inside_mask() {
        let full = matte(1.0);
        let garbage = matte(0.7);
        let k = keyer(KeyerOutput::Intermediate)
            .with_inside_mask(full.view())
            .with_outside_mask(garbage.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, [1.0, 0.0, 0.0, 1.0]), 0.3, epsilon = 1e-6);

        let weak = matte(0.1);
        let k = keyer(KeyerOutput::Intermediate).with_outside_mask(weak.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, PARTIAL), 0.75, epsilon = 1e-3);
        let k = keyer(KeyerOutput::Intermediate).with_outside_mask(garbage.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, PARTIAL), 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_composite_over_background() {
        let bg = Image::filled(Rect::new(0, 0, 1, 1), Components::Rgba, BitDepth::F32, [0.2, 0.4, 0.6, 1.0]);
        let k = keyer(KeyerOutput::Composite).with_background(bg.view());

        let mut px = [0.0, 0.0, 1.0, 1.0];
        k.process(0, 0, &mut px);
        for (got, want) in px.iter().zip([0.2, 0.4, 0.6, 1.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-4);
        }

        let mut px = [1.0, 0.0, 0.0, 1.0];
        k.process(0, 0, &mut px);
        for (got, want) in px.iter().zip([1.0, 0.0, 0.0, 1.0]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-4);
        }

        // no background pixel: the key shows black with the foreground alpha
        let mut px = [0.0, 0.0, 1.0, 1.0];
        k.process(3, 0, &mut px);
        assert_abs_diff_eq!(px[3], 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_linear_input_keys_the_encoded_colour() {
        let linear = ChromaKeyer::new(ChromaKeyerParams { linear_input: true, ..Default::default() }).unwrap();
        let encoded = keyer(KeyerOutput::Intermediate);
        let lut = LutManager::global().get(TransferCurve::Rec709);

        for rgb in [[0.1, 0.1, 0.3], [0.05, 0.2, 0.6], [0.4, 0.3, 0.2]] {
            let [r, g, b] = lut.from_linear_rgb(rgb);
            let want = alpha_of(&encoded, 0, [r, g, b, 1.0]);
            let mut px = [rgb[0], rgb[1], rgb[2], 1.0];
            linear.process(0, 0, &mut px);
            assert_abs_diff_eq!(px[3], want, epsilon = 1e-5);
            // intermediate output keeps the linear source colour
            assert_eq!(&px[..3], &rgb);
        }
        assert_abs_diff_eq!(alpha_of(&linear, 0, [0.0, 0.0, 1.0, 1.0]), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_lift_and_gain() {
        let k = ChromaKeyer::new(ChromaKeyerParams { key_gain: 4.0, ..Default::default() }).unwrap();
        assert_eq!(k.ramp(0.5), 1.0);
        let k = ChromaKeyer::new(ChromaKeyerParams { key_lift: 0.5, ..Default::default() }).unwrap();
        assert_abs_diff_eq!(k.ramp(0.75), 0.5);
        assert_eq!(k.ramp(0.25), 0.0);
        let k = ChromaKeyer::new(ChromaKeyerParams { key_lift: 1.0, ..Default::default() }).unwrap();
        assert_eq!(k.ramp(0.99), 0.0);
        assert_eq!(k.ramp(1.0), 1.0);
    }

    #[test]
    fn test_source_alpha_modes() {
        let p = ChromaKeyerParams { source_alpha: KeyerSourceAlpha::Normal, ..Default::default() };
        let k = ChromaKeyer::new(p).unwrap();
        let mut px = [1.0, 0.0, 0.0, 0.5];
        k.process(0, 0, &mut px);
        assert_abs_diff_eq!(px[3], 0.5);

        let p = ChromaKeyerParams { source_alpha: KeyerSourceAlpha::AddToInsideMask, ..Default::default() };
        let k = ChromaKeyer::new(p).unwrap();
        let mut px = [0.0, 0.0, 1.0, 1.0];
        k.process(0, 0, &mut px);
        assert_abs_diff_eq!(px[3], 1.0);

        // inside mask 0.3 plus source alpha 0.4
        let inside = matte(0.3);
        let k = ChromaKeyer::new(p).unwrap().with_inside_mask(inside.view());
        assert_abs_diff_eq!(alpha_of(&k, 0, [0.0, 0.0, 1.0, 0.4]), 0.7, epsilon = 1e-5);

        let k = keyer(KeyerOutput::Intermediate);
        assert_abs_diff_eq!(alpha_of(&k, 0, [0.3, 0.3, 0.55, 0.2]), 0.75, epsilon = 1e-3);
    }

    #[test]
    fn test_premultiply_output_only_in_intermediate() {
        assert!(keyer(KeyerOutput::Intermediate).premultiply_output(true));
        assert!(!keyer(KeyerOutput::Composite).premultiply_output(true));
        assert!(!keyer(KeyerOutput::Intermediate).premultiply_output(false));
    }

    #[test]
    fn test_rejects_zero_angle() {
        let p = ChromaKeyerParams { acceptance_angle: 0.0, ..Default::default() };
        assert!(ChromaKeyer::new(p).is_err());
    }
}
