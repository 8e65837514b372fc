//! Premultiplication, masking and mix.
//!
//! Every kernel runs between the same two steps:
//!
//! 1. [`unpremultiply`] - stored samples to straight-colour RGBA floats
//! 2. [`premultiply_mask_mix`] - re-premultiply, blend with the source by
//!    `mix × mask`, convert back to the destination sample type
//!
//! # Blend weight
//!
//! ```text
//! weight = mix                         (no masking)
//! weight = mix * mask                  (masking, mask pixel present)
//! weight = mix * (1 - mask)            (masking, inverted)
//! weight = mix * (invert ? 1 : 0)      (masking, mask pixel absent)
//! ```
//!
//! `weight <= 0` copies the source samples bit for bit and `weight == 1`
//! writes the computed value without blending, so `mix = 0` is an exact
//! bypass and `mix = 1` loses nothing.

use fxkit_core::{Components, Sample, image::expand_rgba};

/// Resolved premultiply / mask / mix settings for one render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskMix {
    /// Source colour is premultiplied and must be divided before processing
    pub premult: bool,
    /// RGBA slot holding the premultiplication channel (normally 3)
    pub premult_channel: usize,
    /// Blend factor between source (0) and result (1)
    pub mix: f32,
    /// Use `1 - mask` as the mask weight
    pub mask_invert: bool,
}

impl Default for MaskMix {
    fn default() -> Self {
        Self {
            premult: false,
            premult_channel: 3,
            mix: 1.0,
            mask_invert: false,
        }
    }
}

impl MaskMix {
    /// Blend weight for one pixel.
    ///
    /// `mask` is `None` when masking is disabled and `Some(None)` when it is
    /// enabled but the mask has no pixel at this position.
    #[inline]
    pub fn weight(&self, mask: Option<Option<f32>>) -> f32 {
        let scale = match mask {
            None => 1.0,
            Some(None) => {
                if self.mask_invert { 1.0 } else { 0.0 }
            }
            Some(Some(m)) => {
                if self.mask_invert { 1.0 - m } else { m }
            }
        };
        scale * self.mix
    }
}

/// Stored samples to normalised RGBA, dividing colour by the premultiply
/// channel when `premult` is set.
///
/// An absent pixel reads as transparent black. Alpha at or below zero leaves
/// colour untouched instead of dividing.
#[inline]
pub fn unpremultiply<T: Sample>(
    src: Option<&[T]>,
    components: Components,
    premult: bool,
    premult_channel: usize,
) -> [f32; 4] {
    let Some(src) = src else {
        return [0.0; 4];
    };
    let mut rgba = expand_rgba(src, components);
    if premult && components.has_color() {
        let a = rgba[premult_channel.min(3)];
        if a > 0.0 {
            rgba[0] /= a;
            rgba[1] /= a;
            rgba[2] /= a;
        }
    }
    rgba
}

/// Multiplies colour by the premultiply channel.
#[inline]
pub fn premultiply(rgba: &mut [f32; 4], premult_channel: usize) {
    let a = rgba[premult_channel.min(3)];
    rgba[0] *= a;
    rgba[1] *= a;
    rgba[2] *= a;
}

/// Re-premultiplies `tmp` if requested, blends it with `src` by `weight`
/// and stores the result into `dst`.
///
/// `tmp` is indexed by RGBA slot; `src` and `dst` are stored samples with
/// the layout `components`. Integer destinations clamp to `[0, MAX]`.
#[inline]
pub fn premultiply_mask_mix<T: Sample>(
    tmp: &[f32; 4],
    premult: bool,
    premult_channel: usize,
    weight: f32,
    src: Option<&[T]>,
    dst: &mut [T],
    components: Components,
) {
    let indices = components.rgba_indices();

    if weight <= 0.0 {
        match src {
            Some(s) => dst.copy_from_slice(&s[..dst.len()]),
            None => dst.fill(T::zero()),
        }
        return;
    }

    let mut out = *tmp;
    if premult && components.has_color() {
        premultiply(&mut out, premult_channel);
    }

    if weight == 1.0 {
        for (d, &c) in dst.iter_mut().zip(indices) {
            *d = T::from_f32(out[c]);
        }
        return;
    }

    match src {
        Some(s) => {
            for ((d, s), &c) in dst.iter_mut().zip(s).zip(indices) {
                *d = T::from_f32(out[c] * weight + s.to_f32() * (1.0 - weight));
            }
        }
        None => {
            for (d, &c) in dst.iter_mut().zip(indices) {
                *d = T::from_f32(out[c] * weight);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_unpremultiply_divides_color() {
        let src = [0.25f32, 0.5, 0.1, 0.5];
        let rgba = unpremultiply(Some(&src[..]), Components::Rgba, true, 3);
        assert_abs_diff_eq!(rgba[0], 0.5);
        assert_abs_diff_eq!(rgba[1], 1.0);
        assert_abs_diff_eq!(rgba[3], 0.5);

        let straight = unpremultiply(Some(&src[..]), Components::Rgba, false, 3);
        assert_eq!(straight, src);
    }

    #[test]
    fn test_unpremultiply_zero_alpha_is_identity() {
        let src = [0.25f32, 0.5, 0.1, 0.0];
        assert_eq!(unpremultiply(Some(&src[..]), Components::Rgba, true, 3), src);
        assert_eq!(unpremultiply::<f32>(None, Components::Rgba, true, 3), [0.0; 4]);
    }

    #[test]
    fn test_premultiply_saturated_alpha_is_noop() {
        let src = [64u8, 128, 255, 255];
        let tmp = unpremultiply(Some(&src[..]), Components::Rgba, true, 3);
        let mut dst = [0u8; 4];
        premultiply_mask_mix(&tmp, true, 3, 1.0, Some(&src[..]), &mut dst, Components::Rgba);
        assert_eq!(dst, src);
    }

    #[test]
    fn test_mix_zero_is_exact_bypass() {
        let src = [0.123f32, f32::NAN, 7.0, 0.5];
        let tmp = [f32::INFINITY, 0.0, 0.0, 1.0];
        let mut dst = [0.0f32; 4];
        premultiply_mask_mix(&tmp, false, 3, 0.0, Some(&src[..]), &mut dst, Components::Rgba);
        assert_eq!(dst[0], 0.123);
        assert!(dst[1].is_nan());
        assert_eq!(dst[2], 7.0);
    }

    #[test]
    fn test_partial_mix_blends() {
        let src = [0u16, 65535, 0];
        let tmp = [1.0, 0.0, 0.5, 1.0];
        let mut dst = [0u16; 3];
        premultiply_mask_mix(&tmp, false, 3, 0.5, Some(&src[..]), &mut dst, Components::Rgb);
        assert_eq!(dst, [32768, 32768, 16384]);
    }

    #[test]
    fn test_alpha_only_layout() {
        let tmp = [0.9, 0.9, 0.9, 0.25];
        let mut dst = [0.0f32];
        premultiply_mask_mix::<f32>(&tmp, true, 3, 1.0, None, &mut dst, Components::Alpha);
        assert_eq!(dst, [0.25]);
    }

    #[test]
    fn test_weight() {
        let mm = MaskMix { mix: 0.5, ..Default::default() };
        assert_eq!(mm.weight(None), 0.5);
        assert_eq!(mm.weight(Some(None)), 0.0);
        assert_eq!(mm.weight(Some(Some(0.5))), 0.25);
        let inv = MaskMix { mask_invert: true, ..mm };
        assert_eq!(inv.weight(Some(None)), 0.5);
        assert_eq!(inv.weight(Some(Some(0.25))), 0.375);
    }
}
