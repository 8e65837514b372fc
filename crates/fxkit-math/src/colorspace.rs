//! Colour-space conversions used by the kernels.
//!
//! - [`YPbPrStandard`] - RGB ↔ YPbPr for CCIR 601, Rec.709 and Rec.2020
//! - [`rgb_to_hsv`] / [`hsv_to_rgb`] - hue in degrees, always in [0, 360)
//! - [`LuminanceMath`] - the seven luminance weightings offered by the
//!   colour tools
//!
//! All conversions are linear-light agnostic: they operate on whatever
//! values they are given.
//!
//! # YPbPr
//!
//! With luma weights `Kr`, `Kb` and `Kg = 1 - Kr - Kb`:
//!
//! ```text
//! Y  = Kr R + Kg G + Kb B
//! Pb = 0.5 (B - Y) / (1 - Kb)
//! Pr = 0.5 (R - Y) / (1 - Kr)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use fxkit_math::{YPbPrStandard, rgb_to_hsv, hsv_to_rgb};
//!
//! let ypbpr = YPbPrStandard::Rec709.from_rgb([0.0, 0.0, 1.0]);
//! assert!((ypbpr[1] - 0.5).abs() < 1e-6); // pure blue has Pb = 0.5
//!
//! let hsv = rgb_to_hsv([0.0, 1.0, 0.0]);
//! assert_eq!(hsv, [120.0, 1.0, 1.0]);
//! let rgb = hsv_to_rgb(hsv);
//! assert!((rgb[1] - 1.0).abs() < 1e-6);
//! ```
//!
//! # Dependencies
//!
//! - [`glam`] - `Vec3` dot products for the luma weights

use glam::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Luma weights of a YPbPr standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum YPbPrStandard {
    /// ITU-R BT.601 (SD video)
    Ccir601,
    /// ITU-R BT.709 (HD video)
    #[default]
    Rec709,
    /// ITU-R BT.2020 (UHD video)
    Rec2020,
}

impl YPbPrStandard {
    /// `(Kr, Kb)` for this standard.
    #[inline]
    pub const fn kr_kb(self) -> (f32, f32) {
        match self {
            Self::Ccir601 => (0.299, 0.114),
            Self::Rec709 => (0.2126, 0.0722),
            Self::Rec2020 => (0.2627, 0.0593),
        }
    }

    /// Luma weights as a vector `(Kr, Kg, Kb)`.
    #[inline]
    pub fn weights(self) -> Vec3 {
        let (kr, kb) = self.kr_kb();
        Vec3::new(kr, 1.0 - kr - kb, kb)
    }

    /// RGB to `[Y, Pb, Pr]`.
    #[inline]
    pub fn from_rgb(self, rgb: [f32; 3]) -> [f32; 3] {
        let (kr, kb) = self.kr_kb();
        let y = self.weights().dot(Vec3::from_array(rgb));
        let pb = 0.5 * (rgb[2] - y) / (1.0 - kb);
        let pr = 0.5 * (rgb[0] - y) / (1.0 - kr);
        [y, pb, pr]
    }

    /// `[Y, Pb, Pr]` back to RGB.
    #[inline]
    pub fn to_rgb(self, ypbpr: [f32; 3]) -> [f32; 3] {
        let (kr, kb) = self.kr_kb();
        let kg = 1.0 - kr - kb;
        let [y, pb, pr] = ypbpr;
        let r = y + 2.0 * (1.0 - kr) * pr;
        let b = y + 2.0 * (1.0 - kb) * pb;
        let g = (y - kr * r - kb * b) / kg;
        [r, g, b]
    }
}

/// RGB to `[h, s, v]`, hue in degrees normalised into [0, 360).
///
/// Achromatic input gets hue 0; black gets saturation 0.
pub fn rgb_to_hsv(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta <= 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    [normalize_hue(h), s, max]
}

/// `[h, s, v]` to RGB. Hue may be any angle in degrees.
pub fn hsv_to_rgb(hsv: [f32; 3]) -> [f32; 3] {
    let [h, s, v] = hsv;
    if s <= 0.0 {
        return [v, v, v];
    }
    let c = v * s;
    let h_prime = normalize_hue(h) / 60.0;
    let x = c * (1.0 - ((h_prime % 2.0) - 1.0).abs());

    let (r1, g1, b1) = if h_prime < 1.0 {
        (c, x, 0.0)
    } else if h_prime < 2.0 {
        (x, c, 0.0)
    } else if h_prime < 3.0 {
        (0.0, c, x)
    } else if h_prime < 4.0 {
        (0.0, x, c)
    } else if h_prime < 5.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let m = v - c;
    [r1 + m, g1 + m, b1 + m]
}

/// Wraps an angle in degrees into [0, 360).
#[inline]
pub fn normalize_hue(h: f32) -> f32 {
    if !h.is_finite() {
        return 0.0;
    }
    let h = h.rem_euclid(360.0);
    // rem_euclid can round tiny negatives up to exactly 360
    if h >= 360.0 { 0.0 } else { h }
}

/// Luminance weighting selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LuminanceMath {
    /// BT.709 weights
    #[default]
    Rec709,
    /// BT.2020 weights
    Rec2020,
    /// ACES AP0 primaries
    AcesAp0,
    /// ACES AP1 primaries
    AcesAp1,
    /// BT.601 weights
    Ccir601,
    /// `(r + g + b) / 3`
    Average,
    /// `max(r, g, b)`
    Maximum,
}

impl LuminanceMath {
    /// Luminance of an RGB triplet.
    #[inline]
    pub fn luminance(self, r: f32, g: f32, b: f32) -> f32 {
        match self {
            Self::Rec709 => 0.2126 * r + 0.7152 * g + 0.0722 * b,
            Self::Rec2020 => 0.2627 * r + 0.6780 * g + 0.0593 * b,
            Self::AcesAp0 => 0.343_966_45 * r + 0.728_166_1 * g - 0.072_132_546 * b,
            Self::AcesAp1 => 0.272_228_72 * r + 0.674_081_8 * g + 0.053_689_517 * b,
            Self::Ccir601 => 0.299 * r + 0.587 * g + 0.114 * b,
            Self::Average => (r + g + b) / 3.0,
            Self::Maximum => r.max(g).max(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const STANDARDS: [YPbPrStandard; 3] = [
        YPbPrStandard::Ccir601,
        YPbPrStandard::Rec709,
        YPbPrStandard::Rec2020,
    ];

    #[test]
    fn test_ypbpr_roundtrip() {
        for std in STANDARDS {
            for ri in 0..=8 {
                for gi in 0..=8 {
                    for bi in 0..=8 {
                        let rgb = [ri as f32 / 8.0, gi as f32 / 8.0, bi as f32 / 8.0];
                        let back = std.to_rgb(std.from_rgb(rgb));
                        for c in 0..3 {
                            assert_abs_diff_eq!(back[c], rgb[c], epsilon = 1e-5);
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_ypbpr_extremes() {
        for std in STANDARDS {
            let white = std.from_rgb([1.0, 1.0, 1.0]);
            assert_abs_diff_eq!(white[0], 1.0, epsilon = 1e-6);
            assert_abs_diff_eq!(white[1], 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(white[2], 0.0, epsilon = 1e-6);
            let red = std.from_rgb([1.0, 0.0, 0.0]);
            assert_abs_diff_eq!(red[2], 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_hsv_roundtrip() {
        for hi in 0..36 {
            for si in 1..=4 {
                for vi in 1..=4 {
                    let hsv = [hi as f32 * 10.0, si as f32 / 4.0, vi as f32 / 4.0];
                    let back = rgb_to_hsv(hsv_to_rgb(hsv));
                    assert_abs_diff_eq!(back[0], hsv[0], epsilon = 1e-3);
                    assert_abs_diff_eq!(back[1], hsv[1], epsilon = 1e-5);
                    assert_abs_diff_eq!(back[2], hsv[2], epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn test_hue_range() {
        assert_eq!(normalize_hue(-1e-9), 0.0);
        assert_eq!(normalize_hue(360.0), 0.0);
        assert_eq!(normalize_hue(-90.0), 270.0);
        // magenta-ish: max is r, g < b gives a negative raw hue
        let h = rgb_to_hsv([1.0, 0.0, 0.5])[0];
        assert!((0.0..360.0).contains(&h));
        assert_abs_diff_eq!(h, 330.0, epsilon = 1e-4);
    }

    #[test]
    fn test_luminance_weights_sum_to_one() {
        for m in [
            LuminanceMath::Rec709,
            LuminanceMath::Rec2020,
            LuminanceMath::AcesAp0,
            LuminanceMath::AcesAp1,
            LuminanceMath::Ccir601,
            LuminanceMath::Average,
            LuminanceMath::Maximum,
        ] {
            assert_abs_diff_eq!(m.luminance(1.0, 1.0, 1.0), 1.0, epsilon = 1e-5);
        }
        assert_eq!(LuminanceMath::Maximum.luminance(0.1, 0.7, 0.3), 0.7);
    }
}
