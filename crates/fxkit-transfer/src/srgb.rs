//! sRGB transfer function (IEC 61966-2-1).
//!
//! Piecewise: a linear toe below 0.04045 (encoded) and a 2.4 power above.

/// sRGB encoded to linear.
///
/// ```text
/// V <= 0.04045:  L = V / 12.92
/// otherwise:     L = ((V + 0.055) / 1.055)^2.4
/// ```
#[inline]
pub fn eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// Linear to sRGB encoded.
#[inline]
pub fn oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            let back = oetf(eotf(v));
            assert!((v - back).abs() < 1e-5, "v={v}, back={back}");
        }
    }

    #[test]
    fn test_midpoint() {
        assert!((eotf(0.5) - 0.214).abs() < 0.01);
    }
}
