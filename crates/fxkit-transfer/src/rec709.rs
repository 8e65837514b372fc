//! Rec.709 (BT.709) camera transfer function.

/// Linear to Rec.709 encoded.
///
/// ```text
/// L < 0.018:  V = 4.5 L
/// otherwise:  V = 1.099 L^0.45 - 0.099
/// ```
#[inline]
pub fn oetf(l: f32) -> f32 {
    if l < 0.018 {
        4.5 * l
    } else {
        1.099 * l.powf(0.45) - 0.099
    }
}

/// Rec.709 encoded to linear (inverse OETF).
#[inline]
pub fn eotf(v: f32) -> f32 {
    if v < 0.081 {
        v / 4.5
    } else {
        ((v + 0.099) / 1.099).powf(1.0 / 0.45)
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
            assert!((v - back).abs() < 1e-4, "v={v}, back={back}");
        }
    }
}
