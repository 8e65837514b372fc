//! Scalar helpers shared by the kernels.
//!
//! ```rust
//! use fxkit_math::{lerp, remap, fract};
//!
//! assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
//! assert_eq!(remap(0.5, 0.0, 1.0, 0.0, 100.0), 50.0);
//! assert!((fract(-0.25) - 0.75).abs() < 1e-6);
//! ```

/// Linear interpolation: `a + (b - a) * t`.
///
/// Extrapolates for `t` outside [0, 1].
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Inverse of [`lerp`]; returns 0 when the range is degenerate.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < 1e-10 {
        0.0
    } else {
        (value - a) / (b - a)
    }
}

/// Remaps `value` from `[in_min, in_max]` to `[out_min, out_max]`.
#[inline]
pub fn remap(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    lerp(out_min, out_max, inverse_lerp(in_min, in_max, value))
}

/// Clamps `value` to `[min, max]`.
///
/// NaN maps to `min`.
#[inline]
pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Clamps to [0, 1].
#[inline]
pub fn saturate(value: f32) -> f32 {
    clamp(value, 0.0, 1.0)
}

/// Hermite smoothstep between `edge0` and `edge1`.
#[inline]
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = saturate(inverse_lerp(edge0, edge1, x));
    t * t * (3.0 - 2.0 * t)
}

/// 0 for `x < edge`, 1 otherwise.
#[inline]
pub fn step(edge: f32, x: f32) -> f32 {
    if x < edge { 0.0 } else { 1.0 }
}

/// Fractional part, always in [0, 1).
#[inline]
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

/// -1, 0 or 1.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x < 0.0 {
        -1.0
    } else if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Euclidean modulo for pixel coordinates: always in `[0, n)`.
///
/// ```rust
/// use fxkit_math::wrap_index;
///
/// assert_eq!(wrap_index(-1, 4), 3);
/// assert_eq!(wrap_index(9, 4), 1);
/// ```
#[inline]
pub fn wrap_index(v: i32, n: usize) -> usize {
    let n = n.max(1) as i32;
    (((v % n) + n) % n) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_and_inverse() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(inverse_lerp(2.0, 4.0, 3.0), 0.5);
        assert_eq!(inverse_lerp(1.0, 1.0, 3.0), 0.0);
    }

    #[test]
    fn test_clamp_nan() {
        assert_eq!(clamp(f32::NAN, 0.0, 1.0), 0.0);
        assert_eq!(saturate(1.5), 1.0);
        assert_eq!(saturate(-0.5), 0.0);
    }

    #[test]
    fn test_smoothstep_edges() {
        assert_eq!(smoothstep(0.0, 1.0, -1.0), 0.0);
        assert_eq!(smoothstep(0.0, 1.0, 0.5), 0.5);
        assert_eq!(smoothstep(0.0, 1.0, 2.0), 1.0);
    }

    #[test]
    fn test_wrap_index_negative() {
        for v in -20..20 {
            let w = wrap_index(v, 7);
            assert!(w < 7);
            assert_eq!((w as i32 - v).rem_euclid(7), 0);
        }
    }

    #[test]
    fn test_sign_and_fract() {
        assert_eq!(sign(-3.0), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert!((fract(1.75) - 0.75).abs() < 1e-6);
    }
}
