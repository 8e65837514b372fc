//! Sample types and the bit-depth conversion table.
//!
//! Every kernel works in normalised `f32`; conversion to and from the
//! native sample type happens at the tile boundary through [`Sample`].
//!
//! # Types
//!
//! - [`Sample`] - trait for `u8`, `u16`, `f16` and `f32` samples
//! - [`SampleValue`] - a sample of any depth, used for exact depth conversion
//!
//! # Conversion rules
//!
//! | From \ To | 8-bit | 16-bit | float |
//! |-----------|-------|--------|-------|
//! | 8-bit     | =     | `(v << 8) + v` | `v / 255` |
//! | 16-bit    | `((v+128) - ((v+128) >> 8)) >> 8` | = | `v / 65535` |
//! | float     | scale, round half up, clamp | scale, round half up, clamp | = |
//!
//! Byte replication and the unbiased 16 → 8 rounding are exact: every 8-bit
//! value survives 8 → 16 → 8 unchanged.
//!
//! ```
//! use fxkit_core::pixel::{convert, Sample};
//!
//! let wide: u16 = convert(0x01u8);
//! assert_eq!(wide, 0x0101);
//! let narrow: u8 = convert(wide);
//! assert_eq!(narrow, 0x01);
//!
//! assert_eq!(<u16 as Sample>::from_f32(0.5), 32768);
//! ```
//!
//! # Dependencies
//!
//! - `half` crate for `f16` support

use half::f16;

use crate::BitDepth;

/// Rec.709 luminance coefficient for red channel.
pub const REC709_LUMA_R: f32 = 0.2126;
/// Rec.709 luminance coefficient for green channel.
pub const REC709_LUMA_G: f32 = 0.7152;
/// Rec.709 luminance coefficient for blue channel.
pub const REC709_LUMA_B: f32 = 0.0722;

/// A sample of any supported depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    /// 8-bit sample.
    U8(u8),
    /// 16-bit sample.
    U16(u16),
    /// Float sample (half samples widen to this).
    F32(f32),
}

/// Scale a normalised float to `[0, max]`, rounding half up.
///
/// Values at or below zero (and NaN) map to 0, values at or above one map
/// to `max`.
#[inline]
pub fn float_to_int(v: f32, max: u32) -> u32 {
    if v.is_nan() || v <= 0.0 {
        0
    } else if v >= 1.0 {
        max
    } else {
        (v * max as f32 + 0.5) as u32
    }
}

/// Trait for native sample types.
///
/// # Constants
///
/// - [`DEPTH`](Sample::DEPTH) - runtime depth tag
/// - [`MAX_VALUE`](Sample::MAX_VALUE) - value of full intensity
///
/// # Example
///
/// ```
/// use fxkit_core::Sample;
///
/// let v: u8 = Sample::from_f32(1.0);
/// assert_eq!(v, 255);
/// assert_eq!(128u8.to_f32(), 128.0 / 255.0);
/// ```
pub trait Sample: Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static {
    /// Runtime depth tag.
    const DEPTH: BitDepth;

    /// Value of full intensity (255, 65535 or 1.0).
    const MAX_VALUE: f32;

    /// Normalise to float; integers map to [0, 1].
    fn to_f32(self) -> f32;

    /// Convert from normalised float.
    ///
    /// Integers clamp to `[0, MAX]` and round half up; floats pass through.
    fn from_f32(v: f32) -> Self;

    /// Wrap in a [`SampleValue`].
    fn to_value(self) -> SampleValue;

    /// Convert from a sample of any depth using the exact conversion table.
    fn from_value(v: SampleValue) -> Self;

    /// Zero sample.
    #[inline]
    fn zero() -> Self {
        Self::default()
    }

    /// Full-intensity sample.
    #[inline]
    fn one() -> Self {
        Self::from_f32(1.0)
    }
}

impl Sample for u8 {
    const DEPTH: BitDepth = BitDepth::U8;
    const MAX_VALUE: f32 = 255.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        float_to_int(v, 255) as u8
    }

    #[inline]
    fn to_value(self) -> SampleValue {
        SampleValue::U8(self)
    }

    #[inline]
    fn from_value(v: SampleValue) -> Self {
        match v {
            SampleValue::U8(v) => v,
            SampleValue::U16(v) => {
                let v = v as u32 + 128;
                ((v - (v >> 8)) >> 8) as u8
            }
            SampleValue::F32(v) => Self::from_f32(v),
        }
    }
}

impl Sample for u16 {
    const DEPTH: BitDepth = BitDepth::U16;
    const MAX_VALUE: f32 = 65535.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        float_to_int(v, 65535) as u16
    }

    #[inline]
    fn to_value(self) -> SampleValue {
        SampleValue::U16(self)
    }

    #[inline]
    fn from_value(v: SampleValue) -> Self {
        match v {
            SampleValue::U8(v) => ((v as u16) << 8) + v as u16,
            SampleValue::U16(v) => v,
            SampleValue::F32(v) => Self::from_f32(v),
        }
    }
}

impl Sample for f16 {
    const DEPTH: BitDepth = BitDepth::F16;
    const MAX_VALUE: f32 = 1.0;

    #[inline]
    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        f16::from_f32(v)
    }

    #[inline]
    fn to_value(self) -> SampleValue {
        SampleValue::F32(f16::to_f32(self))
    }

    #[inline]
    fn from_value(v: SampleValue) -> Self {
        f16::from_f32(f32::from_value(v))
    }
}

impl Sample for f32 {
    const DEPTH: BitDepth = BitDepth::F32;
    const MAX_VALUE: f32 = 1.0;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }

    #[inline]
    fn to_value(self) -> SampleValue {
        SampleValue::F32(self)
    }

    #[inline]
    fn from_value(v: SampleValue) -> Self {
        match v {
            SampleValue::U8(v) => v as f32 / 255.0,
            SampleValue::U16(v) => v as f32 / 65535.0,
            SampleValue::F32(v) => v,
        }
    }
}

/// Convert a sample between depths using the exact conversion table.
#[inline]
pub fn convert<S: Sample, D: Sample>(v: S) -> D {
    D::from_value(v.to_value())
}

/// Rec.709 luminance of a linear RGB triplet.
///
/// ```
/// use fxkit_core::pixel::luminance_rec709;
/// let luma = luminance_rec709([0.5, 0.3, 0.2]);
/// assert!((luma - 0.3353).abs() < 0.0001);
/// ```
#[inline]
pub fn luminance_rec709(rgb: [f32; 3]) -> f32 {
    rgb[0] * REC709_LUMA_R + rgb[1] * REC709_LUMA_G + rgb[2] * REC709_LUMA_B
}
