//! Bit depths, component layouts and clip state enums.
//!
//! These are the runtime descriptors the host attaches to every image it
//! hands to a render call. They never change for the lifetime of an image.
//!
//! # Types
//!
//! - [`BitDepth`] - sample storage (8-bit, 16-bit, half, float)
//! - [`Components`] - channel layout (Alpha, XY, RGB, RGBA)
//! - [`PremultState`] - premultiplication state of a clip
//! - [`Field`] - field order of interlaced material
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::format::{BitDepth, Components};
//!
//! assert_eq!(BitDepth::U16.max_value(), 65535.0);
//! assert_eq!(Components::Rgba.count(), 4);
//! assert_eq!(Components::Alpha.rgba_indices(), &[3]);
//! ```

use std::fmt;

/// Storage type of one sample.
///
/// Integer depths are normalised against their maximum value; float depths
/// use 1.0 as full intensity and may exceed [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// 8-bit unsigned integer [0, 255].
    U8,
    /// 16-bit unsigned integer [0, 65535].
    U16,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float.
    #[default]
    F32,
}

impl BitDepth {
    /// Number of bits per channel.
    #[inline]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 | Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    /// Whether this is a floating-point depth.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Value that represents full intensity (255, 65535 or 1.0).
    #[inline]
    pub const fn max_value(&self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            Self::F16 | Self::F32 => 1.0,
        }
    }

    /// Bytes per sample.
    #[inline]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "8-bit",
            Self::U16 => "16-bit",
            Self::F16 => "half",
            Self::F32 => "float",
        };
        f.write_str(name)
    }
}

/// Channel layout of a pixel.
///
/// The per-pixel stride of an image equals [`count`](Components::count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Components {
    /// Single alpha channel.
    Alpha,
    /// Two channels (motion vectors, STMaps).
    Xy,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    #[default]
    Rgba,
}

impl Components {
    /// Number of samples per pixel.
    #[inline]
    pub const fn count(&self) -> usize {
        match self {
            Self::Alpha => 1,
            Self::Xy => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Whether the layout stores an alpha channel.
    #[inline]
    pub const fn has_alpha(&self) -> bool {
        matches!(self, Self::Alpha | Self::Rgba)
    }

    /// Whether the layout stores colour channels.
    #[inline]
    pub const fn has_color(&self) -> bool {
        matches!(self, Self::Rgb | Self::Rgba)
    }

    /// Position of each stored sample inside an RGBA quadruple.
    ///
    /// Kernels work on `[r, g, b, a]`; this maps stored sample `i` to the
    /// RGBA slot it reads from and writes to.
    #[inline]
    pub const fn rgba_indices(&self) -> &'static [usize] {
        match self {
            Self::Alpha => &[3],
            Self::Xy => &[0, 1],
            Self::Rgb => &[0, 1, 2],
            Self::Rgba => &[0, 1, 2, 3],
        }
    }

    /// Stored sample index holding RGBA channel `c`, if any.
    #[inline]
    pub fn sample_index(&self, c: usize) -> Option<usize> {
        self.rgba_indices().iter().position(|&i| i == c)
    }
}

impl fmt::Display for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Alpha => "Alpha",
            Self::Xy => "XY",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
        };
        f.write_str(name)
    }
}

/// Premultiplication state attached to a clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PremultState {
    /// Alpha is 1 everywhere; premultiplication is irrelevant.
    Opaque,
    /// Colour channels are pre-scaled by alpha.
    #[default]
    Premultiplied,
    /// Colour channels carry straight colour.
    Unpremultiplied,
}

impl PremultState {
    /// Whether colour must be divided by alpha before colour math.
    #[inline]
    pub const fn is_premultiplied(&self) -> bool {
        matches!(self, Self::Premultiplied)
    }
}

/// Field order of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Field {
    /// Progressive frame.
    #[default]
    None,
    /// Both fields interleaved.
    Both,
    /// Lower field only.
    Lower,
    /// Upper field only.
    Upper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_depth_properties() {
        assert_eq!(BitDepth::U8.max_value(), 255.0);
        assert_eq!(BitDepth::F32.max_value(), 1.0);
        assert!(BitDepth::F16.is_float());
        assert!(!BitDepth::U16.is_float());
        assert_eq!(BitDepth::F16.bytes(), 2);
    }

    #[test]
    fn test_sample_index() {
        assert_eq!(Components::Alpha.sample_index(3), Some(0));
        assert_eq!(Components::Alpha.sample_index(0), None);
        assert_eq!(Components::Rgb.sample_index(3), None);
        assert_eq!(Components::Rgba.sample_index(2), Some(2));
        assert_eq!(Components::Xy.sample_index(1), Some(1));
    }
}
