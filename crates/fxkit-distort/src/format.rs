//! Frame geometry shared by the lens models.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{DistortError, DistortResult};

/// Full-resolution frame format.
///
/// Points are continuous pixel coordinates with `(0, 0)` at the lower-left
/// corner of the frame and `(width, height)` at the opposite corner.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Format {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
    /// Pixel aspect ratio
    pub pixel_aspect: f64,
}

impl Default for Format {
    fn default() -> Self {
        Self::new(1920.0, 1080.0)
    }
}

impl Format {
    /// Square-pixel format.
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pixel_aspect: 1.0,
        }
    }

    /// Sets the pixel aspect ratio.
    pub const fn with_pixel_aspect(mut self, pixel_aspect: f64) -> Self {
        self.pixel_aspect = pixel_aspect;
        self
    }

    /// Rejects empty or non-finite formats.
    pub fn validate(&self) -> DistortResult<()> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if !ok(self.width) || !ok(self.height) {
            return Err(DistortError::invalid(format!(
                "format must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if !ok(self.pixel_aspect) {
            return Err(DistortError::invalid(format!(
                "pixel aspect must be positive, got {}",
                self.pixel_aspect
            )));
        }
        Ok(())
    }

    /// Frame centre in pixels.
    #[inline]
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Half the larger side, in square pixels.
    #[inline]
    pub fn half_max(&self) -> f64 {
        (self.width * self.pixel_aspect).max(self.height) * 0.5
    }

    /// Half the smaller side, in square pixels.
    #[inline]
    pub fn half_min(&self) -> f64 {
        (self.width * self.pixel_aspect).min(self.height) * 0.5
    }

    /// Half the diagonal, in square pixels.
    #[inline]
    pub fn half_diagonal(&self) -> f64 {
        (self.width * self.pixel_aspect).hypot(self.height) * 0.5
    }

    /// Pixel position to square, centred units of size `unit`.
    #[inline]
    pub fn to_centered(&self, p: DVec2, unit: f64) -> DVec2 {
        let d = p - self.center();
        DVec2::new(d.x * self.pixel_aspect, d.y) / unit
    }

    /// Inverse of [`to_centered`](Self::to_centered).
    #[inline]
    pub fn from_centered(&self, n: DVec2, unit: f64) -> DVec2 {
        let d = n * unit;
        DVec2::new(d.x / self.pixel_aspect, d.y) + self.center()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_centered_roundtrip() {
        let f = Format::new(2048.0, 858.0).with_pixel_aspect(2.0);
        let p = DVec2::new(100.0, 700.0);
        let n = f.to_centered(p, f.half_max());
        let back = f.from_centered(n, f.half_max());
        assert_abs_diff_eq!(back.distance(p), 0.0, epsilon = 1e-9);
        assert_eq!(f.half_max(), 2048.0);
        assert_eq!(f.half_min(), 429.0);
    }

    #[test]
    fn test_validate() {
        assert!(Format::new(0.0, 10.0).validate().is_err());
        assert!(Format::new(10.0, 10.0).with_pixel_aspect(-1.0).validate().is_err());
        assert!(Format::default().validate().is_ok());
    }
}
