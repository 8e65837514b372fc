//! The [`Distortion`] abstraction.

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Format;

/// A bidirectional point mapping between distorted (as shot) and
/// undistorted (rectilinear) pixel positions.
///
/// Each model implements one direction analytically and obtains the other
/// from [`newton_inverse`](crate::newton_inverse), so `distort` and
/// `undistort` are approximate mutual inverses: a round trip lands within a
/// hundredth of a pixel for non-degenerate parameters.
pub trait Distortion: Send + Sync {
    /// Frame the model's coordinates refer to.
    fn format(&self) -> &Format;

    /// Distorted position to undistorted position.
    fn undistort(&self, p: DVec2) -> DVec2;

    /// Undistorted position to distorted position.
    fn distort(&self, p: DVec2) -> DVec2;

    /// Maps `p` in the given direction.
    #[inline]
    fn map(&self, direction: Direction, p: DVec2) -> DVec2 {
        match direction {
            Direction::Distort => self.distort(p),
            Direction::Undistort => self.undistort(p),
        }
    }
}

/// Which way a point is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Undistorted to distorted
    Distort,
    /// Distorted to undistorted
    #[default]
    Undistort,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub fn inverse(self) -> Self {
        match self {
            Self::Distort => Self::Undistort,
            Self::Undistort => Self::Distort,
        }
    }
}
