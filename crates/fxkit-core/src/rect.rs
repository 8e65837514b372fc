//! Integer rectangles in pixel space.
//!
//! [`Rect`] describes image bounds and render windows using the
//! `(x1, y1, x2, y2)` convention: inclusive on the low edges, exclusive on
//! the high edges. Coordinates are signed because image bounds may start
//! left of or below the origin.
//!
//! ```text
//! (x1,y1) ──────────┐
//!    │   window     │
//!    └──────────(x2,y2)   x2, y2 excluded
//! ```
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::Rect;
//!
//! let tile = Rect::new(0, 0, 64, 32);
//! assert_eq!(tile.width(), 64);
//! assert!(tile.contains(63, 31));
//! assert!(!tile.contains(64, 0));
//!
//! let bounds = Rect::new(-10, -10, 40, 40);
//! assert_eq!(tile.intersect(&bounds), Some(Rect::new(0, 0, 40, 32)));
//! ```

use std::fmt;

/// Half-open integer rectangle.
///
/// # Invariants
///
/// A render window satisfies `x1 < x2` and `y1 < y2`; a rectangle that
/// does not is [empty](Rect::is_empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge (inclusive)
    pub x1: i32,
    /// Bottom/top edge (inclusive)
    pub y1: i32,
    /// Right edge (exclusive)
    pub x2: i32,
    /// Opposite vertical edge (exclusive)
    pub y2: i32,
}

impl Rect {
    /// Creates a rectangle from its corners.
    #[inline]
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a rectangle at the origin with the given size.
    #[inline]
    pub const fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width in pixels (0 when empty).
    #[inline]
    pub const fn width(&self) -> i32 {
        if self.x2 > self.x1 { self.x2 - self.x1 } else { 0 }
    }

    /// Height in pixels (0 when empty).
    #[inline]
    pub const fn height(&self) -> i32 {
        if self.y2 > self.y1 { self.y2 - self.y1 } else { 0 }
    }

    /// Number of pixels covered.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Returns `true` if the rectangle covers no pixel.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.x1 >= self.x2 || self.y1 >= self.y2
    }

    /// Returns `true` if pixel `(x, y)` lies inside.
    #[inline]
    pub const fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Returns `true` if `other` lies entirely inside this rectangle.
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x1 >= self.x1 && other.y1 >= self.y1 && other.x2 <= self.x2 && other.y2 <= self.y2
    }

    /// Intersection with another rectangle, or `None` if they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let r = Rect::new(
            self.x1.max(other.x1),
            self.y1.max(other.y1),
            self.x2.min(other.x2),
            self.y2.min(other.y2),
        );
        if r.is_empty() { None } else { Some(r) }
    }

    /// Smallest rectangle containing both. Empty inputs are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::new(
            self.x1.min(other.x1),
            self.y1.min(other.y1),
            self.x2.max(other.x2),
            self.y2.max(other.y2),
        )
    }

    /// Splits the rectangle into horizontal bands of at most `rows` rows.
    pub fn bands(&self, rows: i32) -> impl Iterator<Item = Rect> + '_ {
        let step = rows.max(1);
        (self.y1..self.y2).step_by(step as usize).map(move |y| {
            Rect::new(self.x1, y, self.x2, (y + step).min(self.y2))
        })
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})-({}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}
