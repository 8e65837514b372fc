//! Newton inversion of a one-directional point mapping.
//!
//! Given `f` and a target `p`, finds `q` with `f(q) ≈ p`:
//!
//! ```text
//! q = p
//! repeat at most 10 times:
//!     r = f(q) - p                  stop if |r|² < 1e-4
//!     J = [(f(q + εx) - f(q)) / ε, (f(q + εy) - f(q)) / ε]
//!     stop if a column of J vanishes or J is singular
//!     q = q - J⁻¹ r
//! ```
//!
//! The solver never fails; it returns its current estimate when it stops.
//! Coordinates are pixels, so the tolerance is a hundredth of a pixel.

use glam::{DMat2, DVec2};

/// Iteration cap.
pub const MAX_ITERATIONS: usize = 10;

/// Finite-difference step.
pub const STEP: f64 = 1e-3;

/// Squared residual below which the estimate is accepted.
pub const TOLERANCE_SQUARED: f64 = 1e-4;

/// Finds `q` such that `f(q) ≈ target`, starting from `target`.
///
/// ```rust
/// use fxkit_distort::newton_inverse;
/// use glam::DVec2;
///
/// let f = |p: DVec2| p * 1.1 + DVec2::new(0.01 * p.y, 0.0);
/// let q = newton_inverse(f, DVec2::new(50.0, 20.0));
/// assert!((f(q) - DVec2::new(50.0, 20.0)).length() < 1e-2);
/// ```
pub fn newton_inverse<F>(f: F, target: DVec2) -> DVec2
where
    F: Fn(DVec2) -> DVec2,
{
    let mut q = target;
    for _ in 0..MAX_ITERATIONS {
        let fq = f(q);
        let residual = fq - target;
        if residual.length_squared() < TOLERANCE_SQUARED {
            break;
        }
        let dx = (f(q + DVec2::new(STEP, 0.0)) - fq) / STEP;
        let dy = (f(q + DVec2::new(0.0, STEP)) - fq) / STEP;
        if dx.length_squared() < f64::EPSILON || dy.length_squared() < f64::EPSILON {
            break;
        }
        let jacobian = DMat2::from_cols(dx, dy);
        if jacobian.determinant().abs() < f64::EPSILON {
            break;
        }
        let step = jacobian.inverse() * residual;
        if !step.is_finite() {
            break;
        }
        q -= step;
    }
    q
}
