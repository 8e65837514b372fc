//! Monotone tone-range curves.
//!
//! A curve is a list of control points joined by cubic Hermite segments
//! whose tangents are limited (Fritsch-Carlson) so the curve never
//! overshoots between points. Outside the first and last point the curve
//! is flat.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult};

/// A monotone piecewise-cubic weight curve.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(f32, f32)>", into = "Vec<(f32, f32)>")
)]
pub struct ToneCurve {
    points: Vec<(f32, f32)>,
    tangents: Vec<f32>,
}

impl ToneCurve {
    /// Fits a curve through `points`.
    ///
    /// # Errors
    ///
    /// Needs at least two finite points with strictly increasing `x`.
    pub fn new(points: &[(f32, f32)]) -> OpsResult<Self> {
        if points.len() < 2 {
            return Err(OpsError::invalid("tone curve needs at least two points"));
        }
        if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(OpsError::invalid("tone curve points must be finite"));
        }
        if points.windows(2).any(|w| w[1].0 <= w[0].0) {
            return Err(OpsError::invalid("tone curve x values must increase"));
        }
        let points = points.to_vec();
        let tangents = fit_tangents(&points);
        Ok(Self { points, tangents })
    }

    /// Shadow weight: 1 at black, 0 from 0.09 up.
    pub fn default_shadows() -> Self {
        Self::from_valid(&[(0.0, 1.0), (0.09, 0.0)])
    }

    /// Highlight weight: 0 up to 0.5, 1 at white.
    pub fn default_highlights() -> Self {
        Self::from_valid(&[(0.5, 0.0), (1.0, 1.0)])
    }

    fn from_valid(points: &[(f32, f32)]) -> Self {
        Self {
            points: points.to_vec(),
            tangents: fit_tangents(points),
        }
    }

    /// Control points.
    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    /// Curve value at `x`.
    pub fn eval(&self, x: f32) -> f32 {
        let pts = &self.points;
        let last = pts.len() - 1;
        if x.is_nan() || x <= pts[0].0 {
            return pts[0].1;
        }
        if x >= pts[last].0 {
            return pts[last].1;
        }

        let seg = pts.partition_point(|p| p.0 <= x) - 1;
        let (x0, y0) = pts[seg];
        let (x1, y1) = pts[seg + 1];
        let h = x1 - x0;
        let t = (x - x0) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * y0 + h10 * h * self.tangents[seg] + h01 * y1 + h11 * h * self.tangents[seg + 1]
    }
}

impl TryFrom<Vec<(f32, f32)>> for ToneCurve {
    type Error = OpsError;

    fn try_from(points: Vec<(f32, f32)>) -> OpsResult<Self> {
        Self::new(&points)
    }
}

impl From<ToneCurve> for Vec<(f32, f32)> {
    fn from(curve: ToneCurve) -> Self {
        curve.points
    }
}

fn fit_tangents(points: &[(f32, f32)]) -> Vec<f32> {
    let n = points.len();
    let secants: Vec<f32> = points
        .windows(2)
        .map(|w| (w[1].1 - w[0].1) / (w[1].0 - w[0].0))
        .collect();

    let mut m = vec![0.0f32; n];
    m[0] = secants[0];
    m[n - 1] = secants[n - 2];
    for k in 1..n - 1 {
        let (a, b) = (secants[k - 1], secants[k]);
        m[k] = if a * b <= 0.0 { 0.0 } else { 0.5 * (a + b) };
    }

    for k in 0..n - 1 {
        let d = secants[k];
        if d == 0.0 {
            m[k] = 0.0;
            m[k + 1] = 0.0;
            continue;
        }
        let a = m[k] / d;
        let b = m[k + 1] / d;
        let len2 = a * a + b * b;
        if len2 > 9.0 {
            let t = 3.0 / len2.sqrt();
            m[k] = t * a * d;
            m[k + 1] = t * b * d;
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_defaults() {
        let s = ToneCurve::default_shadows();
        assert_eq!(s.eval(-1.0), 1.0);
        assert_eq!(s.eval(0.0), 1.0);
        assert_eq!(s.eval(0.5), 0.0);
        assert!(s.eval(0.045) > 0.0 && s.eval(0.045) < 1.0);

        let h = ToneCurve::default_highlights();
        assert_eq!(h.eval(0.2), 0.0);
        assert_eq!(h.eval(1.0), 1.0);
        assert_eq!(h.eval(3.0), 1.0);
    }

    #[test]
    fn test_passes_through_points() {
        let c = ToneCurve::new(&[(0.0, 0.0), (0.3, 0.8), (0.6, 0.9), (1.0, 1.0)]).unwrap();
        for &(x, y) in c.points() {
            assert_abs_diff_eq!(c.eval(x), y, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_monotone_between_points() {
        let c = ToneCurve::new(&[(0.0, 0.0), (0.1, 0.9), (0.2, 0.95), (1.0, 1.0)]).unwrap();
        let mut prev = c.eval(0.0);
        for i in 1..=1000 {
            let v = c.eval(i as f32 / 1000.0);
            assert!(v >= prev - 1e-6, "not monotone at {i}");
            assert!(v <= 1.0 + 1e-6);
            prev = v;
        }
    }

    #[test]
    fn test_invalid_points() {
        assert!(ToneCurve::new(&[(0.0, 1.0)]).is_err());
        assert!(ToneCurve::new(&[(0.5, 0.0), (0.5, 1.0)]).is_err());
        assert!(ToneCurve::new(&[(0.0, f32::NAN), (1.0, 1.0)]).is_err());
    }
}
