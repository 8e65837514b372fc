//! Physically parameterised lens models.
//!
//! Every model in this family works in *diagonally normalised* (dn)
//! coordinates derived from the camera's filmback:
//!
//! ```text
//! pixel ──÷ format──▶ unit [0, 1]² ──filmback, lens centre──▶ dn
//!
//! x_dn = (x_unit · w_fb − w_fb / 2 − x_lco) / r_fb
//! y_dn = (y_unit · h_fb − h_fb / 2 − y_lco) / r_fb
//! r_fb = √(w_fb² + h_fb²) / 2
//! ```
//!
//! so radius 1.0 reaches the filmback corner. Each model only supplies its
//! dn-space `undistort` polynomial ([`DnModel`]); [`TdeModel`] composes the
//! coordinate maps and inverts the polynomial with the Newton solver.
//!
//! | Model | Terms |
//! |-------|-------|
//! | [`TdeClassic`] | distortion, squeeze, curvature x / y, quartic |
//! | [`TdeAnamorphic6`] | radial degree 6 with cos 2φ / 4φ / 6φ terms |
//! | [`TdeAnamorphic4Rotated`] | radial degree 4 with cos 2φ / 4φ terms, lens rotation, squeeze |
//! | [`TdeFisheye8`] | equisolid-angle fisheye, radial degree 8 |
//! | [`TdeRadialDecentered`] | radial degree 4, decentering, beam-splitter cylinder |
//!
//! # Usage
//!
//! ```rust
//! use fxkit_distort::{Distortion, Format, TdeClassic, TdeLens, TdeModel};
//! use glam::DVec2;
//!
//! let classic = TdeClassic { distortion: 0.05, ..Default::default() };
//! let lens = TdeModel::new(Format::new(1920.0, 1080.0), TdeLens::default(), classic).unwrap();
//! let p = DVec2::new(100.0, 80.0);
//! let back = lens.distort(lens.undistort(p));
//! assert!((back - p).length() < 1e-2);
//! ```

use glam::DVec2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{newton_inverse, DistortError, DistortResult, Distortion, Format};

/// Camera and lens geometry, in centimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeLens {
    /// Focal length
    pub focal_length_cm: f64,
    /// Filmback width
    pub filmback_width_cm: f64,
    /// Filmback height
    pub filmback_height_cm: f64,
    /// Horizontal lens-centre offset
    pub lens_center_offset_x_cm: f64,
    /// Vertical lens-centre offset
    pub lens_center_offset_y_cm: f64,
}

impl Default for TdeLens {
    fn default() -> Self {
        Self {
            focal_length_cm: 3.5,
            filmback_width_cm: 3.6,
            filmback_height_cm: 2.4,
            lens_center_offset_x_cm: 0.0,
            lens_center_offset_y_cm: 0.0,
        }
    }
}

impl TdeLens {
    /// Rejects a degenerate filmback or focal length.
    pub fn validate(&self) -> DistortResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.filmback_width_cm) || !positive(self.filmback_height_cm) {
            return Err(DistortError::invalid(format!(
                "filmback must be positive, got {}x{} cm",
                self.filmback_width_cm, self.filmback_height_cm
            )));
        }
        if !positive(self.focal_length_cm) {
            return Err(DistortError::invalid(format!(
                "focal length must be positive, got {} cm",
                self.focal_length_cm
            )));
        }
        Ok(())
    }

    /// Half the filmback diagonal.
    #[inline]
    pub fn r_fb_cm(&self) -> f64 {
        self.filmback_width_cm.hypot(self.filmback_height_cm) * 0.5
    }

    /// Focal length in dn units.
    #[inline]
    pub fn focal_dn(&self) -> f64 {
        self.focal_length_cm / self.r_fb_cm()
    }
}

/// A lens polynomial in diagonally normalised coordinates.
pub trait DnModel: Send + Sync {
    /// Distorted dn position to undistorted dn position.
    fn undistort_dn(&self, p: DVec2, lens: &TdeLens) -> DVec2;

    /// Rejects coefficients the polynomial cannot use.
    fn validate(&self) -> DistortResult<()> {
        Ok(())
    }
}

/// A [`DnModel`] bound to a frame format and lens.
#[derive(Debug, Clone)]
pub struct TdeModel<M: DnModel> {
    format: Format,
    lens: TdeLens,
    model: M,
    r_fb: f64,
}

impl<M: DnModel> TdeModel<M> {
    /// Builds the model.
    ///
    /// # Errors
    ///
    /// Fails for an invalid format, filmback, focal length or coefficients.
    pub fn new(format: Format, lens: TdeLens, model: M) -> DistortResult<Self> {
        format.validate()?;
        lens.validate()?;
        model.validate()?;
        Ok(Self {
            format,
            lens,
            r_fb: lens.r_fb_cm(),
            model,
        })
    }

    /// Lens geometry.
    pub fn lens(&self) -> &TdeLens {
        &self.lens
    }

    /// Polynomial coefficients.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Pixel position to dn coordinates.
    pub fn to_dn(&self, p: DVec2) -> DVec2 {
        let l = &self.lens;
        let unit = DVec2::new(p.x / self.format.width, p.y / self.format.height);
        DVec2::new(
            (unit.x * l.filmback_width_cm - 0.5 * l.filmback_width_cm - l.lens_center_offset_x_cm) / self.r_fb,
            (unit.y * l.filmback_height_cm - 0.5 * l.filmback_height_cm - l.lens_center_offset_y_cm) / self.r_fb,
        )
    }

    /// dn coordinates to pixel position.
    pub fn from_dn(&self, dn: DVec2) -> DVec2 {
        let l = &self.lens;
        let unit = DVec2::new(
            (dn.x * self.r_fb + 0.5 * l.filmback_width_cm + l.lens_center_offset_x_cm) / l.filmback_width_cm,
            (dn.y * self.r_fb + 0.5 * l.filmback_height_cm + l.lens_center_offset_y_cm) / l.filmback_height_cm,
        );
        DVec2::new(unit.x * self.format.width, unit.y * self.format.height)
    }
}

impl<M: DnModel> Distortion for TdeModel<M> {
    fn format(&self) -> &Format {
        &self.format
    }

    fn undistort(&self, p: DVec2) -> DVec2 {
        self.from_dn(self.model.undistort_dn(self.to_dn(p), &self.lens))
    }

    fn distort(&self, p: DVec2) -> DVec2 {
        newton_inverse(|q| self.undistort(q), p)
    }
}

fn nonzero(name: &str, v: f64) -> DistortResult<()> {
    if !v.is_finite() || v.abs() < f64::EPSILON {
        return Err(DistortError::invalid(format!("{name} must be non-zero, got {v}")));
    }
    Ok(())
}

/// Classic degree-4 model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeClassic {
    /// Quadratic radial distortion
    pub distortion: f64,
    /// Anamorphic squeeze
    pub anamorphic_squeeze: f64,
    /// Horizontal curvature
    pub curvature_x: f64,
    /// Vertical curvature
    pub curvature_y: f64,
    /// Quartic radial distortion
    pub quartic_distortion: f64,
}

impl Default for TdeClassic {
    fn default() -> Self {
        Self {
            distortion: 0.0,
            anamorphic_squeeze: 1.0,
            curvature_x: 0.0,
            curvature_y: 0.0,
            quartic_distortion: 0.0,
        }
    }
}

impl DnModel for TdeClassic {
    fn validate(&self) -> DistortResult<()> {
        nonzero("anamorphic squeeze", self.anamorphic_squeeze)
    }

    fn undistort_dn(&self, p: DVec2, _lens: &TdeLens) -> DVec2 {
        let sq = self.anamorphic_squeeze;
        let ld = self.distortion;
        let qu = self.quartic_distortion;

        let cxx = ld / sq;
        let cxy = (ld + self.curvature_x) / sq;
        let cyx = ld + self.curvature_y;
        let cyy = ld;
        let cxxx = qu / sq;
        let cxxy = 2.0 * qu / sq;
        let cxyy = qu / sq;
        let cyxx = qu;
        let cyyx = 2.0 * qu;
        let cyyy = qu;

        let x2 = p.x * p.x;
        let y2 = p.y * p.y;
        DVec2::new(
            p.x * (1.0 + cxx * x2 + cxy * y2 + cxxx * x2 * x2 + cxxy * x2 * y2 + cxyy * y2 * y2),
            p.y * (1.0 + cyx * x2 + cyy * y2 + cyxx * x2 * x2 + cyyx * x2 * y2 + cyyy * y2 * y2),
        )
    }
}

/// Anamorphic degree-6 model.
///
/// Coefficient arrays are ordered `[c02, c22, c04, c24, c44, c06, c26, c46, c66]`,
/// where `cNM` multiplies `r^M · cos(N φ)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeAnamorphic6 {
    /// Horizontal coefficients
    pub cx: [f64; 9],
    /// Vertical coefficients
    pub cy: [f64; 9],
}

fn anamorphic_factor6(c: &[f64; 9], r2: f64, c2: f64, c4: f64, c6: f64) -> f64 {
    let r4 = r2 * r2;
    let r6 = r4 * r2;
    1.0 + r2 * (c[0] + c[1] * c2)
        + r4 * (c[2] + c[3] * c2 + c[4] * c4)
        + r6 * (c[5] + c[6] * c2 + c[7] * c4 + c[8] * c6)
}

impl DnModel for TdeAnamorphic6 {
    fn undistort_dn(&self, p: DVec2, _lens: &TdeLens) -> DVec2 {
        let r2 = p.length_squared();
        let phi = p.y.atan2(p.x);
        let (c2, c4, c6) = ((2.0 * phi).cos(), (4.0 * phi).cos(), (6.0 * phi).cos());
        DVec2::new(
            p.x * anamorphic_factor6(&self.cx, r2, c2, c4, c6),
            p.y * anamorphic_factor6(&self.cy, r2, c2, c4, c6),
        )
    }
}

/// Anamorphic degree-4 model with lens rotation and squeeze.
///
/// Coefficient arrays are ordered `[c02, c22, c04, c24, c44]`. The
/// polynomial is evaluated in a frame rotated by `lens_rotation_deg`, then
/// the result is rotated back and squeezed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeAnamorphic4Rotated {
    /// Horizontal coefficients
    pub cx: [f64; 5],
    /// Vertical coefficients
    pub cy: [f64; 5],
    /// Lens rotation in degrees
    pub lens_rotation_deg: f64,
    /// Horizontal squeeze
    pub squeeze_x: f64,
    /// Vertical squeeze
    pub squeeze_y: f64,
}

impl Default for TdeAnamorphic4Rotated {
    fn default() -> Self {
        Self {
            cx: [0.0; 5],
            cy: [0.0; 5],
            lens_rotation_deg: 0.0,
            squeeze_x: 1.0,
            squeeze_y: 1.0,
        }
    }
}

fn anamorphic_factor4(c: &[f64; 5], r2: f64, c2: f64, c4: f64) -> f64 {
    1.0 + r2 * (c[0] + c[1] * c2) + r2 * r2 * (c[2] + c[3] * c2 + c[4] * c4)
}

impl DnModel for TdeAnamorphic4Rotated {
    fn validate(&self) -> DistortResult<()> {
        nonzero("horizontal squeeze", self.squeeze_x)?;
        nonzero("vertical squeeze", self.squeeze_y)
    }

    fn undistort_dn(&self, p: DVec2, _lens: &TdeLens) -> DVec2 {
        let rot = DVec2::from_angle(self.lens_rotation_deg.to_radians());
        let q = rot.rotate(p);
        let r2 = q.length_squared();
        let phi = q.y.atan2(q.x);
        let (c2, c4) = ((2.0 * phi).cos(), (4.0 * phi).cos());
        let u = DVec2::new(
            q.x * anamorphic_factor4(&self.cx, r2, c2, c4),
            q.y * anamorphic_factor4(&self.cy, r2, c2, c4),
        );
        let back = DVec2::new(rot.x, -rot.y).rotate(u);
        DVec2::new(back.x * self.squeeze_x, back.y * self.squeeze_y)
    }
}

/// Largest ray angle from the optical axis (`theta`) the equisolid
/// projection is unfolded to, just short of 90° where `tan(theta)` diverges.
const MAX_RAY_ANGLE: f64 = std::f64::consts::FRAC_PI_2 * 0.999;

/// Equisolid-angle fisheye, radial degree 8.
///
/// The distorted radius is corrected by the polynomial, interpreted as an
/// equisolid projection `r = 2 f sin(θ / 2)` and re-projected
/// rectilinearly as `f tan θ`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeFisheye8 {
    /// Degree-2 coefficient
    pub c2: f64,
    /// Degree-4 coefficient
    pub c4: f64,
    /// Degree-6 coefficient
    pub c6: f64,
    /// Degree-8 coefficient
    pub c8: f64,
}

impl DnModel for TdeFisheye8 {
    fn undistort_dn(&self, p: DVec2, lens: &TdeLens) -> DVec2 {
        let r = p.length();
        if r < 1e-12 {
            return p;
        }
        let f = lens.focal_dn();
        let r2 = r * r;
        let rd = r * (1.0 + r2 * (self.c2 + r2 * (self.c4 + r2 * (self.c6 + r2 * self.c8))));
        let s = (rd / (2.0 * f)).clamp(-1.0, 1.0);
        let theta = (2.0 * s.asin()).clamp(-MAX_RAY_ANGLE, MAX_RAY_ANGLE);
        let ru = f * theta.tan();
        p * (ru / r)
    }
}

/// Radial degree-4 model with decentering and beam-splitter correction.
///
/// The beam-splitter term stretches the result by `1 + b` along the
/// direction `phi_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TdeRadialDecentered {
    /// Degree-2 radial
    pub c2: f64,
    /// Degree-2 decentering u
    pub u1: f64,
    /// Degree-2 decentering v
    pub v1: f64,
    /// Degree-4 radial
    pub c4: f64,
    /// Degree-4 decentering u
    pub u3: f64,
    /// Degree-4 decentering v
    pub v3: f64,
    /// Cylindric direction in degrees
    pub phi_deg: f64,
    /// Cylindric bending
    pub b: f64,
}

impl DnModel for TdeRadialDecentered {
    fn validate(&self) -> DistortResult<()> {
        nonzero("cylindric stretch 1 + b", 1.0 + self.b)
    }

    fn undistort_dn(&self, p: DVec2, _lens: &TdeLens) -> DVec2 {
        let (x, y) = (p.x, p.y);
        let x2 = x * x;
        let y2 = y * y;
        let r2 = x2 + y2;
        let radial = 1.0 + r2 * (self.c2 + self.c4 * r2);
        let u = self.u1 + self.u3 * r2;
        let v = self.v1 + self.v3 * r2;
        let q = DVec2::new(
            x * radial + (r2 + 2.0 * x2) * u + 2.0 * x * y * v,
            y * radial + (r2 + 2.0 * y2) * v + 2.0 * x * y * u,
        );

        let dir = DVec2::from_angle(self.phi_deg.to_radians());
        let along = q.dot(dir) * (1.0 + self.b);
        let across = q.perp_dot(dir);
        dir * along - dir.perp() * across
    }
}

/// Classic model bound to a frame.
pub type TdeClassicModel = TdeModel<TdeClassic>;
/// Anamorphic degree-6 model bound to a frame.
pub type TdeAnamorphic6Model = TdeModel<TdeAnamorphic6>;
/// Rotated anamorphic degree-4 model bound to a frame.
pub type TdeAnamorphic4RotatedModel = TdeModel<TdeAnamorphic4Rotated>;
/// Fisheye degree-8 model bound to a frame.
pub type TdeFisheye8Model = TdeModel<TdeFisheye8>;
/// Decentered radial model bound to a frame.
pub type TdeRadialDecenteredModel = TdeModel<TdeRadialDecentered>;
