//! Applying a lens model to an image tile.
//!
//! Each destination pixel centre is mapped through the model to a source
//! position. The result is either the source resampled there (bilinear,
//! transparent black outside the source) or an STMap holding the normalised
//! source position in red / green.
//!
//! To *remove* distortion from a plate, each undistorted destination pixel
//! reads the plate at `distort(p)`; [`WarpParams::direction`] names the
//! operation applied to the image, not the point mapping.
//!
//! Models are defined at full resolution. At render scale `s` a pixel
//! position is divided by `s` before mapping and multiplied back after.
//!
//! When the `parallel` feature is enabled, rows are rendered with rayon.

use glam::DVec2;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_core::{
    validate_clip, AbortSignal, Error, ImageMut, ImageRef, ImageViewMut, Rect, RenderStatus, Sample,
};
use fxkit_math::lerp;

use crate::{Direction, DistortResult, Distortion};

/// What the warp writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WarpOutput {
    /// Bilinear resample of the source
    #[default]
    Resample,
    /// Normalised source coordinates in R/G, 0 in B, 1 in A
    StMap,
}

/// Settings of one warp call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WarpParams {
    /// Operation applied to the image
    pub direction: Direction,
    /// Output kind
    pub output: WarpOutput,
}

/// Source position for destination pixel `(x, y)` at render scale `scale`.
#[inline]
fn source_position<D: Distortion + ?Sized>(
    model: &D,
    direction: Direction,
    scale: DVec2,
    x: i32,
    y: i32,
) -> DVec2 {
    let centre = DVec2::new(x as f64 + 0.5, y as f64 + 0.5) / scale;
    model.map(direction.inverse(), centre) * scale
}

/// Bilinear sample at continuous position `p`; pixel centres sit at `.5`.
fn sample_bilinear(src: &ImageRef<'_>, p: DVec2) -> [f32; 4] {
    let fx = p.x - 0.5;
    let fy = p.y - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    // the 2x2 footprint misses the source (or the position is NaN)
    let b = src.bounds();
    let hits = |v: f64, lo: i32, hi: i32| v >= f64::from(lo) - 1.0 && v < f64::from(hi);
    if !(hits(x0, b.x1, b.x2) && hits(y0, b.y1, b.y2)) {
        return [0.0; 4];
    }
    let tx = (fx - x0) as f32;
    let ty = (fy - y0) as f32;
    let (x0, y0) = (x0 as i32, y0 as i32);

    let at = |x: i32, y: i32| src.pixel_f32(x, y).unwrap_or([0.0; 4]);
    let p00 = at(x0, y0);
    let p10 = at(x0 + 1, y0);
    let p01 = at(x0, y0 + 1);
    let p11 = at(x0 + 1, y0 + 1);

    std::array::from_fn(|c| {
        let top = lerp(p00[c], p10[c], tx);
        let bot = lerp(p01[c], p11[c], tx);
        lerp(top, bot, ty)
    })
}

fn render_rows<T, A, F>(view: &mut ImageViewMut<'_, T>, window: Rect, abort: &A, pixel: F) -> RenderStatus
where
    T: Sample,
    A: AbortSignal + ?Sized,
    F: Fn(i32, i32) -> [f32; 4] + Sync,
{
    let comps = view.components();
    let n = comps.count();
    let x0 = view.bounds().x1;
    let write_row = |y: i32, row: &mut [T]| {
        for x in window.x1..window.x2 {
            let rgba = pixel(x, y);
            let i = (x - x0) as usize * n;
            for (s, &c) in row[i..i + n].iter_mut().zip(comps.rgba_indices()) {
                *s = T::from_f32(rgba[c]);
            }
        }
    };

    #[cfg(feature = "parallel")]
    let status = view.par_for_each_row(window, abort, write_row);
    #[cfg(not(feature = "parallel"))]
    let status = view.for_each_row(window, abort, write_row);
    status
}

/// Warps `src` into `window` of `dst` through `model`.
///
/// An absent source produces transparent black (or, for an STMap, the
/// coordinates alone).
///
/// # Errors
///
/// Fails if `window` is empty or outside `dst`, or if `src` disagrees with
/// `dst` on render scale, field or bit depth.
pub fn warp<D, A>(
    model: &D,
    params: &WarpParams,
    src: Option<&ImageRef<'_>>,
    dst: &mut ImageMut<'_>,
    window: Rect,
    abort: &A,
) -> DistortResult<RenderStatus>
where
    D: Distortion + ?Sized,
    A: AbortSignal + ?Sized,
{
    let bounds = dst.bounds();
    if window.is_empty() || !bounds.contains_rect(&window) {
        return Err(Error::invalid_region(window, bounds).into());
    }
    if let Some(src) = src {
        validate_clip(dst, src)?;
    }

    let (sx, sy) = dst.render_scale();
    let scale = DVec2::new(sx, sy);
    let format = *model.format();
    let extent = DVec2::new(format.width, format.height) * scale;
    debug!(%window, depth = %dst.depth(), components = %dst.components(), ?params, "lens warp");

    let pixel = |x: i32, y: i32| -> [f32; 4] {
        let p = source_position(model, params.direction, scale, x, y);
        match params.output {
            WarpOutput::StMap => [(p.x / extent.x) as f32, (p.y / extent.y) as f32, 0.0, 1.0],
            WarpOutput::Resample => match src {
                Some(src) => sample_bilinear(src, p),
                None => [0.0; 4],
            },
        }
    };

    let status = match dst {
        ImageMut::U8(v) => render_rows(v, window, abort, pixel),
        ImageMut::U16(v) => render_rows(v, window, abort, pixel),
        ImageMut::F16(v) => render_rows(v, window, abort, pixel),
        ImageMut::F32(v) => render_rows(v, window, abort, pixel),
    };
    if status.is_aborted() {
        debug!(%window, "lens warp cancelled");
    } else {
        trace!(%window, "lens warp done");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::{Format, NukeRadial, NukeRadialParams};
    use fxkit_core::{BitDepth, Components, Image, NeverAbort};

    fn identity_model(w: f64, h: f64) -> NukeRadial {
        NukeRadial::new(Format::new(w, h), NukeRadialParams::default()).unwrap()
    }

    #[test]
    fn test_identity_resample_copies_source() {
        let bounds = Rect::new(0, 0, 8, 4);
        let values: Vec<f32> = (0..32).map(|i| i as f32 / 32.0).collect();
        let src = Image::from_f32(bounds, Components::Alpha, BitDepth::F32, &values).unwrap();
        let mut dst = Image::new(bounds, Components::Alpha, BitDepth::F32);

        let status = warp(
            &identity_model(8.0, 4.0),
            &WarpParams::default(),
            Some(&src.view()),
            &mut dst.view_mut(),
            bounds,
            &NeverAbort,
        )
        .unwrap();
        assert_eq!(status, RenderStatus::Completed);
        for (a, b) in dst.to_f32_vec().iter().zip(&values) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bilinear_far_outside_is_black() {
        let bounds = Rect::new(0, 0, 2, 2);
        let src = Image::filled(bounds, Components::Rgba, BitDepth::F32, [1.0; 4]);
        let src = src.view();
        for p in [
            DVec2::new(i32::MAX as f64 + 0.5, 1.0),
            DVec2::new(i32::MAX as f64 - 0.25, 1.0),
            DVec2::new(1.0, i32::MIN as f64),
            DVec2::new(f64::MAX, f64::MIN),
            DVec2::new(f64::NAN, 1.0),
            DVec2::new(1.0, f64::INFINITY),
        ] {
            assert_eq!(sample_bilinear(&src, p), [0.0; 4], "{p}");
        }
        // a pixel centre on the edge still blends with black
        assert_abs_diff_eq!(sample_bilinear(&src, DVec2::new(2.0, 1.0))[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(sample_bilinear(&src, DVec2::new(0.0, 1.0))[0], 0.5, epsilon = 1e-6);
        assert_eq!(sample_bilinear(&src, DVec2::new(1.0, 1.0)), [1.0; 4]);
    }

    #[test]
    fn test_stmap_identity() {
        let bounds = Rect::new(0, 0, 4, 2);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        let params = WarpParams { output: WarpOutput::StMap, ..Default::default() };
        warp(&identity_model(4.0, 2.0), &params, None, &mut dst.view_mut(), bounds, &NeverAbort).unwrap();
        let px = dst.pixel_f32(1, 1).unwrap();
        assert_abs_diff_eq!(px[0], 1.5 / 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 1.5 / 2.0, epsilon = 1e-6);
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn test_half_render_scale_stmap() {
        let bounds = Rect::new(0, 0, 4, 2);
        let mut dst = Image::new(bounds, Components::Rgb, BitDepth::F32).with_render_scale(0.5, 0.5);
        let params = WarpParams { output: WarpOutput::StMap, ..Default::default() };
        warp(&identity_model(8.0, 4.0), &params, None, &mut dst.view_mut(), bounds, &NeverAbort).unwrap();
        let px = dst.pixel_f32(3, 1).unwrap();
        assert_abs_diff_eq!(px[0], 3.5 / 4.0, epsilon = 1e-6);
        assert_abs_diff_eq!(px[1], 1.5 / 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_outside_window_rejected() {
        let bounds = Rect::new(0, 0, 4, 4);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::U8);
        let err = warp(
            &identity_model(4.0, 4.0),
            &WarpParams::default(),
            None,
            &mut dst.view_mut(),
            Rect::new(0, 0, 5, 4),
            &NeverAbort,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_abort_before_first_row() {
        let bounds = Rect::new(0, 0, 4, 4);
        let mut dst = Image::filled(bounds, Components::Alpha, BitDepth::U8, [0.0, 0.0, 0.0, 0.5]);
        let status = warp(
            &identity_model(4.0, 4.0),
            &WarpParams::default(),
            None,
            &mut dst.view_mut(),
            bounds,
            &|| true,
        )
        .unwrap();
        assert_eq!(status, RenderStatus::Aborted);
        assert!(dst.to_f32_vec().iter().all(|&v| v > 0.4));
    }
}
