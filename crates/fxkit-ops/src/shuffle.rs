//! Channel routing between two inputs.
//!
//! Every destination slot picks one channel of input A or B, or a
//! constant. Samples are moved through the exact depth-conversion table,
//! so A and B may be stored at any depth. A selected channel the input
//! does not store, or a pixel outside the input, reads 0.
//!
//! Shuffle does not unpremultiply and ignores mix and mask: it moves
//! samples, it does not compute them.

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_core::{
    AbortSignal, Components, Error, ImageMut, ImageRef, ImageViewMut, Rect, RenderStatus, Sample,
};

use crate::OpsResult;

/// Input channel (or constant) a destination slot reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShuffleSelector {
    /// Red of A
    ARed,
    /// Green of A
    AGreen,
    /// Blue of A
    ABlue,
    /// Alpha of A
    AAlpha,
    /// Constant 0
    Zero,
    /// Constant full intensity
    One,
    /// Red of B
    BRed,
    /// Green of B
    BGreen,
    /// Blue of B
    BBlue,
    /// Alpha of B
    BAlpha,
}

/// Which input a selector reads.
enum Route {
    Constant(bool),
    A(usize),
    B(usize),
}

impl ShuffleSelector {
    fn route(self) -> Route {
        match self {
            Self::ARed => Route::A(0),
            Self::AGreen => Route::A(1),
            Self::ABlue => Route::A(2),
            Self::AAlpha => Route::A(3),
            Self::Zero => Route::Constant(false),
            Self::One => Route::Constant(true),
            Self::BRed => Route::B(0),
            Self::BGreen => Route::B(1),
            Self::BBlue => Route::B(2),
            Self::BAlpha => Route::B(3),
        }
    }
}

/// Selector per destination RGBA slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShuffleParams {
    /// Source of red
    pub red: ShuffleSelector,
    /// Source of green
    pub green: ShuffleSelector,
    /// Source of blue
    pub blue: ShuffleSelector,
    /// Source of alpha
    pub alpha: ShuffleSelector,
}

impl Default for ShuffleParams {
    fn default() -> Self {
        Self {
            red: ShuffleSelector::ARed,
            green: ShuffleSelector::AGreen,
            blue: ShuffleSelector::ABlue,
            alpha: ShuffleSelector::AAlpha,
        }
    }
}

impl ShuffleParams {
    fn selectors(&self) -> [ShuffleSelector; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

/// Images of a shuffle render.
#[derive(Debug)]
pub struct ShuffleArgs<'a> {
    /// Region of `dst` to produce
    pub window: Rect,
    /// Destination image
    pub dst: ImageMut<'a>,
    /// Input A
    pub a: Option<ImageRef<'a>>,
    /// Input B
    pub b: Option<ImageRef<'a>>,
}

impl<'a> ShuffleArgs<'a> {
    /// Renders `window` of `dst` with both inputs absent.
    pub fn new(window: Rect, dst: ImageMut<'a>) -> Self {
        Self { window, dst, a: None, b: None }
    }

    /// Sets input A.
    pub fn with_a(mut self, a: ImageRef<'a>) -> Self {
        self.a = Some(a);
        self
    }

    /// Sets input B.
    pub fn with_b(mut self, b: ImageRef<'a>) -> Self {
        self.b = Some(b);
        self
    }

    fn validate(&self) -> OpsResult<()> {
        let bounds = self.dst.bounds();
        if self.window.is_empty() || !bounds.contains_rect(&self.window) {
            return Err(Error::invalid_region(self.window, bounds).into());
        }
        for input in [&self.a, &self.b].into_iter().flatten() {
            if input.render_scale() != self.dst.render_scale() {
                return Err(Error::RenderScaleMismatch {
                    expected: self.dst.render_scale(),
                    got: input.render_scale(),
                }
                .into());
            }
            if input.field() != self.dst.field() {
                return Err(Error::FieldMismatch {
                    expected: self.dst.field(),
                    got: input.field(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Reads slot `slot` of `input` at `(x, y)` converted to `T`.
#[inline]
fn read<T: Sample>(input: Option<&ImageRef<'_>>, x: i32, y: i32, slot: usize) -> T {
    input
        .and_then(|img| {
            let i = img.components().sample_index(slot)?;
            img.value_at(x, y, i)
        })
        .map_or(T::zero(), T::from_value)
}

fn shuffle_view<T: Sample, A: AbortSignal + ?Sized>(
    mut view: ImageViewMut<'_, T>,
    window: Rect,
    routes: &[Route; 4],
    a: Option<&ImageRef<'_>>,
    b: Option<&ImageRef<'_>>,
    abort: &A,
) -> RenderStatus {
    let components: Components = view.components();
    let n = components.count();
    let indices = components.rgba_indices();
    let x0 = view.bounds().x1;

    view.for_each_row(window, abort, |y, row| {
        for x in window.x1..window.x2 {
            let i = (x - x0) as usize * n;
            for (k, &slot) in indices.iter().enumerate() {
                row[i + k] = match routes[slot] {
                    Route::Constant(false) => T::zero(),
                    Route::Constant(true) => T::one(),
                    Route::A(c) => read(a, x, y, c),
                    Route::B(c) => read(b, x, y, c),
                };
            }
        }
    })
}

/// Routes channels of A and B into `args.dst`.
///
/// # Errors
///
/// Fails before touching any pixel if the window is empty or outside the
/// destination, or if an input was rendered at another render scale or
/// field.
pub fn render_shuffle<A>(args: ShuffleArgs<'_>, params: &ShuffleParams, abort: &A) -> OpsResult<RenderStatus>
where
    A: AbortSignal + ?Sized,
{
    args.validate()?;
    debug!(
        window = %args.window,
        depth = %args.dst.depth(),
        components = %args.dst.components(),
        a = args.a.is_some(),
        b = args.b.is_some(),
        "render shuffle"
    );

    let routes = params.selectors().map(ShuffleSelector::route);
    let ShuffleArgs { window, dst, a, b } = args;
    let (a, b) = (a.as_ref(), b.as_ref());
    let status = match dst {
        ImageMut::U8(v) => shuffle_view(v, window, &routes, a, b, abort),
        ImageMut::U16(v) => shuffle_view(v, window, &routes, a, b, abort),
        ImageMut::F16(v) => shuffle_view(v, window, &routes, a, b, abort),
        ImageMut::F32(v) => shuffle_view(v, window, &routes, a, b, abort),
    };
    if status.is_aborted() {
        debug!(%window, "shuffle cancelled");
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxkit_core::{BitDepth, Image, NeverAbort};

    #[test]
    fn test_swap_and_constants() {
        let bounds = Rect::new(0, 0, 2, 2);
        let a = Image::filled(bounds, Components::Rgba, BitDepth::F32, [0.1, 0.2, 0.3, 0.4]);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        let params = ShuffleParams {
            red: ShuffleSelector::ABlue,
            green: ShuffleSelector::Zero,
            blue: ShuffleSelector::ARed,
            alpha: ShuffleSelector::One,
        };
        render_shuffle(ShuffleArgs::new(bounds, dst.view_mut()).with_a(a.view()), &params, &NeverAbort).unwrap();
        assert_eq!(dst.pixel_f32(1, 1).unwrap(), [0.3, 0.0, 0.1, 1.0]);
    }

    #[test]
    fn test_depth_conversion_is_exact() {
        let bounds = Rect::new(0, 0, 1, 1);
        let mut a = Image::new(bounds, Components::Rgba, BitDepth::U8);
        a.set_pixel_f32(0, 0, [1.0 / 255.0, 0.0, 128.0 / 255.0, 1.0]);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::U16);
        render_shuffle(
            ShuffleArgs::new(bounds, dst.view_mut()).with_a(a.view()),
            &ShuffleParams::default(),
            &NeverAbort,
        )
        .unwrap();
        let px = dst.pixel_f32(0, 0).unwrap();
        assert_eq!((px[0] * 65535.0).round() as u32, 0x0101);
        assert_eq!((px[2] * 65535.0).round() as u32, 0x8080);
        assert_eq!(px[3], 1.0);
    }

    #[test]
    fn test_missing_channel_reads_zero() {
        let bounds = Rect::new(0, 0, 2, 1);
        let b = Image::filled(bounds, Components::Rgb, BitDepth::F32, [0.5; 4]);
        let mut dst = Image::filled(bounds, Components::Rgba, BitDepth::F32, [0.9; 4]);
        let params = ShuffleParams {
            red: ShuffleSelector::BRed,
            green: ShuffleSelector::AGreen,
            blue: ShuffleSelector::BBlue,
            alpha: ShuffleSelector::BAlpha,
        };
        render_shuffle(ShuffleArgs::new(bounds, dst.view_mut()).with_b(b.view()), &params, &NeverAbort).unwrap();
        assert_eq!(dst.pixel_f32(0, 0).unwrap(), [0.5, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_alpha_only_destination() {
        let bounds = Rect::new(0, 0, 1, 1);
        let a = Image::filled(bounds, Components::Rgba, BitDepth::F32, [0.25, 0.5, 0.75, 1.0]);
        let mut dst = Image::new(bounds, Components::Alpha, BitDepth::F32);
        let params = ShuffleParams { alpha: ShuffleSelector::AGreen, ..Default::default() };
        render_shuffle(ShuffleArgs::new(bounds, dst.view_mut()).with_a(a.view()), &params, &NeverAbort).unwrap();
        assert_eq!(dst.pixel_f32(0, 0).unwrap()[3], 0.5);
    }

    #[test]
    fn test_render_scale_mismatch_rejected() {
        let bounds = Rect::new(0, 0, 1, 1);
        let a = Image::new(bounds, Components::Rgba, BitDepth::F32).with_render_scale(0.5, 0.5);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        let res = render_shuffle(
            ShuffleArgs::new(bounds, dst.view_mut()).with_a(a.view()),
            &ShuffleParams::default(),
            &NeverAbort,
        );
        assert!(res.is_err());
    }
}
