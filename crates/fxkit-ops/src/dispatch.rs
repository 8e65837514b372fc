//! The tile dispatcher shared by every per-pixel kernel.
//!
//! A render call walks the rows of a window of the destination. For each
//! pixel it:
//!
//! 1. reads the source pixel (absent = transparent black) and
//!    unpremultiplies it into normalised RGBA
//! 2. calls [`PixelKernel::process`]
//! 3. re-premultiplies, blends with the source by `mix × mask` and stores
//!    the result in the destination sample type
//! 4. restores the channels the [`ChannelMask`] leaves untouched
//!
//! The abort signal is polled once per row. On cancellation the rest of
//! the window is left unwritten.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::{BitDepth, Components, Image, NeverAbort, Rect};
//! use fxkit_ops::{render_kernel, Invert, RenderArgs};
//!
//! let bounds = Rect::new(0, 0, 4, 4);
//! let src = Image::filled(bounds, Components::Rgba, BitDepth::F32, [0.25, 0.5, 0.75, 1.0]);
//! let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
//!
//! let args = RenderArgs::new(bounds, dst.view_mut()).with_source(src.view());
//! render_kernel(args, &Invert, &NeverAbort).unwrap();
//! assert_eq!(dst.pixel_f32(2, 2).unwrap()[0], 0.75);
//! ```

use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_core::{
    validate_pair, AbortSignal, Components, Error, ImageMut, ImageRef, ImageView, ImageViewMut,
    Rect, RenderStatus, Sample,
};
use fxkit_math::{premultiply_mask_mix, unpremultiply, MaskMix};

use crate::OpsResult;

/// A per-pixel transform run by the dispatcher.
///
/// `pix` holds the unpremultiplied source pixel as normalised RGBA; the
/// kernel overwrites it with its result. Layouts without colour read
/// `0` in RGB, layouts without alpha read `1` in A.
pub trait PixelKernel: Sync {
    /// Transforms one pixel in place.
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]);

    /// Whether the result is premultiplied before storing, given the
    /// clip's premultiply flag. Kernels whose output is already
    /// premultiplied (or must stay straight) return `false`.
    fn premultiply_output(&self, premult: bool) -> bool {
        premult
    }
}

impl<K: PixelKernel + ?Sized> PixelKernel for &K {
    fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
        (**self).process(x, y, pix)
    }

    fn premultiply_output(&self, premult: bool) -> bool {
        (**self).premultiply_output(premult)
    }
}

/// Set of RGBA slots a render writes.
///
/// Disabled slots receive the source value unchanged (0 without a source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMask(u8);

impl ChannelMask {
    /// Red only
    pub const R: Self = Self(1);
    /// Green only
    pub const G: Self = Self(1 << 1);
    /// Blue only
    pub const B: Self = Self(1 << 2);
    /// Alpha only
    pub const A: Self = Self(1 << 3);
    /// Red, green and blue
    pub const RGB: Self = Self(0b0111);
    /// Every slot
    pub const ALL: Self = Self(0b1111);
    /// No slot
    pub const NONE: Self = Self(0);

    /// Mask from per-slot flags.
    pub const fn from_flags(r: bool, g: bool, b: bool, a: bool) -> Self {
        Self(r as u8 | (g as u8) << 1 | (b as u8) << 2 | (a as u8) << 3)
    }

    /// True if RGBA slot `slot` is written.
    #[inline]
    pub const fn contains(self, slot: usize) -> bool {
        slot < 4 && self.0 & (1 << slot) != 0
    }

    /// True if every slot is written.
    #[inline]
    pub const fn is_all(self) -> bool {
        self.0 == Self::ALL.0
    }

    /// Union of two masks.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for ChannelMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Everything a render call needs besides the kernel.
#[derive(Debug)]
pub struct RenderArgs<'a> {
    /// Region of `dst` to produce
    pub window: Rect,
    /// Destination image
    pub dst: ImageMut<'a>,
    /// Source image; `None` reads transparent black everywhere
    pub src: Option<ImageRef<'a>>,
    /// Mask image; its last stored channel is the mask value
    pub mask: Option<ImageRef<'a>>,
    /// Premultiply, mix and mask settings
    pub mask_mix: MaskMix,
    /// Slots to write
    pub channels: ChannelMask,
}

impl<'a> RenderArgs<'a> {
    /// Renders `window` of `dst` with no source, no mask and full mix.
    pub fn new(window: Rect, dst: ImageMut<'a>) -> Self {
        Self {
            window,
            dst,
            src: None,
            mask: None,
            mask_mix: MaskMix::default(),
            channels: ChannelMask::ALL,
        }
    }

    /// Sets the source image.
    pub fn with_source(mut self, src: ImageRef<'a>) -> Self {
        self.src = Some(src);
        self
    }

    /// Enables masking with `mask`.
    pub fn with_mask(mut self, mask: ImageRef<'a>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Sets premultiply / mix / mask-invert settings.
    pub fn with_mask_mix(mut self, mask_mix: MaskMix) -> Self {
        self.mask_mix = mask_mix;
        self
    }

    /// Sets the written slots.
    pub fn with_channels(mut self, channels: ChannelMask) -> Self {
        self.channels = channels;
        self
    }

    fn validate(&self) -> OpsResult<()> {
        let bounds = self.dst.bounds();
        if self.window.is_empty() || !bounds.contains_rect(&self.window) {
            return Err(Error::invalid_region(self.window, bounds).into());
        }
        if let Some(src) = &self.src {
            validate_pair(&self.dst, src)?;
        }
        if let Some(mask) = &self.mask {
            if mask.render_scale() != self.dst.render_scale() {
                return Err(Error::RenderScaleMismatch {
                    expected: self.dst.render_scale(),
                    got: mask.render_scale(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Per-call state shared by every row.
struct RowContext<'a, 'k, T: Sample, K: ?Sized> {
    kernel: &'k K,
    src: Option<ImageView<'a, T>>,
    mask: Option<ImageRef<'a>>,
    mask_mix: MaskMix,
    premult_out: bool,
    channels: ChannelMask,
    components: Components,
    window: Rect,
    x0: i32,
}

impl<T: Sample, K: PixelKernel + ?Sized> RowContext<'_, '_, T, K> {
    #[inline]
    fn render_row(&self, y: i32, row: &mut [T]) {
        let n = self.components.count();
        let indices = self.components.rgba_indices();
        let mm = &self.mask_mix;

        for x in self.window.x1..self.window.x2 {
            let i = (x - self.x0) as usize * n;
            let dst = &mut row[i..i + n];
            let src = self.src.as_ref().and_then(|s| s.pixel(x, y));

            let mut tmp = unpremultiply(src, self.components, mm.premult, mm.premult_channel);
            self.kernel.process(x, y, &mut tmp);

            let weight = mm.weight(self.mask.as_ref().map(|m| m.alpha_at(x, y)));
            premultiply_mask_mix(
                &tmp,
                self.premult_out,
                mm.premult_channel,
                weight,
                src,
                dst,
                self.components,
            );

            if !self.channels.is_all() {
                for (k, &slot) in indices.iter().enumerate() {
                    if !self.channels.contains(slot) {
                        dst[k] = src.map_or(T::zero(), |s| s[k]);
                    }
                }
            }
        }
    }
}

fn run_view<T, K, A>(mut view: ImageViewMut<'_, T>, ctx: RowContext<'_, '_, T, K>, abort: &A, parallel: bool) -> RenderStatus
where
    T: Sample,
    K: PixelKernel + ?Sized,
    A: AbortSignal + ?Sized,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return view.par_for_each_row(ctx.window, abort, |y, row| ctx.render_row(y, row));
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    view.for_each_row(ctx.window, abort, |y, row| ctx.render_row(y, row))
}

macro_rules! typed_source {
    ($src:expr, $variant:ident) => {
        match $src {
            Some(ImageRef::$variant(s)) => Some(s),
            _ => None,
        }
    };
}

fn dispatch<K, A>(args: RenderArgs<'_>, kernel: &K, abort: &A, parallel: bool) -> RenderStatus
where
    K: PixelKernel + ?Sized,
    A: AbortSignal + ?Sized,
{
    let RenderArgs { window, dst, src, mask, mask_mix, channels } = args;
    let premult_out = kernel.premultiply_output(mask_mix.premult);
    let components = dst.components();
    let x0 = dst.bounds().x1;

    macro_rules! ctx {
        ($variant:ident) => {
            RowContext {
                kernel,
                src: typed_source!(src, $variant),
                mask,
                mask_mix,
                premult_out,
                channels,
                components,
                window,
                x0,
            }
        };
    }

    match dst {
        ImageMut::U8(v) => run_view(v, ctx!(U8), abort, parallel),
        ImageMut::U16(v) => run_view(v, ctx!(U16), abort, parallel),
        ImageMut::F16(v) => run_view(v, ctx!(F16), abort, parallel),
        ImageMut::F32(v) => run_view(v, ctx!(F32), abort, parallel),
    }
}

fn log_entry(args: &RenderArgs<'_>, parallel: bool) {
    debug!(
        window = %args.window,
        depth = %args.dst.depth(),
        components = %args.dst.components(),
        source = args.src.is_some(),
        masked = args.mask.is_some(),
        mix = args.mask_mix.mix,
        parallel,
        "render kernel"
    );
}

fn log_exit(window: Rect, status: RenderStatus) {
    if status.is_aborted() {
        debug!(%window, "render cancelled");
    } else {
        trace!(%window, "render done");
    }
}

/// Runs `kernel` over `args.window`, one row at a time on the calling
/// thread.
///
/// # Errors
///
/// Fails before touching any pixel if the window is empty or outside the
/// destination, or if the source disagrees with the destination on bit
/// depth, components, render scale or field.
pub fn render_kernel<K, A>(args: RenderArgs<'_>, kernel: &K, abort: &A) -> OpsResult<RenderStatus>
where
    K: PixelKernel + ?Sized,
    A: AbortSignal + ?Sized,
{
    args.validate()?;
    log_entry(&args, false);
    let window = args.window;
    let status = dispatch(args, kernel, abort, false);
    log_exit(window, status);
    Ok(status)
}

/// Row-parallel counterpart of [`render_kernel`].
///
/// Rows are spread across the rayon pool; each worker polls `abort` before
/// its row. The output is identical to the serial path.
///
/// # Errors
///
/// Same as [`render_kernel`].
#[cfg(feature = "parallel")]
pub fn render_kernel_parallel<K, A>(args: RenderArgs<'_>, kernel: &K, abort: &A) -> OpsResult<RenderStatus>
where
    K: PixelKernel + ?Sized,
    A: AbortSignal + ?Sized,
{
    args.validate()?;
    log_entry(&args, true);
    let window = args.window;
    let status = dispatch(args, kernel, abort, true);
    log_exit(window, status);
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxkit_core::{BitDepth, Image, NeverAbort};

    struct AddOne;

    impl PixelKernel for AddOne {
        fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
            for v in pix.iter_mut() {
                *v += 0.25;
            }
        }
    }

    struct Coords;

    impl PixelKernel for Coords {
        fn process(&self, x: i32, y: i32, pix: &mut [f32; 4]) {
            *pix = [x as f32 / 8.0, y as f32 / 8.0, 0.0, 1.0];
        }
    }

    fn gradient(bounds: Rect, depth: BitDepth) -> Image {
        let n = (bounds.area() * 4) as usize;
        let values: Vec<f32> = (0..n).map(|i| (i % 17) as f32 / 16.0).collect();
        Image::from_f32(bounds, Components::Rgba, depth, &values).unwrap()
    }

    #[test]
    fn test_channel_mask_flags() {
        let m = ChannelMask::from_flags(true, false, true, false);
        assert!(m.contains(0));
        assert!(!m.contains(1));
        assert!(m.contains(2));
        assert!(!m.contains(3));
        assert!(!m.contains(7));
        assert_eq!(ChannelMask::R | ChannelMask::G | ChannelMask::B, ChannelMask::RGB);
        assert!(ChannelMask::default().is_all());
    }

    #[test]
    fn test_disabled_channels_copy_source() {
        let bounds = Rect::new(0, 0, 3, 2);
        let src = Image::filled(bounds, Components::Rgba, BitDepth::U8, [0.0, 0.2, 0.4, 0.6]);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::U8);
        let args = RenderArgs::new(bounds, dst.view_mut())
            .with_source(src.view())
            .with_channels(ChannelMask::G | ChannelMask::A);
        render_kernel(args, &AddOne, &NeverAbort).unwrap();

        for y in 0..2 {
            for x in 0..3 {
                let s = src.pixel_f32(x, y).unwrap();
                let d = dst.pixel_f32(x, y).unwrap();
                assert_eq!(d[0], s[0]);
                assert_eq!(d[2], s[2]);
                assert!((d[1] - (s[1] + 0.25)).abs() < 1.0 / 255.0);
            }
        }
    }

    #[test]
    fn test_window_only_is_written() {
        let bounds = Rect::new(0, 0, 4, 4);
        let mut dst = Image::filled(bounds, Components::Rgb, BitDepth::F32, [9.0; 4]);
        let window = Rect::new(1, 1, 3, 2);
        render_kernel(RenderArgs::new(window, dst.view_mut()), &Coords, &NeverAbort).unwrap();

        for y in 0..4 {
            for x in 0..4 {
                let px = dst.pixel_f32(x, y).unwrap();
                if window.contains(x, y) {
                    assert_eq!(px[0], x as f32 / 8.0);
                } else {
                    assert_eq!(px[0], 9.0);
                }
            }
        }
    }

    #[test]
    fn test_mask_weight_blends() {
        let bounds = Rect::new(0, 0, 2, 1);
        let src = Image::filled(bounds, Components::Rgba, BitDepth::F32, [0.5; 4]);
        let mask = Image::from_f32(bounds, Components::Alpha, BitDepth::F32, &[0.0, 1.0]).unwrap();
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        let args = RenderArgs::new(bounds, dst.view_mut())
            .with_source(src.view())
            .with_mask(mask.view());
        render_kernel(args, &AddOne, &NeverAbort).unwrap();

        assert_eq!(dst.pixel_f32(0, 0).unwrap(), [0.5; 4]);
        assert_eq!(dst.pixel_f32(1, 0).unwrap(), [0.75; 4]);
    }

    #[test]
    fn test_absent_source_reads_black() {
        let bounds = Rect::new(0, 0, 2, 2);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        render_kernel(RenderArgs::new(bounds, dst.view_mut()), &AddOne, &NeverAbort).unwrap();
        assert_eq!(dst.pixel_f32(1, 1).unwrap(), [0.25; 4]);
    }

    #[test]
    fn test_mismatched_source_is_rejected() {
        let bounds = Rect::new(0, 0, 2, 2);
        let src = Image::new(bounds, Components::Rgb, BitDepth::F32);
        let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
        let err = render_kernel(
            RenderArgs::new(bounds, dst.view_mut()).with_source(src.view()),
            &AddOne,
            &NeverAbort,
        )
        .unwrap_err();
        assert!(err.is_unsupported_format());

        let src = Image::new(bounds, Components::Rgba, BitDepth::U16);
        let err = render_kernel(
            RenderArgs::new(bounds, dst.view_mut()).with_source(src.view()),
            &AddOne,
            &NeverAbort,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_abort_leaves_rows_unwritten() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let bounds = Rect::new(0, 0, 2, 4);
        let mut dst = Image::new(bounds, Components::Alpha, BitDepth::F32);
        let polls = AtomicUsize::new(0);
        let abort = || polls.fetch_add(1, Ordering::Relaxed) >= 2;
        let status = render_kernel(RenderArgs::new(bounds, dst.view_mut()), &AddOne, &abort).unwrap();

        assert_eq!(status, RenderStatus::Aborted);
        assert_eq!(dst.pixel_f32(0, 1).unwrap()[3], 0.25);
        assert_eq!(dst.pixel_f32(0, 2).unwrap()[3], 0.0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_serial() {
        let bounds = Rect::new(-3, 2, 29, 21);
        for depth in [BitDepth::U8, BitDepth::U16, BitDepth::F16, BitDepth::F32] {
            let src = gradient(bounds, depth);
            let mm = MaskMix { premult: true, mix: 0.7, ..Default::default() };

            let mut serial = Image::new(bounds, Components::Rgba, depth);
            let args = RenderArgs::new(bounds, serial.view_mut()).with_source(src.view()).with_mask_mix(mm);
            render_kernel(args, &AddOne, &NeverAbort).unwrap();

            let mut par = Image::new(bounds, Components::Rgba, depth);
            let args = RenderArgs::new(bounds, par.view_mut()).with_source(src.view()).with_mask_mix(mm);
            render_kernel_parallel(args, &AddOne, &NeverAbort).unwrap();

            assert_eq!(serial, par, "{depth}");
        }
    }
}
