//! Image views and owned image buffers.
//!
//! The host owns every image; a render call only borrows it. This module
//! models that boundary:
//!
//! - [`ImageView`] / [`ImageViewMut`] - typed, borrowed access with
//!   `pixel(x, y)` addressing (the host's "pixel address for (x, y)")
//! - [`ImageRef`] / [`ImageMut`] - the same views tagged with their runtime
//!   [`BitDepth`], used where the depth is only known at dispatch time
//! - [`Image`] - an owned buffer standing in for a host image (tests,
//!   benches, frame fetches)
//!
//! # Memory Layout
//!
//! Samples are interleaved and rows are stored from `bounds.y1` upwards,
//! `row_stride` samples apart:
//!
//! ```text
//! row y1     [R G B A R G B A ...] (padding)
//! row y1 + 1 [R G B A R G B A ...] (padding)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::{BitDepth, Components, Image, Rect};
//!
//! let mut img = Image::new(Rect::new(0, 0, 4, 4), Components::Rgba, BitDepth::U8);
//! img.set_pixel_f32(1, 2, [1.0, 0.5, 0.0, 1.0]);
//!
//! let px = img.view().pixel_f32(1, 2).unwrap();
//! assert_eq!(px[0], 1.0);
//! assert!(img.view().pixel_f32(4, 0).is_none()); // outside bounds
//! ```

use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

use half::f16;
use rayon::prelude::*;

use crate::{
    AbortSignal, BitDepth, Components, Error, Field, Rect, RenderStatus, Result, Sample, SampleValue,
};

/// Geometry and clip properties shared by every view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDesc {
    /// Pixel rectangle covered by the buffer
    pub bounds: Rect,
    /// Channel layout
    pub components: Components,
    /// Samples between the starts of consecutive rows
    pub row_stride: usize,
    /// Pixel aspect ratio
    pub pixel_aspect: f64,
    /// Render scale the image was produced at
    pub render_scale: (f64, f64),
    /// Field order
    pub field: Field,
}

impl ImageDesc {
    /// Tightly packed descriptor for `bounds` and `components`.
    pub fn packed(bounds: Rect, components: Components) -> Self {
        Self {
            bounds,
            components,
            row_stride: bounds.width() as usize * components.count(),
            pixel_aspect: 1.0,
            render_scale: (1.0, 1.0),
            field: Field::None,
        }
    }

    /// Samples the buffer must hold to cover every row.
    fn required_len(&self) -> usize {
        let h = self.bounds.height() as usize;
        if h == 0 {
            return 0;
        }
        (h - 1) * self.row_stride + self.row_len()
    }

    /// Samples in one row of pixels.
    #[inline]
    fn row_len(&self) -> usize {
        self.bounds.width() as usize * self.components.count()
    }

    /// Offset of pixel `(x, y)`, or `None` outside bounds.
    #[inline]
    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let row = (y - self.bounds.y1) as usize;
        let col = (x - self.bounds.x1) as usize;
        Some(row * self.row_stride + col * self.components.count())
    }

    fn validate(&self, len: usize) -> Result<()> {
        if self.row_stride < self.row_len() {
            return Err(Error::invalid_dimensions(
                self.bounds.width(),
                self.bounds.height(),
                format!("row stride {} shorter than row {}", self.row_stride, self.row_len()),
            ));
        }
        let need = self.required_len();
        if len < need {
            return Err(Error::invalid_dimensions(
                self.bounds.width(),
                self.bounds.height(),
                format!("expected at least {need} samples, got {len}"),
            ));
        }
        Ok(())
    }
}

/// Expands stored samples into a normalised `[r, g, b, a]` quadruple.
///
/// Missing colour reads as 0 and missing alpha as 1, except for alpha-only
/// pixels whose colour is 0.
#[inline]
pub fn expand_rgba<T: Sample>(pix: &[T], components: Components) -> [f32; 4] {
    match components {
        Components::Alpha => [0.0, 0.0, 0.0, pix[0].to_f32()],
        Components::Xy => [pix[0].to_f32(), pix[1].to_f32(), 0.0, 1.0],
        Components::Rgb => [pix[0].to_f32(), pix[1].to_f32(), pix[2].to_f32(), 1.0],
        Components::Rgba => [
            pix[0].to_f32(),
            pix[1].to_f32(),
            pix[2].to_f32(),
            pix[3].to_f32(),
        ],
    }
}

/// Read-only typed view of a host image.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T: Sample> {
    data: &'a [T],
    desc: ImageDesc,
}

impl<'a, T: Sample> ImageView<'a, T> {
    /// Wraps a tightly packed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `data` is too short.
    pub fn new(data: &'a [T], bounds: Rect, components: Components) -> Result<Self> {
        Self::with_desc(data, ImageDesc::packed(bounds, components))
    }

    /// Wraps a buffer described by `desc`.
    pub fn with_desc(data: &'a [T], desc: ImageDesc) -> Result<Self> {
        desc.validate(data.len())?;
        Ok(Self { data, desc })
    }

    /// Descriptor of this view.
    #[inline]
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Pixel rectangle covered by the view.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.desc.bounds
    }

    /// Channel layout.
    #[inline]
    pub fn components(&self) -> Components {
        self.desc.components
    }

    /// Render scale the image was produced at.
    #[inline]
    pub fn render_scale(&self) -> (f64, f64) {
        self.desc.render_scale
    }

    /// Field order.
    #[inline]
    pub fn field(&self) -> Field {
        self.desc.field
    }

    /// Pixel aspect ratio.
    #[inline]
    pub fn pixel_aspect(&self) -> f64 {
        self.desc.pixel_aspect
    }

    /// Samples of pixel `(x, y)`, or `None` outside bounds.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<&'a [T]> {
        let off = self.desc.offset(x, y)?;
        self.data.get(off..off + self.desc.components.count())
    }
}

/// Writable typed view of a host image.
#[derive(Debug)]
pub struct ImageViewMut<'a, T: Sample> {
    data: &'a mut [T],
    desc: ImageDesc,
}

impl<'a, T: Sample> ImageViewMut<'a, T> {
    /// Wraps a tightly packed buffer.
    pub fn new(data: &'a mut [T], bounds: Rect, components: Components) -> Result<Self> {
        Self::with_desc(data, ImageDesc::packed(bounds, components))
    }

    /// Wraps a buffer described by `desc`.
    pub fn with_desc(data: &'a mut [T], desc: ImageDesc) -> Result<Self> {
        desc.validate(data.len())?;
        Ok(Self { data, desc })
    }

    /// Descriptor of this view.
    #[inline]
    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    /// Pixel rectangle covered by the view.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.desc.bounds
    }

    /// Channel layout.
    #[inline]
    pub fn components(&self) -> Components {
        self.desc.components
    }

    /// Render scale the image was produced at.
    #[inline]
    pub fn render_scale(&self) -> (f64, f64) {
        self.desc.render_scale
    }

    /// Field order.
    #[inline]
    pub fn field(&self) -> Field {
        self.desc.field
    }

    /// Pixel aspect ratio.
    #[inline]
    pub fn pixel_aspect(&self) -> f64 {
        self.desc.pixel_aspect
    }

    /// Read-only reborrow.
    #[inline]
    pub fn as_view(&self) -> ImageView<'_, T> {
        ImageView {
            data: self.data,
            desc: self.desc,
        }
    }

    /// Samples of pixel `(x, y)`, or `None` outside bounds.
    #[inline]
    pub fn pixel_mut(&mut self, x: i32, y: i32) -> Option<&mut [T]> {
        let off = self.desc.offset(x, y)?;
        let n = self.desc.components.count();
        self.data.get_mut(off..off + n)
    }

    /// The row at `y`, starting at `bounds.x1`.
    pub fn row_mut(&mut self, y: i32) -> Option<&mut [T]> {
        let off = self.desc.offset(self.desc.bounds.x1, y)?;
        let len = self.desc.row_len();
        self.data.get_mut(off..off + len)
    }

    /// Rows whose `y` lies in `rows`, clipped to the bounds.
    pub fn rows_mut(&mut self, rows: Range<i32>) -> impl Iterator<Item = (i32, &mut [T])> + '_ {
        let (y0, skip, take) = self.row_span(rows);
        let len = self.desc.row_len();
        self.data
            .chunks_mut(self.desc.row_stride.max(1))
            .skip(skip)
            .take(take)
            .enumerate()
            .map(move |(i, row)| (y0 + i as i32, row.split_at_mut(len).0))
    }

    /// Parallel counterpart of [`rows_mut`](Self::rows_mut).
    pub fn par_rows_mut(
        &mut self,
        rows: Range<i32>,
    ) -> impl IndexedParallelIterator<Item = (i32, &mut [T])> + '_ {
        let (y0, skip, take) = self.row_span(rows);
        let len = self.desc.row_len();
        self.data
            .par_chunks_mut(self.desc.row_stride.max(1))
            .skip(skip)
            .take(take)
            .enumerate()
            .map(move |(i, row)| (y0 + i as i32, row.split_at_mut(len).0))
    }

    /// Calls `f(y, row)` for every row of `window`, polling `abort` once
    /// before each row.
    ///
    /// `row` starts at `bounds.x1`; pixel `x` sits at
    /// `(x - bounds.x1) * components.count()`.
    pub fn for_each_row<A, F>(&mut self, window: Rect, abort: &A, mut f: F) -> RenderStatus
    where
        A: AbortSignal + ?Sized,
        F: FnMut(i32, &mut [T]),
    {
        for (y, row) in self.rows_mut(window.y1..window.y2) {
            if abort.should_abort() {
                return RenderStatus::Aborted;
            }
            f(y, row);
        }
        RenderStatus::Completed
    }

    /// Row-parallel counterpart of [`for_each_row`](Self::for_each_row).
    ///
    /// Each worker polls `abort` before its row; once any worker sees the
    /// signal, rows not yet started are skipped.
    pub fn par_for_each_row<A, F>(&mut self, window: Rect, abort: &A, f: F) -> RenderStatus
    where
        A: AbortSignal + ?Sized,
        F: Fn(i32, &mut [T]) + Sync,
    {
        let aborted = AtomicBool::new(false);
        self.par_rows_mut(window.y1..window.y2).for_each(|(y, row)| {
            if aborted.load(Ordering::Relaxed) {
                return;
            }
            if abort.should_abort() {
                aborted.store(true, Ordering::Relaxed);
                return;
            }
            f(y, row);
        });
        if aborted.into_inner() {
            RenderStatus::Aborted
        } else {
            RenderStatus::Completed
        }
    }

    fn row_span(&self, rows: Range<i32>) -> (i32, usize, usize) {
        let b = self.desc.bounds;
        let start = rows.start.max(b.y1);
        let end = rows.end.min(b.y2);
        if start >= end || self.desc.row_len() == 0 {
            return (start, 0, 0);
        }
        (start, (start - b.y1) as usize, (end - start) as usize)
    }
}

macro_rules! dispatch_view {
    ($target:expr, $enum:ident, $v:ident => $body:expr) => {
        match $target {
            $enum::U8($v) => $body,
            $enum::U16($v) => $body,
            $enum::F16($v) => $body,
            $enum::F32($v) => $body,
        }
    };
}

/// A borrowed image whose depth is known at runtime.
#[derive(Debug, Clone, Copy)]
pub enum ImageRef<'a> {
    /// 8-bit samples
    U8(ImageView<'a, u8>),
    /// 16-bit samples
    U16(ImageView<'a, u16>),
    /// Half-float samples
    F16(ImageView<'a, f16>),
    /// Float samples
    F32(ImageView<'a, f32>),
}

impl<'a> ImageRef<'a> {
    /// Sample depth.
    pub fn depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::U8,
            Self::U16(_) => BitDepth::U16,
            Self::F16(_) => BitDepth::F16,
            Self::F32(_) => BitDepth::F32,
        }
    }

    /// Descriptor of the view.
    pub fn desc(&self) -> &ImageDesc {
        dispatch_view!(self, Self, v => v.desc())
    }

    /// Pixel rectangle covered by the image.
    pub fn bounds(&self) -> Rect {
        self.desc().bounds
    }

    /// Channel layout.
    pub fn components(&self) -> Components {
        self.desc().components
    }

    /// Render scale the image was produced at.
    pub fn render_scale(&self) -> (f64, f64) {
        self.desc().render_scale
    }

    /// Field order.
    pub fn field(&self) -> Field {
        self.desc().field
    }

    /// Normalised `[r, g, b, a]` at `(x, y)`, or `None` outside bounds.
    pub fn pixel_f32(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        dispatch_view!(self, Self, v => v.pixel(x, y).map(|p| expand_rgba(p, v.components())))
    }

    /// Normalised value of the last stored channel (the alpha of an RGBA or
    /// alpha-only image), or `None` outside bounds.
    pub fn alpha_at(&self, x: i32, y: i32) -> Option<f32> {
        dispatch_view!(self, Self, v => v.pixel(x, y).and_then(|p| p.last()).map(|s| s.to_f32()))
    }

    /// Stored sample `c` of pixel `(x, y)`.
    pub fn value_at(&self, x: i32, y: i32, c: usize) -> Option<SampleValue> {
        dispatch_view!(self, Self, v => v.pixel(x, y).and_then(|p| p.get(c)).map(|s| s.to_value()))
    }
}

/// A writable image whose depth is known at runtime.
#[derive(Debug)]
pub enum ImageMut<'a> {
    /// 8-bit samples
    U8(ImageViewMut<'a, u8>),
    /// 16-bit samples
    U16(ImageViewMut<'a, u16>),
    /// Half-float samples
    F16(ImageViewMut<'a, f16>),
    /// Float samples
    F32(ImageViewMut<'a, f32>),
}

impl<'a> ImageMut<'a> {
    /// Sample depth.
    pub fn depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::U8,
            Self::U16(_) => BitDepth::U16,
            Self::F16(_) => BitDepth::F16,
            Self::F32(_) => BitDepth::F32,
        }
    }

    /// Descriptor of the view.
    pub fn desc(&self) -> &ImageDesc {
        dispatch_view!(self, Self, v => v.desc())
    }

    /// Pixel rectangle covered by the image.
    pub fn bounds(&self) -> Rect {
        self.desc().bounds
    }

    /// Channel layout.
    pub fn components(&self) -> Components {
        self.desc().components
    }

    /// Render scale the image was produced at.
    pub fn render_scale(&self) -> (f64, f64) {
        self.desc().render_scale
    }

    /// Field order.
    pub fn field(&self) -> Field {
        self.desc().field
    }

    /// Read-only reborrow.
    pub fn as_ref(&self) -> ImageRef<'_> {
        match self {
            Self::U8(v) => ImageRef::U8(v.as_view()),
            Self::U16(v) => ImageRef::U16(v.as_view()),
            Self::F16(v) => ImageRef::F16(v.as_view()),
            Self::F32(v) => ImageRef::F32(v.as_view()),
        }
    }

    /// Writes normalised values into the stored channels of `(x, y)`.
    ///
    /// `rgba` is indexed by RGBA slot; only the slots the layout stores are
    /// written. Returns `false` outside bounds.
    pub fn set_pixel_f32(&mut self, x: i32, y: i32, rgba: [f32; 4]) -> bool {
        dispatch_view!(self, Self, v => {
            let comps = v.components();
            match v.pixel_mut(x, y) {
                Some(p) => {
                    for (s, &c) in p.iter_mut().zip(comps.rgba_indices()) {
                        *s = Sample::from_f32(rgba[c]);
                    }
                    true
                }
                None => false,
            }
        })
    }
}

/// Owned sample storage for an [`Image`].
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    /// 8-bit samples
    U8(Vec<u8>),
    /// 16-bit samples
    U16(Vec<u16>),
    /// Half-float samples
    F16(Vec<f16>),
    /// Float samples
    F32(Vec<f32>),
}

impl ImageData {
    fn zeroed(depth: BitDepth, len: usize) -> Self {
        match depth {
            BitDepth::U8 => Self::U8(vec![0; len]),
            BitDepth::U16 => Self::U16(vec![0; len]),
            BitDepth::F16 => Self::F16(vec![f16::ZERO; len]),
            BitDepth::F32 => Self::F32(vec![0.0; len]),
        }
    }

    fn len(&self) -> usize {
        dispatch_view!(self, Self, d => d.len())
    }
}

/// Owned, tightly packed image buffer.
///
/// Stands in for a host image wherever the crate needs to hold pixels:
/// tests, benchmarks and frames fetched for accumulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: ImageData,
    desc: ImageDesc,
}

impl Image {
    /// Creates a zero-filled image.
    pub fn new(bounds: Rect, components: Components, depth: BitDepth) -> Self {
        let desc = ImageDesc::packed(bounds, components);
        Self {
            data: ImageData::zeroed(depth, desc.required_len()),
            desc,
        }
    }

    /// Creates an image from interleaved normalised values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimensions`] if `values` does not hold exactly
    /// one sample per stored channel.
    pub fn from_f32(
        bounds: Rect,
        components: Components,
        depth: BitDepth,
        values: &[f32],
    ) -> Result<Self> {
        let mut img = Self::new(bounds, components, depth);
        if values.len() != img.data.len() {
            return Err(Error::invalid_dimensions(
                bounds.width(),
                bounds.height(),
                format!("expected {} samples, got {}", img.data.len(), values.len()),
            ));
        }
        dispatch_view!(&mut img.data, ImageData, d => {
            for (s, &v) in d.iter_mut().zip(values) {
                *s = Sample::from_f32(v);
            }
        });
        Ok(img)
    }

    /// Creates an image filled with one normalised RGBA value.
    pub fn filled(bounds: Rect, components: Components, depth: BitDepth, rgba: [f32; 4]) -> Self {
        let mut img = Self::new(bounds, components, depth);
        img.fill_f32(rgba);
        img
    }

    /// Sets the render scale reported by views of this image.
    pub fn with_render_scale(mut self, sx: f64, sy: f64) -> Self {
        self.desc.render_scale = (sx, sy);
        self
    }

    /// Sets the field order reported by views of this image.
    pub fn with_field(mut self, field: Field) -> Self {
        self.desc.field = field;
        self
    }

    /// Sets the pixel aspect ratio reported by views of this image.
    pub fn with_pixel_aspect(mut self, par: f64) -> Self {
        self.desc.pixel_aspect = par;
        self
    }

    /// Sample depth.
    pub fn depth(&self) -> BitDepth {
        match self.data {
            ImageData::U8(_) => BitDepth::U8,
            ImageData::U16(_) => BitDepth::U16,
            ImageData::F16(_) => BitDepth::F16,
            ImageData::F32(_) => BitDepth::F32,
        }
    }

    /// Pixel rectangle covered by the image.
    pub fn bounds(&self) -> Rect {
        self.desc.bounds
    }

    /// Channel layout.
    pub fn components(&self) -> Components {
        self.desc.components
    }

    /// Raw storage.
    pub fn data(&self) -> &ImageData {
        &self.data
    }

    /// Borrowed read-only view.
    pub fn view(&self) -> ImageRef<'_> {
        let desc = self.desc;
        match &self.data {
            ImageData::U8(d) => ImageRef::U8(ImageView { data: d, desc }),
            ImageData::U16(d) => ImageRef::U16(ImageView { data: d, desc }),
            ImageData::F16(d) => ImageRef::F16(ImageView { data: d, desc }),
            ImageData::F32(d) => ImageRef::F32(ImageView { data: d, desc }),
        }
    }

    /// Borrowed writable view.
    pub fn view_mut(&mut self) -> ImageMut<'_> {
        let desc = self.desc;
        match &mut self.data {
            ImageData::U8(d) => ImageMut::U8(ImageViewMut { data: d, desc }),
            ImageData::U16(d) => ImageMut::U16(ImageViewMut { data: d, desc }),
            ImageData::F16(d) => ImageMut::F16(ImageViewMut { data: d, desc }),
            ImageData::F32(d) => ImageMut::F32(ImageViewMut { data: d, desc }),
        }
    }

    /// Normalised `[r, g, b, a]` at `(x, y)`.
    pub fn pixel_f32(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        self.view().pixel_f32(x, y)
    }

    /// Writes a normalised RGBA value into `(x, y)`; see [`ImageMut::set_pixel_f32`].
    pub fn set_pixel_f32(&mut self, x: i32, y: i32, rgba: [f32; 4]) -> bool {
        self.view_mut().set_pixel_f32(x, y, rgba)
    }

    /// Writes the same normalised RGBA value into every pixel.
    pub fn fill_f32(&mut self, rgba: [f32; 4]) {
        let comps = self.desc.components;
        dispatch_view!(&mut self.data, ImageData, d => {
            for px in d.chunks_mut(comps.count()) {
                for (s, &c) in px.iter_mut().zip(comps.rgba_indices()) {
                    *s = Sample::from_f32(rgba[c]);
                }
            }
        });
    }

    /// Stored samples of every pixel, normalised, in storage order.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        dispatch_view!(&self.data, ImageData, d => d.iter().map(|s| s.to_f32()).collect())
    }
}

/// Checks that `src` was rendered for the same frame as `dst`: matching
/// render scale, field and bit depth.
///
/// Component layouts may differ; see [`validate_pair`] for the stricter check.
pub fn validate_clip(dst: &ImageMut<'_>, src: &ImageRef<'_>) -> Result<()> {
    if src.render_scale() != dst.render_scale() {
        return Err(Error::RenderScaleMismatch {
            expected: dst.render_scale(),
            got: src.render_scale(),
        });
    }
    if src.field() != dst.field() {
        return Err(Error::FieldMismatch {
            expected: dst.field(),
            got: src.field(),
        });
    }
    if src.depth() != dst.depth() {
        return Err(Error::depth_mismatch(dst.depth(), src.depth()));
    }
    Ok(())
}

/// Checks that `src` and `dst` agree on render scale, field, bit depth and
/// component layout.
pub fn validate_pair(dst: &ImageMut<'_>, src: &ImageRef<'_>) -> Result<()> {
    validate_clip(dst, src)?;
    if src.components() != dst.components() {
        return Err(Error::components_mismatch(dst.components(), src.components()));
    }
    Ok(())
}
