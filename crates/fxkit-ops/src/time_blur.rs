//! Accumulation motion blur.
//!
//! The source is fetched at `divisions` sub-frame times spread over the
//! shutter interval and averaged into a float accumulator owned by the
//! render call. A frame the host cannot deliver fails the render at once.
//!
//! # Usage
//!
//! ```rust
//! use fxkit_core::{BitDepth, Components, Image, NeverAbort, Rect};
//! use fxkit_ops::{render_time_blur, TimeBlurParams};
//!
//! let bounds = Rect::new(0, 0, 2, 2);
//! let mut dst = Image::new(bounds, Components::Rgba, BitDepth::F32);
//! let params = TimeBlurParams { divisions: 4, ..Default::default() };
//!
//! // a source whose value is the frame time
//! let fetch = |t: f64| Ok(Some(Image::filled(bounds, Components::Rgba, BitDepth::F32, [t as f32; 4])));
//! render_time_blur(&params, 10.0, fetch, dst.view_mut(), bounds, &NeverAbort).unwrap();
//! assert!((dst.pixel_f32(0, 0).unwrap()[0] - 10.0).abs() < 1e-5);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use fxkit_core::{validate_clip, AbortSignal, Error, Image, ImageMut, ImageRef, Rect, RenderStatus};

use crate::{OpsError, OpsResult};

/// Where the shutter interval sits relative to the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ShutterOffset {
    /// Centred on the frame
    #[default]
    Centered,
    /// Opens at the frame
    Start,
    /// Closes at the frame
    End,
    /// Opens at `time + custom_offset`
    Custom,
}

/// Settings of the time blur.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TimeBlurParams {
    /// Number of sub-frame samples
    pub divisions: u32,
    /// Shutter length in frames
    pub shutter: f64,
    /// Shutter placement
    pub shutter_offset: ShutterOffset,
    /// Opening offset for [`ShutterOffset::Custom`], in frames
    pub custom_offset: f64,
}

impl Default for TimeBlurParams {
    fn default() -> Self {
        Self {
            divisions: 10,
            shutter: 0.5,
            shutter_offset: ShutterOffset::Centered,
            custom_offset: 0.0,
        }
    }
}

impl TimeBlurParams {
    /// Rejects zero divisions and a negative or non-finite shutter.
    pub fn validate(&self) -> OpsResult<()> {
        if self.divisions == 0 {
            return Err(OpsError::invalid("time blur needs at least one division"));
        }
        if !self.shutter.is_finite() || self.shutter < 0.0 || !self.custom_offset.is_finite() {
            return Err(OpsError::invalid(format!("invalid shutter {}", self.shutter)));
        }
        Ok(())
    }

    /// Time the shutter opens for the frame at `time`.
    pub fn shutter_open(&self, time: f64) -> f64 {
        match self.shutter_offset {
            ShutterOffset::Centered => time - self.shutter / 2.0,
            ShutterOffset::Start => time,
            ShutterOffset::End => time - self.shutter,
            ShutterOffset::Custom => time + self.custom_offset,
        }
    }

    /// Sub-frame sample times: the midpoints of `divisions` equal slices
    /// of the shutter interval.
    pub fn sample_times(&self, time: f64) -> Vec<f64> {
        let open = self.shutter_open(time);
        let n = self.divisions as f64;
        (0..self.divisions)
            .map(|i| open + self.shutter * (i as f64 + 0.5) / n)
            .collect()
    }
}

/// Running RGBA sum over a window.
#[derive(Debug, Clone)]
pub struct TimeBlurAccumulator {
    window: Rect,
    sum: Vec<f32>,
    count: u32,
}

impl TimeBlurAccumulator {
    /// Empty accumulator for `window`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] if `window` covers no pixels.
    pub fn new(window: Rect) -> OpsResult<Self> {
        if window.is_empty() {
            let err = Error::invalid_dimensions(window.width(), window.height(), "empty accumulation window");
            return Err(err.into());
        }
        Ok(Self {
            window,
            sum: vec![0.0; window.area() as usize * 4],
            count: 0,
        })
    }

    /// Number of accumulated frames.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Adds one frame. `None`, or pixels outside the frame, add black.
    pub fn accumulate(&mut self, frame: Option<&ImageRef<'_>>) {
        self.count += 1;
        let Some(frame) = frame else {
            return;
        };
        let window = self.window;
        let stride = window.width() as usize * 4;
        let add_row = |(i, row): (usize, &mut [f32])| {
            let y = window.y1 + i as i32;
            for (j, x) in (window.x1..window.x2).enumerate() {
                if let Some(px) = frame.pixel_f32(x, y) {
                    for (acc, v) in row[j * 4..j * 4 + 4].iter_mut().zip(px) {
                        *acc += v;
                    }
                }
            }
        };

        #[cfg(feature = "parallel")]
        self.sum.par_chunks_mut(stride).enumerate().for_each(add_row);
        #[cfg(not(feature = "parallel"))]
        self.sum.chunks_mut(stride).enumerate().for_each(add_row);
    }

    /// Average of pixel `(x, y)`, or `None` outside the window or before
    /// any frame was added.
    pub fn average(&self, x: i32, y: i32) -> Option<[f32; 4]> {
        if self.count == 0 || !self.window.contains(x, y) {
            return None;
        }
        let i = ((y - self.window.y1) as usize * self.window.width() as usize + (x - self.window.x1) as usize) * 4;
        let inv = 1.0 / self.count as f32;
        let s = &self.sum[i..i + 4];
        Some([s[0] * inv, s[1] * inv, s[2] * inv, s[3] * inv])
    }

    /// Writes the average into `dst`, polling `abort` once per row.
    pub fn finish<A: AbortSignal + ?Sized>(&self, dst: &mut ImageMut<'_>, abort: &A) -> RenderStatus {
        for y in self.window.y1..self.window.y2 {
            if abort.should_abort() {
                return RenderStatus::Aborted;
            }
            for x in self.window.x1..self.window.x2 {
                let px = self.average(x, y).unwrap_or([0.0; 4]);
                dst.set_pixel_f32(x, y, px);
            }
        }
        RenderStatus::Completed
    }
}

/// Renders `window` of `dst` as the average of the source over the
/// shutter interval around `time`.
///
/// `fetch(t)` returns the source at time `t`, `Ok(None)` for an absent
/// source, or an error (typically [`OpsError::SourceFetch`]) that aborts
/// the render. The abort signal is polled before every fetch and once per
/// output row.
///
/// # Errors
///
/// Invalid parameters or window, a fetch error, or a fetched frame whose
/// render scale, field or depth differs from `dst`.
pub fn render_time_blur<F, A>(
    params: &TimeBlurParams,
    time: f64,
    mut fetch: F,
    mut dst: ImageMut<'_>,
    window: Rect,
    abort: &A,
) -> OpsResult<RenderStatus>
where
    F: FnMut(f64) -> OpsResult<Option<Image>>,
    A: AbortSignal + ?Sized,
{
    params.validate()?;
    let bounds = dst.bounds();
    if window.is_empty() || !bounds.contains_rect(&window) {
        return Err(Error::invalid_region(window, bounds).into());
    }

    let times = params.sample_times(time);
    debug!(%window, time, samples = times.len(), shutter = params.shutter, "render time blur");

    let mut acc = TimeBlurAccumulator::new(window)?;
    for t in times {
        if abort.should_abort() {
            debug!(%window, "time blur cancelled");
            return Ok(RenderStatus::Aborted);
        }
        let frame = fetch(t)?;
        let view = frame.as_ref().map(Image::view);
        if let Some(v) = &view {
            validate_clip(&dst, v)?;
        }
        acc.accumulate(view.as_ref());
        trace!(t, "accumulated sub-frame");
    }

    let status = acc.finish(&mut dst, abort);
    if status.is_aborted() {
        debug!(%window, "time blur cancelled");
    }
    Ok(status)
}
