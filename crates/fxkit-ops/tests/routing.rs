//! Shuffle across bit depths and time blur over a moving source.

use std::cell::RefCell;

use approx::assert_abs_diff_eq;
use fxkit_core::{BitDepth, Components, Field, Image, ImageData, NeverAbort, Rect, RenderStatus};
use fxkit_ops::{
    render_shuffle, render_time_blur, OpsError, ShuffleArgs, ShuffleParams, ShuffleSelector,
    ShutterOffset, TimeBlurParams,
};

fn ones() -> ShuffleParams {
    ShuffleParams {
        red: ShuffleSelector::One,
        green: ShuffleSelector::One,
        blue: ShuffleSelector::Zero,
        alpha: ShuffleSelector::One,
    }
}

#[test]
fn shuffle_one_is_full_scale_at_every_depth() {
    let b = Rect::new(0, 0, 3, 2);

    let mut u8_dst = Image::new(b, Components::Rgba, BitDepth::U8);
    render_shuffle(ShuffleArgs::new(b, u8_dst.view_mut()), &ones(), &NeverAbort).unwrap();
    let ImageData::U8(data) = u8_dst.data() else { panic!("expected u8 storage") };
    assert!(data.chunks(4).all(|p| p == [255, 255, 0, 255]));

    let mut u16_dst = Image::new(b, Components::Rgba, BitDepth::U16);
    render_shuffle(ShuffleArgs::new(b, u16_dst.view_mut()), &ones(), &NeverAbort).unwrap();
    let ImageData::U16(data) = u16_dst.data() else { panic!("expected u16 storage") };
    assert!(data.chunks(4).all(|p| p == [65535, 65535, 0, 65535]));

    let mut f32_dst = Image::new(b, Components::Rgba, BitDepth::F32);
    render_shuffle(ShuffleArgs::new(b, f32_dst.view_mut()), &ones(), &NeverAbort).unwrap();
    let ImageData::F32(data) = f32_dst.data() else { panic!("expected f32 storage") };
    assert!(data.chunks(4).all(|p| p == [1.0, 1.0, 0.0, 1.0]));

    let mut f16_dst = Image::new(b, Components::Rgba, BitDepth::F16);
    render_shuffle(ShuffleArgs::new(b, f16_dst.view_mut()), &ones(), &NeverAbort).unwrap();
    assert_eq!(f16_dst.pixel_f32(2, 1).unwrap(), [1.0, 1.0, 0.0, 1.0]);
}

#[test]
fn shuffle_merges_two_inputs_of_different_depths() {
    let b = Rect::new(0, 0, 2, 2);
    let a = Image::filled(b, Components::Rgba, BitDepth::U16, [1.0, 0.0, 0.0, 1.0]);
    let matte = Image::filled(b, Components::Alpha, BitDepth::U8, [0.0, 0.0, 0.0, 1.0]);
    let mut dst = Image::new(b, Components::Rgba, BitDepth::F32);
    let params = ShuffleParams { alpha: ShuffleSelector::BAlpha, ..Default::default() };
    render_shuffle(
        ShuffleArgs::new(b, dst.view_mut()).with_a(a.view()).with_b(matte.view()),
        &params,
        &NeverAbort,
    )
    .unwrap();
    assert_eq!(dst.pixel_f32(1, 1).unwrap(), [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn shuffle_rejects_other_field() {
    let b = Rect::new(0, 0, 2, 2);
    let a = Image::new(b, Components::Rgba, BitDepth::F32).with_field(Field::Upper);
    let mut dst = Image::new(b, Components::Rgba, BitDepth::F32);
    let res = render_shuffle(ShuffleArgs::new(b, dst.view_mut()).with_a(a.view()), &ShuffleParams::default(), &NeverAbort);
    assert!(res.is_err());
}

/// A one-pixel-wide white bar at `x = floor(t)` on black.
fn bar_at(b: Rect, t: f64) -> Image {
    let mut img = Image::new(b, Components::Rgba, BitDepth::F32);
    img.set_pixel_f32(t.floor() as i32, 0, [1.0, 1.0, 1.0, 1.0]);
    img
}

#[test]
fn time_blur_smears_a_moving_bar() {
    let b = Rect::new(0, 0, 8, 1);
    let params = TimeBlurParams {
        divisions: 4,
        shutter: 2.0,
        shutter_offset: ShutterOffset::Start,
        ..Default::default()
    };
    let times = RefCell::new(Vec::new());
    let mut dst = Image::new(b, Components::Rgba, BitDepth::F32);
    let status = render_time_blur(
        &params,
        2.0,
        |t| {
            times.borrow_mut().push(t);
            Ok(Some(bar_at(b, t)))
        },
        dst.view_mut(),
        b,
        &NeverAbort,
    )
    .unwrap();
    assert_eq!(status, RenderStatus::Completed);
    assert_eq!(times.borrow().len(), 4);

    // sub-frames at 2.25, 2.75, 3.25, 3.75
    assert_abs_diff_eq!(dst.pixel_f32(2, 0).unwrap()[0], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(dst.pixel_f32(3, 0).unwrap()[0], 0.5, epsilon = 1e-6);
    assert_eq!(dst.pixel_f32(4, 0).unwrap()[0], 0.0);
}

#[test]
fn time_blur_surfaces_fetch_errors() {
    let b = Rect::new(0, 0, 2, 2);
    let mut dst = Image::new(b, Components::Rgba, BitDepth::F32);
    let res = render_time_blur(
        &TimeBlurParams::default(),
        0.0,
        |t| Err(OpsError::source_fetch(t, "offline")),
        dst.view_mut(),
        b,
        &NeverAbort,
    );
    assert!(res.is_err());
}

#[test]
fn time_blur_of_absent_source_is_black() {
    let b = Rect::new(0, 0, 2, 2);
    let mut dst = Image::filled(b, Components::Rgba, BitDepth::U8, [1.0; 4]);
    render_time_blur(&TimeBlurParams::default(), 5.0, |_| Ok(None), dst.view_mut(), b, &NeverAbort).unwrap();
    assert_eq!(dst.pixel_f32(1, 1).unwrap(), [0.0; 4]);
}
