use approx::assert_abs_diff_eq;

use crate::overlay::Overlay;

use super::*;

fn random_frame(width: u32, height: u32) -> Frame {
    let data = std::iter::repeat_with(|| fastrand::u8(..))
        .take(width as usize * height as usize * 3)
        .collect();
    Frame::from_raw(Resolution::new(width, height), ChannelOrder::Rgb, data)
}

fn solid_overlay(width: u32, height: u32, rgba: [u8; 4]) -> Overlay {
    Overlay::from_rgba8(
        Resolution::new(width, height),
        rgba.repeat(width as usize * height as usize),
        ChannelOrder::Rgb,
    )
}

/// Overlay with random colors whose alpha is taken from `alpha(x, y)`.
fn random_overlay(width: u32, height: u32, alpha: impl Fn(u32, u32) -> u8) -> Overlay {
    let mut data = Vec::new();
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[fastrand::u8(..), fastrand::u8(..), fastrand::u8(..)]);
            data.push(alpha(x, y));
        }
    }
    Overlay::from_rgba8(Resolution::new(width, height), data, ChannelOrder::Rgb)
}

#[test]
fn composite_outside_frame_is_noop() {
    let mut frame = random_frame(200, 200);
    let before = frame.clone();
    let overlay = solid_overlay(50, 50, [255, 255, 255, 255]);

    assert!(!composite(&mut frame, &overlay, -100, -100));
    assert_eq!(frame.data(), before.data());

    assert!(!composite(&mut frame, &overlay, 200, 0));
    assert!(!composite(&mut frame, &overlay, 0, 200));
    assert!(!composite(&mut frame, &overlay, -50, 10));
    assert_eq!(frame.data(), before.data());
}

#[test]
fn composite_transparent_pixels_pass_through() {
    let mut frame = random_frame(64, 48);
    let before = frame.clone();
    // Checkerboard of fully transparent and half transparent pixels, random colors.
    let overlay = random_overlay(40, 30, |x, y| if (x + y) % 2 == 0 { 0 } else { 128 });

    assert!(composite(&mut frame, &overlay, 10, 5));
    for y in 0..30 {
        for x in 0..40 {
            if (x + y) % 2 == 0 {
                assert_eq!(frame.get(x + 10, y + 5), before.get(x + 10, y + 5));
            }
        }
    }

    let invisible = random_overlay(64, 48, |_, _| 0);
    let mut frame = before.clone();
    assert!(composite(&mut frame, &invisible, 0, 0));
    assert_eq!(frame.data(), before.data());
}

#[test]
fn composite_opaque_pixels_replace() {
    let mut frame = random_frame(32, 32);
    let overlay = random_overlay(8, 8, |_, _| 255);

    assert!(composite(&mut frame, &overlay, 4, 20));
    for y in 0..8 {
        for x in 0..8 {
            let [r, g, b, _] = overlay.raw(x, y);
            assert_eq!(frame.get(x + 4, y + 20), Color::from_rgb8(r, g, b));
        }
    }
}

#[test]
fn composite_blends_partial_alpha() {
    let mut frame = Frame::new(1, 1);
    frame.clear(Color::from_rgb8(100, 0, 200));
    let overlay = solid_overlay(1, 1, [200, 255, 0, 51]);

    composite(&mut frame, &overlay, 0, 0);
    // alpha = 0.2
    assert_eq!(frame.get(0, 0), Color::from_rgb8(120, 51, 160));
}

#[test]
fn composite_clips_every_side() {
    let mut frame = Frame::new(10, 10);
    let overlay = solid_overlay(30, 30, [255, 255, 255, 255]);

    // Overlay larger than the frame in every direction.
    assert!(composite(&mut frame, &overlay, -10, -10));
    assert!(frame.data().iter().all(|&b| b == 255));

    let mut frame = Frame::new(10, 10);
    let corner = solid_overlay(4, 4, [0, 255, 0, 255]);
    assert!(composite(&mut frame, &corner, 8, -2));
    for y in 0..10 {
        for x in 0..10 {
            let expected = if x >= 8 && y < 2 {
                Color::GREEN
            } else {
                Color::BLACK
            };
            assert_eq!(frame.get(x, y), expected, "({x},{y})");
        }
    }
}

#[test]
fn composite_respects_channel_order() {
    let mut frame = Frame::from_raw(Resolution::new(2, 1), ChannelOrder::Bgr, vec![0; 6]);

    let bgr = Overlay::from_rgba8(Resolution::new(1, 1), vec![255, 0, 0, 255], ChannelOrder::Bgr);
    composite(&mut frame, &bgr, 0, 0);
    assert_eq!(frame.get(0, 0), Color::RED);
    assert_eq!(&frame.data()[..3], &[0, 0, 255]);

    // Mismatched order still produces the right color.
    let rgb = Overlay::from_rgba8(Resolution::new(1, 1), vec![255, 0, 0, 255], ChannelOrder::Rgb);
    composite(&mut frame, &rgb, 1, 0);
    assert_eq!(frame.get(1, 0), Color::RED);
}

#[test]
fn luma() {
    let mut frame = Frame::new(2, 1);
    frame.set(0, 0, Color::WHITE);
    frame.set(1, 0, Color::from_rgb8(100, 100, 100));
    let gray = frame.to_luma();
    assert_eq!(gray.get_pixel(0, 0).0, [255]);
    assert_eq!(gray.get_pixel(1, 0).0, [100]);

    let bgr = Frame::from_raw(Resolution::new(1, 1), ChannelOrder::Bgr, vec![255, 0, 0]);
    let rgb = Frame::from_raw(Resolution::new(1, 1), ChannelOrder::Rgb, vec![0, 0, 255]);
    assert_eq!(bgr.get(0, 0), Color::BLUE);
    assert_eq!(bgr.to_luma(), rgb.to_luma());
    assert_abs_diff_eq!(
        f32::from(bgr.to_luma().get_pixel(0, 0).0[0]),
        0.114 * 255.0,
        epsilon = 0.5
    );
}

#[test]
fn rgba_export() {
    let frame = Frame::from_raw(Resolution::new(1, 1), ChannelOrder::Bgr, vec![1, 2, 3]);
    assert_eq!(frame.to_rgba8(), [3, 2, 1, 255]);
}
