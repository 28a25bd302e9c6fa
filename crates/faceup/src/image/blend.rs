use crate::overlay::Overlay;

use super::{Frame, Rect};

/// Alpha-blends `overlay` onto `frame`, placing the overlay's top left corner at `(x, y)`.
///
/// The overlay may lie partially or entirely outside of the frame; only the part that intersects
/// the frame is blended, and nothing outside of the frame is ever written. Pixels whose overlay
/// alpha is 0 are left untouched.
///
/// Returns `true` if any part of the overlay intersected the frame.
pub fn composite(frame: &mut Frame, overlay: &Overlay, x: i32, y: i32) -> bool {
    let placed = Rect::from_top_left(x, y, overlay.width(), overlay.height());
    let Some(clip) = placed.intersection(&frame.rect()) else {
        return false;
    };

    let swap = overlay.order() != frame.order();
    // `clip` lies inside the frame, so its coordinates are non-negative.
    let (x0, y0) = (clip.x() as u32, clip.y() as u32);
    // Offset of the clipped region inside the overlay.
    let (ox, oy) = (
        (i64::from(clip.x()) - i64::from(x)) as u32,
        (i64::from(clip.y()) - i64::from(y)) as u32,
    );

    for dy in 0..clip.height() {
        for dx in 0..clip.width() {
            let src = overlay.raw(ox + dx, oy + dy);
            let alpha = src[3];
            if alpha == 0 {
                continue;
            }

            let color = if swap {
                [src[2], src[1], src[0]]
            } else {
                [src[0], src[1], src[2]]
            };
            let dest = frame.raw_mut(x0 + dx, y0 + dy);
            blend_pixel(dest, color, alpha);
        }
    }

    true
}

fn blend_pixel(dest: &mut [u8; 3], src: [u8; 3], alpha: u8) {
    if alpha == u8::MAX {
        *dest = src;
        return;
    }

    let alpha = f32::from(alpha) / 255.0;
    for (d, s) in dest.iter_mut().zip(src) {
        let blended = (1.0 - alpha) * f32::from(*d) + alpha * f32::from(s);
        *d = blended.round().clamp(0.0, 255.0) as u8;
    }
}
