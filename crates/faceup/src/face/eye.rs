//! Eye candidate filtering.
//!
//! Eye cascades fire on nostrils, mouth corners, and eyebrows about as often as on eyes. The
//! heuristics here discard hits that cannot plausibly be an eye given the face they were found in.

use crate::image::Rect;

/// Filters raw eye detections down to plausible eyes.
///
/// `eyes` are relative to the top left corner of a `face_width x face_height` face region. A
/// candidate is kept if its vertical center does not lie below the middle of the face and its
/// width is between 1/10 and 1/2 of the face width (both bounds inclusive). Surviving candidates
/// keep their original order.
pub fn filter_eyes(eyes: &[Rect], face_width: u32, face_height: u32) -> Vec<Rect> {
    let face_mid = i64::from(face_height / 2);
    let min_width = f64::from(face_width) / 10.0;
    let max_width = f64::from(face_width) / 2.0;

    eyes.iter()
        .filter(|eye| i64::from(eye.y()) + i64::from(eye.height() / 2) <= face_mid)
        .filter(|eye| {
            let width = f64::from(eye.width());
            width >= min_width && width <= max_width
        })
        .copied()
        .collect()
}

/// Picks the eye pair out of filtered candidates: the two widest ones.
///
/// Returns `None` if fewer than two candidates are available.
pub fn select_pair(mut candidates: Vec<Rect>) -> Option<[Rect; 2]> {
    // Stable sort, so equally wide candidates keep their detection order.
    candidates.sort_by(|a, b| b.width().cmp(&a.width()));
    match candidates[..] {
        [first, second, ..] => Some([first, second]),
        _ => None,
    }
}
