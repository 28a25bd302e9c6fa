//! Per-frame face annotation.
//!
//! The [`Annotator`] finds faces in a frame, optionally outlines them, puts a hat above every face
//! that leaves enough room for one, and centers a pair of glasses between the eyes of every face
//! where exactly two plausible eyes were found.

use std::sync::Arc;

use image::{imageops, GrayImage};

use crate::{
    detection::{Cascade, CascadeParams, DetectorConfig},
    face::{eye, DetectionState},
    image::{composite, draw, Color, Frame, Rect},
    overlay::Overlay,
    timer::Timer,
};

const BOX_COLOR: Color = Color::WHITE;
const BOX_STROKE_WIDTH: u32 = 2;

/// Height of the hat relative to the face height.
const HAT_HEIGHT_RATIO: f64 = 0.5;
/// Width of the glasses relative to the face width.
const GLASSES_WIDTH_RATIO: f64 = 0.6;

/// What to draw onto each frame.
///
/// Settings are shared between the GUI and the capture thread as an immutable snapshot, see
/// [`Controls`][crate::capture::Controls].
#[derive(Debug, Clone)]
pub struct Settings {
    pub hat: Option<Arc<Overlay>>,
    pub glasses: Option<Arc<Overlay>>,
    /// Whether to outline detected faces.
    pub draw_box: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hat: None,
            glasses: None,
            draw_box: true,
        }
    }
}

/// Result of annotating a single frame.
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Detection state after this frame.
    pub state: DetectionState,
    pub faces: Vec<FaceAnnotation>,
}

/// What was found and drawn for one face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceAnnotation {
    /// Face bounding box in frame coordinates.
    pub face: Rect,
    /// The chosen eye pair, relative to the face's top left corner, widest eye first.
    pub eyes: Option<[Rect; 2]>,
    pub hat: bool,
    pub glasses: bool,
}

/// Detects faces and eyes and composites overlays onto frames.
pub struct Annotator<F, E> {
    faces: F,
    eyes: E,
    config: DetectorConfig,
    state: DetectionState,
    t_faces: Timer,
    t_eyes: Timer,
    t_overlays: Timer,
}

impl<F: Cascade, E: Cascade> Annotator<F, E> {
    /// Creates an annotator using the default [`DetectorConfig`].
    pub fn new(faces: F, eyes: E) -> Self {
        Self::with_config(faces, eyes, DetectorConfig::default())
    }

    pub fn with_config(faces: F, eyes: E, config: DetectorConfig) -> Self {
        Self {
            faces,
            eyes,
            config,
            state: DetectionState::default(),
            t_faces: Timer::new("faces"),
            t_eyes: Timer::new("eyes"),
            t_overlays: Timer::new("overlays"),
        }
    }

    /// Returns the detection state after the last annotated frame.
    #[inline]
    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Annotates `frame` in place according to `settings`.
    ///
    /// Faces are processed independently and in detection order, so overlays of later faces may
    /// cover those of earlier ones. An error is returned only if face detection fails. If eye
    /// detection fails for a face, that face gets no glasses.
    pub fn annotate(&mut self, frame: &mut Frame, settings: &Settings) -> anyhow::Result<Annotation> {
        let gray = frame.to_luma();
        let faces = self
            .t_faces
            .time(|| self.faces.detect(&gray, &self.config.face))?;

        if self.state.update(faces.len()) {
            if let Some(time) = self.state.first_seen() {
                log::info!("face detected at {}", time.format("%H:%M:%S"));
            }
        }

        let mut results = Vec::with_capacity(faces.len());
        for face in faces {
            if settings.draw_box {
                draw::rect(frame, face)
                    .color(BOX_COLOR)
                    .stroke_width(BOX_STROKE_WIDTH);
            }

            let hat = match &settings.hat {
                Some(hat) => self.t_overlays.time(|| place_hat(frame, hat, face)),
                None => false,
            };

            let eyes = match self
                .t_eyes
                .time(|| detect_eyes(&mut self.eyes, &self.config.eyes, &gray, face))
            {
                Ok(candidates) => {
                    eye::select_pair(eye::filter_eyes(&candidates, face.width(), face.height()))
                }
                Err(e) => {
                    log::warn!("eye detection failed for face at {face:?}: {e:#}");
                    None
                }
            };

            let glasses = match (&settings.glasses, &eyes) {
                (Some(glasses), Some(pair)) => self
                    .t_overlays
                    .time(|| place_glasses(frame, glasses, face, pair)),
                _ => false,
            };

            results.push(FaceAnnotation {
                face,
                eyes,
                hat,
                glasses,
            });
        }

        Ok(Annotation {
            state: self.state,
            faces: results,
        })
    }

    /// Returns the annotation timers for profiling output.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_faces, &self.t_eyes, &self.t_overlays].into_iter()
    }
}

/// Runs the eye cascade on the part of `face` inside the image, returning boxes relative to the
/// face.
fn detect_eyes<E: Cascade>(
    cascade: &mut E,
    params: &CascadeParams,
    gray: &GrayImage,
    face: Rect,
) -> anyhow::Result<Vec<Rect>> {
    let bounds = Rect::from_top_left(0, 0, gray.width(), gray.height());
    let Some(roi) = face.intersection(&bounds) else {
        return Ok(Vec::new());
    };

    let crop = imageops::crop_imm(
        gray,
        roi.x() as u32,
        roi.y() as u32,
        roi.width(),
        roi.height(),
    )
    .to_image();
    let (dx, dy) = (roi.x() - face.x(), roi.y() - face.y());
    Ok(cascade
        .detect(&crop, params)?
        .into_iter()
        .map(|eye| eye.move_by(dx, dy))
        .collect())
}

/// Places `hat` directly above `face`, as wide as the face and half as tall.
///
/// If the hat would stick out above the top of the frame, it is not drawn at all.
///
/// Returns whether the hat was drawn.
pub fn place_hat(frame: &mut Frame, hat: &Overlay, face: Rect) -> bool {
    let height = (f64::from(face.height()) * HAT_HEIGHT_RATIO) as u32;
    let top = i64::from(face.y()) - i64::from(height);
    if top < 0 {
        return false;
    }

    match hat.resize(face.width(), height) {
        Some(hat) => composite(frame, &hat, face.x(), top as i32),
        None => false,
    }
}

/// Centers `glasses` between the eyes of `face`.
///
/// `eyes` are relative to the face's top left corner. The glasses are only placed if exactly two
/// eyes are given. They are scaled to 60% of the face width, keeping their aspect ratio.
///
/// Returns whether the glasses were drawn.
pub fn place_glasses(frame: &mut Frame, glasses: &Overlay, face: Rect, eyes: &[Rect]) -> bool {
    let [left, right] = eyes else {
        return false;
    };
    if glasses.width() == 0 {
        return false;
    }

    let center = |eye: &Rect| {
        (
            face.x() + eye.x() + (eye.width() / 2) as i32,
            face.y() + eye.y() + (eye.height() / 2) as i32,
        )
    };
    let (x1, y1) = center(left);
    let (x2, y2) = center(right);
    let mid_x = (x1 + x2).div_euclid(2);
    let mid_y = (y1 + y2).div_euclid(2);

    let width = (f64::from(face.width()) * GLASSES_WIDTH_RATIO) as u32;
    let height =
        (f64::from(width) * f64::from(glasses.height()) / f64::from(glasses.width())) as u32;
    let Some(glasses) = glasses.resize(width, height) else {
        return false;
    };

    composite(
        frame,
        &glasses,
        mid_x - (width / 2) as i32,
        mid_y - (height / 2) as i32,
    )
}

#[cfg(test)]
mod tests {
    use crate::image::{ChannelOrder, Resolution};

    use super::*;

    fn opaque(width: u32, height: u32, color: Color) -> Overlay {
        Overlay::from_rgba8(
            Resolution::new(width, height),
            [color.r(), color.g(), color.b(), 255].repeat((width * height) as usize),
            ChannelOrder::Rgb,
        )
    }

    fn count(frame: &Frame, color: Color) -> usize {
        let mut n = 0;
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                if frame.get(x, y) == color {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn hat_sits_above_face() {
        let mut frame = Frame::new(200, 200);
        let hat = opaque(10, 10, Color::RED);
        let face = Rect::from_top_left(50, 60, 40, 50);

        assert!(place_hat(&mut frame, &hat, face));
        // 40x25 hat at (50, 35)
        assert_eq!(count(&frame, Color::RED), 40 * 25);
        assert_eq!(frame.get(50, 35), Color::RED);
        assert_eq!(frame.get(89, 59), Color::RED);
        assert_eq!(frame.get(50, 60), Color::BLACK);
        assert_eq!(frame.get(50, 34), Color::BLACK);
    }

    #[test]
    fn hat_skipped_without_room() {
        let mut frame = Frame::new(200, 200);
        let hat = opaque(10, 10, Color::RED);

        assert!(!place_hat(&mut frame, &hat, Rect::from_top_left(50, 24, 40, 50)));
        assert_eq!(count(&frame, Color::RED), 0);

        // Exactly enough room.
        assert!(place_hat(&mut frame, &hat, Rect::from_top_left(50, 25, 40, 50)));
        assert_eq!(frame.get(50, 0), Color::RED);
    }

    #[test]
    fn glasses_centered_between_eyes() {
        let mut frame = Frame::new(200, 200);
        // 2:1 aspect ratio
        let glasses = opaque(20, 10, Color::GREEN);
        let face = Rect::from_top_left(50, 50, 100, 100);
        let eyes = [
            Rect::from_top_left(20, 20, 20, 20),
            Rect::from_top_left(60, 20, 20, 20),
        ];

        assert!(place_glasses(&mut frame, &glasses, face, &eyes));
        // Eye centers (80, 80) and (120, 80), midpoint (100, 80); 60x30 glasses.
        assert_eq!(count(&frame, Color::GREEN), 60 * 30);
        assert_eq!(frame.get(70, 65), Color::GREEN);
        assert_eq!(frame.get(129, 94), Color::GREEN);
        assert_eq!(frame.get(69, 65), Color::BLACK);
        assert_eq!(frame.get(130, 94), Color::BLACK);
    }

    #[test]
    fn glasses_need_exactly_two_eyes() {
        let glasses = opaque(20, 10, Color::GREEN);
        let face = Rect::from_top_left(50, 50, 100, 100);
        let eye = |x| Rect::from_top_left(x, 20, 20, 20);

        for eyes in [vec![], vec![eye(20)], vec![eye(20), eye(60), eye(40)]] {
            let mut frame = Frame::new(200, 200);
            assert!(!place_glasses(&mut frame, &glasses, face, &eyes));
            assert_eq!(count(&frame, Color::GREEN), 0, "{} eyes", eyes.len());
        }

        let mut frame = Frame::new(200, 200);
        assert!(place_glasses(&mut frame, &glasses, face, &[eye(20), eye(60)]));
        assert!(count(&frame, Color::GREEN) > 0);
    }

    #[test]
    fn overlays_clip_at_frame_edge() {
        let mut frame = Frame::new(100, 100);
        let glasses = opaque(20, 10, Color::GREEN);
        // Face hanging off the right edge.
        let face = Rect::from_top_left(60, 10, 80, 80);
        let eyes = [
            Rect::from_top_left(10, 10, 20, 20),
            Rect::from_top_left(50, 10, 20, 20),
        ];
        assert!(place_glasses(&mut frame, &glasses, face, &eyes));
        assert!(count(&frame, Color::GREEN) > 0);
    }
}
