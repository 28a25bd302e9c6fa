//! Face tracking state and eye localization.

pub mod eye;

use chrono::{DateTime, Local};

/// Whether a face is currently visible, and since when.
///
/// Only the most recent "first seen" timestamp is kept; there is no per-face identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectionState {
    detected: bool,
    first_seen: Option<DateTime<Local>>,
}

impl DetectionState {
    /// Updates the state with the number of faces found in the current frame.
    ///
    /// Returns `true` if a face appeared in this frame after a frame without any.
    pub fn update(&mut self, faces: usize) -> bool {
        self.update_with(faces, Local::now)
    }

    /// Like [`DetectionState::update`], but obtains the current time from `now`.
    ///
    /// `now` is only invoked when a new detection starts.
    pub fn update_with(&mut self, faces: usize, now: impl FnOnce() -> DateTime<Local>) -> bool {
        if faces == 0 {
            self.detected = false;
            return false;
        }
        if self.detected {
            return false;
        }

        self.detected = true;
        self.first_seen = Some(now());
        true
    }

    /// Returns whether the last processed frame contained at least one face.
    #[inline]
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Returns when the most recent detection started.
    ///
    /// After the face disappears this still reports the start of the previous detection.
    #[inline]
    pub fn first_seen(&self) -> Option<DateTime<Local>> {
        self.first_seen
    }
}
