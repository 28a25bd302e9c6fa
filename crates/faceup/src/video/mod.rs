//! Video sources.

pub mod webcam;

use crate::{image::Frame, timer::Timer};

/// A source of video frames.
///
/// Implementations are moved onto the capture thread and dropped there once capture stops, which
/// releases the underlying device.
pub trait Camera: Send {
    /// Reads the next frame, blocking until one is available.
    ///
    /// An error indicates that this particular frame could not be read. Callers may keep reading.
    fn read(&mut self) -> anyhow::Result<Frame>;

    /// Returns profiling timers to report alongside the capture FPS.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn read(&mut self) -> anyhow::Result<Frame> {
        (**self).read()
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blank;

    impl Camera for Blank {
        fn read(&mut self) -> anyhow::Result<Frame> {
            Ok(Frame::new(2, 2))
        }
    }

    struct Timed(Timer);

    impl Camera for Timed {
        fn read(&mut self) -> anyhow::Result<Frame> {
            Ok(self.0.time(|| Frame::new(2, 2)))
        }

        fn timers(&self) -> Vec<&Timer> {
            vec![&self.0]
        }
    }

    #[test]
    fn timers_default_to_none() {
        assert!(Blank.timers().is_empty());
    }

    #[test]
    fn boxed_camera_forwards_timers() {
        let mut camera: Box<dyn Camera> = Box::new(Timed(Timer::new("grab")));
        camera.read().unwrap();
        let names = camera
            .timers()
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("grab: 1x"), "{}", names[0]);
    }
}
