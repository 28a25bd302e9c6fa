//! The capture thread and its connections to the display.
//!
//! A [`CaptureLoop`] owns the camera. It reads frames, annotates them with the current
//! [`Settings`] snapshot obtained from [`Controls`], and offers them to the display through a small
//! bounded queue. When the queue is full the frame is dropped: the capture thread never waits for
//! the display.

use std::{
    io,
    panic::resume_unwind,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};

use crate::{
    annotate::{Annotator, Settings},
    detection::Cascade,
    face::DetectionState,
    image::{ChannelOrder, Frame},
    overlay::Overlay,
    timer::{FpsCounter, Timer},
    video::Camera,
};

/// Number of annotated frames that can wait for the display.
pub const QUEUE_CAPACITY: usize = 3;

/// An annotated frame and the detection state after it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub state: DetectionState,
}

/// Creates a connected frame queue with room for [`QUEUE_CAPACITY`] frames.
pub fn frame_queue() -> (FrameSender, FrameReceiver) {
    frame_queue_with_capacity(QUEUE_CAPACITY)
}

/// Creates a connected frame queue with room for `capacity` frames.
pub fn frame_queue_with_capacity(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (sender, recv) = channel::bounded(capacity);
    (FrameSender { sender }, FrameReceiver { recv })
}

/// Producer half of the frame queue.
pub struct FrameSender {
    sender: Sender<AnnotatedFrame>,
}

impl FrameSender {
    /// Enqueues `frame` if there is room for it.
    ///
    /// Never blocks. Returns `false` if the frame was dropped because the queue is full or the
    /// receiver is gone.
    pub fn push(&self, frame: AnnotatedFrame) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("frame queue full, dropping frame");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::trace!("frame queue closed, dropping frame");
                false
            }
        }
    }
}

/// Consumer half of the frame queue.
pub struct FrameReceiver {
    recv: Receiver<AnnotatedFrame>,
}

impl FrameReceiver {
    /// Takes the oldest queued frame, if any.
    pub fn try_pop(&self) -> Option<AnnotatedFrame> {
        match self.recv.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Returns the number of frames waiting in the queue.
    pub fn len(&self) -> usize {
        self.recv.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recv.is_empty()
    }
}

/// A handle for changing the overlays and outline toggle while the capture thread is running.
///
/// All clones share the same settings. Every change publishes a fresh immutable [`Settings`]
/// snapshot, so the capture thread sees either the old or the new settings for a frame, never a
/// mix. Overlay files are loaded before the lock is taken.
#[derive(Clone, Default)]
pub struct Controls {
    settings: Arc<Mutex<Arc<Settings>>>,
}

impl Controls {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Arc::new(Mutex::new(Arc::new(settings))),
        }
    }

    /// Returns the current settings.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.settings.lock().unwrap().clone()
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) {
        let mut guard = self.settings.lock().unwrap();
        let mut next = Settings::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Loads the hat from `path`, or removes it if `path` is `None`.
    ///
    /// If loading fails the hat is removed. Returns whether a hat is set afterwards.
    pub fn set_hat(&self, path: Option<&Path>) -> bool {
        let hat = path.and_then(|path| Overlay::load(path, ChannelOrder::Rgb));
        let loaded = hat.is_some();
        match path {
            Some(path) if loaded => log::info!("hat set to '{}'", path.display()),
            _ => log::info!("hat removed"),
        }
        self.set_hat_overlay(hat);
        loaded
    }

    /// Loads the glasses from `path`, or removes them if `path` is `None`.
    ///
    /// If loading fails the glasses are removed. Returns whether glasses are set afterwards.
    pub fn set_glasses(&self, path: Option<&Path>) -> bool {
        let glasses = path.and_then(|path| Overlay::load(path, ChannelOrder::Rgb));
        let loaded = glasses.is_some();
        match path {
            Some(path) if loaded => log::info!("glasses set to '{}'", path.display()),
            _ => log::info!("glasses removed"),
        }
        self.set_glasses_overlay(glasses);
        loaded
    }

    pub fn set_hat_overlay(&self, hat: Option<Overlay>) {
        let hat = hat.map(Arc::new);
        self.update(|s| s.hat = hat);
    }

    pub fn set_glasses_overlay(&self, glasses: Option<Overlay>) {
        let glasses = glasses.map(Arc::new);
        self.update(|s| s.glasses = glasses);
    }

    /// Removes both overlays.
    pub fn clear_overlays(&self) {
        log::info!("overlays cleared");
        self.update(|s| {
            s.hat = None;
            s.glasses = None;
        });
    }

    /// Enables or disables the face outline.
    pub fn set_draw_box(&self, draw_box: bool) {
        log::debug!("face outline {}", if draw_box { "on" } else { "off" });
        self.update(|s| s.draw_box = draw_box);
    }
}

/// Handle to the capture thread.
///
/// Dropping the handle stops the thread and waits for it to exit. If the thread has panicked, the
/// panic is forwarded to the thread dropping the `CaptureLoop`.
pub struct CaptureLoop {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Spawns the capture thread.
    ///
    /// `open` is invoked on the new thread to acquire the camera. If it fails, the error is logged
    /// and the thread exits without producing any frames.
    pub fn spawn<C, O, F, E>(
        open: O,
        annotator: Annotator<F, E>,
        controls: Controls,
        sender: FrameSender,
    ) -> io::Result<Self>
    where
        C: Camera + 'static,
        O: FnOnce() -> anyhow::Result<C> + Send + 'static,
        F: Cascade + 'static,
        E: Cascade + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::Builder::new().name("capture".into()).spawn({
            let stop = stop.clone();
            move || {
                log::trace!("capture thread starting");
                match open() {
                    Ok(camera) => run(camera, annotator, &controls, &sender, &stop),
                    Err(e) => log::error!("failed to open camera: {e:#}"),
                }
                log::trace!("capture thread exiting");
            }
        })?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Returns whether the capture thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stops the capture thread and waits until it has released the camera.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                if !thread::panicking() {
                    resume_unwind(payload);
                }
            }
        }
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<C: Camera, F: Cascade, E: Cascade>(
    mut camera: C,
    mut annotator: Annotator<F, E>,
    controls: &Controls,
    sender: &FrameSender,
    stop: &AtomicBool,
) {
    let t_read = Timer::new("read");
    let t_annotate = Timer::new("annotate");
    let mut fps = FpsCounter::new("capture");

    while !stop.load(Ordering::Relaxed) {
        let mut frame = match t_read.time(|| camera.read()) {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("failed to read frame: {e:#}");
                continue;
            }
        };

        let settings = controls.snapshot();
        let state = match t_annotate.time(|| annotator.annotate(&mut frame, &settings)) {
            Ok(annotation) => annotation.state,
            Err(e) => {
                log::warn!("failed to annotate frame: {e:#}");
                continue;
            }
        };

        sender.push(AnnotatedFrame { frame, state });
        fps.tick_with(
            [&t_read, &t_annotate]
                .into_iter()
                .chain(camera.timers())
                .chain(annotator.timers()),
        );
    }

    drop(camera);
    log::info!("camera released");
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use crate::image::Resolution;

    use super::*;

    fn frame(tag: u8) -> AnnotatedFrame {
        let mut frame = Frame::new(4, 4);
        frame.clear(crate::image::Color::from_rgb8(tag, tag, tag));
        AnnotatedFrame {
            frame,
            state: DetectionState::default(),
        }
    }

    fn tag(frame: &AnnotatedFrame) -> u8 {
        frame.frame.get(0, 0).r()
    }

    #[test]
    fn full_queue_keeps_oldest_frames() {
        let (sender, recv) = frame_queue();
        let pushed = (1..=5).map(|i| sender.push(frame(i))).collect::<Vec<_>>();
        assert_eq!(pushed, [true, true, true, false, false]);
        assert_eq!(recv.len(), 3);

        let tags = std::iter::from_fn(|| recv.try_pop())
            .map(|f| tag(&f))
            .collect::<Vec<_>>();
        assert_eq!(tags, [1, 2, 3]);
        assert!(recv.try_pop().is_none());
    }

    #[test]
    fn one_frame_per_poll_in_order() {
        let (sender, recv) = frame_queue();
        for i in 1..=3 {
            sender.push(frame(i));
        }

        assert_eq!(recv.try_pop().map(|f| tag(&f)), Some(1));
        assert_eq!(recv.len(), 2);
        // Room for one more while the display catches up.
        assert!(sender.push(frame(4)));
        assert!(!sender.push(frame(5)));

        let shown = (0..4)
            .map(|_| recv.try_pop().map(|f| tag(&f)))
            .collect::<Vec<_>>();
        assert_eq!(shown, [Some(2), Some(3), Some(4), None]);
    }

    #[test]
    fn push_after_receiver_dropped() {
        let (sender, recv) = frame_queue();
        drop(recv);
        assert!(!sender.push(frame(0)));
    }

    #[test]
    fn controls_defaults() {
        let controls = Controls::default();
        let settings = controls.snapshot();
        assert!(settings.draw_box);
        assert!(settings.hat.is_none());
        assert!(settings.glasses.is_none());
    }

    #[test]
    fn snapshots_are_immutable() {
        let controls = Controls::default();
        let before = controls.snapshot();

        let overlay = Overlay::from_rgba8(Resolution::new(1, 1), vec![1, 2, 3, 4], ChannelOrder::Rgb);
        controls.clone().set_hat_overlay(Some(overlay.clone()));
        controls.set_draw_box(false);

        assert!(before.hat.is_none());
        assert!(before.draw_box);

        let after = controls.snapshot();
        assert_eq!(after.hat.as_deref(), Some(&overlay));
        assert!(!after.draw_box);

        controls.clear_overlays();
        assert!(controls.snapshot().hat.is_none());
        assert!(!controls.snapshot().draw_box);
    }

    #[test]
    fn failed_load_clears_slot() {
        let controls = Controls::default();
        let overlay = Overlay::from_rgba8(Resolution::new(1, 1), vec![0; 4], ChannelOrder::Rgb);
        controls.set_glasses_overlay(Some(overlay));

        let missing = PathBuf::from("/nonexistent/faceup/glasses.png");
        assert!(!controls.set_glasses(Some(&missing)));
        assert!(controls.snapshot().glasses.is_none());
    }

    #[test]
    fn load_hat_from_file() {
        let path = std::env::temp_dir().join(format!("faceup-hat-{}.png", std::process::id()));
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let controls = Controls::default();
        assert!(controls.set_hat(Some(&path)));
        let hat = controls.snapshot().hat.clone().unwrap();
        assert_eq!((hat.width(), hat.height()), (3, 2));

        assert!(!controls.set_hat(None));
        assert!(controls.snapshot().hat.is_none());

        fs::remove_file(&path).ok();
    }
}
