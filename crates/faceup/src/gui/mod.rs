//! The display window.
//!
//! Shows annotated frames in the order they were captured, one per poll, and maps keyboard input and dropped files to [`Controls`]:
//!
//! | Input | Action |
//! |-------|--------|
//! | `H` | toggle the hat |
//! | `G` | toggle the glasses |
//! | `C` | remove both overlays |
//! | `B` | toggle the face outline |
//! | `Esc` | quit |
//! | drop file | use as hat, or as glasses while `Shift` is held |
//!
//! Quitting, by `Esc` or by closing the window, asks for confirmation in the window title. A
//! second `Esc` or close request confirms, any other key cancels.

mod renderer;

use std::{
    mem,
    path::{Path, PathBuf},
    time::Instant,
};

use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyboardInput, ModifiersState, StartCause, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    platform::run_return::EventLoopExtRunReturn,
    window::WindowBuilder,
};

use crate::{
    capture::{AnnotatedFrame, CaptureLoop, Controls, FrameReceiver},
    config::{Config, DISPLAY_POLL_INTERVAL},
    face::DetectionState,
    image::Resolution,
};

use self::renderer::{Gpu, Renderer};

const TITLE: &str = "FaceUp";
const QUIT_PROMPT: &str = "Do you want to quit? Esc: yes, any other key: no";

/// Formats the window title for a detection state.
fn title(state: &DetectionState, quit_pending: bool) -> String {
    if quit_pending {
        return format!("{TITLE} - {QUIT_PROMPT}");
    }
    match state.first_seen() {
        Some(time) if state.is_detected() => {
            format!("{TITLE} - face since {}", time.format("%H:%M:%S"))
        }
        _ => TITLE.to_string(),
    }
}

/// Two-step quit: the first request asks, the second one confirms.
#[derive(Debug, Default)]
struct QuitConfirmation {
    pending: bool,
}

impl QuitConfirmation {
    /// Returns `true` if this request confirms an earlier one.
    fn request(&mut self) -> bool {
        if self.pending {
            return true;
        }
        log::debug!("quit requested, waiting for confirmation");
        self.pending = true;
        false
    }

    /// Withdraws a pending request. Returns whether one was pending.
    fn cancel(&mut self) -> bool {
        mem::take(&mut self.pending)
    }
}

struct Gui {
    renderer: Renderer,
    controls: Controls,
    frames: FrameReceiver,
    capture: Option<CaptureLoop>,
    hat: Option<PathBuf>,
    glasses: Option<PathBuf>,
    modifiers: ModifiersState,
    state: DetectionState,
    quit: QuitConfirmation,
    title: String,
    error: Option<anyhow::Error>,
}

impl Gui {
    fn poll_frame(&mut self) {
        let Some(AnnotatedFrame { frame, state }) = self.frames.try_pop() else {
            return;
        };

        self.renderer.update_texture(
            Resolution::new(frame.width(), frame.height()),
            &frame.to_rgba8(),
        );
        self.renderer.window().request_redraw();
        self.state = state;
        self.refresh_title();
    }

    fn refresh_title(&mut self) {
        let title = title(&self.state, self.quit.pending);
        if title != self.title {
            self.renderer.window().set_title(&title);
            self.title = title;
        }
    }

    /// Returns `true` if the application should exit.
    fn request_quit(&mut self) -> bool {
        let confirmed = self.quit.request();
        self.refresh_title();
        confirmed
    }

    fn toggle_hat(&self) {
        if self.controls.snapshot().hat.is_some() {
            self.controls.set_hat(None);
        } else {
            self.controls.set_hat(self.hat.as_deref());
        }
    }

    fn toggle_glasses(&self) {
        if self.controls.snapshot().glasses.is_some() {
            self.controls.set_glasses(None);
        } else {
            self.controls.set_glasses(self.glasses.as_deref());
        }
    }

    fn dropped_file(&mut self, path: &Path) {
        if self.modifiers.shift() {
            if self.controls.set_glasses(Some(path)) {
                self.glasses = Some(path.to_path_buf());
            }
        } else if self.controls.set_hat(Some(path)) {
            self.hat = Some(path.to_path_buf());
        }
    }

    /// Returns `true` if the application should exit.
    fn key_pressed(&mut self, key: VirtualKeyCode) -> bool {
        if key == VirtualKeyCode::Escape {
            return self.request_quit();
        }
        if self.quit.cancel() {
            self.refresh_title();
            return false;
        }

        match key {
            VirtualKeyCode::H => self.toggle_hat(),
            VirtualKeyCode::G => self.toggle_glasses(),
            VirtualKeyCode::C => self.controls.clear_overlays(),
            VirtualKeyCode::B => {
                let draw_box = self.controls.snapshot().draw_box;
                self.controls.set_draw_box(!draw_box);
            }
            _ => {}
        }
        false
    }

    fn shutdown(&mut self) {
        if let Some(capture) = self.capture.take() {
            log::debug!("stopping capture");
            capture.stop();
        }
    }

    fn handle_window_event(&mut self, event: WindowEvent<'_>) -> bool {
        match event {
            WindowEvent::CloseRequested => return self.request_quit(),
            WindowEvent::Resized(size) => self.renderer.resize(size),
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers,
            WindowEvent::DroppedFile(path) => self.dropped_file(&path),
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state: ElementState::Pressed,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => return self.key_pressed(key),
            _ => {}
        }
        false
    }
}

/// Opens the window and runs the display until the user quits.
///
/// The capture loop is stopped before this function returns, which releases the camera.
pub fn run(
    config: &Config,
    controls: Controls,
    frames: FrameReceiver,
    capture: CaptureLoop,
) -> anyhow::Result<()> {
    let mut event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title(TITLE)
        .with_inner_size(PhysicalSize::new(
            Resolution::VGA.width(),
            Resolution::VGA.height(),
        ))
        .build(&event_loop)?;
    let gpu = pollster::block_on(Gpu::open())?;
    let renderer = Renderer::new(window, gpu)?;

    let mut gui = Gui {
        renderer,
        controls,
        frames,
        capture: Some(capture),
        hat: config.hat.clone(),
        glasses: config.glasses.clone(),
        modifiers: ModifiersState::empty(),
        state: DetectionState::default(),
        quit: QuitConfirmation::default(),
        title: TITLE.to_string(),
        error: None,
    };

    event_loop.run_return(|event, _target, flow| {
        let exit = match event {
            Event::NewEvents(StartCause::Init | StartCause::ResumeTimeReached { .. }) => {
                gui.poll_frame();
                *flow = ControlFlow::WaitUntil(Instant::now() + DISPLAY_POLL_INTERVAL);
                false
            }
            Event::WindowEvent { event, .. } => gui.handle_window_event(event),
            Event::RedrawRequested(_) => match gui.renderer.redraw() {
                Ok(()) => false,
                Err(e) => {
                    gui.error = Some(e);
                    true
                }
            },
            _ => false,
        };

        if exit {
            gui.shutdown();
            *flow = ControlFlow::Exit;
        }
    });

    gui.shutdown();
    match gui.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
