//! FaceUp webcam face filter.
//!
//! Frames are captured from a webcam, faces and eyes are located with a cascade detector, and
//! decorative overlays (a hat and a pair of glasses) are alpha-blended onto every detected face
//! before the frame is handed to the display.
//!
//! # Pipeline
//!
//! - [`capture::CaptureLoop`] owns the [`video::Camera`] on a dedicated thread and pushes annotated
//!   frames into a [`capture::frame_queue`] of capacity 3, dropping frames when it is full.
//! - [`annotate::Annotator`] runs the face and eye [`detection::Cascade`]s, filters eye candidates
//!   with [`face::eye::filter_eyes`], and places overlays with [`image::composite`].
//! - [`capture::Controls`] lets the GUI swap overlays and the face outline toggle at any time
//!   without stopping the capture loop.
//!
//! # Environment Variables
//!
//! The application binary is configured through `FACEUP_*` environment variables, see
//! [`config::Config`].

pub mod annotate;
pub mod capture;
pub mod config;
pub mod detection;
pub mod face;
pub mod gui;
pub mod image;
pub mod overlay;
pub mod timer;
pub mod video;

use log::LevelFilter;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("wgpu"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and FaceUp will log at *trace* level.
/// Otherwise, they will log at *debug* level.
///
/// `wgpu` will always log at *warn* level.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
