use faceup::annotate::{Annotator, Settings};
use faceup::capture::{frame_queue, CaptureLoop, Controls};
use faceup::config::Config;
use faceup::detection::HaarCascade;
use faceup::gui;
use faceup::image::Resolution;
use faceup::video::webcam::{ParamPreference, Webcam, WebcamOptions};

fn main() -> anyhow::Result<()> {
    faceup::init_logger!();

    let config = Config::from_env();

    let faces = HaarCascade::load(&config.face_cascade)?;
    let eyes = HaarCascade::load(&config.eye_cascade)?;
    let annotator = Annotator::new(faces, eyes);

    let controls = Controls::new(Settings::default());
    controls.set_hat(config.hat.as_deref());
    controls.set_glasses(config.glasses.as_deref());

    let mut options = WebcamOptions::default()
        .resolution(Resolution::VGA)
        .fps(30)
        .prefer(ParamPreference::Framerate);
    if let Some(name) = &config.webcam_name {
        options = options.name(name);
    }

    let (sender, frames) = frame_queue();
    let capture = CaptureLoop::spawn(
        move || Webcam::open(options),
        annotator,
        controls.clone(),
        sender,
    )?;

    gui::run(&config, controls, frames, capture)
}
