//! Application settings.
//!
//! Settings are read from environment variables. Every variable has a default, so running without
//! any of them set uses the bundled cascades and overlays and the first usable webcam.

use std::{env, path::PathBuf, time::Duration};

/// How often the display checks the frame queue.
pub const DISPLAY_POLL_INTERVAL: Duration = Duration::from_millis(30);

const ENV_WEBCAM_NAME: &str = "FACEUP_WEBCAM_NAME";
const ENV_FACE_CASCADE: &str = "FACEUP_FACE_CASCADE";
const ENV_EYE_CASCADE: &str = "FACEUP_EYE_CASCADE";
const ENV_HAT: &str = "FACEUP_HAT";
const ENV_GLASSES: &str = "FACEUP_GLASSES";

const DEFAULT_FACE_CASCADE: &str = "xml/haarcascade_frontalface_default.xml";
const DEFAULT_EYE_CASCADE: &str = "xml/haarcascade_eye.xml";
const DEFAULT_HAT: &str = "example_overlays/szczur.png";
const DEFAULT_GLASSES: &str = "example_overlays/glasses.png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Card name of the webcam to open. `None` opens the first usable device.
    pub webcam_name: Option<String>,
    pub face_cascade: PathBuf,
    pub eye_cascade: PathBuf,
    /// Hat image loaded at startup and when the hat is toggled back on.
    pub hat: Option<PathBuf>,
    pub glasses: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Reads the configuration from `FACEUP_*` environment variables.
    pub fn from_env() -> Self {
        let config = Self::from_lookup(|var| env::var(var).ok());
        log::debug!("{config:?}");
        config
    }

    /// Builds the configuration from a variable lookup function.
    ///
    /// An overlay variable set to the empty string disables that overlay. An empty webcam name is
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |var: &str, default: &str| PathBuf::from(lookup(var).unwrap_or_else(|| default.into()));
        let overlay = |var: &str, default: &str| match lookup(var) {
            Some(value) if value.is_empty() => None,
            Some(value) => Some(PathBuf::from(value)),
            None => Some(PathBuf::from(default)),
        };

        Self {
            webcam_name: lookup(ENV_WEBCAM_NAME).filter(|name| !name.is_empty()),
            face_cascade: path(ENV_FACE_CASCADE, DEFAULT_FACE_CASCADE),
            eye_cascade: path(ENV_EYE_CASCADE, DEFAULT_EYE_CASCADE),
            hat: overlay(ENV_HAT, DEFAULT_HAT),
            glasses: overlay(ENV_GLASSES, DEFAULT_GLASSES),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars.iter().copied().collect::<HashMap<&'static str, &'static str>>();
        move |var| vars.get(var).map(|v| v.to_string())
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.webcam_name, None);
        assert_eq!(config.face_cascade, PathBuf::from(DEFAULT_FACE_CASCADE));
        assert_eq!(config.eye_cascade, PathBuf::from(DEFAULT_EYE_CASCADE));
        assert_eq!(config.hat, Some(PathBuf::from(DEFAULT_HAT)));
        assert_eq!(config.glasses, Some(PathBuf::from(DEFAULT_GLASSES)));
    }

    #[test]
    fn overrides() {
        let vars = [
            ("FACEUP_WEBCAM_NAME", "Integrated Camera"),
            ("FACEUP_FACE_CASCADE", "/tmp/face.xml"),
            ("FACEUP_HAT", "party.png"),
        ];
        let config = Config::from_lookup(lookup(&vars));
        assert_eq!(config.webcam_name.as_deref(), Some("Integrated Camera"));
        assert_eq!(config.face_cascade, PathBuf::from("/tmp/face.xml"));
        assert_eq!(config.eye_cascade, PathBuf::from(DEFAULT_EYE_CASCADE));
        assert_eq!(config.hat, Some(PathBuf::from("party.png")));
    }

    #[test]
    fn empty_disables() {
        let vars = [
            ("FACEUP_WEBCAM_NAME", ""),
            ("FACEUP_HAT", ""),
            ("FACEUP_GLASSES", ""),
        ];
        let config = Config::from_lookup(lookup(&vars));
        assert_eq!(config.webcam_name, None);
        assert_eq!(config.hat, None);
        assert_eq!(config.glasses, None);
    }
}
