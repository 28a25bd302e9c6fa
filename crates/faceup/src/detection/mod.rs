//! Cascade object detection.
//!
//! Face and eye detection is delegated to a [`Cascade`], a classical multi-scale sliding window
//! classifier. The parameters handed to it are collected in [`DetectorConfig`] so that detection
//! behavior does not depend on magic numbers spread across the pipeline.

#[cfg(feature = "opencv")]
mod haar;

use image::GrayImage;

use crate::image::Rect;

#[cfg(feature = "opencv")]
pub use haar::HaarCascade;

/// Parameters of a single multi-scale detection pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeParams {
    /// Factor by which the search window grows between scales. Must be greater than 1.
    pub scale_factor: f64,
    /// Number of overlapping raw hits required to report a box.
    pub min_neighbors: u32,
    /// Smallest box size (`width`, `height`) to search for, in pixels.
    pub min_size: (u32, u32),
}

impl CascadeParams {
    pub const FACE: Self = Self {
        scale_factor: 1.2,
        min_neighbors: 5,
        min_size: (30, 30),
    };

    pub const EYE: Self = Self {
        scale_factor: 1.2,
        min_neighbors: 2,
        min_size: (20, 20),
    };
}

/// Detection parameters for faces and for eyes inside of a face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    pub face: CascadeParams,
    pub eyes: CascadeParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            face: CascadeParams::FACE,
            eyes: CascadeParams::EYE,
        }
    }
}

/// A trained cascade classifier.
///
/// Implementations scan a grayscale image and return the bounding boxes of every object they
/// find, in image coordinates. The image passed in may be a crop of a larger frame (eye detection
/// runs on the face region only).
pub trait Cascade: Send {
    fn detect(&mut self, gray: &GrayImage, params: &CascadeParams) -> anyhow::Result<Vec<Rect>>;
}

impl<C: Cascade + ?Sized> Cascade for Box<C> {
    fn detect(&mut self, gray: &GrayImage, params: &CascadeParams) -> anyhow::Result<Vec<Rect>> {
        (**self).detect(gray, params)
    }
}
