//! OpenCV Haar cascade backend.

use std::path::Path;

use anyhow::{bail, Context};
use image::GrayImage;
use opencv::{
    core::{Mat, Rect as CvRect, Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};

use crate::image::Rect;

use super::{Cascade, CascadeParams};

/// A Haar feature cascade loaded from one of OpenCV's XML model files (eg.
/// `haarcascade_frontalface_default.xml`).
pub struct HaarCascade {
    classifier: CascadeClassifier,
    hits: Vector<CvRect>,
}

impl HaarCascade {
    /// Loads a cascade from an OpenCV XML file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .with_context(|| format!("cascade path '{}' is not valid UTF-8", path.display()))?;
        let classifier = CascadeClassifier::new(path_str)
            .with_context(|| format!("failed to load cascade '{}'", path.display()))?;
        if classifier.empty()? {
            bail!("cascade '{}' is empty or missing", path.display());
        }
        log::debug!("loaded cascade '{}'", path.display());

        Ok(Self {
            classifier,
            hits: Vector::new(),
        })
    }
}

impl Cascade for HaarCascade {
    fn detect(&mut self, gray: &GrayImage, params: &CascadeParams) -> anyhow::Result<Vec<Rect>> {
        if gray.width() == 0 || gray.height() == 0 {
            return Ok(Vec::new());
        }

        let mat =
            Mat::new_rows_cols_with_data(gray.height() as i32, gray.width() as i32, gray.as_raw())?;
        self.hits.clear();
        self.classifier.detect_multi_scale(
            &*mat,
            &mut self.hits,
            params.scale_factor,
            params.min_neighbors as i32,
            0,
            Size::new(params.min_size.0 as i32, params.min_size.1 as i32),
            Size::default(),
        )?;

        Ok(self
            .hits
            .iter()
            .map(|r| Rect::from_top_left(r.x, r.y, r.width.max(0) as u32, r.height.max(0) as u32))
            .collect())
    }
}
