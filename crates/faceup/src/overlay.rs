//! Decorative overlay images.
//!
//! An [`Overlay`] is an RGBA image (a hat, a pair of glasses) that gets alpha-blended onto camera
//! frames with [`composite`][crate::image::composite]. Overlays are immutable once loaded; fitting
//! them to a face with [`Overlay::resize`] produces a new buffer.

use std::{fmt, path::Path};

use anyhow::Context;
use image::{imageops::FilterType, ImageBuffer, RgbaImage};

use crate::image::{ChannelOrder, Resolution};

/// Resampling filter used to fit overlays to faces.
///
/// Overlays are almost always shrunk, and the triangle filter widens its support when
/// downsampling, averaging over the covered source area.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// An 8-bit image with alpha channel, stored in the channel order of the frames it is blended
/// onto.
#[derive(Clone, PartialEq, Eq)]
pub struct Overlay {
    buf: RgbaImage,
    order: ChannelOrder,
}

impl Overlay {
    /// Loads an overlay from the filesystem, converting it to `order`.
    ///
    /// The image format is detected from the file contents. If the file cannot be read or decoded,
    /// the error is logged and `None` is returned.
    pub fn load<P: AsRef<Path>>(path: P, order: ChannelOrder) -> Option<Self> {
        let path = path.as_ref();
        match Self::try_load(path, order) {
            Ok(overlay) => {
                log::debug!("loaded overlay '{}' ({:?})", path.display(), overlay);
                Some(overlay)
            }
            Err(e) => {
                log::warn!("failed to load overlay '{}': {:#}", path.display(), e);
                None
            }
        }
    }

    /// Loads an overlay from the filesystem, returning any error to the caller.
    ///
    /// Every call reads the file again; nothing is cached.
    pub fn try_load<P: AsRef<Path>>(path: P, order: ChannelOrder) -> anyhow::Result<Self> {
        Self::try_load_impl(path.as_ref(), order)
    }

    fn try_load_impl(path: &Path, order: ChannelOrder) -> anyhow::Result<Self> {
        let image = image::io::Reader::open(path)
            .with_context(|| format!("failed to open '{}'", path.display()))?
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("failed to decode '{}'", path.display()))?;
        Ok(Self::from_rgba_image(image.to_rgba8(), order))
    }

    /// Creates an overlay from RGBA8 data (in red, green, blue, alpha order).
    ///
    /// # Panics
    ///
    /// Panics if `buf` does not contain exactly `4 * width * height` bytes.
    pub fn from_rgba8(res: Resolution, buf: Vec<u8>, order: ChannelOrder) -> Self {
        let expected_size = res.width() as usize * res.height() as usize * 4;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} overlay (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );
        let buf = ImageBuffer::from_raw(res.width(), res.height(), buf)
            .expect("buffer size does not match overlay resolution");
        Self::from_rgba_image(buf, order)
    }

    fn from_rgba_image(mut buf: RgbaImage, order: ChannelOrder) -> Self {
        if order == ChannelOrder::Bgr {
            // Only red and blue trade places, alpha stays where it is.
            for pix in buf.pixels_mut() {
                pix.0.swap(0, 2);
            }
        }
        Self { buf, order }
    }

    /// Returns the width of this overlay, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this overlay, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns the channel order the color channels are stored in.
    #[inline]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Resamples the overlay to `width x height`, returning a new overlay.
    ///
    /// Returns `None` if either dimension is zero.
    pub fn resize(&self, width: u32, height: u32) -> Option<Overlay> {
        if width == 0 || height == 0 || self.width() == 0 || self.height() == 0 {
            return None;
        }
        if (width, height) == (self.width(), self.height()) {
            return Some(self.clone());
        }
        Some(Overlay {
            buf: image::imageops::resize(&self.buf, width, height, RESIZE_FILTER),
            order: self.order,
        })
    }

    /// Returns the raw channels of a pixel, in [`Overlay::order`] with alpha last.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this overlay.
    #[inline]
    pub fn raw(&self, x: u32, y: u32) -> [u8; 4] {
        self.buf[(x, y)].0
    }
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?} Overlay", self.width(), self.height(), self.order)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::Rgba;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("faceup-{}-{}", std::process::id(), name))
    }

    #[test]
    fn load_swaps_red_and_blue_for_bgr() {
        let path = temp_path("swap.png");
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([10, 20, 30, 40]));
        image.put_pixel(1, 0, Rgba([200, 100, 50, 255]));
        image.save(&path).unwrap();

        let rgb = Overlay::load(&path, ChannelOrder::Rgb).unwrap();
        assert_eq!(rgb.raw(0, 0), [10, 20, 30, 40]);

        let bgr = Overlay::load(&path, ChannelOrder::Bgr).unwrap();
        assert_eq!(bgr.order(), ChannelOrder::Bgr);
        assert_eq!(bgr.raw(0, 0), [30, 20, 10, 40]);
        assert_eq!(bgr.raw(1, 0), [50, 100, 200, 255]);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_detects_format_from_contents() {
        let path = temp_path("no-extension");
        let image = RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 4]));
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();

        let overlay = Overlay::load(&path, ChannelOrder::Rgb).unwrap();
        assert_eq!(overlay.resolution(), Resolution::new(3, 2));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_failure_yields_none() {
        assert!(Overlay::load(temp_path("does-not-exist.png"), ChannelOrder::Rgb).is_none());

        let path = temp_path("garbage.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(Overlay::load(&path, ChannelOrder::Rgb).is_none());
        assert!(Overlay::try_load(&path, ChannelOrder::Rgb).is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn resize_produces_new_buffer() {
        let overlay = Overlay::from_rgba8(
            Resolution::new(4, 4),
            [255, 0, 0, 255].repeat(16),
            ChannelOrder::Rgb,
        );
        let small = overlay.resize(2, 1).unwrap();
        assert_eq!(small.resolution(), Resolution::new(2, 1));
        let [r, g, b, a] = small.raw(1, 0);
        assert!(r >= 254 && g <= 1 && b <= 1 && a >= 254, "{:?}", small.raw(1, 0));
        assert_eq!(overlay.resolution(), Resolution::new(4, 4));

        assert!(overlay.resize(0, 3).is_none());
        assert!(overlay.resize(3, 0).is_none());
    }
}
