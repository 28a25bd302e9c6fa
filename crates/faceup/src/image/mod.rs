//! Frame storage and manipulation.
//!
//! This module provides:
//!
//! - The [`Frame`] type, an owned 3-channel camera frame that remembers its [`ChannelOrder`].
//! - The alpha [`composite`] operation that blends an [`Overlay`] onto a [`Frame`].
//! - A few [`draw`] functions to visualize detections.
//! - [`Rect`], an integer-valued rectangle used for detection boxes and clipping.
//!
//! [`Overlay`]: crate::overlay::Overlay

mod blend;
pub mod draw;
mod rect;
mod resolution;

#[cfg(test)]
mod tests;

use std::fmt;

use embedded_graphics::{pixelcolor::raw::RawU24, prelude::PixelColor};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};

pub use blend::*;
pub use rect::Rect;
pub use resolution::*;

/// Order in which the color channels of a pixel are stored in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    /// Red, green, blue. Produced by the JPEG decoder and expected by the display.
    #[default]
    Rgb,
    /// Blue, green, red. The native layout of OpenCV-style capture pipelines.
    Bgr,
}

impl ChannelOrder {
    /// Converts a logical RGB triple into this channel order (or back; the mapping is its own
    /// inverse).
    #[inline]
    pub fn arrange(self, [a, b, c]: [u8; 3]) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => [a, b, c],
            ChannelOrder::Bgr => [c, b, a],
        }
    }
}

/// An 8-bit camera frame without alpha channel.
///
/// Pixels are stored row-major with the origin in the top left corner. The in-memory channel
/// order is given by [`Frame::order`]; accessors like [`Frame::get`] and [`Frame::set`] always
/// speak logical RGB.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub(crate) buf: RgbImage,
    order: ChannelOrder,
}

impl Frame {
    /// Creates a black frame of the given size, stored in RGB order.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: ImageBuffer::new(width, height),
            order: ChannelOrder::Rgb,
        }
    }

    /// Creates a frame from raw 3-channel pixel data laid out in `order`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` does not contain exactly `3 * width * height` bytes.
    pub fn from_raw(res: Resolution, order: ChannelOrder, buf: Vec<u8>) -> Self {
        let expected_size = res.width() as usize * res.height() as usize * 3;
        assert_eq!(
            expected_size,
            buf.len(),
            "incorrect buffer size {} for {} frame (expected {} bytes)",
            buf.len(),
            res,
            expected_size,
        );

        Self {
            buf: ImageBuffer::from_raw(res.width(), res.height(), buf)
                .expect("buffer size does not match frame resolution"),
            order,
        }
    }

    /// Decodes a JFIF JPEG or Motion JPEG from a byte slice into an RGB frame.
    pub fn decode_jpeg(data: &[u8]) -> anyhow::Result<Self> {
        let buf = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgb8();
        Ok(Self {
            buf,
            order: ChannelOrder::Rgb,
        })
    }

    /// Returns the width of this frame, in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    /// Returns the height of this frame, in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Returns the size of this frame.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    /// Returns a [`Rect`] covering this frame.
    ///
    /// The rectangle will be positioned at `(0, 0)` and have the width and height of the frame.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_top_left(0, 0, self.width(), self.height())
    }

    /// Returns the in-memory channel order of this frame.
    #[inline]
    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// Gets the color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.order.arrange(self.buf[(x, y)].0))
    }

    /// Sets the color at the given pixel coordinates.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y)` is outside the bounds of this frame.
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf[(x, y)].0 = self.order.arrange(color.0);
    }

    /// Clears the frame, setting every pixel to `color`.
    pub fn clear(&mut self, color: Color) {
        let raw = self.order.arrange(color.0);
        self.buf.pixels_mut().for_each(|pix| pix.0 = raw);
    }

    /// Computes the single-channel luminance image that cascade detectors operate on.
    ///
    /// Uses the ITU-R BT.601 weights.
    pub fn to_luma(&self) -> GrayImage {
        let mut out = GrayImage::new(self.width(), self.height());
        for (src, dest) in self.buf.pixels().zip(out.pixels_mut()) {
            let [r, g, b] = self.order.arrange(src.0);
            let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
            *dest = Luma([luma.round() as u8]);
        }
        out
    }

    /// Converts the frame to tightly packed RGBA8 data with an opaque alpha channel.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.width() as usize * self.height() as usize * 4);
        for pix in self.buf.pixels() {
            let [r, g, b] = self.order.arrange(pix.0);
            data.extend_from_slice(&[r, g, b, 255]);
        }
        data
    }

    /// Returns the raw pixel data in the frame's channel order.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }

    /// Mutable access to the raw channels of a pixel, in the frame's channel order.
    #[inline]
    pub(crate) fn raw_mut(&mut self, x: u32, y: u32) -> &mut [u8; 3] {
        &mut self.buf.get_pixel_mut(x, y).0
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?} Frame", self.width(), self.height(), self.order)
    }
}

/// An 8-bit sRGB color without alpha.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct Color(pub(crate) [u8; 3]);

impl Color {
    pub const BLACK: Self = Self([0, 0, 0]);
    pub const WHITE: Self = Self([255, 255, 255]);
    pub const RED: Self = Self([255, 0, 0]);
    pub const GREEN: Self = Self([0, 255, 0]);
    pub const BLUE: Self = Self([0, 0, 255]);

    #[inline]
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    #[inline]
    pub fn r(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    pub fn g(&self) -> u8 {
        self.0[1]
    }

    #[inline]
    pub fn b(&self) -> u8 {
        self.0[2]
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r(), self.g(), self.b())
    }
}

// FIXME leaks `embedded-graphics` dependency
impl PixelColor for Color {
    type Raw = RawU24;
}
