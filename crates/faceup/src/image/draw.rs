//! Drawing primitives for visualizing detections.

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};

use super::{Color, Frame, Rect};

/// Guard returned by [`rect`]; draws the rectangle outline when dropped and allows customization.
pub struct DrawRect<'a> {
    frame: &'a mut Frame,
    rect: Rect,
    color: Color,
    stroke_width: u32,
}

impl DrawRect<'_> {
    /// Sets the rectangle's color.
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the rectangle's stroke width.
    ///
    /// By default, a stroke width of 1 is used.
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }
}

impl Drop for DrawRect<'_> {
    fn drop(&mut self) {
        match self
            .rect
            .rect
            .into_styled(PrimitiveStyle::with_stroke(self.color, self.stroke_width))
            .draw(&mut Target(self.frame))
        {
            Ok(_) => {}
            Err(infallible) => match infallible {},
        }
    }
}

/// Draws a rectangle outline onto a frame.
///
/// Parts of the rectangle outside of the frame are clipped.
pub fn rect(frame: &mut Frame, rect: Rect) -> DrawRect<'_> {
    DrawRect {
        frame,
        rect,
        color: Color::RED,
        stroke_width: 1,
    }
}

struct Target<'a>(&'a mut Frame);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        let (width, height) = (self.0.width(), self.0.height());

        Rectangle {
            top_left: Point { x: 0, y: 0 },
            size: Size { width, height },
        }
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = embedded_graphics::Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x >= 0
                && (point.x as u32) < self.0.width()
                && point.y >= 0
                && (point.y as u32) < self.0.height()
            {
                self.0.set(point.x as u32, point.y as u32, color);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_is_clipped_and_hollow() {
        let mut frame = Frame::new(20, 20);
        rect(&mut frame, Rect::from_top_left(5, 5, 10, 10))
            .color(Color::WHITE)
            .stroke_width(2);

        assert_eq!(frame.get(5, 5), Color::WHITE);
        assert_eq!(frame.get(14, 10), Color::WHITE);
        assert_eq!(frame.get(10, 10), Color::BLACK);
        assert_eq!(frame.get(0, 0), Color::BLACK);

        // Must not panic when partially outside of the frame.
        rect(&mut frame, Rect::from_top_left(-5, 15, 40, 40)).color(Color::GREEN);
        assert_eq!(frame.get(0, 15), Color::GREEN);
    }
}
