use std::fmt;

use embedded_graphics::prelude::*;

/// An axis-aligned rectangle.
///
/// This rectangle type uses (signed) integer coordinates. It is used for the boxes reported by
/// cascade detectors as well as for clipping overlays against a [`Frame`][super::Frame].
///
/// Rectangles are allowed to have zero height and/or width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub(crate) rect: embedded_graphics::primitives::Rectangle,
}

impl Rect {
    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: i32, top_left_y: i32, width: u32, height: u32) -> Self {
        Self {
            rect: embedded_graphics::primitives::Rectangle {
                top_left: Point {
                    x: top_left_x,
                    y: top_left_y,
                },
                size: Size { width, height },
            },
        }
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> i32 {
        self.rect.top_left.x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> i32 {
        self.rect.top_left.y
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.rect.size.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rect.size.height
    }

    #[must_use]
    pub fn move_by(&self, x: i32, y: i32) -> Rect {
        Rect::from_top_left(self.x() + x, self.y() + y, self.width(), self.height())
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns `None` when the intersection is empty (ie. the rectangles do not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x().max(other.x());
        let y_min = self.y().max(other.y());
        let x_end = (i64::from(self.x()) + i64::from(self.width()))
            .min(i64::from(other.x()) + i64::from(other.width()));
        let y_end = (i64::from(self.y()) + i64::from(self.height()))
            .min(i64::from(other.y()) + i64::from(other.height()));
        if x_end <= i64::from(x_min) || y_end <= i64::from(y_min) {
            return None;
        }
        let rect = Rect::from_top_left(
            x_min,
            y_min,
            (x_end - i64::from(x_min)) as u32,
            (y_end - i64::from(y_min)) as u32,
        );
        debug_assert!(
            self.contains_rect(&rect) && other.contains_rect(&rect),
            "intersect self={:?} other={:?} res={:?}",
            self,
            other,
            rect,
        );
        Some(rect)
    }

    /// Returns whether `self` contains `other`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.x() <= other.x()
            && self.y() <= other.y()
            && i64::from(self.x()) + i64::from(self.width())
                >= i64::from(other.x()) + i64::from(other.width())
            && i64::from(self.y()) + i64::from(self.height())
                >= i64::from(other.y()) + i64::from(other.height())
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let x = self.rect.top_left.x;
        let y = self.rect.top_left.y;
        let w = self.rect.size.width;
        let h = self.rect.size.height;
        let bx = i64::from(x) + i64::from(w);
        let by = i64::from(y) + i64::from(h);
        write!(f, "Rect @ ({x},{y})-({bx},{by})/{w}x{h}")
    }
}
