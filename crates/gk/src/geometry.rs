//! Rectangles and rectangle regions for the compositor

use std::cmp::{max, min};

/// Like `ratatui::layout::Rect`, but signed so panels can be partly
/// off-screen while they are dragged.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn end_x(self) -> i32 {
        self.x + self.width
    }

    pub fn end_y(self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn contains(self, x: i32, y: i32) -> bool {
        self.x <= x && x < self.end_x() && self.y <= y && y < self.end_y()
    }

    /// The largest rect inside both `self` and `other`
    pub fn intersect(self, other: Rect) -> Rect {
        let x1 = max(self.x, other.x);
        let y1 = max(self.y, other.y);
        let x2 = min(self.end_x(), other.end_x());
        let y2 = min(self.end_y(), other.end_y());
        Rect::new(x1, y1, max(0, x2 - x1), max(0, y2 - y1))
    }

    pub fn overlaps(self, other: Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Shrink by one cell on every side
    pub fn inner(self) -> Rect {
        Rect::new(
            self.x + 1,
            self.y + 1,
            max(0, self.width - 2),
            max(0, self.height - 2),
        )
    }

    /// `self` minus `cut`, as up to four non-overlapping slabs: the part above
    /// the overlap, below it, and left and right of it.
    pub fn subtract(self, cut: Rect) -> Vec<Rect> {
        if self.is_empty() {
            return Vec::new();
        }
        let overlap = self.intersect(cut);
        if overlap.is_empty() {
            return vec![self];
        }
        let slabs = [
            Rect::new(self.x, self.y, self.width, overlap.y - self.y),
            Rect::new(
                self.x,
                overlap.end_y(),
                self.width,
                self.end_y() - overlap.end_y(),
            ),
            Rect::new(self.x, overlap.y, overlap.x - self.x, overlap.height),
            Rect::new(
                overlap.end_x(),
                overlap.y,
                self.end_x() - overlap.end_x(),
                overlap.height,
            ),
        ];
        slabs.into_iter().filter(|r| !r.is_empty()).collect()
    }

    /// Move (not resize) so the rect lies inside `bounds` where it can.
    pub fn clamp_within(self, bounds: Rect) -> Rect {
        let width = min(self.width, bounds.width);
        let height = min(self.height, bounds.height);
        let x = self.x.clamp(bounds.x, max(bounds.x, bounds.end_x() - width));
        let y = self.y.clamp(bounds.y, max(bounds.y, bounds.end_y() - height));
        Rect::new(x, y, width, height)
    }

    /// A rect of the given size centered in `self`
    pub fn centered(self, width: i32, height: i32) -> Rect {
        let width = min(width, self.width);
        let height = min(height, self.height);
        Rect::new(
            self.x + (self.width - width) / 2,
            self.y + (self.height - height) / 2,
            width,
            height,
        )
    }
}

impl From<ratatui::layout::Rect> for Rect {
    fn from(rect: ratatui::layout::Rect) -> Self {
        Rect::new(
            i32::from(rect.x),
            i32::from(rect.y),
            i32::from(rect.width),
            i32::from(rect.height),
        )
    }
}

/// Subtract `cut` from every rect of `region`.
pub fn subtract_region(region: &[Rect], cut: Rect) -> Vec<Rect> {
    region.iter().flat_map(|rect| rect.subtract(cut)).collect()
}
