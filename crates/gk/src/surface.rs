//! Clipped drawing on a ratatui `Buffer`
//!
//! Every write is clipped to the surface's clip rect. Writes report how many
//! columns actually landed, so callers decide about truncation explicitly
//! instead of relying on out-of-bounds failures.

use crate::geometry::Rect;
use ratatui::buffer::Buffer;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

const TAB_WIDTH: i32 = 4;

pub struct Surface<'a> {
    buf: &'a mut Buffer,
    clip: Rect,
}

impl<'a> Surface<'a> {
    pub fn new(buf: &'a mut Buffer) -> Self {
        let clip = Rect::from(buf.area);
        Self { buf, clip }
    }

    pub fn clip(&self) -> Rect {
        self.clip
    }

    /// A surface restricted to `rect` (intersected with the current clip)
    pub fn clipped(&mut self, rect: Rect) -> Surface<'_> {
        Surface {
            clip: self.clip.intersect(rect),
            buf: &mut *self.buf,
        }
    }

    fn cell_mut(&mut self, x: i32, y: i32) -> Option<&mut ratatui::buffer::Cell> {
        if !self.clip.contains(x, y) {
            return None;
        }
        let x = u16::try_from(x).ok()?;
        let y = u16::try_from(y).ok()?;
        self.buf.cell_mut((x, y))
    }

    /// Write `text` starting at column `x`, which may lie left of the clip
    /// (horizontal scrolling). Returns the number of columns written.
    pub fn put_str(&mut self, x: i32, y: i32, text: &str, style: Style) -> usize {
        if y < self.clip.y || y >= self.clip.end_y() {
            return 0;
        }
        let end = self.clip.end_x();
        let mut col = x;
        let mut written = 0;

        for ch in text.chars() {
            if col >= end {
                break;
            }
            if ch == '\t' {
                let pad = TAB_WIDTH - (col - x).rem_euclid(TAB_WIDTH);
                for _ in 0..pad {
                    written += self.put_char(col, y, ' ', style);
                    col += 1;
                }
                continue;
            }
            let width = ch.width().unwrap_or(0) as i32;
            if width == 0 {
                continue;
            }
            if col + width > end {
                // A wide glyph that does not fit; pad the remaining cell.
                while col < end {
                    written += self.put_char(col, y, ' ', style);
                    col += 1;
                }
                break;
            }
            if col < self.clip.x {
                // Partly scrolled off the left edge.
                for pad_col in self.clip.x..col + width {
                    written += self.put_char(pad_col, y, ' ', style);
                }
            } else {
                written += self.put_char(col, y, ch, style);
                for skip in 1..width {
                    if let Some(cell) = self.cell_mut(col + skip, y) {
                        cell.reset();
                        cell.set_style(style);
                        written += 1;
                    }
                }
            }
            col += width;
        }

        written
    }

    fn put_char(&mut self, x: i32, y: i32, ch: char, style: Style) -> usize {
        match self.cell_mut(x, y) {
            Some(cell) => {
                cell.set_char(ch).set_style(style);
                1
            }
            None => 0,
        }
    }

    /// Fill `rect` with spaces
    pub fn fill(&mut self, rect: Rect, style: Style) {
        let rect = self.clip.intersect(rect);
        for y in rect.y..rect.end_y() {
            for x in rect.x..rect.end_x() {
                self.put_char(x, y, ' ', style);
            }
        }
    }

    /// Patch the style of already drawn cells
    pub fn restyle(&mut self, rect: Rect, style: Style) {
        let rect = self.clip.intersect(rect);
        for y in rect.y..rect.end_y() {
            for x in rect.x..rect.end_x() {
                if let Some(cell) = self.cell_mut(x, y) {
                    cell.set_style(style);
                }
            }
        }
    }

    /// Reset every cell in the clip
    pub fn clear(&mut self) {
        let clip = self.clip;
        for y in clip.y..clip.end_y() {
            for x in clip.x..clip.end_x() {
                if let Some(cell) = self.cell_mut(x, y) {
                    cell.reset();
                }
            }
        }
    }

    /// Single-line border around `rect` with an optional title on the top edge
    pub fn draw_box(&mut self, rect: Rect, style: Style, title: Option<&str>) {
        if rect.width < 2 || rect.height < 2 {
            return;
        }
        let (x1, y1) = (rect.x, rect.y);
        let (x2, y2) = (rect.end_x() - 1, rect.end_y() - 1);
        for x in x1 + 1..x2 {
            self.put_char(x, y1, '─', style);
            self.put_char(x, y2, '─', style);
        }
        for y in y1 + 1..y2 {
            self.put_char(x1, y, '│', style);
            self.put_char(x2, y, '│', style);
        }
        self.put_char(x1, y1, '┌', style);
        self.put_char(x2, y1, '┐', style);
        self.put_char(x1, y2, '└', style);
        self.put_char(x2, y2, '┘', style);

        if let Some(title) = title {
            let mut inner = self.clipped(Rect::new(x1 + 1, y1, rect.width - 2, 1));
            inner.put_str(x1 + 2, y1, &format!(" {title} "), style);
        }
    }
}
