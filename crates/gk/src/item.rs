//! Rows of a list: the `Row` trait and the stock row kinds

use crate::config::{Theme, Tone};
use crate::geometry::Rect;
use crate::input::MouseInput;
use crate::segment::{SegmentAction, SegmentedRow};
use crate::surface::Surface;
use crossterm::event::KeyEvent;
use std::borrow::Cow;
use unicode_width::UnicodeWidthStr;

/// Per-draw state of a row
#[derive(Debug, Clone, Copy)]
pub struct RowState<'a> {
    pub selected: bool,
    /// The row matches the list's active search
    pub matched: bool,
    /// The panel holding the row has keyboard focus
    pub focused: bool,
    pub theme: &'a Theme,
}

/// What a row did with a mouse event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowResponse {
    Ignored,
    Handled,
    /// An element was pressed; moves and the release belong to it until the
    /// button is let go. Columns are relative to the row.
    Capture { start: usize, width: usize },
    Action(SegmentAction),
}

/// One renderable line of a list
pub trait Row {
    /// Plain text of the row, used for searching and width measurement
    fn text(&self) -> Cow<'_, str>;

    fn selectable(&self) -> bool {
        true
    }

    /// Display width of the full row
    fn width(&self) -> usize {
        self.text().width()
    }

    /// Draw into columns `[x, x + width)` of line `y`, skipping the first
    /// `offset_x` columns of content
    fn draw(
        &self,
        surface: &mut Surface,
        x: i32,
        y: i32,
        offset_x: usize,
        width: usize,
        state: &RowState,
    );

    fn handle_key(&mut self, _key: &KeyEvent) -> Option<SegmentAction> {
        None
    }

    /// `col` is the content column under the pointer, offset included
    fn handle_mouse(&mut self, _input: &MouseInput, _col: usize, _width: usize) -> RowResponse {
        RowResponse::Ignored
    }
}

/// Draw `text` in one tone, shifted left by `offset_x`
#[allow(clippy::too_many_arguments)]
pub fn draw_plain(
    surface: &mut Surface,
    text: &str,
    tone: Tone,
    x: i32,
    y: i32,
    offset_x: usize,
    width: usize,
    state: &RowState,
) {
    let mut row = surface.clipped(Rect::new(x, y, width as i32, 1));
    row.put_str(x - offset_x as i32, y, text, state.theme.style(tone));
}

/// The stock row kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Text { text: String, tone: Tone },
    /// Horizontal rule; never selectable
    Separator,
    Segmented(SegmentedRow),
}

impl Item {
    pub fn plain(text: impl Into<String>, tone: Tone) -> Self {
        Item::Text {
            text: text.into(),
            tone,
        }
    }

    pub fn as_segmented(&self) -> Option<&SegmentedRow> {
        match self {
            Item::Segmented(row) => Some(row),
            _ => None,
        }
    }

    pub fn as_segmented_mut(&mut self) -> Option<&mut SegmentedRow> {
        match self {
            Item::Segmented(row) => Some(row),
            _ => None,
        }
    }
}

impl Row for Item {
    fn text(&self) -> Cow<'_, str> {
        match self {
            Item::Text { text, .. } => Cow::Borrowed(text),
            Item::Separator => Cow::Borrowed(""),
            Item::Segmented(row) => Cow::Owned(row.joined_text()),
        }
    }

    fn selectable(&self) -> bool {
        match self {
            Item::Text { .. } => true,
            Item::Separator => false,
            Item::Segmented(row) => row.is_selectable(),
        }
    }

    fn width(&self) -> usize {
        match self {
            Item::Separator => 0,
            Item::Segmented(row) => row.layout(0).last().map_or(0, |s| s.start + s.width),
            Item::Text { text, .. } => text.width(),
        }
    }

    fn draw(
        &self,
        surface: &mut Surface,
        x: i32,
        y: i32,
        offset_x: usize,
        width: usize,
        state: &RowState,
    ) {
        match self {
            Item::Text { text, tone } => {
                draw_plain(surface, text, *tone, x, y, offset_x, width, state)
            }
            Item::Separator => {
                let rule = "─".repeat(width);
                let mut row = surface.clipped(Rect::new(x, y, width as i32, 1));
                row.put_str(x, y, &rule, state.theme.border_style(false));
            }
            Item::Segmented(row) => row.draw(surface, x, y, offset_x, width, state),
        }
    }

    fn handle_key(&mut self, key: &KeyEvent) -> Option<SegmentAction> {
        match self {
            Item::Segmented(row) => row.handle_key(key),
            _ => None,
        }
    }

    fn handle_mouse(&mut self, input: &MouseInput, col: usize, width: usize) -> RowResponse {
        match self {
            Item::Segmented(row) => row.handle_mouse(input, col, width),
            _ => RowResponse::Ignored,
        }
    }
}
