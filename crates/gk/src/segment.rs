//! Segmented rows: a row built from text, buttons, toggles, fillers and an
//! editable field, laid out left to right

use crate::config::Tone;
use crate::geometry::Rect;
use crate::input::{MouseInput, MouseKind};
use crate::item::{RowResponse, RowState};
use crate::surface::Surface;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Modifier, Style};
use std::borrow::Cow;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Narrowest an edit field is laid out
const EDIT_MIN_WIDTH: usize = 12;

/// Visual state of a button under the mouse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PressState {
    #[default]
    Idle,
    /// Held down with the pointer still on it
    Pressed,
    /// Held down but the pointer left; releasing now does nothing
    PressedElsewhere,
}

/// Single-line text input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditField {
    text: String,
    /// In chars, not bytes
    cursor: usize,
}

impl EditField {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.text
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Display column of the cursor
    pub fn cursor_col(&self) -> usize {
        self.text[..self.byte_index(self.cursor)].width()
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.text.chars().count() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    /// Put the cursor on the char covering display column `col`
    pub fn set_cursor_col(&mut self, col: usize) {
        let mut used = 0;
        for (i, ch) in self.text.chars().enumerate() {
            let width = ch.width().unwrap_or(0);
            if used + width > col {
                self.cursor = i;
                return;
            }
            used += width;
        }
        self.cursor = self.text.chars().count();
    }

    /// Returns true when the key was consumed
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        let len = self.text.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear();
                true
            }
            KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = 0;
                true
            }
            KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.cursor = len;
                true
            }
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.insert(ch);
                true
            }
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                self.cursor = (self.cursor + 1).min(len);
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = len;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text { text: String, tone: Tone },
    Button {
        id: &'static str,
        label: String,
        press: PressState,
    },
    Toggle {
        id: &'static str,
        label: String,
        on: bool,
    },
    /// Absorbs leftover width
    Filler,
    Edit(EditField),
}

impl Segment {
    pub fn text(text: impl Into<String>, tone: Tone) -> Self {
        Segment::Text {
            text: text.into(),
            tone,
        }
    }

    pub fn button(id: &'static str, label: impl Into<String>) -> Self {
        Segment::Button {
            id,
            label: label.into(),
            press: PressState::Idle,
        }
    }

    pub fn toggle(id: &'static str, label: impl Into<String>, on: bool) -> Self {
        Segment::Toggle {
            id,
            label: label.into(),
            on,
        }
    }

    /// What the segment shows when there is room for all of it
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Segment::Text { text, .. } => Cow::Borrowed(text),
            Segment::Button { label, .. } => Cow::Owned(format!("[ {label} ]")),
            Segment::Toggle { label, on, .. } => {
                let mark = if *on { 'x' } else { ' ' };
                Cow::Owned(format!("[{mark}] {label}"))
            }
            Segment::Filler => Cow::Borrowed(""),
            Segment::Edit(field) => Cow::Borrowed(field.text()),
        }
    }

    pub fn natural_width(&self) -> usize {
        match self {
            Segment::Edit(field) => (field.text().width() + 1).max(EDIT_MIN_WIDTH),
            other => other.display().width(),
        }
    }

    fn style(&self, state: &RowState, editing: bool) -> Style {
        let theme = state.theme;
        match self {
            Segment::Text { tone, .. } => theme.style(*tone),
            Segment::Button { press, .. } => {
                let base = theme.style(Tone::Primary).add_modifier(Modifier::BOLD);
                match press {
                    PressState::Idle => base,
                    PressState::Pressed => base.add_modifier(Modifier::REVERSED),
                    PressState::PressedElsewhere => base.add_modifier(Modifier::UNDERLINED),
                }
            }
            Segment::Toggle { on: true, .. } => theme.style(Tone::Accent),
            Segment::Toggle { on: false, .. } => theme.style(Tone::Muted),
            Segment::Filler => Style::default(),
            Segment::Edit(_) => {
                let style = theme.style(Tone::Text).add_modifier(Modifier::UNDERLINED);
                if editing {
                    style.add_modifier(Modifier::BOLD)
                } else {
                    style
                }
            }
        }
    }
}

/// Column range a segment occupies within its row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub start: usize,
    pub width: usize,
}

impl SegmentSpan {
    pub fn contains(&self, col: usize) -> bool {
        self.start <= col && col < self.start + self.width
    }
}

/// Lay segments out in `width` columns. Fillers split the leftover width
/// evenly, the remainder going to the leftmost fillers. Spans may run past
/// `width`; drawing truncates.
pub fn layout(segments: &[Segment], separator_width: usize, width: usize) -> Vec<SegmentSpan> {
    let natural: usize = segments.iter().map(Segment::natural_width).sum::<usize>()
        + separator_width * segments.len().saturating_sub(1);
    let fillers = segments
        .iter()
        .filter(|s| matches!(s, Segment::Filler))
        .count();
    let leftover = width.saturating_sub(natural);
    let (share, remainder) = if fillers > 0 {
        (leftover / fillers, leftover % fillers)
    } else {
        (0, 0)
    };

    let mut spans = Vec::with_capacity(segments.len());
    let mut col = 0;
    let mut filler_index = 0;
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            col += separator_width;
        }
        let seg_width = match segment {
            Segment::Filler => {
                let extra = usize::from(filler_index < remainder);
                filler_index += 1;
                share + extra
            }
            other => other.natural_width(),
        };
        spans.push(SegmentSpan {
            start: col,
            width: seg_width,
        });
        col += seg_width;
    }
    spans
}

/// Things a segment can ask its panel to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentAction {
    /// A button was clicked and released
    Activated(&'static str),
    Toggled(&'static str, bool),
    /// The edit field's text changed
    Edited,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedRow {
    segments: Vec<Segment>,
    separator: String,
    selectable: bool,
    /// Index of the edit segment receiving keys
    editing: Option<usize>,
    /// Index of the button held down
    pressed: Option<usize>,
}

impl SegmentedRow {
    pub fn new(segments: Vec<Segment>, separator: impl Into<String>) -> Self {
        let editing = segments
            .iter()
            .position(|s| matches!(s, Segment::Edit(_)));
        Self {
            segments,
            separator: separator.into(),
            selectable: true,
            editing,
            pressed: None,
        }
    }

    pub fn non_selectable(mut self) -> Self {
        self.selectable = false;
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    pub fn layout(&self, width: usize) -> Vec<SegmentSpan> {
        layout(&self.segments, self.separator.width(), width)
    }

    /// Concatenated text, separators included (used for searching)
    pub fn joined_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.display())
            .collect::<Vec<_>>()
            .join(&self.separator)
    }

    pub fn edit_field(&self) -> Option<&EditField> {
        self.segments.iter().find_map(|s| match s {
            Segment::Edit(field) => Some(field),
            _ => None,
        })
    }

    pub fn toggle_state(&self, id: &str) -> Option<bool> {
        self.segments.iter().find_map(|s| match s {
            Segment::Toggle { id: tid, on, .. } if *tid == id => Some(*on),
            _ => None,
        })
    }

    /// Flip a toggle by id, returning its new state
    pub fn flip_toggle(&mut self, id: &str) -> Option<bool> {
        self.segments.iter_mut().find_map(|s| match s {
            Segment::Toggle { id: tid, on, .. } if *tid == id => {
                *on = !*on;
                Some(*on)
            }
            _ => None,
        })
    }

    fn set_press(&mut self, index: usize, state: PressState) {
        if let Some(Segment::Button { press, .. }) = self.segments.get_mut(index) {
            *press = state;
        }
    }

    pub fn draw(
        &self,
        surface: &mut Surface,
        x: i32,
        y: i32,
        offset_x: usize,
        width: usize,
        state: &RowState,
    ) {
        let origin = x - offset_x as i32;
        let layout_width = width + offset_x;
        let spans = self.layout(layout_width);
        let sep_style = state.theme.style(Tone::Muted);
        let row_clip = Rect::new(x, y, width as i32, 1);
        let mut row = surface.clipped(row_clip);

        for (i, (segment, span)) in self.segments.iter().zip(&spans).enumerate() {
            if i > 0 && !self.separator.is_empty() {
                let sep_x = origin + span.start as i32 - self.separator.width() as i32;
                row.put_str(sep_x, y, &self.separator, sep_style);
            }
            let seg_x = origin + span.start as i32;
            let editing = state.focused && self.editing == Some(i);
            let style = segment.style(state, editing);
            let mut cell = row.clipped(Rect::new(seg_x, y, span.width as i32, 1));
            match segment {
                Segment::Filler => {}
                Segment::Edit(field) => {
                    cell.fill(Rect::new(seg_x, y, span.width as i32, 1), style);
                    let cursor_col = field.cursor_col();
                    let scroll = cursor_col.saturating_sub(span.width.saturating_sub(1));
                    cell.put_str(seg_x - scroll as i32, y, field.text(), style);
                    if editing {
                        let cursor_x = seg_x + (cursor_col - scroll) as i32;
                        cell.restyle(
                            Rect::new(cursor_x, y, 1, 1),
                            Style::default().add_modifier(Modifier::REVERSED),
                        );
                    }
                }
                other => {
                    cell.put_str(seg_x, y, &other.display(), style);
                }
            }
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Option<SegmentAction> {
        let index = self.editing?;
        match self.segments.get_mut(index) {
            Some(Segment::Edit(field)) => field.handle_key(key).then_some(SegmentAction::Edited),
            _ => None,
        }
    }

    /// `col` is relative to the row's first column, horizontal offset
    /// included; `width` is the layout width `draw` uses (viewport plus
    /// offset)
    pub fn handle_mouse(&mut self, input: &MouseInput, col: usize, width: usize) -> RowResponse {
        match input.kind {
            MouseKind::LeftClick | MouseKind::DoubleClick => {
                let spans = self.layout(width);
                let Some(index) = spans.iter().position(|span| span.contains(col)) else {
                    return RowResponse::Ignored;
                };
                let span = spans[index];
                match &mut self.segments[index] {
                    Segment::Button { press, .. } => {
                        *press = PressState::Pressed;
                        self.pressed = Some(index);
                        RowResponse::Capture {
                            start: span.start,
                            width: span.width,
                        }
                    }
                    Segment::Toggle { id, on, .. } => {
                        *on = !*on;
                        RowResponse::Action(SegmentAction::Toggled(*id, *on))
                    }
                    Segment::Edit(field) => {
                        field.set_cursor_col(col - span.start);
                        self.editing = Some(index);
                        RowResponse::Handled
                    }
                    Segment::Text { .. } | Segment::Filler => RowResponse::Ignored,
                }
            }
            MouseKind::PressHold => match self.pressed {
                Some(index) => {
                    self.set_press(index, PressState::Pressed);
                    RowResponse::Handled
                }
                None => RowResponse::Ignored,
            },
            MouseKind::PressLeave => match self.pressed {
                Some(index) => {
                    self.set_press(index, PressState::PressedElsewhere);
                    RowResponse::Handled
                }
                None => RowResponse::Ignored,
            },
            MouseKind::LeftRelease => {
                let Some(index) = self.pressed.take() else {
                    return RowResponse::Ignored;
                };
                let response = match &self.segments[index] {
                    Segment::Button {
                        id,
                        press: PressState::Pressed,
                        ..
                    } => RowResponse::Action(SegmentAction::Activated(*id)),
                    _ => RowResponse::Handled,
                };
                self.set_press(index, PressState::Idle);
                response
            }
            _ => RowResponse::Ignored,
        }
    }
}
