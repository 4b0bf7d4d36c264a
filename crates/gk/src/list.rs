//! Virtualized list of rows with selection, scrolling and search
//!
//! Only the rows inside the viewport are drawn. Selection always lands on a
//! selectable row; the viewport follows it according to a [`ScrollAlign`]
//! policy, re-scrolling only when the selection would leave the window.

use crate::config::Theme;
use crate::geometry::Rect;
use crate::input::{MouseInput, MouseKind};
use crate::item::{Row, RowResponse, RowState};
use crate::search::SearchQuery;
use crate::surface::Surface;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::Style;
use serde::Deserialize;

const WHEEL_STEP: usize = 3;
const HSCROLL_STEP: usize = 8;

/// Where the selection is placed when the list has to scroll to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    #[default]
    Center,
    Top,
    Bottom,
}

/// Preferred probing direction when the target row is not selectable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// What a mouse event did to the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListMouse {
    Ignored,
    Scrolled,
    Selected(usize),
    /// Double-click on a row
    Activated(usize),
    /// Right-click on a row (it is selected first)
    Context(usize),
    /// A row element took the press; screen rect of the element
    Capture(Rect),
    Row(usize, RowResponse),
}

pub struct ListView<R> {
    rows: Vec<R>,
    selected: Option<usize>,
    offset_y: usize,
    offset_x: usize,
    width: usize,
    height: usize,
    align: ScrollAlign,
    search: Option<SearchQuery>,
    /// Row holding a pressed element
    pressed: Option<usize>,
}

impl<R: Row> ListView<R> {
    pub fn new(align: ScrollAlign) -> Self {
        Self {
            rows: Vec::new(),
            selected: None,
            offset_y: 0,
            offset_x: 0,
            width: 0,
            height: 1,
            align,
            search: None,
            pressed: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&R> {
        self.rows.get(index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut R> {
        self.rows.get_mut(index)
    }

    pub fn push(&mut self, row: R) {
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
        self.selected = None;
        self.offset_y = 0;
        self.offset_x = 0;
        self.pressed = None;
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&R> {
        self.selected.and_then(|i| self.rows.get(i))
    }

    pub fn offset_y(&self) -> usize {
        self.offset_y
    }

    pub fn offset_x(&self) -> usize {
        self.offset_x
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_viewport(&mut self, width: usize, height: usize) {
        let selection_visible = self.selected.is_some_and(|i| self.is_in_view(i));
        self.width = width;
        self.height = height.max(1);
        self.offset_y = self.offset_y.min(self.max_offset_y());
        if selection_visible {
            if let Some(index) = self.selected {
                self.scroll_to(index);
            }
        }
        self.clamp_offset_x();
    }

    fn is_in_view(&self, index: usize) -> bool {
        index >= self.offset_y && index < self.offset_y + self.height
    }

    fn max_offset_y(&self) -> usize {
        self.rows.len().saturating_sub(self.height)
    }

    /// Select the first selectable row if nothing is selected
    pub fn ensure_selection(&mut self) -> bool {
        if self.selected.is_some() {
            return false;
        }
        match self.rows.iter().position(|r| r.selectable()) {
            Some(index) => {
                self.selected = Some(index);
                self.scroll_to(index);
                true
            }
            None => false,
        }
    }

    /// Select row `target`, or the nearest selectable row found by probing
    /// outward, alternating sides and trying `direction` first. Returns false
    /// (selection unchanged) when no row is selectable.
    pub fn set_selected(&mut self, target: usize, direction: Direction) -> bool {
        let len = self.rows.len();
        if len == 0 {
            return false;
        }
        let target = target.min(len - 1);
        for distance in 0..len {
            let ahead = match direction {
                Direction::Forward => target.checked_add(distance),
                Direction::Backward => target.checked_sub(distance),
            };
            let behind = match direction {
                Direction::Forward => target.checked_sub(distance),
                Direction::Backward => target.checked_add(distance),
            };
            for candidate in [ahead, behind].into_iter().flatten() {
                if candidate < len && self.rows[candidate].selectable() {
                    self.selected = Some(candidate);
                    self.scroll_to(candidate);
                    return true;
                }
            }
        }
        false
    }

    /// Scroll so `index` is visible, using the alignment policy only when it
    /// is currently outside the window
    pub fn scroll_to(&mut self, index: usize) {
        if self.is_in_view(index) {
            return;
        }
        let height = self.height;
        let offset = match self.align {
            ScrollAlign::Center => index.saturating_sub(height / 2),
            ScrollAlign::Top => index,
            ScrollAlign::Bottom => (index + 1).saturating_sub(height),
        };
        self.offset_y = offset.min(self.max_offset_y());
    }

    /// Move the selection by `delta` rows
    pub fn move_selection(&mut self, delta: isize) -> bool {
        if self.rows.is_empty() {
            return false;
        }
        let Some(current) = self.selected else {
            return self.ensure_selection();
        };
        let target = current.saturating_add_signed(delta).min(self.rows.len() - 1);
        let direction = if delta < 0 {
            Direction::Backward
        } else {
            Direction::Forward
        };
        self.set_selected(target, direction) && self.selected != Some(current)
    }

    pub fn select_first(&mut self) -> bool {
        self.set_selected(0, Direction::Forward)
    }

    pub fn select_last(&mut self) -> bool {
        self.set_selected(self.rows.len().saturating_sub(1), Direction::Backward)
    }

    pub fn page(&self) -> isize {
        self.height.saturating_sub(1).max(1) as isize
    }

    pub fn scroll_by(&mut self, delta: isize) {
        self.offset_y = self
            .offset_y
            .saturating_add_signed(delta)
            .min(self.max_offset_y());
    }

    fn max_offset_x(&self) -> usize {
        let end = (self.offset_y + self.height).min(self.rows.len());
        let longest = self.rows[self.offset_y.min(end)..end]
            .iter()
            .map(Row::width)
            .max()
            .unwrap_or(0);
        longest.saturating_sub(self.width)
    }

    fn clamp_offset_x(&mut self) {
        self.offset_x = self.offset_x.min(self.max_offset_x());
    }

    pub fn scroll_x(&mut self, delta: isize) {
        self.offset_x = self.offset_x.saturating_add_signed(delta);
        self.clamp_offset_x();
    }

    pub fn search(&self) -> Option<&SearchQuery> {
        self.search.as_ref()
    }

    pub fn set_search(&mut self, query: Option<SearchQuery>) {
        self.search = query;
    }

    fn row_matches(&self, index: usize) -> bool {
        self.search
            .as_ref()
            .is_some_and(|query| query.is_match(&self.rows[index].text()))
    }

    /// Select the next matching row after the selection, wrapping once
    pub fn search_next(&mut self) -> bool {
        self.search_step(Direction::Forward)
    }

    pub fn search_prev(&mut self) -> bool {
        self.search_step(Direction::Backward)
    }

    fn search_step(&mut self, direction: Direction) -> bool {
        let len = self.rows.len();
        if len == 0 || self.search.is_none() {
            return false;
        }
        let start = self.selected.unwrap_or(match direction {
            Direction::Forward => len - 1,
            Direction::Backward => 0,
        });
        for step in 1..=len {
            let index = match direction {
                Direction::Forward => (start + step) % len,
                Direction::Backward => (start + len - step) % len,
            };
            if self.rows[index].selectable() && self.row_matches(index) {
                self.selected = Some(index);
                self.scroll_to(index);
                return true;
            }
        }
        false
    }

    /// Row shown on viewport line `line`
    pub fn row_at(&self, line: usize) -> Option<usize> {
        if line >= self.height {
            return None;
        }
        let index = self.offset_y + line;
        (index < self.rows.len()).then_some(index)
    }

    /// Navigation keys shared by every list. Returns true when consumed.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('d') => {
                    self.move_selection(self.page() / 2);
                    true
                }
                KeyCode::Char('u') => {
                    self.move_selection(-(self.page() / 2));
                    true
                }
                _ => false,
            };
        }
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.move_selection(1);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.move_selection(-1);
            }
            KeyCode::PageDown | KeyCode::Char(' ') => {
                self.move_selection(self.page());
            }
            KeyCode::PageUp => {
                self.move_selection(-self.page());
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.select_first();
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.select_last();
            }
            KeyCode::Left | KeyCode::Char('h') => self.scroll_x(-(HSCROLL_STEP as isize)),
            KeyCode::Right | KeyCode::Char('l') => self.scroll_x(HSCROLL_STEP as isize),
            KeyCode::Char('0') => self.offset_x = 0,
            KeyCode::Char('$') => self.offset_x = self.max_offset_x(),
            _ => return false,
        }
        true
    }

    /// Dispatch a mouse event whose coordinates lie in `area`, the rect the
    /// list was last drawn into
    pub fn handle_mouse(&mut self, input: &MouseInput, area: Rect) -> ListMouse {
        match input.kind {
            MouseKind::WheelUp => {
                self.scroll_by(-(WHEEL_STEP as isize));
                return ListMouse::Scrolled;
            }
            MouseKind::WheelDown => {
                self.scroll_by(WHEEL_STEP as isize);
                return ListMouse::Scrolled;
            }
            MouseKind::PressHold | MouseKind::PressLeave | MouseKind::LeftRelease => {
                let Some(index) = self.pressed else {
                    return ListMouse::Ignored;
                };
                if input.kind == MouseKind::LeftRelease {
                    self.pressed = None;
                }
                let col = self.content_col(input.x, area);
                let width = self.layout_width();
                return match self.rows.get_mut(index) {
                    Some(row) => ListMouse::Row(index, row.handle_mouse(input, col, width)),
                    None => ListMouse::Ignored,
                };
            }
            MouseKind::LeftClick | MouseKind::DoubleClick | MouseKind::RightClick => {}
            _ => return ListMouse::Ignored,
        }

        let line = input.y - area.y;
        if line < 0 || !area.contains(input.x, input.y) {
            return ListMouse::Ignored;
        }
        let Some(index) = self.row_at(line as usize) else {
            return ListMouse::Ignored;
        };

        if input.kind != MouseKind::RightClick {
            let col = self.content_col(input.x, area);
            let width = self.layout_width();
            let response = self.rows[index].handle_mouse(input, col, width);
            match response {
                RowResponse::Ignored => {}
                RowResponse::Capture { start, width } => {
                    self.pressed = Some(index);
                    let x = area.x + start as i32 - self.offset_x as i32;
                    return ListMouse::Capture(Rect::new(x, input.y, width as i32, 1));
                }
                other => {
                    if self.rows[index].selectable() {
                        self.selected = Some(index);
                    }
                    return ListMouse::Row(index, other);
                }
            }
        }

        if !self.rows[index].selectable() {
            return ListMouse::Ignored;
        }
        self.selected = Some(index);
        match input.kind {
            MouseKind::DoubleClick => ListMouse::Activated(index),
            MouseKind::RightClick => ListMouse::Context(index),
            _ => ListMouse::Selected(index),
        }
    }

    fn content_col(&self, x: i32, area: Rect) -> usize {
        (x - area.x).max(0) as usize + self.offset_x
    }

    /// Width rows are laid out at: the viewport plus the columns scrolled
    /// off to the left, matching what `Row::draw` sees
    fn layout_width(&self) -> usize {
        self.width + self.offset_x
    }

    /// Draw the visible rows into `area`, blanking lines past the end
    pub fn draw(&mut self, surface: &mut Surface, area: Rect, theme: &Theme, focused: bool) {
        self.set_viewport(area.width.max(0) as usize, area.height.max(0) as usize);
        surface.fill(area, Style::default());
        if area.is_empty() {
            return;
        }

        let end = (self.offset_y + self.height).min(self.rows.len());
        for (line, index) in (self.offset_y..end).enumerate() {
            let y = area.y + line as i32;
            let state = RowState {
                selected: self.selected == Some(index),
                matched: self.row_matches(index),
                focused,
                theme,
            };
            let row_rect = Rect::new(area.x, y, area.width, 1);
            self.rows[index].draw(surface, area.x, y, self.offset_x, self.width, &state);
            if state.selected {
                surface.restyle(row_rect, theme.selection_style());
            } else if state.matched {
                surface.restyle(row_rect, theme.match_style());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tone;
    use crate::item::Item;
    use ratatui::buffer::Buffer;
    use ratatui::layout::Rect as TermRect;
    use std::borrow::Cow;
    use std::cell::Cell;

    fn make_list(rows: &[&str]) -> ListView<Item> {
        let mut list = ListView::new(ScrollAlign::Center);
        for row in rows {
            if *row == "-" {
                list.push(Item::Separator);
            } else {
                list.push(Item::plain(*row, Tone::Text));
            }
        }
        list
    }

    fn click(kind: MouseKind, x: i32, y: i32) -> MouseInput {
        MouseInput {
            kind,
            x,
            y,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_selection_skips_separator() {
        let mut list = make_list(&["a", "-", "c"]);
        assert!(list.set_selected(1, Direction::Forward));
        assert_eq!(list.selected(), Some(2));
        assert!(list.set_selected(1, Direction::Backward));
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn test_selection_searches_outward_alternately() {
        let mut list = make_list(&["a", "-", "-", "-", "e"]);
        // "a" and "e" are both two rows away; the requested direction wins
        assert!(list.set_selected(2, Direction::Forward));
        assert_eq!(list.selected(), Some(4));
        // target 1: backward "a" is one away, forward "e" three away
        assert!(list.set_selected(1, Direction::Forward));
        assert_eq!(list.selected(), Some(0));
    }

    #[test]
    fn test_selection_unchanged_when_nothing_selectable() {
        let mut list = make_list(&["-", "-"]);
        assert!(!list.set_selected(0, Direction::Forward));
        assert_eq!(list.selected(), None);

        let mut empty = make_list(&[]);
        assert!(!empty.set_selected(3, Direction::Forward));
    }

    #[test]
    fn test_scroll_policies() {
        let rows: Vec<String> = (0..100).map(|i| format!("row {i}")).collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

        let mut centered = make_list(&refs);
        centered.set_viewport(20, 10);
        centered.set_selected(50, Direction::Forward);
        assert_eq!(centered.offset_y(), 45);
        // Moving inside the window does not re-scroll
        centered.move_selection(2);
        assert_eq!(centered.offset_y(), 45);

        let mut top = make_list(&refs);
        top.align = ScrollAlign::Top;
        top.set_viewport(20, 10);
        top.set_selected(50, Direction::Forward);
        assert_eq!(top.offset_y(), 50);

        let mut bottom = make_list(&refs);
        bottom.align = ScrollAlign::Bottom;
        bottom.set_viewport(20, 10);
        bottom.set_selected(50, Direction::Forward);
        assert_eq!(bottom.offset_y(), 41);

        // Offsets never run past the end
        top.set_selected(99, Direction::Forward);
        assert_eq!(top.offset_y(), 90);
    }

    #[test]
    fn test_horizontal_offset_clamped_to_longest_visible_row() {
        let mut list = make_list(&["short", "a somewhat longer row"]);
        list.set_viewport(10, 5);
        list.scroll_x(100);
        assert_eq!(list.offset_x(), 21 - 10);
        list.scroll_x(-100);
        assert_eq!(list.offset_x(), 0);
    }

    #[test]
    fn test_search_wraps_once() {
        let mut list = make_list(&["fix a", "feat b", "fix c", "-"]);
        list.set_search(SearchQuery::new("fix", false, false));
        list.set_selected(2, Direction::Forward);
        assert!(list.search_next());
        assert_eq!(list.selected(), Some(0));
        assert!(list.search_prev());
        assert_eq!(list.selected(), Some(2));

        list.set_search(SearchQuery::new("nothing", false, false));
        assert!(!list.search_next());
        assert_eq!(list.selected(), Some(2));
    }

    #[test]
    fn test_mouse_selects_activates_and_scrolls() {
        let mut list = make_list(&["a", "-", "c", "d"]);
        let area = Rect::new(0, 0, 10, 4);
        list.set_viewport(10, 4);
        assert_eq!(
            list.handle_mouse(&click(MouseKind::LeftClick, 1, 2), area),
            ListMouse::Selected(2)
        );
        assert_eq!(
            list.handle_mouse(&click(MouseKind::LeftClick, 1, 1), area),
            ListMouse::Ignored
        );
        assert_eq!(list.selected(), Some(2));
        assert_eq!(
            list.handle_mouse(&click(MouseKind::DoubleClick, 1, 3), area),
            ListMouse::Activated(3)
        );
        assert_eq!(
            list.handle_mouse(&click(MouseKind::RightClick, 1, 0), area),
            ListMouse::Context(0)
        );
        assert_eq!(
            list.handle_mouse(&click(MouseKind::LeftClick, 1, 9), area),
            ListMouse::Ignored
        );
    }

    #[test]
    fn test_click_hits_button_pushed_right_by_filler_while_scrolled() {
        use crate::segment::{Segment, SegmentedRow};

        let mut list = ListView::new(ScrollAlign::Center);
        list.push(Item::Segmented(SegmentedRow::new(
            vec![
                Segment::text("ab", Tone::Text),
                Segment::Filler,
                Segment::button("ok", "OK"),
            ],
            " ",
        )));
        list.push(Item::plain("x".repeat(60), Tone::Text));
        list.set_viewport(20, 2);
        list.scroll_x(100);
        assert_eq!(list.offset_x(), 40);

        // drawn at layout width 60, the button spans content columns 54..60,
        // which is screen columns 14..20
        let area = Rect::new(0, 0, 20, 2);
        assert_eq!(
            list.handle_mouse(&click(MouseKind::LeftClick, 15, 0), area),
            ListMouse::Capture(Rect::new(14, 0, 6, 1))
        );
    }

    struct CountingRow<'a> {
        draws: &'a Cell<usize>,
    }

    impl Row for CountingRow<'_> {
        fn text(&self) -> Cow<'_, str> {
            Cow::Borrowed("row")
        }

        fn draw(
            &self,
            surface: &mut Surface,
            x: i32,
            y: i32,
            _offset_x: usize,
            _width: usize,
            _state: &RowState,
        ) {
            self.draws.set(self.draws.get() + 1);
            surface.put_str(x, y, "row", Style::default());
        }
    }

    #[test]
    fn test_only_visible_rows_are_drawn() {
        let draws = Cell::new(0);
        let mut list = ListView::new(ScrollAlign::Center);
        for _ in 0..1000 {
            list.push(CountingRow { draws: &draws });
        }
        let theme = Theme::default();
        let mut buf = Buffer::empty(TermRect::new(0, 0, 20, 5));
        let mut surface = Surface::new(&mut buf);
        list.draw(&mut surface, Rect::new(0, 0, 20, 5), &theme, true);
        assert_eq!(draws.get(), 5);
    }
}
