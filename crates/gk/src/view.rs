//! Panels: the `View` trait and the frame every panel carries

use crate::app::AppContext;
use crate::config::{Theme, Tone};
use crate::geometry::Rect;
use crate::input::MouseInput;
use crate::search::SearchQuery;
use crate::surface::Surface;
use bitflags::bitflags;
use crossterm::event::KeyEvent;
use ratatui::style::Modifier;
use unicode_width::UnicodeWidthStr;

/// Smallest size a window can be resized to
pub const MIN_SIZE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Covers the whole view area and occludes everything beneath
    Fullscreen,
    /// Floating, movable and resizable
    Window,
    /// Modal, centred; a click outside dismisses it
    Popup,
}

bitflags! {
    /// Edges grabbed by a resize drag
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Edges: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const TOP = 1 << 2;
        const BOTTOM = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    Move,
    Resize(Edges),
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    mode: DragMode,
    start_x: i32,
    start_y: i32,
    origin: Rect,
}

/// Geometry, decoration and redraw bookkeeping shared by all panels
#[derive(Debug, Clone)]
pub struct ViewFrame {
    id: String,
    mode: DisplayMode,
    rect: Rect,
    /// Last window geometry, restored when leaving fullscreen
    window_rect: Rect,
    dirty: bool,
    resized: bool,
    focused: bool,
    title: Option<String>,
    footer: Option<String>,
    drag: Option<DragState>,
}

impl ViewFrame {
    pub fn new(id: impl Into<String>, mode: DisplayMode, rect: Rect) -> Self {
        Self {
            id: id.into(),
            mode,
            rect,
            window_rect: rect,
            dirty: true,
            resized: false,
            focused: false,
            title: None,
            footer: None,
            drag: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
        self.resized = false;
    }

    /// Moved or resized since it was last drawn
    pub fn was_resized(&self) -> bool {
        self.resized
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        if self.focused != focused {
            self.focused = focused;
            self.dirty = true;
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = Some(title.into());
        if self.title != title {
            self.title = title;
            self.dirty = true;
        }
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    pub fn set_footer(&mut self, footer: Option<String>) {
        if self.footer != footer {
            self.footer = footer;
            self.dirty = true;
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        if self.rect != rect {
            self.rect = rect;
            self.resized = true;
            self.dirty = true;
        }
        if self.mode == DisplayMode::Window {
            self.window_rect = rect;
        }
    }

    /// Fit the frame to `screen` for its mode: fullscreen takes it all,
    /// windows are kept on screen, popups are centred.
    pub fn layout(&mut self, screen: Rect) {
        let rect = match self.mode {
            DisplayMode::Fullscreen => screen,
            DisplayMode::Window => self.rect.clamp_within(screen),
            DisplayMode::Popup => screen.centered(self.rect.width, self.rect.height),
        };
        self.set_rect(rect);
    }

    pub fn set_mode(&mut self, mode: DisplayMode, screen: Rect) {
        if self.mode == mode {
            return;
        }
        if mode == DisplayMode::Window {
            self.rect = self.window_rect;
        }
        self.mode = mode;
        self.resized = true;
        self.dirty = true;
        self.layout(screen);
    }

    /// Where the panel's content goes, inside the decoration
    pub fn content_rect(&self) -> Rect {
        match self.mode {
            DisplayMode::Fullscreen => {
                let top = i32::from(self.title.is_some());
                let bottom = i32::from(self.footer.is_some());
                Rect::new(
                    self.rect.x,
                    self.rect.y + top,
                    self.rect.width,
                    (self.rect.height - top - bottom).max(0),
                )
            }
            DisplayMode::Window | DisplayMode::Popup => self.rect.inner(),
        }
    }

    /// Border, title and footer
    pub fn draw_chrome(&self, surface: &mut Surface, theme: &Theme) {
        let rect = self.rect;
        match self.mode {
            DisplayMode::Fullscreen => {
                if let Some(title) = &self.title {
                    let bar = Rect::new(rect.x, rect.y, rect.width, 1);
                    let style = theme.style(Tone::Primary).add_modifier(Modifier::BOLD);
                    surface.fill(bar, style);
                    surface.put_str(rect.x + 1, rect.y, title, style);
                }
                if let Some(footer) = &self.footer {
                    let y = rect.end_y() - 1;
                    surface.fill(Rect::new(rect.x, y, rect.width, 1), theme.style(Tone::Muted));
                    let x = rect.end_x() - footer.width() as i32 - 1;
                    surface.put_str(x.max(rect.x), y, footer, theme.style(Tone::Muted));
                }
            }
            DisplayMode::Window | DisplayMode::Popup => {
                let border = theme.border_style(self.focused);
                surface.draw_box(rect, border, self.title.as_deref());
                if let Some(footer) = &self.footer {
                    let label = format!(" {footer} ");
                    let mut edge = surface.clipped(Rect::new(
                        rect.x + 1,
                        rect.end_y() - 1,
                        rect.width - 2,
                        1,
                    ));
                    let x = rect.end_x() - 2 - label.width() as i32;
                    edge.put_str(x, rect.end_y() - 1, &label, border);
                }
            }
        }
    }

    /// Drag that a press at (x, y) would start: the title band moves, other
    /// border cells resize from the edges they lie on
    pub fn drag_mode_at(&self, x: i32, y: i32) -> Option<DragMode> {
        if self.mode == DisplayMode::Fullscreen || !self.rect.contains(x, y) {
            return None;
        }
        let rect = self.rect;
        let mut edges = Edges::empty();
        if x == rect.x {
            edges |= Edges::LEFT;
        }
        if x == rect.end_x() - 1 {
            edges |= Edges::RIGHT;
        }
        if y == rect.y {
            edges |= Edges::TOP;
        }
        if y == rect.end_y() - 1 {
            edges |= Edges::BOTTOM;
        }

        if edges.is_empty() {
            return None;
        }
        // Popups can be moved but not resized
        if self.mode == DisplayMode::Popup {
            return edges.contains(Edges::TOP).then_some(DragMode::Move);
        }
        if edges == Edges::TOP {
            return Some(DragMode::Move);
        }
        Some(DragMode::Resize(edges))
    }

    /// Start a drag if (x, y) is on the border band
    pub fn begin_drag(&mut self, x: i32, y: i32) -> bool {
        let Some(mode) = self.drag_mode_at(x, y) else {
            return false;
        };
        tracing::trace!(view = %self.id, ?mode, "drag started");
        self.drag = Some(DragState {
            mode,
            start_x: x,
            start_y: y,
            origin: self.rect,
        });
        true
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Apply the pointer displacement since `begin_drag`
    pub fn drag_to(&mut self, x: i32, y: i32, screen: Rect) {
        let Some(drag) = self.drag else {
            return;
        };
        let dx = x - drag.start_x;
        let dy = y - drag.start_y;
        let origin = drag.origin;

        let rect = match drag.mode {
            DragMode::Move => {
                Rect::new(origin.x + dx, origin.y + dy, origin.width, origin.height)
                    .clamp_within(screen)
            }
            DragMode::Resize(edges) => {
                let (x, width) = resize_axis(
                    origin.x,
                    origin.width,
                    dx,
                    edges.contains(Edges::LEFT),
                    edges.contains(Edges::RIGHT),
                    screen.x,
                    screen.end_x(),
                );
                let (y, height) = resize_axis(
                    origin.y,
                    origin.height,
                    dy,
                    edges.contains(Edges::TOP),
                    edges.contains(Edges::BOTTOM),
                    screen.y,
                    screen.end_y(),
                );
                Rect::new(x, y, width, height)
            }
        };
        self.set_rect(rect);
    }

    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            tracing::trace!(view = %self.id, rect = ?self.rect, "drag ended");
        }
    }
}

/// Resize one axis from the displacement of its grabbed edge, keeping the
/// minimum size and the screen bounds
fn resize_axis(
    start: i32,
    size: i32,
    delta: i32,
    near: bool,
    far: bool,
    lo: i32,
    hi: i32,
) -> (i32, i32) {
    let end = start + size;
    if near {
        let new_start = (start + delta).max(lo).min(end - MIN_SIZE);
        return (new_start, end - new_start);
    }
    if far {
        let new_end = (end + delta).min(hi).max(start + MIN_SIZE);
        return (start, new_end - start);
    }
    (start, size)
}

/// What a panel did with a mouse event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseOutcome {
    Ignored,
    Handled,
    /// An element inside the panel was pressed; the router sends moves and
    /// the release here until the button is let go
    Capture(Rect),
}

/// A panel in the compositor's stack
pub trait View {
    fn frame(&self) -> &ViewFrame;

    fn frame_mut(&mut self) -> &mut ViewFrame;

    /// Paint the whole rect of the frame
    fn draw(&mut self, surface: &mut Surface, theme: &Theme);

    /// Returns true when the key was consumed
    fn handle_key(&mut self, key: &KeyEvent, ctx: &mut AppContext) -> bool;

    fn handle_mouse(&mut self, _input: &MouseInput, _ctx: &mut AppContext) -> MouseOutcome {
        MouseOutcome::Ignored
    }

    /// Drain the panel's jobs into its state; called once per main-loop pass
    fn poll_jobs(&mut self, _ctx: &mut AppContext) {}

    fn apply_search(&mut self, _query: Option<SearchQuery>) {}

    fn current_search(&self) -> Option<&SearchQuery> {
        None
    }

    fn reload(&mut self, _ctx: &mut AppContext) {}

    /// The panel was removed from the stack
    fn on_close(&mut self, _ctx: &mut AppContext) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: Rect = Rect::new(0, 0, 80, 24);

    fn window() -> ViewFrame {
        ViewFrame::new("w", DisplayMode::Window, Rect::new(10, 5, 30, 10))
    }

    #[test]
    fn test_drag_modes_by_band() {
        let frame = window();
        assert_eq!(frame.drag_mode_at(20, 5), Some(DragMode::Move));
        assert_eq!(
            frame.drag_mode_at(10, 8),
            Some(DragMode::Resize(Edges::LEFT))
        );
        assert_eq!(
            frame.drag_mode_at(39, 14),
            Some(DragMode::Resize(Edges::RIGHT | Edges::BOTTOM))
        );
        assert_eq!(frame.drag_mode_at(20, 8), None);
        assert_eq!(frame.drag_mode_at(0, 0), None);

        let full = ViewFrame::new("f", DisplayMode::Fullscreen, SCREEN);
        assert_eq!(full.drag_mode_at(0, 0), None);
    }

    #[test]
    fn test_move_is_clamped_on_screen() {
        let mut frame = window();
        assert!(frame.begin_drag(20, 5));
        frame.drag_to(80, 30, SCREEN);
        assert_eq!(frame.rect(), Rect::new(50, 14, 30, 10));
        frame.drag_to(-50, -50, SCREEN);
        assert_eq!(frame.rect(), Rect::new(0, 0, 30, 10));
        frame.end_drag();
        assert!(!frame.is_dragging());
        assert!(frame.was_resized());
    }

    #[test]
    fn test_resize_keeps_minimum() {
        let mut frame = window();
        assert!(frame.begin_drag(39, 14));
        frame.drag_to(0, 0, SCREEN);
        assert_eq!(frame.rect(), Rect::new(10, 5, MIN_SIZE, MIN_SIZE));

        frame.end_drag();
        let mut frame = window();
        assert!(frame.begin_drag(10, 8));
        frame.drag_to(-20, 8, SCREEN);
        assert_eq!(frame.rect(), Rect::new(0, 5, 40, 10));
        frame.drag_to(60, 8, SCREEN);
        assert_eq!(frame.rect(), Rect::new(35, 5, MIN_SIZE, 10));
    }

    #[test]
    fn test_fullscreen_toggle_restores_window() {
        let mut frame = window();
        frame.set_mode(DisplayMode::Fullscreen, SCREEN);
        assert_eq!(frame.rect(), SCREEN);
        frame.set_mode(DisplayMode::Window, SCREEN);
        assert_eq!(frame.rect(), Rect::new(10, 5, 30, 10));
    }

    #[test]
    fn test_popup_layout_recenters() {
        let mut frame = ViewFrame::new("p", DisplayMode::Popup, Rect::new(0, 0, 20, 6));
        frame.layout(SCREEN);
        assert_eq!(frame.rect(), Rect::new(30, 9, 20, 6));
        assert_eq!(frame.drag_mode_at(30, 9), Some(DragMode::Move));
        assert_eq!(frame.drag_mode_at(30, 12), None);
    }
}
