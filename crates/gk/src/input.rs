//! Terminal events to UI events, and their routing through the view stack
//!
//! [`EventNormalizer`] turns crossterm events into [`UiEvent`]s: key presses,
//! resizes, and mouse events with double clicks recognized. [`InputRouter`]
//! then delivers them: keys to the focused view, mouse events to the view
//! under the pointer, to an in-progress drag, or to the element holding a
//! press capture.

use crate::app::{AppCommand, AppContext};
use crate::compositor::Compositor;
use crate::geometry::Rect;
use crate::view::{DisplayMode, MouseOutcome};
use crossterm::event::{
    Event, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseKind {
    LeftClick,
    DoubleClick,
    LeftRelease,
    RightClick,
    RightRelease,
    /// Pointer moved with the left button held
    LeftMove,
    RightMove,
    /// Pointer moved with no button held
    Move,
    WheelUp,
    WheelDown,
    /// Left button held over the captured element
    PressHold,
    /// Left button held away from the captured element
    PressLeave,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseInput {
    pub kind: MouseKind,
    pub x: i32,
    pub y: i32,
    pub modifiers: KeyModifiers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Key(KeyEvent),
    Mouse(MouseInput),
    Resize(u16, u16),
}

#[derive(Debug, Clone, Copy)]
struct Click {
    at: Instant,
    x: i32,
    y: i32,
}

/// Translates raw terminal events, tracking clicks to detect double clicks
#[derive(Debug)]
pub struct EventNormalizer {
    double_click: Duration,
    last_click: Option<Click>,
}

impl EventNormalizer {
    pub fn new(double_click: Duration) -> Self {
        Self {
            double_click,
            last_click: None,
        }
    }

    /// `None` for events the UI does not act on
    pub fn translate(&mut self, event: &Event, now: Instant) -> Option<UiEvent> {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(UiEvent::Key(*key)),
            Event::Key(key) => {
                tracing::debug!(?key, "ignoring key event");
                None
            }
            Event::Mouse(mouse) => self.mouse(mouse, now).map(UiEvent::Mouse),
            Event::Resize(width, height) => Some(UiEvent::Resize(*width, *height)),
            other => {
                tracing::debug!(event = ?other, "ignoring terminal event");
                None
            }
        }
    }

    pub fn mouse(&mut self, event: &MouseEvent, now: Instant) -> Option<MouseInput> {
        let x = i32::from(event.column);
        let y = i32::from(event.row);
        let kind = match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.click(x, y, now),
            MouseEventKind::Up(MouseButton::Left) => MouseKind::LeftRelease,
            MouseEventKind::Down(MouseButton::Right) => MouseKind::RightClick,
            MouseEventKind::Up(MouseButton::Right) => MouseKind::RightRelease,
            MouseEventKind::Drag(MouseButton::Left) => MouseKind::LeftMove,
            MouseEventKind::Drag(MouseButton::Right) => MouseKind::RightMove,
            MouseEventKind::Moved => MouseKind::Move,
            MouseEventKind::ScrollUp => MouseKind::WheelUp,
            MouseEventKind::ScrollDown => MouseKind::WheelDown,
            other => {
                tracing::debug!(kind = ?other, "ignoring mouse event");
                return None;
            }
        };
        Some(MouseInput {
            kind,
            x,
            y,
            modifiers: event.modifiers,
        })
    }

    fn click(&mut self, x: i32, y: i32, now: Instant) -> MouseKind {
        let double = self.last_click.is_some_and(|last| {
            last.x == x && last.y == y && now.saturating_duration_since(last.at) < self.double_click
        });
        if double {
            // A third click starts a new pair
            self.last_click = None;
            MouseKind::DoubleClick
        } else {
            self.last_click = Some(Click { at: now, x, y });
            MouseKind::LeftClick
        }
    }
}

#[derive(Debug, Clone)]
struct Capture {
    view: String,
    area: Rect,
}

/// Delivers UI events to views, holding drag and press-capture state
/// between events
#[derive(Debug, Default)]
pub struct InputRouter {
    capture: Option<Capture>,
    drag: Option<String>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn has_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Give `key` to the focused view. Returns false when no view consumed
    /// it.
    pub fn route_key(
        &mut self,
        key: &KeyEvent,
        compositor: &mut Compositor,
        ctx: &mut AppContext,
    ) -> bool {
        match compositor.top_mut() {
            Some(view) => view.handle_key(key, ctx),
            None => false,
        }
    }

    pub fn route_mouse(
        &mut self,
        input: &MouseInput,
        compositor: &mut Compositor,
        ctx: &mut AppContext,
    ) {
        if self.route_drag(input, compositor) || self.route_capture(input, compositor, ctx) {
            return;
        }

        let Some(index) = compositor.hit_test(input.x, input.y) else {
            return;
        };
        let Some(view) = compositor.get_mut(index) else {
            return;
        };
        let frame = view.frame();
        let id = frame.id().to_string();

        if frame.mode() == DisplayMode::Popup && !frame.rect().contains(input.x, input.y) {
            if matches!(
                input.kind,
                MouseKind::LeftClick | MouseKind::DoubleClick | MouseKind::RightClick
            ) {
                tracing::debug!(view = %id, "click outside popup");
                ctx.commands.push(AppCommand::Close(id));
            }
            return;
        }

        let is_click = matches!(
            input.kind,
            MouseKind::LeftClick | MouseKind::DoubleClick | MouseKind::RightClick
        );
        if is_click && compositor.top_index() != Some(index) {
            compositor.raise(&id);
        }
        let Some(view) = compositor.find_mut(&id) else {
            return;
        };

        if input.kind == MouseKind::LeftClick && view.frame_mut().begin_drag(input.x, input.y) {
            self.drag = Some(id);
            return;
        }

        if let MouseOutcome::Capture(area) = view.handle_mouse(input, ctx) {
            tracing::trace!(view = %id, ?area, "press captured");
            self.capture = Some(Capture { view: id, area });
        }
    }

    /// Moves and the release while a view is being dragged
    fn route_drag(&mut self, input: &MouseInput, compositor: &mut Compositor) -> bool {
        let Some(id) = &self.drag else {
            return false;
        };
        let screen = compositor.screen();
        let Some(view) = compositor.find_mut(id) else {
            self.drag = None;
            return false;
        };
        match input.kind {
            MouseKind::LeftMove => view.frame_mut().drag_to(input.x, input.y, screen),
            MouseKind::LeftRelease => {
                view.frame_mut().end_drag();
                self.drag = None;
            }
            _ => {}
        }
        true
    }

    /// Moves and the release while an element holds the press
    fn route_capture(
        &mut self,
        input: &MouseInput,
        compositor: &mut Compositor,
        ctx: &mut AppContext,
    ) -> bool {
        let Some(capture) = &self.capture else {
            return false;
        };
        let kind = match input.kind {
            MouseKind::LeftMove if capture.area.contains(input.x, input.y) => MouseKind::PressHold,
            MouseKind::LeftMove => MouseKind::PressLeave,
            MouseKind::LeftRelease => MouseKind::LeftRelease,
            _ => return false,
        };
        let id = capture.view.clone();
        if kind == MouseKind::LeftRelease {
            self.capture = None;
        }
        let Some(view) = compositor.find_mut(&id) else {
            self.capture = None;
            return false;
        };
        let rewritten = MouseInput { kind, ..*input };
        view.handle_mouse(&rewritten, ctx);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Theme};
    use crate::surface::Surface;
    use crate::view::{View, ViewFrame};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn down(x: u16, y: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: x,
            row: y,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn kinds(normalizer: &mut EventNormalizer, clicks: &[(u16, u16, u64)]) -> Vec<MouseKind> {
        let start = Instant::now();
        clicks
            .iter()
            .filter_map(|&(x, y, ms)| {
                normalizer.mouse(&down(x, y), start + Duration::from_millis(ms))
            })
            .map(|input| input.kind)
            .collect()
    }

    #[test]
    fn test_double_click_needs_same_cell_within_window() {
        let mut normalizer = EventNormalizer::new(Duration::from_millis(300));
        assert_eq!(
            kinds(&mut normalizer, &[(3, 4, 0), (3, 4, 120)]),
            vec![MouseKind::LeftClick, MouseKind::DoubleClick]
        );

        let mut normalizer = EventNormalizer::new(Duration::from_millis(300));
        assert_eq!(
            kinds(&mut normalizer, &[(3, 4, 0), (3, 4, 300)]),
            vec![MouseKind::LeftClick, MouseKind::LeftClick]
        );

        let mut normalizer = EventNormalizer::new(Duration::from_millis(300));
        assert_eq!(
            kinds(&mut normalizer, &[(3, 4, 0), (4, 4, 50)]),
            vec![MouseKind::LeftClick, MouseKind::LeftClick]
        );
    }

    #[test]
    fn test_third_click_starts_a_new_pair() {
        let mut normalizer = EventNormalizer::new(Duration::from_millis(300));
        assert_eq!(
            kinds(&mut normalizer, &[(1, 1, 0), (1, 1, 50), (1, 1, 100)]),
            vec![
                MouseKind::LeftClick,
                MouseKind::DoubleClick,
                MouseKind::LeftClick
            ]
        );
    }

    #[test]
    fn test_unhandled_events_are_dropped() {
        let mut normalizer = EventNormalizer::new(Duration::from_millis(300));
        let middle = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Middle),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        };
        assert!(normalizer.mouse(&middle, Instant::now()).is_none());
        assert!(normalizer
            .translate(&Event::FocusGained, Instant::now())
            .is_none());

        let mut release = KeyEvent::new(crossterm::event::KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(normalizer
            .translate(&Event::Key(release), Instant::now())
            .is_none());
        assert_eq!(
            normalizer.translate(&Event::Resize(80, 24), Instant::now()),
            Some(UiEvent::Resize(80, 24))
        );
    }

    /// Records the mouse kinds it receives; a click on column 5 is a press
    /// capture of a three-column element
    struct Recorder {
        frame: ViewFrame,
        seen: Rc<RefCell<Vec<MouseKind>>>,
    }

    impl Recorder {
        fn boxed(
            id: &'static str,
            mode: DisplayMode,
            rect: Rect,
        ) -> (Box<dyn View>, Rc<RefCell<Vec<MouseKind>>>) {
            let seen = Rc::new(RefCell::new(Vec::new()));
            let view = Recorder {
                frame: ViewFrame::new(id, mode, rect),
                seen: Rc::clone(&seen),
            };
            (Box::new(view), seen)
        }
    }

    impl View for Recorder {
        fn frame(&self) -> &ViewFrame {
            &self.frame
        }

        fn frame_mut(&mut self) -> &mut ViewFrame {
            &mut self.frame
        }

        fn draw(&mut self, _surface: &mut Surface, _theme: &Theme) {}

        fn handle_key(&mut self, _key: &KeyEvent, _ctx: &mut AppContext) -> bool {
            true
        }

        fn handle_mouse(&mut self, input: &MouseInput, _ctx: &mut AppContext) -> MouseOutcome {
            self.seen.borrow_mut().push(input.kind);
            if input.kind == MouseKind::LeftClick && input.x == 5 {
                return MouseOutcome::Capture(Rect::new(5, input.y, 3, 1));
            }
            MouseOutcome::Handled
        }
    }

    fn context() -> AppContext {
        AppContext::new(Config::default(), PathBuf::from(".")).unwrap()
    }

    fn mouse(kind: MouseKind, x: i32, y: i32) -> MouseInput {
        MouseInput {
            kind,
            x,
            y,
            modifiers: KeyModifiers::NONE,
        }
    }

    const SCREEN: Rect = Rect::new(0, 0, 40, 12);

    #[test]
    fn test_capture_rewrites_moves_until_release() {
        let mut ctx = context();
        let mut compositor = Compositor::new(SCREEN);
        let (view, seen) = Recorder::boxed("log", DisplayMode::Fullscreen, SCREEN);
        compositor.show(view);
        let mut router = InputRouter::new();

        router.route_mouse(&mouse(MouseKind::LeftClick, 5, 2), &mut compositor, &mut ctx);
        assert!(router.has_capture());
        router.route_mouse(&mouse(MouseKind::LeftMove, 6, 2), &mut compositor, &mut ctx);
        router.route_mouse(&mouse(MouseKind::LeftMove, 20, 7), &mut compositor, &mut ctx);
        router.route_mouse(&mouse(MouseKind::LeftMove, 7, 2), &mut compositor, &mut ctx);
        router.route_mouse(&mouse(MouseKind::LeftRelease, 7, 2), &mut compositor, &mut ctx);
        assert!(!router.has_capture());

        assert_eq!(
            *seen.borrow(),
            vec![
                MouseKind::LeftClick,
                MouseKind::PressHold,
                MouseKind::PressLeave,
                MouseKind::PressHold,
                MouseKind::LeftRelease,
            ]
        );
    }

    #[test]
    fn test_click_outside_popup_queues_close() {
        let mut ctx = context();
        let mut compositor = Compositor::new(SCREEN);
        let (log, log_seen) = Recorder::boxed("log", DisplayMode::Fullscreen, SCREEN);
        let (menu, _) = Recorder::boxed("menu", DisplayMode::Popup, Rect::new(0, 0, 10, 4));
        compositor.show(log);
        compositor.show(menu);
        let mut router = InputRouter::new();

        router.route_mouse(&mouse(MouseKind::LeftClick, 1, 1), &mut compositor, &mut ctx);
        assert!(log_seen.borrow().is_empty());
        assert_eq!(ctx.commands, vec![AppCommand::Close("menu".to_string())]);
    }

    #[test]
    fn test_click_raises_window_beneath() {
        let mut ctx = context();
        let mut compositor = Compositor::new(SCREEN);
        let (a, a_seen) = Recorder::boxed("a", DisplayMode::Window, Rect::new(0, 0, 20, 8));
        let (b, _) = Recorder::boxed("b", DisplayMode::Window, Rect::new(10, 2, 20, 8));
        compositor.show(a);
        compositor.show(b);
        let mut router = InputRouter::new();

        router.route_mouse(&mouse(MouseKind::LeftClick, 3, 3), &mut compositor, &mut ctx);
        assert_eq!(compositor.ids(), vec!["b", "a"]);
        assert_eq!(*a_seen.borrow(), vec![MouseKind::LeftClick]);
    }

    #[test]
    fn test_raising_click_redraws_old_and_new_top() {
        let mut ctx = context();
        let mut compositor = Compositor::new(SCREEN);
        let (a, _) = Recorder::boxed("a", DisplayMode::Window, Rect::new(0, 0, 20, 8));
        let (b, _) = Recorder::boxed("b", DisplayMode::Window, Rect::new(10, 2, 20, 8));
        compositor.show(a);
        compositor.show(b);
        compositor.render(&Theme::default());
        assert!(!compositor.find("a").unwrap().frame().is_dirty());
        assert!(!compositor.find("b").unwrap().frame().is_dirty());

        let mut router = InputRouter::new();
        router.route_mouse(&mouse(MouseKind::LeftClick, 3, 3), &mut compositor, &mut ctx);

        let a = compositor.find("a").unwrap().frame();
        let b = compositor.find("b").unwrap().frame();
        assert!(a.is_focused() && a.is_dirty());
        assert!(!b.is_focused() && b.is_dirty());
    }

    #[test]
    fn test_border_press_drags_window() {
        let mut ctx = context();
        let mut compositor = Compositor::new(SCREEN);
        let (view, seen) = Recorder::boxed("diff", DisplayMode::Window, Rect::new(5, 2, 20, 6));
        compositor.show(view);
        let mut router = InputRouter::new();

        router.route_mouse(&mouse(MouseKind::LeftClick, 10, 2), &mut compositor, &mut ctx);
        assert!(router.is_dragging());
        router.route_mouse(&mouse(MouseKind::LeftMove, 12, 4), &mut compositor, &mut ctx);
        router.route_mouse(&mouse(MouseKind::LeftRelease, 12, 4), &mut compositor, &mut ctx);
        assert!(!router.is_dragging());
        assert!(seen.borrow().is_empty());
        assert_eq!(
            compositor.find("diff").unwrap().frame().rect(),
            Rect::new(7, 4, 20, 6)
        );
    }
}
