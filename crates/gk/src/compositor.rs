//! Stack of possibly overlapping panels
//!
//! The last view in the stack is topmost and has keyboard focus. Rendering
//! goes into a persistent canvas, so a frame only repaints the views that are
//! dirty, plus every higher view overlapping one that was repainted.

use crate::config::Theme;
use crate::geometry::{subtract_region, Rect};
use crate::surface::Surface;
use crate::view::{DisplayMode, View};
use ratatui::buffer::Buffer;

pub struct Compositor {
    views: Vec<Box<dyn View>>,
    screen: Rect,
    canvas: Buffer,
    /// Clear the canvas and repaint everything on the next render
    full_redraw: bool,
    /// Areas uncovered by hidden views
    damage: Vec<Rect>,
}

fn term_rect(rect: Rect) -> ratatui::layout::Rect {
    let clamp = |v: i32| u16::try_from(v.max(0)).unwrap_or(u16::MAX);
    ratatui::layout::Rect::new(
        clamp(rect.x),
        clamp(rect.y),
        clamp(rect.width),
        clamp(rect.height),
    )
}

impl Compositor {
    pub fn new(screen: Rect) -> Self {
        Self {
            views: Vec::new(),
            screen,
            canvas: Buffer::empty(term_rect(screen)),
            full_redraw: true,
            damage: Vec::new(),
        }
    }

    pub fn screen(&self) -> Rect {
        self.screen
    }

    pub fn canvas(&self) -> &Buffer {
        &self.canvas
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn ids(&self) -> Vec<String> {
        self.views.iter().map(|v| v.frame().id().to_string()).collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.views.iter().position(|v| v.frame().id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn find(&self, id: &str) -> Option<&dyn View> {
        self.views
            .iter()
            .find(|v| v.frame().id() == id)
            .map(|v| v.as_ref())
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Box<dyn View>> {
        self.views.iter_mut().find(|v| v.frame().id() == id)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Box<dyn View>> {
        self.views.get_mut(index)
    }

    pub fn top(&self) -> Option<&dyn View> {
        self.views.last().map(|v| v.as_ref())
    }

    pub fn top_mut(&mut self) -> Option<&mut Box<dyn View>> {
        self.views.last_mut()
    }

    pub fn top_index(&self) -> Option<usize> {
        self.views.len().checked_sub(1)
    }

    pub fn views_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn View>> {
        self.views.iter_mut()
    }

    fn refocus(&mut self) {
        let top = self.views.len().checked_sub(1);
        for (i, view) in self.views.iter_mut().enumerate() {
            view.frame_mut().set_focused(Some(i) == top);
        }
    }

    /// Put `view` on top. A view already shown under the same id is replaced.
    pub fn show(&mut self, mut view: Box<dyn View>) -> Option<Box<dyn View>> {
        let replaced = self.remove(view.frame().id());
        view.frame_mut().layout(self.screen);
        view.frame_mut().mark_dirty();
        tracing::debug!(view = view.frame().id(), "show");
        self.views.push(view);
        self.refocus();
        replaced
    }

    /// Move a shown view to the top. Returns false when it is not shown.
    pub fn raise(&mut self, id: &str) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        if index + 1 != self.views.len() {
            let view = self.views.remove(index);
            self.views.push(view);
            if let Some(top) = self.views.last_mut() {
                top.frame_mut().mark_dirty();
            }
            self.refocus();
        }
        true
    }

    /// Remove a view, returning it. Hiding a view that is not shown changes
    /// nothing.
    pub fn hide(&mut self, id: &str) -> Option<Box<dyn View>> {
        let view = self.remove(id)?;
        tracing::debug!(view = id, "hide");
        self.refocus();
        Some(view)
    }

    fn remove(&mut self, id: &str) -> Option<Box<dyn View>> {
        let index = self.position(id)?;
        let view = self.views.remove(index);
        self.damage.push(view.frame().rect().intersect(self.screen));
        Some(view)
    }

    /// Pieces of view `index` not covered by any view above it
    pub fn visible_region(&self, index: usize) -> Vec<Rect> {
        let Some(view) = self.views.get(index) else {
            return Vec::new();
        };
        let mut region = vec![view.frame().rect().intersect(self.screen)];
        region.retain(|r| !r.is_empty());
        for above in &self.views[index + 1..] {
            if region.is_empty() {
                break;
            }
            region = subtract_region(&region, above.frame().rect());
        }
        region
    }

    pub fn is_visible(&self, index: usize) -> bool {
        !self.visible_region(index).is_empty()
    }

    /// The view that receives a mouse event at (x, y): the first view from
    /// the top that contains the point, except that a popup takes every
    /// event while it is shown
    pub fn hit_test(&self, x: i32, y: i32) -> Option<usize> {
        self.views.iter().enumerate().rev().find_map(|(i, view)| {
            let frame = view.frame();
            (frame.mode() == DisplayMode::Popup || frame.rect().contains(x, y)).then_some(i)
        })
    }

    /// New view area after a terminal resize
    pub fn resize(&mut self, screen: Rect) {
        if screen == self.screen {
            return;
        }
        tracing::debug!(?screen, "resize");
        self.screen = screen;
        self.canvas.resize(term_rect(screen));
        for view in &mut self.views {
            view.frame_mut().layout(screen);
            view.frame_mut().mark_dirty();
        }
        self.full_redraw = true;
    }

    /// Repaint what changed into the canvas. Returns the ids drawn, bottom
    /// first.
    pub fn render(&mut self, theme: &Theme) -> Vec<String> {
        let visible: Vec<bool> = (0..self.views.len()).map(|i| self.is_visible(i)).collect();

        let moved = self
            .views
            .iter()
            .zip(&visible)
            .any(|(view, visible)| *visible && view.frame().was_resized());
        if self.full_redraw || moved {
            self.canvas.reset();
            self.damage.clear();
            for view in &mut self.views {
                view.frame_mut().mark_dirty();
            }
            self.full_redraw = false;
        } else {
            for area in std::mem::take(&mut self.damage) {
                Surface::new(&mut self.canvas).clipped(area).clear();
                for view in &mut self.views {
                    if view.frame().rect().overlaps(area) {
                        view.frame_mut().mark_dirty();
                    }
                }
            }
        }

        let screen = self.screen;
        let mut painted: Vec<Rect> = Vec::new();
        let mut drawn = Vec::new();
        for (view, visible) in self.views.iter_mut().zip(visible) {
            if !visible {
                continue;
            }
            let rect = view.frame().rect();
            if painted.iter().any(|r| r.overlaps(rect)) {
                view.frame_mut().mark_dirty();
            }
            if !view.frame().is_dirty() {
                continue;
            }
            let mut canvas = Surface::new(&mut self.canvas);
            let mut surface = canvas.clipped(rect.intersect(screen));
            surface.clear();
            view.draw(&mut surface, theme);
            view.frame_mut().clear_dirty();
            painted.push(rect);
            drawn.push(view.frame().id().to_string());
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppContext;
    use crate::view::ViewFrame;
    use crossterm::event::KeyEvent;

    struct Panel {
        frame: ViewFrame,
        fill: &'static str,
    }

    impl Panel {
        fn boxed(id: &'static str, mode: DisplayMode, rect: Rect) -> Box<dyn View> {
            Box::new(Panel {
                frame: ViewFrame::new(id, mode, rect),
                fill: id,
            })
        }
    }

    impl View for Panel {
        fn frame(&self) -> &ViewFrame {
            &self.frame
        }

        fn frame_mut(&mut self) -> &mut ViewFrame {
            &mut self.frame
        }

        fn draw(&mut self, surface: &mut Surface, _theme: &Theme) {
            let rect = self.frame.rect();
            for y in rect.y..rect.end_y() {
                for x in rect.x..rect.end_x() {
                    surface.put_str(x, y, self.fill, Default::default());
                }
            }
        }

        fn handle_key(&mut self, _key: &KeyEvent, _ctx: &mut AppContext) -> bool {
            false
        }
    }

    const SCREEN: Rect = Rect::new(0, 0, 40, 10);

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_fullscreen_occludes_views_beneath() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("w", DisplayMode::Window, Rect::new(2, 2, 10, 4)));
        compositor.show(Panel::boxed("f", DisplayMode::Fullscreen, SCREEN));
        assert!(!compositor.is_visible(0));
        assert!(compositor.is_visible(1));
    }

    #[test]
    fn test_partially_covered_view_stays_visible() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.show(Panel::boxed("b", DisplayMode::Window, Rect::new(0, 0, 5, 4)));
        assert_eq!(compositor.visible_region(0), vec![Rect::new(5, 0, 5, 4)]);
    }

    #[test]
    fn test_hide_is_idempotent() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.render(&Theme::default());
        assert!(compositor.hide("missing").is_none());
        assert!(!compositor.find("a").unwrap().frame().is_dirty());
        assert!(compositor.hide("a").is_some());
        assert!(compositor.hide("a").is_none());
        assert!(compositor.is_empty());
    }

    #[test]
    fn test_show_replaces_same_id_and_focuses_top() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.show(Panel::boxed("b", DisplayMode::Window, Rect::new(5, 0, 10, 4)));
        assert!(compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4))).is_some());
        assert_eq!(compositor.ids(), vec!["b", "a"]);
        assert!(compositor.top().unwrap().frame().is_focused());
        assert!(!compositor.find("b").unwrap().frame().is_focused());

        assert!(compositor.raise("b"));
        assert_eq!(compositor.ids(), vec!["a", "b"]);
        assert!(!compositor.raise("zzz"));
    }

    #[test]
    fn test_hit_test_prefers_top_and_popups() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("f", DisplayMode::Fullscreen, SCREEN));
        compositor.show(Panel::boxed("w", DisplayMode::Window, Rect::new(2, 2, 10, 4)));
        assert_eq!(compositor.hit_test(3, 3), Some(1));
        assert_eq!(compositor.hit_test(30, 8), Some(0));

        compositor.show(Panel::boxed("p", DisplayMode::Popup, Rect::new(0, 0, 6, 3)));
        assert_eq!(compositor.hit_test(0, 0), Some(2));
    }

    #[test]
    fn test_render_repaints_only_dirty_and_overlapping_above() {
        let theme = Theme::default();
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.show(Panel::boxed("b", DisplayMode::Window, Rect::new(5, 0, 10, 4)));
        compositor.show(Panel::boxed("c", DisplayMode::Window, Rect::new(30, 0, 5, 4)));
        assert_eq!(compositor.render(&theme), vec!["a", "b", "c"]);
        assert_eq!(compositor.render(&theme), Vec::<String>::new());

        compositor.find_mut("a").unwrap().frame_mut().mark_dirty();
        // b overlaps a and is above it; c does not
        assert_eq!(compositor.render(&theme), vec!["a", "b"]);
        assert_eq!(&row(compositor.canvas(), 0)[..15], "aaaaabbbbbbbbbb");
    }

    #[test]
    fn test_hide_repaints_uncovered_area() {
        let theme = Theme::default();
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.show(Panel::boxed("b", DisplayMode::Window, Rect::new(20, 0, 5, 4)));
        compositor.show(Panel::boxed("p", DisplayMode::Window, Rect::new(5, 0, 10, 4)));
        compositor.render(&theme);
        compositor.hide("p");
        // b gains focus, so its border style changes too
        assert_eq!(compositor.render(&theme), vec!["a", "b"]);
        assert_eq!(&row(compositor.canvas(), 0)[..16], "aaaaaaaaaa      ");
    }

    #[test]
    fn test_moved_view_clears_and_redraws_everything() {
        let theme = Theme::default();
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("a", DisplayMode::Window, Rect::new(0, 0, 10, 4)));
        compositor.show(Panel::boxed("b", DisplayMode::Window, Rect::new(20, 0, 5, 4)));
        compositor.render(&theme);
        compositor
            .find_mut("b")
            .unwrap()
            .frame_mut()
            .set_rect(Rect::new(25, 0, 5, 4));
        assert_eq!(compositor.render(&theme), vec!["a", "b"]);
        assert_eq!(&row(compositor.canvas(), 0)[20..30], "     bbbbb");
    }

    #[test]
    fn test_resize_relayouts() {
        let mut compositor = Compositor::new(SCREEN);
        compositor.show(Panel::boxed("f", DisplayMode::Fullscreen, SCREEN));
        compositor.show(Panel::boxed("w", DisplayMode::Window, Rect::new(30, 5, 10, 5)));
        compositor.resize(Rect::new(0, 0, 20, 8));
        assert_eq!(compositor.find("f").unwrap().frame().rect(), Rect::new(0, 0, 20, 8));
        assert_eq!(compositor.find("w").unwrap().frame().rect(), Rect::new(10, 3, 10, 5));
        assert_eq!(compositor.canvas().area.width, 20);
    }
}
