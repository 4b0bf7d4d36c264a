//! Key binding reference

use super::{draw_list, list_mouse, mouse_outcome};
use crate::app::AppContext;
use crate::config::{Theme, Tone};
use crate::geometry::Rect;
use crate::input::MouseInput;
use crate::item::{Item, Row};
use crate::list::ListView;
use crate::surface::Surface;
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crossterm::event::KeyEvent;
use unicode_width::UnicodeWidthStr;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Everywhere",
        &[
            ("j k / arrows", "move selection"),
            ("space PgDn PgUp", "page"),
            ("g G", "first / last row"),
            ("h l 0 $", "scroll sideways"),
            ("/ n N", "search, next, previous"),
            ("q Esc", "close panel"),
            ("?", "this help"),
            ("Ctrl-c", "quit"),
        ],
    ),
    (
        "Log",
        &[
            ("Enter / double-click", "show revision"),
            ("m / right-click", "actions"),
            (":", "run a git command on the commit"),
            ("r", "reload"),
        ],
    ),
    (
        "Diff, blame and output",
        &[
            ("Enter", "jump to file / open revision"),
            ("b", "blame line"),
            ("f", "toggle fullscreen"),
            ("drag title", "move window"),
            ("drag border", "resize window"),
        ],
    ),
];

const KEY_WIDTH: usize = 22;

pub struct HelpView {
    frame: ViewFrame,
    list: ListView<Item>,
}

impl HelpView {
    pub const ID: &'static str = "help";

    pub fn new(ctx: &AppContext) -> Self {
        let mut list = ListView::new(ctx.config.ui.scroll_align);
        for (index, (title, bindings)) in SECTIONS.iter().enumerate() {
            if index > 0 {
                list.push(Item::Separator);
            }
            list.push(Item::plain(*title, Tone::Primary));
            for (keys, action) in bindings.iter() {
                let pad = KEY_WIDTH.saturating_sub(keys.width());
                list.push(Item::plain(
                    format!("  {keys}{}{action}", " ".repeat(pad)),
                    Tone::Text,
                ));
            }
        }
        list.ensure_selection();

        let width = list.rows().iter().map(|row| row.text().width()).max().unwrap_or(0) + 4;
        let height = list.len() + 2;
        let mut frame = ViewFrame::new(
            Self::ID,
            DisplayMode::Popup,
            Rect::new(0, 0, width as i32, height as i32),
        );
        frame.set_title("keys");
        frame.set_footer(Some("q to close".to_string()));
        Self { frame, list }
    }
}

impl View for HelpView {
    fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ViewFrame {
        &mut self.frame
    }

    fn draw(&mut self, surface: &mut Surface, theme: &Theme) {
        draw_list(&self.frame, &mut self.list, surface, theme);
    }

    fn handle_key(&mut self, key: &KeyEvent, _ctx: &mut AppContext) -> bool {
        if !self.list.handle_key(key) {
            return false;
        }
        self.frame.mark_dirty();
        true
    }

    fn handle_mouse(&mut self, input: &MouseInput, _ctx: &mut AppContext) -> MouseOutcome {
        let outcome = mouse_outcome(&list_mouse(&self.frame, &mut self.list, input));
        if outcome != MouseOutcome::Ignored {
            self.frame.mark_dirty();
        }
        outcome
    }
}
