//! The panels: log, diff, blame and command output, plus the help, prompt
//! and menu popups

mod blame;
mod diff;
mod help;
mod log;
mod menu;
mod output;
mod prompt;

#[cfg(test)]
mod tests;

pub use blame::BlameView;
pub use diff::DiffView;
pub use help::HelpView;
pub use log::LogView;
pub use menu::MenuView;
pub use output::OutputView;
pub use prompt::{NameKind, PromptView};

use crate::config::Theme;
use crate::geometry::Rect;
use crate::input::{MouseInput, MouseKind};
use crate::item::Row;
use crate::list::{ListMouse, ListView};
use crate::surface::Surface;
use crate::view::{MouseOutcome, ViewFrame};

/// Chrome plus the list filling the content rect
pub(crate) fn draw_list<R: Row>(
    frame: &ViewFrame,
    list: &mut ListView<R>,
    surface: &mut Surface,
    theme: &Theme,
) {
    frame.draw_chrome(surface, theme);
    list.draw(surface, frame.content_rect(), theme, frame.is_focused());
}

/// Give a mouse event to the list when it lands in the content rect, or when
/// it continues a press the list holds
pub(crate) fn list_mouse<R: Row>(
    frame: &ViewFrame,
    list: &mut ListView<R>,
    input: &MouseInput,
) -> ListMouse {
    let area = frame.content_rect();
    let continues_press = matches!(
        input.kind,
        MouseKind::PressHold | MouseKind::PressLeave | MouseKind::LeftRelease
    );
    if !continues_press && !area.contains(input.x, input.y) {
        return ListMouse::Ignored;
    }
    list.handle_mouse(input, area)
}

/// The common part of turning a list response into a view response
pub(crate) fn mouse_outcome(response: &ListMouse) -> MouseOutcome {
    match response {
        ListMouse::Ignored => MouseOutcome::Ignored,
        ListMouse::Capture(area) => MouseOutcome::Capture(*area),
        _ => MouseOutcome::Handled,
    }
}

/// Initial rect of a floating window: most of the screen, offset from the
/// top-left so the panel beneath stays reachable
pub(crate) fn window_rect(screen: Rect) -> Rect {
    let width = (screen.width * 9 / 10).max(20);
    let height = (screen.height * 8 / 10).max(6);
    Rect::new(
        screen.x + screen.width / 20,
        screen.y + screen.height / 10,
        width,
        height,
    )
    .clamp_within(screen)
}

/// Footer text for a list: position, count and a loading marker
pub(crate) fn list_footer<R: Row>(list: &ListView<R>, loading: bool) -> String {
    let position = list.selected().map_or(0, |i| i + 1);
    let mut footer = format!("{position}/{}", list.len());
    if loading {
        footer.push_str(" loading");
    }
    if let Some(query) = list.search() {
        footer.push_str(&format!(" /{}", query.pattern()));
    }
    footer
}
