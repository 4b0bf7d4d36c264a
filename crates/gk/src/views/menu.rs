//! Actions on one revision

use super::{draw_list, list_mouse, mouse_outcome};
use crate::app::{AppCommand, AppContext};
use crate::config::{Theme, Tone};
use crate::geometry::Rect;
use crate::input::MouseInput;
use crate::item::Item;
use crate::list::{Direction, ListMouse, ListView};
use crate::segment::{Segment, SegmentedRow};
use crate::surface::Surface;
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crate::views::prompt::NameKind;
use crossterm::event::{KeyCode, KeyEvent};
use gk_core::git::Mutation;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    ShowDiff,
    Checkout,
    CherryPick,
    Revert,
    Reset,
    CreateBranch,
    CreateTag,
}

const ACTIONS: &[(MenuAction, &str)] = &[
    (MenuAction::ShowDiff, "Show diff"),
    (MenuAction::Checkout, "Checkout (detached)"),
    (MenuAction::CherryPick, "Cherry-pick onto HEAD"),
    (MenuAction::Revert, "Revert"),
    (MenuAction::Reset, "Reset branch here (mixed)"),
    (MenuAction::CreateBranch, "Create branch..."),
    (MenuAction::CreateTag, "Create tag..."),
];

/// Row index of the first action; the summary line and a rule come first
const FIRST_ACTION: usize = 2;

pub struct MenuView {
    frame: ViewFrame,
    list: ListView<Item>,
    commit: String,
}

impl MenuView {
    pub const ID: &'static str = "menu";

    pub fn new(ctx: &AppContext, commit: String, summary: String) -> Self {
        let mut list = ListView::new(ctx.config.ui.scroll_align);
        list.push(Item::Segmented(
            SegmentedRow::new(vec![Segment::text(summary, Tone::Muted)], "").non_selectable(),
        ));
        list.push(Item::Separator);
        for (_, label) in ACTIONS {
            list.push(Item::plain(*label, Tone::Text));
        }
        list.set_selected(FIRST_ACTION, Direction::Forward);

        let width = ACTIONS
            .iter()
            .map(|(_, label)| label.width())
            .max()
            .unwrap_or(0)
            .max(30)
            + 4;
        let height = list.len() + 2;
        let mut frame = ViewFrame::new(
            Self::ID,
            DisplayMode::Popup,
            Rect::new(0, 0, width as i32, height as i32),
        );
        let short: String = commit.chars().take(10).collect();
        frame.set_title(short);
        Self {
            frame,
            list,
            commit,
        }
    }

    fn action_at(&self, index: usize) -> Option<MenuAction> {
        index
            .checked_sub(FIRST_ACTION)
            .and_then(|i| ACTIONS.get(i))
            .map(|(action, _)| *action)
    }

    fn activate(&self, index: usize, ctx: &mut AppContext) {
        let Some(action) = self.action_at(index) else {
            return;
        };
        let commit = self.commit.clone();
        let mutation = |mutation| AppCommand::RunMutation {
            mutation,
            commit: commit.clone(),
        };
        let command = match action {
            MenuAction::ShowDiff => AppCommand::OpenDiff {
                commit: commit.clone(),
            },
            MenuAction::Checkout => mutation(Mutation::Checkout),
            MenuAction::CherryPick => mutation(Mutation::CherryPick),
            MenuAction::Revert => mutation(Mutation::Revert),
            MenuAction::Reset => mutation(Mutation::Reset),
            MenuAction::CreateBranch => AppCommand::PromptName {
                kind: NameKind::Branch,
                commit: commit.clone(),
            },
            MenuAction::CreateTag => AppCommand::PromptName {
                kind: NameKind::Tag,
                commit: commit.clone(),
            },
        };
        ctx.push(AppCommand::Close(Self::ID.to_string()));
        ctx.push(command);
    }
}

impl View for MenuView {
    fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ViewFrame {
        &mut self.frame
    }

    fn draw(&mut self, surface: &mut Surface, theme: &Theme) {
        draw_list(&self.frame, &mut self.list, surface, theme);
    }

    fn handle_key(&mut self, key: &KeyEvent, ctx: &mut AppContext) -> bool {
        if key.code == KeyCode::Enter {
            if let Some(index) = self.list.selected() {
                self.activate(index, ctx);
            }
            return true;
        }
        if !self.list.handle_key(key) {
            return false;
        }
        self.frame.mark_dirty();
        true
    }

    fn handle_mouse(&mut self, input: &MouseInput, ctx: &mut AppContext) -> MouseOutcome {
        let response = list_mouse(&self.frame, &mut self.list, input);
        // Menus act on a single click
        if let ListMouse::Selected(index) | ListMouse::Activated(index) = response {
            self.activate(index, ctx);
        }
        let outcome = mouse_outcome(&response);
        if outcome != MouseOutcome::Ignored {
            self.frame.mark_dirty();
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    fn menu() -> (MenuView, AppContext) {
        let ctx = AppContext::new(Config::default(), PathBuf::from("/tmp/repo")).unwrap();
        let view = MenuView::new(&ctx, "abc123".to_string(), "Fix parser".to_string());
        (view, ctx)
    }

    #[test]
    fn test_starts_on_first_action() {
        let (view, _ctx) = menu();
        assert_eq!(view.list.selected(), Some(FIRST_ACTION));
        assert_eq!(view.action_at(1), None);
        assert_eq!(view.action_at(FIRST_ACTION), Some(MenuAction::ShowDiff));
    }

    #[test]
    fn test_header_rows_are_not_selectable() {
        let (mut view, mut ctx) = menu();
        view.handle_key(&KeyEvent::from(KeyCode::Up), &mut ctx);
        assert_eq!(view.list.selected(), Some(FIRST_ACTION));
    }

    #[test]
    fn test_enter_runs_mutation_and_closes() {
        let (mut view, mut ctx) = menu();
        for _ in 0..3 {
            view.handle_key(&KeyEvent::from(KeyCode::Down), &mut ctx);
        }
        view.handle_key(&KeyEvent::from(KeyCode::Enter), &mut ctx);
        assert_eq!(
            ctx.commands,
            vec![
                AppCommand::Close(MenuView::ID.to_string()),
                AppCommand::RunMutation {
                    mutation: Mutation::Revert,
                    commit: "abc123".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_create_branch_opens_name_prompt() {
        let (view, mut ctx) = menu();
        view.activate(FIRST_ACTION + 5, &mut ctx);
        assert_eq!(
            ctx.commands[1],
            AppCommand::PromptName {
                kind: NameKind::Branch,
                commit: "abc123".to_string(),
            }
        );
    }
}
