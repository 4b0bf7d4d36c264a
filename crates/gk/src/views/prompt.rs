//! One-line input popup: search queries, new branch or tag names, and git
//! commands to run against a commit

use super::{draw_list, list_mouse};
use crate::app::{AppCommand, AppContext};
use crate::config::{Theme, Tone};
use crate::geometry::Rect;
use crate::input::MouseInput;
use crate::item::{Item, Row, RowResponse};
use crate::list::{ListMouse, ListView};
use crate::search::SearchQuery;
use crate::segment::{EditField, Segment, SegmentAction, SegmentedRow};
use crate::surface::Surface;
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use gk_core::git::Mutation;

const WIDTH: i32 = 52;
const EDIT_ROW: usize = 0;
const TOGGLE_ROW: usize = 1;

/// What a name prompt creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Branch,
    Tag,
}

impl NameKind {
    fn label(self) -> &'static str {
        match self {
            NameKind::Branch => "branch",
            NameKind::Tag => "tag",
        }
    }

    fn mutation(self, name: String) -> Mutation {
        match self {
            NameKind::Branch => Mutation::CreateBranch(name),
            NameKind::Tag => Mutation::CreateTag(name),
        }
    }
}

#[derive(Debug, Clone)]
enum Purpose {
    Search { target: String },
    Name { kind: NameKind, commit: String },
    Command { commit: String },
}

pub struct PromptView {
    frame: ViewFrame,
    list: ListView<Item>,
    purpose: Purpose,
}

impl PromptView {
    pub const ID: &'static str = "prompt";

    /// Search prompt for the view `target`, prefilled from its active query
    pub fn search(ctx: &AppContext, target: String, current: Option<&SearchQuery>) -> Self {
        let (pattern, regex, case_sensitive) = match current {
            Some(query) => (query.pattern(), query.is_regex(), query.is_case_sensitive()),
            None => ("", ctx.config.search.regex, ctx.config.search.case_sensitive),
        };
        let separator = ctx.config.ui.separator.clone();
        let rows = vec![
            Self::edit_row("Find:", pattern, &separator),
            Item::Segmented(SegmentedRow::new(
                vec![
                    Segment::toggle("regex", "regex", regex),
                    Segment::toggle("case", "match case", case_sensitive),
                ],
                separator.clone(),
            )),
            Item::Separator,
            Self::button_row("Find", &separator),
        ];
        Self::build(ctx, format!("search {target}"), rows, Purpose::Search { target })
    }

    /// Name prompt for creating a branch or tag at `commit`
    pub fn name(ctx: &AppContext, kind: NameKind, commit: String) -> Self {
        let separator = ctx.config.ui.separator.clone();
        let rows = vec![
            Self::edit_row("Name:", "", &separator),
            Item::Separator,
            Self::button_row("Create", &separator),
        ];
        let short: String = commit.chars().take(10).collect();
        Self::build(
            ctx,
            format!("new {} at {short}", kind.label()),
            rows,
            Purpose::Name { kind, commit },
        )
    }

    /// `git <command> <commit>` prompt; the command is split on whitespace
    pub fn command(ctx: &AppContext, commit: String) -> Self {
        let separator = ctx.config.ui.separator.clone();
        let rows = vec![
            Self::edit_row("git", "", &separator),
            Item::Separator,
            Self::button_row("Run", &separator),
        ];
        let short: String = commit.chars().take(10).collect();
        Self::build(ctx, format!("run on {short}"), rows, Purpose::Command { commit })
    }

    fn edit_row(label: &str, text: &str, separator: &str) -> Item {
        Item::Segmented(SegmentedRow::new(
            vec![
                Segment::text(label, Tone::Muted),
                Segment::Edit(EditField::new(text)),
            ],
            separator,
        ))
    }

    fn button_row(confirm: &str, separator: &str) -> Item {
        Item::Segmented(SegmentedRow::new(
            vec![
                Segment::Filler,
                Segment::button("ok", confirm),
                Segment::button("cancel", "Cancel"),
            ],
            separator,
        ))
    }

    fn build(ctx: &AppContext, title: String, rows: Vec<Item>, purpose: Purpose) -> Self {
        let height = rows.len() as i32 + 2;
        let mut list = ListView::new(ctx.config.ui.scroll_align);
        for row in rows {
            list.push(row);
        }
        list.ensure_selection();
        let mut frame = ViewFrame::new(Self::ID, DisplayMode::Popup, Rect::new(0, 0, WIDTH, height));
        frame.set_title(title);
        frame.set_footer(Some("Enter ok  Esc cancel".to_string()));
        Self {
            frame,
            list,
            purpose,
        }
    }

    pub fn text(&self) -> &str {
        self.list
            .row(EDIT_ROW)
            .and_then(Item::as_segmented)
            .and_then(SegmentedRow::edit_field)
            .map_or("", EditField::text)
    }

    fn toggle(&self, id: &str) -> bool {
        self.list
            .row(TOGGLE_ROW)
            .and_then(Item::as_segmented)
            .and_then(|row| row.toggle_state(id))
            .unwrap_or(false)
    }

    fn flip(&mut self, id: &str) {
        if let Some(row) = self.list.row_mut(TOGGLE_ROW).and_then(Item::as_segmented_mut) {
            row.flip_toggle(id);
        }
    }

    fn submit(&self, ctx: &mut AppContext) {
        match &self.purpose {
            Purpose::Search { target } => {
                ctx.push(AppCommand::ApplySearch {
                    target: target.clone(),
                    pattern: self.text().to_string(),
                    regex: self.toggle("regex"),
                    case_sensitive: self.toggle("case"),
                });
            }
            Purpose::Name { kind, commit } => {
                let name = self.text().trim();
                if name.is_empty() || name.contains(char::is_whitespace) {
                    ctx.status
                        .error(format!("{} name must be one word", kind.label()));
                    return;
                }
                ctx.push(AppCommand::RunMutation {
                    mutation: kind.mutation(name.to_string()),
                    commit: commit.clone(),
                });
            }
            Purpose::Command { commit } => {
                let args: Vec<String> = self
                    .text()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if !args.is_empty() {
                    ctx.push(AppCommand::RunCommand {
                        args,
                        commit: commit.clone(),
                    });
                }
            }
        }
        ctx.push(AppCommand::Close(Self::ID.to_string()));
    }
}

impl View for PromptView {
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
        let searching = matches!(self.purpose, Purpose::Search { .. });
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => self.submit(ctx),
            KeyCode::Char('r') if ctrl && searching => self.flip("regex"),
            KeyCode::Char('t') if ctrl && searching => self.flip("case"),
            _ => {
                let edited = self
                    .list
                    .row_mut(EDIT_ROW)
                    .and_then(|row| row.handle_key(key))
                    .is_some();
                if !edited {
                    return false;
                }
            }
        }
        self.frame.mark_dirty();
        true
    }

    fn handle_mouse(&mut self, input: &MouseInput, ctx: &mut AppContext) -> MouseOutcome {
        let outcome = match list_mouse(&self.frame, &mut self.list, input) {
            ListMouse::Ignored => return MouseOutcome::Ignored,
            ListMouse::Capture(area) => MouseOutcome::Capture(area),
            ListMouse::Row(_, RowResponse::Action(SegmentAction::Activated(id))) => {
                match id {
                    "ok" => self.submit(ctx),
                    "cancel" => ctx.push(AppCommand::Close(Self::ID.to_string())),
                    _ => {}
                }
                MouseOutcome::Handled
            }
            _ => MouseOutcome::Handled,
        };
        self.frame.mark_dirty();
        outcome
    }
}
