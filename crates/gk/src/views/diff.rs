//! Patch of one revision, classified line by line as it streams in

use super::{draw_list, list_footer, list_mouse, mouse_outcome, window_rect};
use crate::app::{AppCommand, AppContext};
use crate::config::{PanelMode, Theme, Tone};
use crate::input::MouseInput;
use crate::item::{draw_plain, Row, RowState};
use crate::list::{Direction, ListMouse, ListView};
use crate::search::SearchQuery;
use crate::surface::Surface;
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crossterm::event::{KeyCode, KeyEvent};
use gk_core::git;
use gk_core::{classify_line, ColorClass, DiffLine, DiffLineKind, DiffParserState};
use gk_core::{Job, JobMessage, JobSink, JobSpec};
use std::borrow::Cow;

pub struct DiffRow {
    pub line: DiffLine,
}

fn tone(color: ColorClass) -> Tone {
    match color {
        ColorClass::File => Tone::DiffFile,
        ColorClass::Stat => Tone::Accent,
        ColorClass::Hunk => Tone::DiffHunk,
        ColorClass::Added => Tone::DiffAdded,
        ColorClass::Removed => Tone::DiffRemoved,
        ColorClass::Meta => Tone::DiffMeta,
        ColorClass::Commit => Tone::CommitId,
        ColorClass::Context | ColorClass::Message | ColorClass::Plain => Tone::Text,
    }
}

impl Row for DiffRow {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.line.text)
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
        let tone = tone(self.line.color);
        draw_plain(surface, &self.line.text, tone, x, y, offset_x, width, state);
    }
}

pub struct DiffView {
    frame: ViewFrame,
    list: ListView<DiffRow>,
    commit: String,
    job: Option<Job<DiffLine>>,
    errors: Vec<String>,
}

impl DiffView {
    pub const ID: &'static str = "diff";

    pub fn new(ctx: &mut AppContext, commit: String) -> Self {
        let mut view = Self::empty(ctx, commit);
        let mut state = DiffParserState::new();
        let spec = JobSpec::new(Self::ID, git::show_args(&view.commit), move |line: String| {
            Some(classify_line(&mut state, &line))
        })
        .current_dir(&ctx.repo_root);
        view.job = Some(ctx.jobs.start(spec));
        view
    }

    pub(crate) fn empty(ctx: &AppContext, commit: String) -> Self {
        let mode = match ctx.config.ui.diff_mode {
            PanelMode::Window => DisplayMode::Window,
            PanelMode::Fullscreen => DisplayMode::Fullscreen,
        };
        let mut frame = ViewFrame::new(Self::ID, mode, window_rect(ctx.screen));
        let short: String = commit.chars().take(10).collect();
        frame.set_title(format!("diff {short}"));
        Self {
            frame,
            list: ListView::new(ctx.config.ui.scroll_align),
            commit,
            job: None,
            errors: Vec::new(),
        }
    }

    fn loading(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.is_pending())
    }

    fn update_footer(&mut self) {
        let footer = list_footer(&self.list, self.loading());
        self.frame.set_footer(Some(footer));
    }

    fn selected_line(&self) -> Option<&DiffLine> {
        self.list.selected_row().map(|row| &row.line)
    }

    /// First row of the patch for `path`, as named by a stat line
    fn file_row(&self, path: &str) -> Option<usize> {
        // Long stat paths are abbreviated with a leading `...`
        let tail = path.trim_start_matches("...");
        self.list.rows().iter().position(|row| {
            let line = &row.line;
            let header = match line.kind {
                DiffLineKind::FileHeader => line.text.starts_with("+++") || line.text.starts_with("---"),
                DiffLineKind::Info => line.text.starts_with("diff "),
                _ => false,
            };
            header && line.text.trim_end().ends_with(tail)
        })
    }

    /// Blame the file position of the selected line: new-side lines in the
    /// revision itself, removed lines in its parent
    fn blame_selected(&self, ctx: &mut AppContext) {
        let Some(line) = self.selected_line() else {
            return;
        };
        let command = match (&line.new, &line.old) {
            (Some((path, number)), _) => AppCommand::OpenBlame {
                commit: Some(self.commit.clone()),
                path: path.clone(),
                line: *number,
            },
            (None, Some((path, number))) => AppCommand::OpenBlame {
                commit: Some(format!("{}^", self.commit)),
                path: path.clone(),
                line: *number,
            },
            (None, None) => {
                ctx.status.info("no file line here");
                return;
            }
        };
        ctx.push(command);
    }

    fn activate(&mut self, ctx: &mut AppContext) {
        let Some(line) = self.selected_line() else {
            return;
        };
        if let Some(path) = line.stat_path.clone() {
            match self.file_row(&path) {
                Some(index) => {
                    self.list.set_selected(index, Direction::Forward);
                }
                None => ctx.status.info(format!("{path}: not loaded yet")),
            }
            return;
        }
        if line.location().is_some() {
            self.blame_selected(ctx);
        }
    }

    fn toggle_fullscreen(&mut self, ctx: &AppContext) {
        let mode = match self.frame.mode() {
            DisplayMode::Fullscreen => DisplayMode::Window,
            _ => DisplayMode::Fullscreen,
        };
        self.frame.set_mode(mode, ctx.screen);
    }
}

impl JobSink<DiffLine> for DiffView {
    fn process_item(&mut self, line: DiffLine) {
        self.list.push(DiffRow { line });
        self.list.ensure_selection();
    }

    fn process_message(&mut self, message: &JobMessage) {
        if let JobMessage::Error(text) = message {
            self.errors.push(text.clone());
        }
    }
}

impl View for DiffView {
    fn frame(&self) -> &ViewFrame {
        &self.frame
    }

    fn frame_mut(&mut self) -> &mut ViewFrame {
        &mut self.frame
    }

    fn draw(&mut self, surface: &mut Surface, theme: &Theme) {
        self.update_footer();
        draw_list(&self.frame, &mut self.list, surface, theme);
    }

    fn handle_key(&mut self, key: &KeyEvent, ctx: &mut AppContext) -> bool {
        match key.code {
            KeyCode::Enter => self.activate(ctx),
            KeyCode::Char('b') => self.blame_selected(ctx),
            KeyCode::Char('f') => self.toggle_fullscreen(ctx),
            KeyCode::Char('/') => ctx.push(AppCommand::OpenSearch {
                target: Self::ID.to_string(),
            }),
            KeyCode::Char('n') => {
                self.list.search_next();
            }
            KeyCode::Char('N') => {
                self.list.search_prev();
            }
            _ => {
                if !self.list.handle_key(key) {
                    return false;
                }
            }
        }
        self.frame.mark_dirty();
        true
    }

    fn handle_mouse(&mut self, input: &MouseInput, ctx: &mut AppContext) -> MouseOutcome {
        let response = list_mouse(&self.frame, &mut self.list, input);
        if let ListMouse::Activated(_) = response {
            self.activate(ctx);
        }
        let outcome = mouse_outcome(&response);
        if outcome != MouseOutcome::Ignored {
            self.frame.mark_dirty();
        }
        outcome
    }

    fn poll_jobs(&mut self, ctx: &mut AppContext) {
        let Some(mut job) = self.job.take() else {
            return;
        };
        let stats = job.drain(self);
        self.job = Some(job);
        for error in self.errors.drain(..) {
            ctx.status.error(format!("diff: {error}"));
        }
        if stats.items > 0 || stats.finished {
            self.frame.mark_dirty();
        }
    }

    fn apply_search(&mut self, query: Option<SearchQuery>) {
        let active = query.is_some();
        self.list.set_search(query);
        if active {
            self.list.search_next();
        }
    }

    fn current_search(&self) -> Option<&SearchQuery> {
        self.list.search()
    }

    fn on_close(&mut self, ctx: &mut AppContext) {
        if let Some(job) = &mut self.job {
            ctx.jobs.release(job);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::path::PathBuf;

    const SHOW: &str = "\
commit 0123456789abcdef0123456789abcdef01234567
Author: Ada <ada@example.com>

    Fix the parser

 src/lib.rs | 3 ++-
 1 file changed, 2 insertions(+), 1 deletion(-)

diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,3 +10,4 @@ fn main() {
 let a = 1;
-let b = 2;
+let b = 3;
+let c = 4;";

    fn loaded() -> (DiffView, AppContext) {
        let ctx = AppContext::new(Config::default(), PathBuf::from("/tmp/repo")).unwrap();
        let mut view = DiffView::empty(&ctx, "0123456789abcdef".to_string());
        let mut state = DiffParserState::new();
        for line in SHOW.lines() {
            view.process_item(classify_line(&mut state, line));
        }
        (view, ctx)
    }

    fn select_text(view: &mut DiffView, prefix: &str) {
        let index = view
            .list
            .rows()
            .iter()
            .position(|row| row.line.text.starts_with(prefix))
            .unwrap();
        assert!(view.list.set_selected(index, Direction::Forward));
    }

    #[test]
    fn test_enter_on_stat_line_jumps_to_file() {
        let (mut view, mut ctx) = loaded();
        select_text(&mut view, " src/lib.rs |");
        view.handle_key(&KeyEvent::from(KeyCode::Enter), &mut ctx);
        let selected = view.selected_line().unwrap();
        assert_eq!(selected.text, "diff --git a/src/lib.rs b/src/lib.rs");
        assert!(ctx.commands.is_empty());
    }

    #[test]
    fn test_blame_added_line_uses_revision() {
        let (mut view, mut ctx) = loaded();
        select_text(&mut view, "+let c");
        view.handle_key(&KeyEvent::from(KeyCode::Char('b')), &mut ctx);
        assert_eq!(
            ctx.commands,
            vec![AppCommand::OpenBlame {
                commit: Some("0123456789abcdef".to_string()),
                path: "src/lib.rs".to_string(),
                line: 12,
            }]
        );
    }

    #[test]
    fn test_blame_removed_line_uses_parent() {
        let (mut view, mut ctx) = loaded();
        select_text(&mut view, "-let b");
        view.handle_key(&KeyEvent::from(KeyCode::Char('b')), &mut ctx);
        assert_eq!(
            ctx.commands,
            vec![AppCommand::OpenBlame {
                commit: Some("0123456789abcdef^".to_string()),
                path: "src/lib.rs".to_string(),
                line: 11,
            }]
        );
    }

    #[test]
    fn test_blame_outside_file_reports() {
        let (mut view, mut ctx) = loaded();
        select_text(&mut view, "Author:");
        view.handle_key(&KeyEvent::from(KeyCode::Char('b')), &mut ctx);
        assert!(ctx.commands.is_empty());
        assert!(ctx.status.current(std::time::Instant::now()).is_some());
    }

    #[test]
    fn test_replaced_panel_does_not_stop_successor() {
        let mut ctx = AppContext::new(Config::default(), std::env::temp_dir()).unwrap();
        let mut first = DiffView::new(&mut ctx, "HEAD~1".to_string());
        let second = DiffView::new(&mut ctx, "HEAD".to_string());

        // The compositor closes the old panel after the new one started
        first.on_close(&mut ctx);
        assert!(first.job.as_ref().unwrap().is_stopped());
        assert!(!second.job.as_ref().unwrap().is_stopped());
        assert!(second.loading());
    }

    #[test]
    fn test_fullscreen_toggle() {
        let (mut view, mut ctx) = loaded();
        ctx.screen = crate::geometry::Rect::new(0, 0, 100, 30);
        view.handle_key(&KeyEvent::from(KeyCode::Char('f')), &mut ctx);
        assert_eq!(view.frame().mode(), DisplayMode::Fullscreen);
        assert_eq!(view.frame().rect(), ctx.screen);
        view.handle_key(&KeyEvent::from(KeyCode::Char('f')), &mut ctx);
        assert_eq!(view.frame().mode(), DisplayMode::Window);
    }
}
