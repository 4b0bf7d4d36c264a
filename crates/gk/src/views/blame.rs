//! Line-by-line authorship of one file at one revision

use super::{draw_list, list_footer, list_mouse, mouse_outcome, window_rect};
use crate::app::{AppCommand, AppContext};
use crate::config::{Theme, Tone};
use crate::input::MouseInput;
use crate::item::Item;
use crate::list::{Direction, ListMouse, ListView};
use crate::search::SearchQuery;
use crate::segment::{Segment, SegmentedRow};
use crate::surface::Surface;
use crate::time_format::{now_epoch, TimeFormatter};
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crossterm::event::{KeyCode, KeyEvent};
use gk_core::git;
use gk_core::{BlameLine, BlameParser, Job, JobMessage, JobSink, JobSpec};
use unicode_width::UnicodeWidthChar;

const AUTHOR_WIDTH: usize = 14;

/// Truncate or pad `text` to exactly `width` columns
fn fit(text: &str, width: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push_str(&" ".repeat(width - used));
    out
}

pub struct BlameView {
    frame: ViewFrame,
    list: ListView<Item>,
    /// Parallel to the list rows
    lines: Vec<BlameLine>,
    commit: Option<String>,
    path: String,
    /// Line to select once it has streamed in
    target: Option<usize>,
    job: Option<Job<BlameLine>>,
    times: TimeFormatter,
    separator: String,
    now: i64,
    errors: Vec<String>,
}

impl BlameView {
    pub const ID: &'static str = "blame";

    pub fn new(ctx: &mut AppContext, commit: Option<String>, path: String, line: usize) -> Self {
        let mut view = Self::empty(ctx, commit, path, line);
        let mut parser = BlameParser::new();
        let argv = git::blame_args(view.commit.as_deref(), &view.path);
        let spec = JobSpec::new(Self::ID, argv, move |raw: String| parser.push_line(&raw))
            .current_dir(&ctx.repo_root);
        view.job = Some(ctx.jobs.start(spec));
        view
    }

    pub(crate) fn empty(
        ctx: &AppContext,
        commit: Option<String>,
        path: String,
        line: usize,
    ) -> Self {
        let mut frame = ViewFrame::new(Self::ID, DisplayMode::Window, window_rect(ctx.screen));
        let at = commit
            .as_deref()
            .map(|c| c.chars().take(10).collect::<String>())
            .unwrap_or_else(|| "worktree".to_string());
        frame.set_title(format!("blame {path} @ {at}"));
        Self {
            frame,
            list: ListView::new(ctx.config.ui.scroll_align),
            lines: Vec::new(),
            commit,
            path,
            target: Some(line),
            job: None,
            times: ctx.times.clone(),
            separator: ctx.config.ui.separator.clone(),
            now: now_epoch(),
            errors: Vec::new(),
        }
    }

    fn row(&self, line: &BlameLine) -> Item {
        let (id, id_tone) = if line.uncommitted {
            ("uncommitted".to_string(), Tone::Warning)
        } else {
            (line.short_commit().to_string(), Tone::CommitId)
        };
        let segments = vec![
            Segment::text(fit(&id, 11), id_tone),
            Segment::text(fit(&line.author, AUTHOR_WIDTH), Tone::Muted),
            Segment::text(self.times.format(line.author_time, self.now), Tone::Muted),
            Segment::text(format!("{:>5}", line.line), Tone::Muted),
            Segment::text(line.text.clone(), Tone::Text),
        ];
        Item::Segmented(SegmentedRow::new(segments, self.separator.clone()))
    }

    fn loading(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.is_pending())
    }

    fn update_footer(&mut self) {
        let footer = list_footer(&self.list, self.loading());
        self.frame.set_footer(Some(footer));
    }

    fn selected_line(&self) -> Option<&BlameLine> {
        self.list.selected().and_then(|i| self.lines.get(i))
    }

    fn open_diff(&self, ctx: &mut AppContext) {
        match self.selected_line() {
            Some(line) if line.uncommitted => ctx.status.info("line is not committed yet"),
            Some(line) => ctx.push(AppCommand::OpenDiff {
                commit: line.commit.clone(),
            }),
            None => {}
        }
    }
}

impl JobSink<BlameLine> for BlameView {
    fn process_item(&mut self, line: BlameLine) {
        let row = self.row(&line);
        let index = self.list.len();
        let is_target = self.target == Some(line.line);
        self.list.push(row);
        self.lines.push(line);
        if is_target {
            self.target = None;
            self.list.set_selected(index, Direction::Forward);
        }
    }

    fn process_message(&mut self, message: &JobMessage) {
        if let JobMessage::Error(text) = message {
            self.errors.push(text.clone());
        }
    }

    fn on_finished(&mut self, _code: Option<i32>) {
        // Target past the end of the file
        if self.target.take().is_some() {
            self.list.select_last();
        }
    }
}

impl View for BlameView {
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
            KeyCode::Enter => self.open_diff(ctx),
            KeyCode::Char('f') => {
                let mode = match self.frame.mode() {
                    DisplayMode::Fullscreen => DisplayMode::Window,
                    _ => DisplayMode::Fullscreen,
                };
                self.frame.set_mode(mode, ctx.screen);
            }
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
            self.open_diff(ctx);
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
            ctx.status.error(format!("blame: {error}"));
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
