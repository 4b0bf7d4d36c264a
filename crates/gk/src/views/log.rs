//! Revision history, the root panel

use super::{draw_list, list_footer, list_mouse, mouse_outcome};
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
use gk_core::git::{self, CommitEntry, LogOptions};
use gk_core::{GraphBuilder, Job, JobMessage, JobSink, JobSpec};

pub struct LogView {
    frame: ViewFrame,
    list: ListView<Item>,
    /// Parallel to the list rows
    commits: Vec<CommitEntry>,
    options: LogOptions,
    job: Option<Job<CommitEntry>>,
    /// Absent when the graph column is turned off
    graph: Option<GraphBuilder>,
    graph_width: usize,
    times: TimeFormatter,
    separator: String,
    now: i64,
    /// Commit to reselect once a reload streams it in
    restore: Option<String>,
    errors: Vec<String>,
    exit_code: Option<Option<i32>>,
}

impl LogView {
    pub const ID: &'static str = "log";

    pub fn new(ctx: &mut AppContext, options: LogOptions) -> Self {
        let mut view = Self::empty(ctx, options);
        view.start(ctx);
        view
    }

    /// A view with no job attached
    pub(crate) fn empty(ctx: &AppContext, options: LogOptions) -> Self {
        let mut frame = ViewFrame::new(Self::ID, DisplayMode::Fullscreen, ctx.screen);
        frame.set_title(Self::title(ctx));
        let graph_width = ctx.config.ui.graph_width;
        Self {
            frame,
            list: ListView::new(ctx.config.ui.scroll_align),
            commits: Vec::new(),
            options,
            job: None,
            graph: (graph_width > 0).then(|| GraphBuilder::new(graph_width)),
            graph_width,
            times: ctx.times.clone(),
            separator: ctx.config.ui.separator.clone(),
            now: now_epoch(),
            restore: None,
            errors: Vec::new(),
            exit_code: None,
        }
    }

    fn title(ctx: &AppContext) -> String {
        let root = ctx
            .repo_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ctx.repo_root.display().to_string());
        match &ctx.branch {
            Some(branch) => format!("{root} [{branch}]"),
            None => root,
        }
    }

    fn start(&mut self, ctx: &mut AppContext) {
        let spec = JobSpec::new(Self::ID, git::log_args(&self.options), |line: String| {
            git::parse_log_record(&line)
        })
        .current_dir(&ctx.repo_root);
        self.job = Some(ctx.jobs.start(spec));
        if let Some(graph) = &mut self.graph {
            graph.reset();
        }
        self.now = now_epoch();
        self.exit_code = None;
        self.update_footer();
    }

    pub fn commits(&self) -> &[CommitEntry] {
        &self.commits
    }

    pub fn selected_commit(&self) -> Option<&CommitEntry> {
        self.list.selected().and_then(|i| self.commits.get(i))
    }

    fn commit_row(&mut self, commit: &CommitEntry) -> Item {
        let mut segments = Vec::new();
        if let Some(graph) = &mut self.graph {
            let cells = graph.push(commit);
            let width = self.graph_width;
            segments.push(Segment::text(format!("{cells:<width$}"), Tone::Accent));
        }
        segments.push(Segment::text(commit.short_id.clone(), Tone::CommitId));
        if !commit.refs.is_empty() {
            segments.push(Segment::text(
                format!("({})", commit.refs.join(", ")),
                Tone::Refs,
            ));
        }
        segments.push(Segment::text(commit.summary.clone(), Tone::Text));
        segments.push(Segment::Filler);
        segments.push(Segment::text(commit.author.clone(), Tone::Muted));
        segments.push(Segment::text(
            self.times.format(commit.author_time, self.now),
            Tone::Muted,
        ));
        Item::Segmented(SegmentedRow::new(segments, self.separator.clone()))
    }

    fn loading(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.is_pending())
    }

    fn update_footer(&mut self) {
        let mut footer = list_footer(&self.list, self.loading());
        if let Some(Some(code)) = self.exit_code.filter(|code| *code != Some(0)) {
            footer.push_str(&format!(" (git exited {code})"));
        }
        self.frame.set_footer(Some(footer));
    }

    fn open_diff(&self, ctx: &mut AppContext) {
        if let Some(commit) = self.selected_commit() {
            ctx.push(AppCommand::OpenDiff {
                commit: commit.id.clone(),
            });
        }
    }

    fn open_menu(&self, ctx: &mut AppContext) {
        if let Some(commit) = self.selected_commit() {
            ctx.push(AppCommand::OpenMenu {
                commit: commit.id.clone(),
                summary: commit.summary.clone(),
            });
        }
    }

    fn prompt_command(&self, ctx: &mut AppContext) {
        if let Some(commit) = self.selected_commit() {
            ctx.push(AppCommand::OpenCommand {
                commit: commit.id.clone(),
            });
        }
    }

    fn step_search(&mut self, ctx: &mut AppContext, forward: bool) {
        if self.list.search().is_none() {
            ctx.status.info("no active search");
            return;
        }
        let found = if forward {
            self.list.search_next()
        } else {
            self.list.search_prev()
        };
        if !found {
            ctx.status.info("no match");
        }
    }
}

impl JobSink<CommitEntry> for LogView {
    fn process_item(&mut self, commit: CommitEntry) {
        let row = self.commit_row(&commit);
        let index = self.list.len();
        let restore = self.restore.as_deref() == Some(commit.id.as_str());
        self.list.push(row);
        self.commits.push(commit);
        if restore {
            self.restore = None;
            self.list.set_selected(index, Direction::Forward);
        } else if self.restore.is_none() {
            self.list.ensure_selection();
        }
    }

    fn process_message(&mut self, message: &JobMessage) {
        if let JobMessage::Error(text) = message {
            self.errors.push(text.clone());
        }
    }

    fn on_finished(&mut self, code: Option<i32>) {
        self.exit_code = Some(code);
        // The remembered commit is gone; fall back to the top
        self.restore = None;
        self.list.ensure_selection();
    }
}

impl View for LogView {
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
            KeyCode::Char('r') => self.reload(ctx),
            KeyCode::Char('/') => ctx.push(AppCommand::OpenSearch {
                target: Self::ID.to_string(),
            }),
            KeyCode::Char('n') => self.step_search(ctx, true),
            KeyCode::Char('N') => self.step_search(ctx, false),
            KeyCode::Char('m') => self.open_menu(ctx),
            KeyCode::Char(':') => self.prompt_command(ctx),
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
        match response {
            ListMouse::Activated(_) => self.open_diff(ctx),
            ListMouse::Context(_) => self.open_menu(ctx),
            _ => {}
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
            ctx.status.error(format!("log: {error}"));
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

    fn reload(&mut self, ctx: &mut AppContext) {
        self.restore = self.selected_commit().map(|c| c.id.clone());
        self.list.clear();
        self.commits.clear();
        self.frame.set_title(Self::title(ctx));
        self.start(ctx);
        self.frame.mark_dirty();
    }

    fn on_close(&mut self, ctx: &mut AppContext) {
        if let Some(job) = &mut self.job {
            ctx.jobs.release(job);
        }
    }
}
