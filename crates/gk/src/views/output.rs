//! Output of a user-typed git command run against one commit

use super::{draw_list, list_footer, list_mouse, mouse_outcome, window_rect};
use crate::app::{AppCommand, AppContext};
use crate::config::{Theme, Tone};
use crate::input::MouseInput;
use crate::item::Item;
use crate::list::ListView;
use crate::search::SearchQuery;
use crate::surface::Surface;
use crate::view::{DisplayMode, MouseOutcome, View, ViewFrame};
use crossterm::event::{KeyCode, KeyEvent};
use gk_core::{Job, JobMessage, JobSink, JobSpec};

const NO_OUTPUT: &str = "Command executed successfully with no output.";

pub struct OutputView {
    frame: ViewFrame,
    list: ListView<Item>,
    job: Option<Job<String>>,
    exit_code: Option<Option<i32>>,
}

impl OutputView {
    pub const ID: &'static str = "output";

    /// Run `git <args> <commit>` in the repository root
    pub fn new(ctx: &mut AppContext, args: Vec<String>, commit: String) -> Self {
        let mut view = Self::empty(ctx);
        let argv = std::iter::once("git".to_string())
            .chain(args)
            .chain(std::iter::once(commit))
            .collect();
        let spec = JobSpec::lines(Self::ID, argv).current_dir(&ctx.repo_root);
        let job = ctx.jobs.start(spec);
        tracing::info!(command = %job.argv().join(" "), "running user command");
        view.frame.set_title(job.argv().join(" "));
        view.job = Some(job);
        view
    }

    pub(crate) fn empty(ctx: &AppContext) -> Self {
        let mut frame = ViewFrame::new(Self::ID, DisplayMode::Window, window_rect(ctx.screen));
        frame.set_title("git");
        Self {
            frame,
            list: ListView::new(ctx.config.ui.scroll_align),
            job: None,
            exit_code: None,
        }
    }

    fn loading(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.is_pending())
    }

    fn update_footer(&mut self) {
        let mut footer = list_footer(&self.list, self.loading());
        if let Some(code) = self.exit_code.filter(|code| *code != Some(0)) {
            match code {
                Some(code) => footer.push_str(&format!(" (exited {code})")),
                None => footer.push_str(" (killed)"),
            }
        }
        self.frame.set_footer(Some(footer));
    }

    fn push_line(&mut self, text: String, tone: Tone) {
        self.list.push(Item::plain(text, tone));
        self.list.ensure_selection();
    }

    fn toggle_fullscreen(&mut self, ctx: &AppContext) {
        let mode = match self.frame.mode() {
            DisplayMode::Fullscreen => DisplayMode::Window,
            _ => DisplayMode::Fullscreen,
        };
        self.frame.set_mode(mode, ctx.screen);
    }
}

impl JobSink<String> for OutputView {
    fn process_item(&mut self, line: String) {
        self.push_line(line, Tone::Text);
    }

    /// Stderr is part of the output here, not a status bar error
    fn process_message(&mut self, message: &JobMessage) {
        if let JobMessage::Error(text) = message {
            self.push_line(text.clone(), Tone::Error);
        }
    }

    fn on_finished(&mut self, code: Option<i32>) {
        self.exit_code = Some(code);
        if self.list.is_empty() && code == Some(0) {
            self.push_line(NO_OUTPUT.to_string(), Tone::Muted);
        }
    }
}

impl View for OutputView {
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

    fn handle_mouse(&mut self, input: &MouseInput, _ctx: &mut AppContext) -> MouseOutcome {
        let response = list_mouse(&self.frame, &mut self.list, input);
        let outcome = mouse_outcome(&response);
        if outcome != MouseOutcome::Ignored {
            self.frame.mark_dirty();
        }
        outcome
    }

    fn poll_jobs(&mut self, _ctx: &mut AppContext) {
        let Some(mut job) = self.job.take() else {
            return;
        };
        let stats = job.drain(self);
        self.job = Some(job);
        if stats.items > 0 || stats.errors > 0 || stats.finished {
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
