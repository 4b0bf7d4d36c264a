//! Application state shared with panels, and the main loop
//!
//! Panels never reach each other directly. They get `&mut AppContext` in
//! their callbacks and queue [`AppCommand`]s on it; the loop applies the
//! queue between input handling and drawing.

use crate::compositor::Compositor;
use crate::config::{Config, Theme, Tone};
use crate::geometry::Rect;
use crate::input::{EventNormalizer, InputRouter, UiEvent};
use crate::search::SearchQuery;
use crate::surface::Surface;
use crate::time_format::TimeFormatter;
use crate::view::View;
use crate::views::{
    BlameView, DiffView, HelpView, LogView, MenuView, NameKind, OutputView, PromptView,
};
use anyhow::Result;
use crossterm::event::{self, KeyCode, KeyEvent, KeyModifiers};
use gk_core::git::{self, LogOptions, Mutation};
use gk_core::{JobError, JobRunner};
use ratatui::backend::Backend;
use ratatui::style::Style;
use ratatui::{Frame, Terminal};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

/// Input poll timeout while any job is producing
const BUSY_POLL: Duration = Duration::from_millis(20);
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Cross-panel requests, applied by the main loop in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Close(String),
    OpenDiff {
        commit: String,
    },
    /// `commit` of `None` blames the working tree
    OpenBlame {
        commit: Option<String>,
        path: String,
        line: usize,
    },
    OpenSearch {
        target: String,
    },
    ApplySearch {
        target: String,
        pattern: String,
        regex: bool,
        case_sensitive: bool,
    },
    OpenMenu {
        commit: String,
        summary: String,
    },
    PromptName {
        kind: NameKind,
        commit: String,
    },
    RunMutation {
        mutation: Mutation,
        commit: String,
    },
    /// Ask for a git command to run against `commit`
    OpenCommand {
        commit: String,
    },
    /// `git <args> <commit>`, output streamed into its own panel
    RunCommand {
        args: Vec<String>,
        commit: String,
    },
    ShowHelp,
    Quit,
}

/// Transient message on the status bar
#[derive(Debug)]
pub struct StatusLine {
    message: Option<(String, Tone, Instant)>,
    timeout: Duration,
}

impl StatusLine {
    pub fn new(timeout: Duration) -> Self {
        Self {
            message: None,
            timeout,
        }
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.set(text.into(), Tone::Text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.set(text.into(), Tone::Warning);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.set(text.into(), Tone::Error);
    }

    fn set(&mut self, text: String, tone: Tone) {
        self.message = Some((text, tone, Instant::now()));
    }

    /// The message, unless it has expired by `now`
    pub fn current(&self, now: Instant) -> Option<(&str, Tone)> {
        self.message
            .as_ref()
            .filter(|(_, _, at)| now.saturating_duration_since(*at) < self.timeout)
            .map(|(text, tone, _)| (text.as_str(), *tone))
    }

    pub fn clear(&mut self) {
        self.message = None;
    }
}

pub struct AppContext {
    pub config: Config,
    pub theme: Theme,
    pub times: TimeFormatter,
    pub repo_root: PathBuf,
    pub branch: Option<String>,
    pub jobs: JobRunner,
    pub status: StatusLine,
    pub commands: Vec<AppCommand>,
    /// Area available to views (the terminal minus the status bar)
    pub screen: Rect,
}

impl AppContext {
    pub fn new(config: Config, repo_root: PathBuf) -> Result<Self, JobError> {
        let theme = config.theme.resolve();
        let times = TimeFormatter::new(config.ui.time_mode, &config.ui.time_format);
        let status = StatusLine::new(Duration::from_millis(config.ui.status_timeout_ms));
        Ok(Self {
            config,
            theme,
            times,
            repo_root,
            branch: None,
            jobs: JobRunner::new()?,
            status,
            commands: Vec::new(),
            screen: Rect::default(),
        })
    }

    pub fn push(&mut self, command: AppCommand) {
        self.commands.push(command);
    }

    pub fn refresh_branch(&mut self) {
        self.branch = git::get_current_branch(&self.repo_root).ok();
    }
}

/// Screen rows left for views once the status bar takes the last one
fn view_area(width: u16, height: u16) -> Rect {
    Rect::new(0, 0, i32::from(width), (i32::from(height) - 1).max(0))
}

pub struct App {
    pub ctx: AppContext,
    pub compositor: Compositor,
    router: InputRouter,
    normalizer: EventNormalizer,
    quit: bool,
}

impl App {
    pub fn new(mut ctx: AppContext, options: LogOptions, width: u16, height: u16) -> Self {
        let screen = view_area(width, height);
        ctx.screen = screen;
        let normalizer =
            EventNormalizer::new(Duration::from_millis(ctx.config.ui.double_click_ms));
        let mut compositor = Compositor::new(screen);
        let log = LogView::new(&mut ctx, options);
        compositor.show(Box::new(log));
        Self {
            ctx,
            compositor,
            router: InputRouter::new(),
            normalizer,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn poll_jobs(&mut self) {
        for view in self.compositor.views_mut() {
            view.poll_jobs(&mut self.ctx);
        }
    }

    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Key(key) => self.handle_key(&key),
            UiEvent::Mouse(input) => {
                self.router
                    .route_mouse(&input, &mut self.compositor, &mut self.ctx)
            }
            UiEvent::Resize(width, height) => self.resize(width, height),
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        let screen = view_area(width, height);
        self.ctx.screen = screen;
        self.compositor.resize(screen);
    }

    fn handle_key(&mut self, key: &KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit = true;
            return;
        }
        if self
            .router
            .route_key(key, &mut self.compositor, &mut self.ctx)
        {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                if let Some(top) = self.compositor.top() {
                    let id = top.frame().id().to_string();
                    self.close(&id);
                }
            }
            KeyCode::Char('?') => self.ctx.push(AppCommand::ShowHelp),
            _ => {}
        }
    }

    /// Remove a view; closing the last one ends the program
    fn close(&mut self, id: &str) {
        if let Some(mut view) = self.compositor.hide(id) {
            view.on_close(&mut self.ctx);
        }
        if id == LogView::ID || self.compositor.is_empty() {
            self.quit = true;
        }
    }

    fn open(&mut self, view: Box<dyn View>) {
        if let Some(mut replaced) = self.compositor.show(view) {
            replaced.on_close(&mut self.ctx);
        }
    }

    /// Apply queued commands, including any queued while applying
    pub fn apply_commands(&mut self) {
        while !self.ctx.commands.is_empty() {
            let commands = std::mem::take(&mut self.ctx.commands);
            for command in commands {
                self.apply(command);
            }
        }
    }

    fn apply(&mut self, command: AppCommand) {
        tracing::debug!(?command, "apply");
        match command {
            AppCommand::Close(id) => self.close(&id),
            AppCommand::OpenDiff { commit } => {
                let view = DiffView::new(&mut self.ctx, commit);
                self.open(Box::new(view));
            }
            AppCommand::OpenBlame { commit, path, line } => {
                let view = BlameView::new(&mut self.ctx, commit, path, line);
                self.open(Box::new(view));
            }
            AppCommand::OpenSearch { target } => {
                let Some(view) = self.compositor.find(&target) else {
                    return;
                };
                let prompt = PromptView::search(&self.ctx, target, view.current_search());
                self.open(Box::new(prompt));
            }
            AppCommand::ApplySearch {
                target,
                pattern,
                regex,
                case_sensitive,
            } => {
                let query = SearchQuery::new(&pattern, regex, case_sensitive);
                if query.as_ref().is_some_and(SearchQuery::fell_back) {
                    self.ctx
                        .status
                        .warn(format!("invalid regex, searching for \"{pattern}\" literally"));
                }
                self.ctx.config.search.regex = regex;
                self.ctx.config.search.case_sensitive = case_sensitive;
                if let Some(view) = self.compositor.find_mut(&target) {
                    view.apply_search(query);
                    view.frame_mut().mark_dirty();
                }
            }
            AppCommand::OpenMenu { commit, summary } => {
                let menu = MenuView::new(&self.ctx, commit, summary);
                self.open(Box::new(menu));
            }
            AppCommand::PromptName { kind, commit } => {
                let prompt = PromptView::name(&self.ctx, kind, commit);
                self.open(Box::new(prompt));
            }
            AppCommand::RunMutation { mutation, commit } => self.run_mutation(&mutation, &commit),
            AppCommand::OpenCommand { commit } => {
                let prompt = PromptView::command(&self.ctx, commit);
                self.open(Box::new(prompt));
            }
            AppCommand::RunCommand { args, commit } => {
                let view = OutputView::new(&mut self.ctx, args, commit);
                self.open(Box::new(view));
            }
            AppCommand::ShowHelp => self.open(Box::new(HelpView::new(&self.ctx))),
            AppCommand::Quit => self.quit = true,
        }
    }

    fn run_mutation(&mut self, mutation: &Mutation, commit: &str) {
        let short: String = commit.chars().take(7).collect();
        match mutation.run(&self.ctx.repo_root, commit) {
            Ok(_) => {
                tracing::info!(action = mutation.label(), commit, "mutation done");
                self.ctx
                    .status
                    .info(format!("{} {short}: done", mutation.label()));
            }
            Err(err) => {
                tracing::error!(action = mutation.label(), commit, %err, "mutation failed");
                self.ctx
                    .status
                    .error(format!("{} {short} failed: {err}", mutation.label()));
            }
        }
        self.ctx.refresh_branch();
        if let Some(log) = self.compositor.find_mut(LogView::ID) {
            log.reload(&mut self.ctx);
        }
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        self.compositor.render(&self.ctx.theme);
        let buffer = frame.buffer_mut();
        buffer.merge(self.compositor.canvas());

        let area = frame.area();
        if area.height == 0 {
            return;
        }
        let bar = Rect::new(
            0,
            i32::from(area.height) - 1,
            i32::from(area.width),
            1,
        );
        let mut surface = Surface::new(frame.buffer_mut());
        draw_status_bar(&mut surface, bar, &self.ctx, Instant::now());
    }
}

/// Message (or key hints) on the left, job indicator and branch on the right
pub fn draw_status_bar(surface: &mut Surface, bar: Rect, ctx: &AppContext, now: Instant) {
    let theme = &ctx.theme;
    let base = Style::default().bg(theme.status_bar).fg(theme.text);
    surface.fill(bar, base);

    let mut right = String::new();
    let running = ctx.jobs.running();
    if running > 0 {
        right.push_str(&format!("loading ({running}) "));
    }
    if let Some(branch) = &ctx.branch {
        right.push_str(&format!(" {branch} "));
    }
    let right_x = bar.end_x() - right.width() as i32;
    let left_width = (right_x - bar.x - 1).max(0);

    let mut left = surface.clipped(Rect::new(bar.x, bar.y, left_width, 1));
    match ctx.status.current(now) {
        Some((text, tone)) => {
            left.put_str(bar.x + 1, bar.y, text, base.fg(theme.fg(tone)));
        }
        None => {
            left.put_str(
                bar.x + 1,
                bar.y,
                "? help  q close  / search",
                base.fg(theme.text_muted),
            );
        }
    }
    surface.put_str(right_x.max(bar.x), bar.y, &right, base.fg(theme.accent));
}

/// Drain jobs, apply commands, draw, then wait for input
pub fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        app.poll_jobs();
        app.apply_commands();
        if app.should_quit() {
            break;
        }
        terminal.draw(|frame| app.draw(frame))?;

        let timeout = if app.ctx.jobs.any_running() {
            BUSY_POLL
        } else {
            IDLE_POLL
        };
        if !event::poll(timeout)? {
            continue;
        }
        loop {
            let raw = event::read()?;
            if let Some(event) = app.normalizer.translate(&raw, Instant::now()) {
                app.handle_event(event);
            }
            if app.should_quit() || !event::poll(Duration::ZERO)? {
                break;
            }
        }
    }

    app.ctx.jobs.stop_all();
    Ok(())
}
