//! gk - terminal repository browser with overlapping panels

mod app;
mod color;
mod compositor;
mod config;
mod geometry;
mod input;
mod item;
mod list;
mod logging;
mod search;
mod segment;
mod surface;
mod time_format;
mod view;
mod views;

use anyhow::{Context, Result};
use app::{App, AppContext};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gk_core::git::{self, LogOptions};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gk")]
#[command(author, version, about = "A terminal repository browser")]
struct Args {
    /// Revisions to list (defaults to HEAD)
    revisions: Vec<String>,

    /// Restrict the history to these paths
    #[arg(last = true)]
    paths: Vec<String>,

    /// List commits reachable from all refs
    #[arg(short, long)]
    all: bool,

    /// Stop after this many commits
    #[arg(short = 'n', long)]
    max_count: Option<usize>,

    /// Only commits by authors matching this pattern
    #[arg(long)]
    author: Option<String>,

    /// Only commits more recent than this date
    #[arg(long)]
    since: Option<String>,

    /// Only commits older than this date
    #[arg(long)]
    until: Option<String>,

    /// Only commits whose message matches this pattern
    #[arg(long)]
    grep: Option<String>,

    /// Only merge commits
    #[arg(long, conflicts_with = "no_merges")]
    merges: bool,

    /// Leave out merge commits
    #[arg(long)]
    no_merges: bool,

    /// Follow only the first parent of merges
    #[arg(long)]
    first_parent: bool,

    /// Write diagnostics to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Treat search patterns as regular expressions by default
    #[arg(long)]
    regex: bool,

    /// Make searches case sensitive by default
    #[arg(long)]
    case_sensitive: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = config::Config::load();

    // CLI overrides config
    config.log.all |= args.all;
    if args.max_count.is_some() {
        config.log.max_count = args.max_count;
    }
    if args.log_file.is_some() {
        config.log.file = args.log_file.clone();
    }
    config.search.regex |= args.regex;
    config.search.case_sensitive |= args.case_sensitive;

    logging::init(config.log.file.as_deref())?;

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    if !git::is_git_repo(&cwd) {
        anyhow::bail!("Not in a git repository.\n\nUsage: gk [revisions...] [-- paths...]");
    }
    let repo_root = git::get_repo_root(&cwd).context("Failed to get git repository root")?;

    let options = LogOptions {
        all: config.log.all,
        max_count: config.log.max_count,
        revisions: args.revisions,
        paths: args.paths,
        author: args.author,
        since: args.since,
        until: args.until,
        grep: args.grep,
        merges: args.merges,
        no_merges: args.no_merges,
        first_parent: args.first_parent,
    };

    let mut ctx = AppContext::new(config, repo_root).context("Failed to start job runner")?;
    ctx.refresh_branch();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let size = terminal.size()?;
    let mut app = App::new(ctx, options, size.width, size.height);
    let result = app::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!("{err:#}");
        eprintln!("Error: {:#}", err);
        return Err(err);
    }

    tracing::info!("gk exited");
    Ok(())
}
