use std::path::PathBuf;
use std::time::Instant;

use crate::app::{draw_status_bar, AppContext};
use crate::compositor::Compositor;
use crate::config::Config;
use crate::geometry::Rect;
use crate::surface::Surface;
use crate::views::{DiffView, HelpView, LogView};
use gk_core::git::{CommitEntry, LogOptions};
use gk_core::{classify_line, DiffParserState, JobSink};
use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

const WIDTH: u16 = 60;
const HEIGHT: u16 = 12;

fn context() -> AppContext {
    let mut ctx = AppContext::new(Config::default(), PathBuf::from("/tmp/repo")).expect("ctx");
    ctx.screen = Rect::new(0, 0, i32::from(WIDTH), i32::from(HEIGHT) - 1);
    ctx.branch = Some("main".to_string());
    // rows start at the short id unless a test turns the graph on
    ctx.config.ui.graph_width = 0;
    ctx
}

fn commit(id: &str, summary: &str, author: &str) -> CommitEntry {
    CommitEntry {
        id: id.repeat(10),
        short_id: id.repeat(2),
        parents: Vec::new(),
        author: author.to_string(),
        author_time: None,
        refs: Vec::new(),
        summary: summary.to_string(),
    }
}

fn log_view(ctx: &AppContext) -> LogView {
    let mut log = LogView::empty(ctx, LogOptions::default());
    log.process_item(commit("a1b", "Fix parser", "Ada"));
    let mut tagged = commit("c2d", "Add lexer", "Grace");
    tagged.refs = vec!["tag: v1.0".to_string()];
    log.process_item(tagged);
    log
}

fn render(compositor: &mut Compositor, ctx: &AppContext) -> Buffer {
    let backend = TestBackend::new(WIDTH, HEIGHT);
    let mut terminal = Terminal::new(backend).expect("terminal");
    terminal
        .draw(|frame| {
            compositor.render(&ctx.theme);
            frame.buffer_mut().merge(compositor.canvas());
            let bar = Rect::new(0, i32::from(HEIGHT) - 1, i32::from(WIDTH), 1);
            draw_status_bar(&mut Surface::new(frame.buffer_mut()), bar, ctx, Instant::now());
        })
        .expect("draw");
    terminal.backend().buffer().clone()
}

fn buffer_text(buf: &Buffer) -> Vec<String> {
    let mut lines = Vec::new();
    for y in 0..buf.area.height {
        let mut line = String::new();
        for x in 0..buf.area.width {
            line.push_str(buf[(x, y)].symbol());
        }
        lines.push(line);
    }
    lines
}

#[test]
fn test_log_renders_commit_rows() {
    let ctx = context();
    let mut compositor = Compositor::new(ctx.screen);
    compositor.show(Box::new(log_view(&ctx)));

    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(lines[0].contains("repo [main]"), "title: {:?}", lines[0]);
    assert!(lines[1].starts_with("a1ba1b Fix parser"), "{:?}", lines[1]);
    assert!(lines[1].trim_end().ends_with("Ada unknown"), "{:?}", lines[1]);
    assert!(lines[2].starts_with("c2dc2d (tag: v1.0) Add lexer"));
    // footer on the last view row
    assert!(lines[10].contains("1/2"), "footer: {:?}", lines[10]);
}

#[test]
fn test_log_graph_column_leads_each_row() {
    let mut ctx = context();
    ctx.config.ui.graph_width = 4;
    let mut compositor = Compositor::new(ctx.screen);
    let mut log = LogView::empty(&ctx, LogOptions::default());
    let mut merge = commit("m1", "Merge topic", "Ada");
    merge.parents = vec!["b2".repeat(10), "t3".repeat(10)];
    log.process_item(merge);
    let mut topic = commit("t3", "Topic work", "Grace");
    topic.parents = vec!["b2".repeat(10)];
    log.process_item(topic);
    log.process_item(commit("b2", "Base", "Ada"));
    compositor.show(Box::new(log));

    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(lines[1].starts_with("*\\   m1m1 Merge topic"), "{:?}", lines[1]);
    assert!(lines[2].starts_with("|*   t3t3 Topic work"), "{:?}", lines[2]);
    assert!(lines[3].starts_with("*/   b2b2 Base"), "{:?}", lines[3]);
}

#[test]
fn test_status_bar_shows_branch_and_message() {
    let mut ctx = context();
    let mut compositor = Compositor::new(ctx.screen);
    compositor.show(Box::new(log_view(&ctx)));

    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(lines[11].contains("? help"));
    assert!(lines[11].trim_end().ends_with("main"));

    ctx.status.error("checkout failed");
    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(lines[11].contains("checkout failed"));
    assert!(!lines[11].contains("? help"));
}

#[test]
fn test_diff_window_floats_over_log() {
    let ctx = context();
    let mut compositor = Compositor::new(ctx.screen);
    compositor.show(Box::new(log_view(&ctx)));

    let mut diff = DiffView::empty(&ctx, "a1ba1ba1ba1b".to_string());
    let mut state = DiffParserState::new();
    for raw in ["@@ -1,2 +1,2 @@", " same", "-old", "+new"] {
        diff.process_item(classify_line(&mut state, raw));
    }
    compositor.show(Box::new(diff));

    let lines = buffer_text(&render(&mut compositor, &ctx));
    let window = compositor.find(DiffView::ID).expect("diff").frame().rect();
    let top = window.y as usize;
    let left = window.x as usize;
    assert!(lines[top][left..].starts_with("┌─ diff a1ba1ba1ba"), "{:?}", lines[top]);
    assert!(lines[top + 1].contains("@@ -1,2 +1,2 @@"));
    assert!(lines[top + 4].contains("+new"));
    // the log title row is above the window and still visible
    assert!(lines[0].contains("repo [main]"));
}

#[test]
fn test_closing_window_uncovers_log() {
    let ctx = context();
    let mut compositor = Compositor::new(ctx.screen);
    compositor.show(Box::new(log_view(&ctx)));
    compositor.show(Box::new(HelpView::new(&ctx)));

    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(lines.iter().any(|line| line.contains("keys")));

    compositor.hide(HelpView::ID);
    let lines = buffer_text(&render(&mut compositor, &ctx));
    assert!(!lines.iter().any(|line| line.contains("┌")));
    assert!(lines[1].starts_with("a1ba1b Fix parser"));
}
