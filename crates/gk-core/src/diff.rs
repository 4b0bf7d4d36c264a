//! Line classifier for streamed `git show` / `git log -p` output
//!
//! The parser keeps no hidden state: callers own a [`DiffParserState`] per
//! stream and thread it through [`classify_line`] one line at a time, in the
//! order the lines arrive.

use regex::Regex;
use std::sync::OnceLock;

/// What a line of diff output is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    /// `--- a/path` / `+++ b/path`
    FileHeader,
    /// `path | 12 ++--` summary lines before the patch
    Stat,
    /// `@@ -a,b +c,d @@`
    HunkHeader,
    Added,
    Removed,
    Context,
    /// `diff --git`, `index`, mode and rename lines, commit headers
    Info,
    /// Commit message text
    Message,
    Plain,
}

/// Display class used to pick a theme color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorClass {
    File,
    Stat,
    Hunk,
    Added,
    Removed,
    Context,
    Meta,
    Commit,
    Message,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
    pub color: ColorClass,
    /// Position of the line in the old file, for removed and context lines
    pub old: Option<(String, usize)>,
    /// Position of the line in the new file, for added and context lines
    pub new: Option<(String, usize)>,
    /// Path named by a stat line
    pub stat_path: Option<String>,
    /// Running index of this line in the stream
    pub index: usize,
}

impl DiffLine {
    /// Best path/line pair to jump to from this line (new side preferred)
    pub fn location(&self) -> Option<(&str, usize)> {
        self.new
            .as_ref()
            .or(self.old.as_ref())
            .map(|(path, line)| (path.as_str(), *line))
    }
}

/// Per-stream parser state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffParserState {
    pub old_path: Option<String>,
    pub old_line: usize,
    pub new_path: Option<String>,
    pub new_line: usize,
    pub in_file: bool,
    pub lines_seen: usize,
}

impl DiffParserState {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_file(&mut self) {
        self.old_path = None;
        self.new_path = None;
        self.old_line = 0;
        self.new_line = 0;
        self.in_file = false;
    }
}

const INFO_PREFIXES: &[&str] = &[
    "index ",
    "new file mode",
    "deleted file mode",
    "old mode",
    "new mode",
    "similarity index",
    "dissimilarity index",
    "rename from",
    "rename to",
    "copy from",
    "copy to",
    "Binary files",
    "\\ No newline",
];

const HEADER_PREFIXES: &[&str] = &[
    "Author:",
    "AuthorDate:",
    "Commit:",
    "CommitDate:",
    "Date:",
    "Merge:",
];

fn hunk_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@+ -(\d+)(?:,\d+)? \+(\d+)(?:,\d+)? @@").expect("hunk pattern is valid")
    })
}

fn stat_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(\S.*?)\s+\|\s+(?:\d+\s*[+\-]*|Bin\b.*)$").expect("stat pattern is valid")
    })
}

fn stat_summary_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\d+ files? changed").expect("stat summary pattern is valid")
    })
}

/// Strip the `a/` or `b/` prefix git puts on paths; `/dev/null` stays as is.
fn strip_side_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let path = path.trim_end_matches('\t').trim_end();
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Classify one raw line, advancing `state`.
pub fn classify_line(state: &mut DiffParserState, raw: &str) -> DiffLine {
    let index = state.lines_seen;
    state.lines_seen += 1;

    let line = |kind, color| DiffLine {
        kind,
        text: raw.to_string(),
        color,
        old: None,
        new: None,
        stat_path: None,
        index,
    };

    if let Some(caps) = hunk_regex().captures(raw) {
        let old_start: usize = caps[1].parse().unwrap_or(0);
        let new_start: usize = caps[2].parse().unwrap_or(0);
        state.old_line = old_start.saturating_sub(1);
        state.new_line = new_start.saturating_sub(1);
        state.in_file = true;
        return line(DiffLineKind::HunkHeader, ColorClass::Hunk);
    }

    if raw.starts_with("--- a/") || raw.starts_with("--- /dev/null") {
        state.old_path = Some(strip_side_prefix(&raw[4..], "a/").to_string());
        state.in_file = true;
        return line(DiffLineKind::FileHeader, ColorClass::File);
    }
    if raw.starts_with("+++ b/") || raw.starts_with("+++ /dev/null") {
        state.new_path = Some(strip_side_prefix(&raw[4..], "b/").to_string());
        state.in_file = true;
        return line(DiffLineKind::FileHeader, ColorClass::File);
    }

    if let Some(rest) = raw.strip_prefix("diff ") {
        state.close_file();
        state.in_file = true;
        // `diff --git a/x b/y`: remember both sides until ---/+++ confirm them
        let mut parts = rest.split_whitespace().filter(|p| !p.starts_with("--"));
        if let (Some(old), Some(new)) = (parts.next(), parts.next()) {
            state.old_path = Some(strip_side_prefix(old, "a/").to_string());
            state.new_path = Some(strip_side_prefix(new, "b/").to_string());
        }
        return line(DiffLineKind::Info, ColorClass::File);
    }
    if is_commit_line(raw) {
        state.close_file();
        return line(DiffLineKind::Info, ColorClass::Commit);
    }
    if INFO_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return line(DiffLineKind::Info, ColorClass::Meta);
    }

    if state.in_file {
        let old_path = state.old_path.clone().unwrap_or_default();
        let new_path = state.new_path.clone().unwrap_or_default();
        match raw.as_bytes().first() {
            Some(b' ') => {
                state.old_line += 1;
                state.new_line += 1;
                let mut out = line(DiffLineKind::Context, ColorClass::Context);
                out.old = Some((old_path, state.old_line));
                out.new = Some((new_path, state.new_line));
                return out;
            }
            Some(b'+') => {
                state.new_line += 1;
                let mut out = line(DiffLineKind::Added, ColorClass::Added);
                out.new = Some((new_path, state.new_line));
                return out;
            }
            Some(b'-') => {
                state.old_line += 1;
                let mut out = line(DiffLineKind::Removed, ColorClass::Removed);
                out.old = Some((old_path, state.old_line));
                return out;
            }
            // An empty line inside a patch is a context line whose space was
            // stripped by some tool along the way.
            None => {
                state.old_line += 1;
                state.new_line += 1;
                let mut out = line(DiffLineKind::Context, ColorClass::Context);
                out.old = Some((old_path, state.old_line));
                out.new = Some((new_path, state.new_line));
                return out;
            }
            _ => return line(DiffLineKind::Plain, ColorClass::Plain),
        }
    }

    if HEADER_PREFIXES.iter().any(|prefix| raw.starts_with(prefix)) {
        return line(DiffLineKind::Info, ColorClass::Meta);
    }
    if let Some(caps) = stat_regex().captures(raw) {
        let mut out = line(DiffLineKind::Stat, ColorClass::Stat);
        out.stat_path = Some(caps[1].trim().to_string());
        return out;
    }
    if stat_summary_regex().is_match(raw) {
        return line(DiffLineKind::Stat, ColorClass::Stat);
    }
    if raw.is_empty() || raw.starts_with("    ") {
        return line(DiffLineKind::Message, ColorClass::Message);
    }

    line(DiffLineKind::Plain, ColorClass::Plain)
}

fn is_commit_line(raw: &str) -> bool {
    let Some(rest) = raw.strip_prefix("commit ") else {
        return false;
    };
    let hash = rest.split_whitespace().next().unwrap_or("");
    hash.len() >= 7 && hash.chars().all(|c| c.is_ascii_hexdigit())
}
