//! Incremental parser for `git blame --porcelain`
//!
//! Porcelain output only describes a commit the first time it appears, so the
//! parser remembers every commit it has seen and attaches that metadata to
//! each subsequent line.

use std::collections::HashMap;

/// One blamed line of the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub commit: String,
    pub author: String,
    pub author_time: Option<i64>,
    pub summary: String,
    /// Line number in the original commit
    pub orig_line: usize,
    /// Line number in the blamed file
    pub line: usize,
    pub text: String,
    pub uncommitted: bool,
}

impl BlameLine {
    pub fn short_commit(&self) -> &str {
        if self.commit.len() > 8 {
            &self.commit[..8]
        } else {
            &self.commit
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CommitInfo {
    author: String,
    author_time: Option<i64>,
    summary: String,
}

#[derive(Debug, Clone)]
struct PendingLine {
    commit: String,
    orig_line: usize,
    line: usize,
}

#[derive(Debug, Default)]
pub struct BlameParser {
    commits: HashMap<String, CommitInfo>,
    current: Option<PendingLine>,
}

impl BlameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of porcelain output; yields a record on each content line.
    pub fn push_line(&mut self, raw: &str) -> Option<BlameLine> {
        if let Some(text) = raw.strip_prefix('\t') {
            let pending = self.current.take()?;
            let info = self
                .commits
                .get(&pending.commit)
                .cloned()
                .unwrap_or_default();
            let uncommitted =
                pending.commit.chars().all(|c| c == '0') || info.author == "Not Committed Yet";
            return Some(BlameLine {
                commit: pending.commit,
                author: info.author,
                author_time: info.author_time,
                summary: info.summary,
                orig_line: pending.orig_line,
                line: pending.line,
                text: text.to_string(),
                uncommitted,
            });
        }

        let Some(commit) = self.current.as_ref().map(|p| p.commit.clone()) else {
            self.start_line(raw);
            return None;
        };

        let info = self.commits.entry(commit).or_default();
        if let Some(rest) = raw.strip_prefix("author ") {
            info.author = rest.to_string();
        } else if let Some(rest) = raw.strip_prefix("author-time ") {
            info.author_time = rest.trim().parse::<i64>().ok();
        } else if let Some(rest) = raw.strip_prefix("summary ") {
            info.summary = rest.to_string();
        }
        None
    }

    /// Header line: `<sha> <orig-line> <final-line> [<group-size>]`
    fn start_line(&mut self, raw: &str) {
        let mut parts = raw.split_whitespace();
        let (Some(commit), Some(orig_line), Some(line)) = (parts.next(), parts.next(), parts.next())
        else {
            return;
        };
        if commit.len() < 40 || !commit.chars().all(|c| c.is_ascii_hexdigit()) {
            return;
        }
        let (Ok(orig_line), Ok(line)) = (orig_line.parse::<usize>(), line.parse::<usize>()) else {
            return;
        };
        self.commits.entry(commit.to_string()).or_default();
        self.current = Some(PendingLine {
            commit: commit.to_string(),
            orig_line,
            line,
        });
    }
}
