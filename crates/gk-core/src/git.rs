//! Git command plumbing: one-shot queries, argv for streaming jobs, and the
//! record formats those jobs produce

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository")]
    NotARepo,
    #[error("Git command failed: {0}")]
    CommandFailed(String),
    #[error("Empty command")]
    EmptyCommand,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a blocking command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// First non-empty line of stderr, falling back to stdout
    pub fn summary(&self) -> String {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("")
            .to_string()
    }
}

/// Commit metadata for log rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub id: String,
    pub short_id: String,
    pub parents: Vec<String>,
    pub author: String,
    pub author_time: Option<i64>,
    /// Decorations (`HEAD -> main`, `tag: v1.0`, ...)
    pub refs: Vec<String>,
    pub summary: String,
}

impl CommitEntry {
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// What the log panel asks git for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogOptions {
    pub all: bool,
    pub max_count: Option<usize>,
    pub revisions: Vec<String>,
    pub paths: Vec<String>,
    pub author: Option<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    /// Message pattern
    pub grep: Option<String>,
    pub merges: bool,
    pub no_merges: bool,
    pub first_parent: bool,
}

const FIELD_SEP: char = '\u{1f}';
const LOG_FORMAT: &str = "%H%x1f%h%x1f%P%x1f%an%x1f%at%x1f%D%x1f%s";

/// Check if a directory is a git repository
pub fn is_git_repo(path: &Path) -> bool {
    Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--git-dir")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Get the current git branch name
pub fn get_current_branch(path: &Path) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--abbrev-ref")
        .arg("HEAD")
        .output()?;

    if !output.status.success() {
        return Err(GitError::NotARepo);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get the root of the git repository
pub fn get_repo_root(path: &Path) -> Result<PathBuf, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(path)
        .arg("rev-parse")
        .arg("--show-toplevel")
        .output()?;

    if !output.status.success() {
        return Err(GitError::NotARepo);
    }

    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PathBuf::from(root))
}

/// Run a command to completion and capture its output
pub fn run_command_sync(argv: &[String], cwd: Option<&Path>) -> Result<CommandOutput, GitError> {
    let (program, args) = argv.split_first().ok_or(GitError::EmptyCommand)?;
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    tracing::debug!(argv = ?argv, "running command");
    let output = cmd.output()?;
    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn git_argv(args: &[&str]) -> Vec<String> {
    std::iter::once("git")
        .chain(args.iter().copied())
        .map(str::to_string)
        .collect()
}

/// argv for the streaming log job; one record per line
pub fn log_args(options: &LogOptions) -> Vec<String> {
    let format = format!("--pretty=format:{LOG_FORMAT}");
    let mut argv = git_argv(&["log", "--date-order", "--decorate=short", format.as_str()]);
    if let Some(count) = options.max_count {
        argv.push(format!("--max-count={count}"));
    }
    if options.all {
        argv.push("--all".to_string());
    }
    let filters = [
        ("author", &options.author),
        ("since", &options.since),
        ("until", &options.until),
        ("grep", &options.grep),
    ];
    for (flag, value) in filters {
        if let Some(value) = value {
            argv.push(format!("--{flag}={value}"));
        }
    }
    if options.merges {
        argv.push("--merges".to_string());
    }
    if options.no_merges {
        argv.push("--no-merges".to_string());
    }
    if options.first_parent {
        argv.push("--first-parent".to_string());
    }
    argv.extend(options.revisions.iter().cloned());
    if !options.paths.is_empty() {
        argv.push("--".to_string());
        argv.extend(options.paths.iter().cloned());
    }
    argv
}

/// argv for the streaming diff job of one commit
pub fn show_args(commit: &str) -> Vec<String> {
    git_argv(&[
        "show",
        "--stat",
        "--patch",
        "--format=fuller",
        "--no-color",
        "--no-ext-diff",
        commit,
    ])
}

/// argv for the streaming blame job; `commit` of `None` blames the worktree
pub fn blame_args(commit: Option<&str>, path: &str) -> Vec<String> {
    let mut argv = git_argv(&["blame", "--porcelain"]);
    if let Some(commit) = commit {
        argv.push(commit.to_string());
    }
    argv.push("--".to_string());
    argv.push(path.to_string());
    argv
}

/// Parse one `LOG_FORMAT` record
pub fn parse_log_record(line: &str) -> Option<CommitEntry> {
    let parts: Vec<&str> = line.splitn(7, FIELD_SEP).collect();
    if parts.len() < 7 {
        return None;
    }
    let id = parts[0].trim();
    if id.is_empty() {
        return None;
    }
    let parents = parts[2].split_whitespace().map(str::to_string).collect();
    let refs = parts[5]
        .split(", ")
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();
    Some(CommitEntry {
        id: id.to_string(),
        short_id: parts[1].to_string(),
        parents,
        author: parts[3].to_string(),
        author_time: parts[4].trim().parse::<i64>().ok(),
        refs,
        summary: parts[6].to_string(),
    })
}

/// Repository mutations offered on a selected revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Checkout,
    CherryPick,
    Revert,
    Reset,
    CreateBranch(String),
    CreateTag(String),
}

impl Mutation {
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::Checkout => "Checkout",
            Mutation::CherryPick => "Cherry-pick",
            Mutation::Revert => "Revert",
            Mutation::Reset => "Reset branch here",
            Mutation::CreateBranch(_) => "Create branch",
            Mutation::CreateTag(_) => "Create tag",
        }
    }

    pub fn args(&self, commit: &str) -> Vec<String> {
        match self {
            Mutation::Checkout => git_argv(&["checkout", "--detach", commit]),
            Mutation::CherryPick => git_argv(&["cherry-pick", commit]),
            Mutation::Revert => git_argv(&["revert", "--no-edit", commit]),
            Mutation::Reset => git_argv(&["reset", "--mixed", commit]),
            Mutation::CreateBranch(name) => git_argv(&["branch", name.as_str(), commit]),
            Mutation::CreateTag(name) => git_argv(&["tag", name.as_str(), commit]),
        }
    }

    /// Run against the repository at `repo_root`
    pub fn run(&self, repo_root: &Path, commit: &str) -> Result<CommandOutput, GitError> {
        let output = run_command_sync(&self.args(commit), Some(repo_root))?;
        if !output.success() {
            return Err(GitError::CommandFailed(output.summary()));
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_record() {
        let line = "abc123\u{1f}abc\u{1f}p1 p2\u{1f}Ada\u{1f}1700000000\u{1f}HEAD -> main, tag: v1\u{1f}Merge | things";
        let entry = parse_log_record(line).unwrap();
        assert_eq!(entry.id, "abc123");
        assert_eq!(entry.short_id, "abc");
        assert_eq!(entry.parents, vec!["p1", "p2"]);
        assert!(entry.is_merge());
        assert_eq!(entry.author_time, Some(1_700_000_000));
        assert_eq!(entry.refs, vec!["HEAD -> main", "tag: v1"]);
        assert_eq!(entry.summary, "Merge | things");
    }

    #[test]
    fn test_parse_log_record_rejects_partial_lines() {
        assert_eq!(parse_log_record("not a record"), None);
        assert_eq!(parse_log_record(""), None);
    }

    #[test]
    fn test_log_args() {
        let options = LogOptions {
            all: true,
            max_count: Some(50),
            revisions: vec!["main".to_string()],
            paths: vec!["src".to_string()],
            ..Default::default()
        };
        let argv = log_args(&options);
        assert_eq!(argv[0], "git");
        assert_eq!(argv[1], "log");
        assert!(argv.contains(&"--max-count=50".to_string()));
        assert!(argv.contains(&"--all".to_string()));
        let dashdash = argv.iter().position(|a| a == "--").unwrap();
        assert_eq!(argv[dashdash - 1], "main");
        assert_eq!(argv[dashdash + 1], "src");
    }

    #[test]
    fn test_log_args_filters_precede_revisions() {
        let options = LogOptions {
            revisions: vec!["v1.0..main".to_string()],
            author: Some("Ada Lovelace".to_string()),
            since: Some("2 weeks ago".to_string()),
            grep: Some("fix".to_string()),
            no_merges: true,
            first_parent: true,
            ..Default::default()
        };
        let argv = log_args(&options);
        for flag in [
            "--author=Ada Lovelace",
            "--since=2 weeks ago",
            "--grep=fix",
            "--no-merges",
            "--first-parent",
        ] {
            let at = argv.iter().position(|a| a == flag).unwrap();
            assert!(at < argv.len() - 1, "{flag} must come before the revisions");
        }
        assert!(!argv.iter().any(|a| a.starts_with("--until") || a == "--merges"));
        assert_eq!(argv.last().unwrap(), "v1.0..main");
    }

    #[test]
    fn test_mutation_args() {
        assert_eq!(
            Mutation::CreateBranch("topic".into()).args("abc"),
            vec!["git", "branch", "topic", "abc"]
        );
        assert_eq!(
            Mutation::Revert.args("abc"),
            vec!["git", "revert", "--no-edit", "abc"]
        );
    }

    #[test]
    fn test_run_command_sync_empty_argv() {
        assert!(matches!(
            run_command_sync(&[], None),
            Err(GitError::EmptyCommand)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_command_sync_captures_streams() {
        let argv: Vec<String> = ["sh", "-c", "echo out; echo err >&2; exit 2"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let output = run_command_sync(&argv, None).unwrap();
        assert_eq!(output.code, Some(2));
        assert!(!output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.summary(), "err");
    }
}
