//! gk-core - job pipeline, diff stream classifier and git plumbing for gk
//!
//! Nothing in this crate touches terminal state. Streaming commands run as
//! [`job::Job`]s whose output is drained by the UI once per frame, and the
//! text they produce is classified by [`diff::classify_line`] or
//! [`blame::BlameParser`].

pub mod blame;
pub mod diff;
pub mod git;
pub mod graph;
pub mod job;

pub use blame::{BlameLine, BlameParser};
pub use diff::{classify_line, ColorClass, DiffLine, DiffLineKind, DiffParserState};
pub use git::{CommandOutput, CommitEntry, GitError};
pub use graph::GraphBuilder;
pub use job::{DrainStats, Job, JobError, JobMessage, JobRunner, JobSink, JobSpec};
