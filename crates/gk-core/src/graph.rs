//! Lane assignment for the log's graph column
//!
//! Commits arrive newest first, the order `git log --date-order` prints
//! them. Each lane remembers the commit it is waiting for; a commit lands in
//! the lane that waits for it (or the first free one) and the lane then
//! waits for its first parent. Merge parents beyond the first get lanes of
//! their own to the right.

use crate::git::CommitEntry;

const COMMIT: char = '*';
const LANE: char = '|';
const MERGE_FILL: char = '-';

/// Builds one graph cell string per commit, in display order
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    /// Commit id each lane waits for
    lanes: Vec<Option<String>>,
    max_width: usize,
}

impl GraphBuilder {
    /// `max_width` caps the returned strings, not the lane bookkeeping
    pub fn new(max_width: usize) -> Self {
        Self {
            lanes: Vec::new(),
            max_width,
        }
    }

    pub fn reset(&mut self) {
        self.lanes.clear();
    }

    /// Lanes still waiting for a commit
    pub fn active_lanes(&self) -> usize {
        self.lanes.iter().filter(|lane| lane.is_some()).count()
    }

    fn free_lane(&mut self, from: usize) -> usize {
        match self.lanes.iter().skip(from).position(Option::is_none) {
            Some(offset) => from + offset,
            None => {
                self.lanes.push(None);
                self.lanes.len() - 1
            }
        }
    }

    /// Cells for `commit`, one char per lane, trailing blanks trimmed
    pub fn push(&mut self, commit: &CommitEntry) -> String {
        let id = commit.id.as_str();
        let col = match self.lanes.iter().position(|l| l.as_deref() == Some(id)) {
            Some(col) => col,
            None => self.free_lane(0),
        };

        let mut cells = vec![' '; self.lanes.len()];
        for (i, lane) in self.lanes.iter_mut().enumerate() {
            let converging = lane.as_deref() == Some(id);
            if i == col {
                cells[i] = COMMIT;
            } else if converging {
                cells[i] = if i > col { '/' } else { '\\' };
                *lane = None;
            } else if lane.is_some() {
                cells[i] = LANE;
            }
        }

        self.lanes[col] = commit.parents.first().cloned();
        if commit.is_merge() {
            for parent in &commit.parents[1..] {
                let existing = self
                    .lanes
                    .iter()
                    .position(|l| l.as_ref() == Some(parent));
                let target = match existing {
                    Some(target) if target == col => continue,
                    Some(target) => target,
                    None => {
                        let target = self.free_lane(col + 1);
                        self.lanes[target] = Some(parent.clone());
                        cells.resize(self.lanes.len(), ' ');
                        cells[target] = '\\';
                        target
                    }
                };
                let between = if target > col {
                    col + 1..target
                } else {
                    target + 1..col
                };
                for cell in &mut cells[between] {
                    if *cell == ' ' {
                        *cell = MERGE_FILL;
                    }
                }
            }
        }

        while matches!(self.lanes.last(), Some(None)) {
            self.lanes.pop();
        }

        let graph: String = cells.into_iter().take(self.max_width).collect();
        graph.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(id: &str, parents: &[&str]) -> CommitEntry {
        CommitEntry {
            id: id.to_string(),
            short_id: id.to_string(),
            parents: parents.iter().map(|p| p.to_string()).collect(),
            author: "a".to_string(),
            author_time: None,
            refs: Vec::new(),
            summary: String::new(),
        }
    }

    fn rows(builder: &mut GraphBuilder, commits: &[CommitEntry]) -> Vec<String> {
        commits.iter().map(|c| builder.push(c)).collect()
    }

    #[test]
    fn test_linear_history_is_one_lane() {
        let mut builder = GraphBuilder::new(10);
        let history = [commit("c", &["b"]), commit("b", &["a"]), commit("a", &[])];
        assert_eq!(rows(&mut builder, &history), vec!["*", "*", "*"]);
        assert_eq!(builder.active_lanes(), 0);
    }

    #[test]
    fn test_merge_opens_and_closes_a_lane() {
        let mut builder = GraphBuilder::new(10);
        let history = [
            commit("m", &["a", "b"]),
            commit("b", &["a"]),
            commit("a", &[]),
        ];
        assert_eq!(rows(&mut builder, &history), vec!["*\\", "|*", "*/"]);
    }

    #[test]
    fn test_merge_fills_across_busy_lanes() {
        let mut builder = GraphBuilder::new(10);
        let history = [
            commit("x", &["base"]),
            commit("y", &["base"]),
            commit("m", &["p1", "p2"]),
        ];
        // x takes lane 0, y lane 1 (nothing waits for it), m lane 2 and its
        // second parent lane 3
        assert_eq!(rows(&mut builder, &history), vec!["*", "|*", "||*\\"]);
        assert_eq!(builder.active_lanes(), 4);
    }

    #[test]
    fn test_merge_into_existing_lane_draws_fill() {
        let mut builder = GraphBuilder::new(10);
        let history = [
            commit("tip", &["x"]),
            commit("side", &["y"]),
            commit("other", &["z"]),
            commit("y", &[]),
            commit("x", &["base", "z"]),
        ];
        let graph = rows(&mut builder, &history);
        assert_eq!(graph[3], "|*|");
        // "z" already has lane 2; the merge fills the freed lane toward it
        assert_eq!(graph[4], "*-|");
        assert_eq!(builder.active_lanes(), 2);
    }

    #[test]
    fn test_unrelated_roots_reuse_lane_zero() {
        let mut builder = GraphBuilder::new(10);
        let history = [commit("x", &[]), commit("y", &[])];
        assert_eq!(rows(&mut builder, &history), vec!["*", "*"]);
    }

    #[test]
    fn test_width_cap_truncates_output_only() {
        let mut builder = GraphBuilder::new(2);
        let history = [
            commit("a", &["a1"]),
            commit("b", &["b1"]),
            commit("c", &["c1"]),
        ];
        assert_eq!(rows(&mut builder, &history), vec!["*", "|*", "||"]);
        assert_eq!(builder.active_lanes(), 3);
        builder.reset();
        assert_eq!(builder.active_lanes(), 0);
    }
}
