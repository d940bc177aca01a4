use indexmap::IndexSet;
use std::{
    collections::{HashSet, VecDeque},
    path::{Path, PathBuf},
};

/// FIFO frontier plus visited set for one traversal call.
///
/// Files come off the queue one breadth-first level at a time, in discovery
/// order, so the visited set lists the entry first and nearer dependencies
/// before farther ones.
#[derive(Debug)]
pub(crate) struct Worklist {
    queue: VecDeque<PathBuf>,
    queued: HashSet<PathBuf>,
    visited: IndexSet<PathBuf>,
}

impl Worklist {
    pub(crate) fn new(entry: &Path) -> Self {
        let mut work =
            Self { queue: VecDeque::new(), queued: HashSet::new(), visited: IndexSet::new() };
        work.push(entry.to_path_buf());
        work
    }

    /// Everything currently queued, oldest first. Paths pushed afterwards
    /// form the next level.
    pub(crate) fn take_level(&mut self) -> Vec<PathBuf> {
        self.queue.drain(..).collect()
    }

    /// Records a canonical path; false when it was already visited.
    pub(crate) fn mark_visited(&mut self, path: PathBuf) -> bool {
        self.visited.insert(path)
    }

    /// Queues `path` unless it was visited or is already waiting.
    pub(crate) fn push(&mut self, path: PathBuf) {
        if !self.visited.contains(&path) && self.queued.insert(path.clone()) {
            self.queue.push_back(path);
        }
    }

    pub(crate) fn into_visited(self) -> IndexSet<PathBuf> {
        self.visited
    }
}
