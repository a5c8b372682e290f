//! Topological staging of a DAG.

use log::debug;

use crate::dag::DAG;
use crate::error::{LowerBoundError, Result};

/// Partition of DAG tasks into topological levels.
///
/// Stage `k` (1-based in [`Stages::stage`], 0-based in the underlying vector) contains the tasks whose longest
/// dependency chain, counted in tasks, has length `k`. All predecessors of a task lie in earlier stages.
#[derive(Clone, Debug, PartialEq)]
pub struct Stages {
    levels: Vec<Vec<usize>>,
    level_of: Vec<usize>,
}

impl Stages {
    /// Builds stages using Kahn's algorithm: every round removes the current zero in-degree frontier.
    ///
    /// Returns [`LowerBoundError::CycleDetected`] if some tasks never reach zero in-degree.
    pub fn new(dag: &DAG) -> Result<Self> {
        let total_tasks = dag.task_count();
        let mut in_degree: Vec<usize> = (0..total_tasks).map(|t| dag.predecessors(t).len()).collect();
        let mut frontier: Vec<usize> = (0..total_tasks).filter(|&t| in_degree[t] == 0).collect();
        let mut levels = Vec::new();
        let mut level_of = vec![usize::MAX; total_tasks];
        let mut staged = 0;

        while !frontier.is_empty() {
            let mut next = Vec::new();
            for &task in frontier.iter() {
                level_of[task] = levels.len();
                for &succ in dag.successors(task) {
                    in_degree[succ] -= 1;
                    if in_degree[succ] == 0 {
                        next.push(succ);
                    }
                }
            }
            staged += frontier.len();
            next.sort_unstable();
            levels.push(frontier);
            frontier = next;
        }

        if staged < total_tasks {
            return Err(LowerBoundError::CycleDetected {
                unresolved: total_tasks - staged,
            });
        }
        debug!("DAG with {} tasks split into {} stages", total_tasks, levels.len());
        Ok(Self { levels, level_of })
    }

    /// Returns the number of stages.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Returns tasks of the stage with the given 1-based index.
    pub fn stage(&self, index: usize) -> Option<&[usize]> {
        index.checked_sub(1).and_then(|i| self.levels.get(i)).map(|l| l.as_slice())
    }

    /// Returns 1-based stage index of the task.
    pub fn stage_of(&self, task_id: usize) -> usize {
        self.level_of[task_id] + 1
    }

    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Iterates over `(stage index, tasks)` pairs with 1-based indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.levels.iter().enumerate().map(|(i, l)| (i + 1, l.as_slice()))
    }

    /// Returns tasks in topological order (stage by stage).
    pub fn topological_order(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.levels.iter().flat_map(|l| l.iter().copied())
    }
}
