//! Critical path length (CPLen).

use serde::{Deserialize, Serialize};

use crate::dag::DAG;
use crate::error::{LowerBoundError, Result};
use crate::stages::Stages;

/// Algorithm used to find the longest duration-weighted path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalPathMode {
    /// Dynamic programming over the topological order, O(V+E).
    #[default]
    Dp,
    /// Enumeration of all simple paths, exponential in the worst case.
    Enumeration,
}

/// Longest path in a DAG together with its length (sum of task durations).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CriticalPath {
    pub length: f64,
    /// Task ids along the path. Empty only for an empty DAG.
    pub path: Vec<usize>,
}

/// Computes critical path of the DAG using the given algorithm.
///
/// `path_limit` bounds the number of paths visited in enumeration mode and is ignored in DP mode.
pub fn critical_path(dag: &DAG, mode: CriticalPathMode, path_limit: Option<usize>) -> Result<CriticalPath> {
    match mode {
        CriticalPathMode::Dp => {
            let stages = Stages::new(dag)?;
            Ok(critical_path_dp(dag, &stages))
        }
        CriticalPathMode::Enumeration => critical_path_enumeration(dag, path_limit),
    }
}

/// Returns `cplen[v] = duration[v] + max(cplen[succ])` for every task, i.e. the longest path starting at `v`.
pub fn critical_path_ranks(dag: &DAG, stages: &Stages) -> Vec<f64> {
    let mut ranks = vec![0f64; dag.task_count()];
    for task in stages.topological_order().rev() {
        ranks[task] = dag
            .successors(task)
            .iter()
            .map(|&succ| ranks[succ])
            .max_by(|a, b| a.total_cmp(b))
            .unwrap_or_default()
            + dag.get_task(task).duration;
    }
    ranks
}

pub fn critical_path_dp(dag: &DAG, stages: &Stages) -> CriticalPath {
    let ranks = critical_path_ranks(dag, stages);
    let start = match (0..ranks.len()).max_by(|&a, &b| ranks[a].total_cmp(&ranks[b])) {
        Some(start) => start,
        None => return CriticalPath::default(),
    };
    let mut path = vec![start];
    let mut current = start;
    while let Some(next) = dag
        .successors(current)
        .iter()
        .copied()
        .max_by(|&a, &b| ranks[a].total_cmp(&ranks[b]))
    {
        path.push(next);
        current = next;
    }
    CriticalPath {
        length: ranks[start],
        path,
    }
}

pub fn critical_path_enumeration(dag: &DAG, path_limit: Option<usize>) -> Result<CriticalPath> {
    let mut best = CriticalPath::default();
    for_each_path(dag, path_limit, |path| {
        let length: f64 = path.iter().map(|&t| dag.get_task(t).duration).sum();
        if length > best.length || best.path.is_empty() {
            best.length = length;
            best.path = path.to_vec();
        }
    })?;
    Ok(best)
}

/// Calls `visit` for every simple path in the DAG, including single-task paths.
///
/// Every path between an ordered pair of tasks is visited exactly once. Fails on cyclic graphs and when more than
/// `path_limit` paths would be visited.
pub fn for_each_path<F>(dag: &DAG, path_limit: Option<usize>, mut visit: F) -> Result<()>
where
    F: FnMut(&[usize]),
{
    Stages::new(dag)?;

    let mut visited = 0usize;
    let mut count = |path: &[usize]| -> Result<()> {
        visited += 1;
        if let Some(limit) = path_limit {
            if visited > limit {
                return Err(LowerBoundError::EnumerationLimitExceeded { limit });
            }
        }
        visit(path);
        Ok(())
    };

    let mut path: Vec<usize> = Vec::new();
    // index of the next successor to try, for each task on the path
    let mut cursor: Vec<usize> = Vec::new();
    for source in 0..dag.task_count() {
        path.push(source);
        cursor.push(0);
        count(&path)?;
        while let Some(&task) = path.last() {
            let depth = path.len() - 1;
            match dag.successors(task).get(cursor[depth]) {
                Some(&succ) => {
                    cursor[depth] += 1;
                    path.push(succ);
                    cursor.push(0);
                    count(&path)?;
                }
                None => {
                    path.pop();
                    cursor.pop();
                }
            }
        }
    }
    Ok(())
}
