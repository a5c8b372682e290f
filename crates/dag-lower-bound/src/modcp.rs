//! Modified critical path (ModCP).
//!
//! No schedule can finish faster than the unavoidable work of its busiest stage plus the minimal delay contributed
//! by every other stage. Two formulations are supported: stages as topological levels of the whole DAG (polynomial),
//! and stages as single tasks along every simple path (exponential, meant for small partition pieces).

use serde::{Deserialize, Serialize};

use crate::critical_path::for_each_path;
use crate::dag::DAG;
use crate::error::Result;
use crate::resource::ResourceCapacity;
use crate::stages::Stages;
use crate::total_work::total_work;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModCpMode {
    /// Stages are the topological levels of the DAG.
    #[default]
    Staged,
    /// Stages are the tasks of each simple path.
    Path,
}

/// Computes ModCP of the DAG using the given formulation.
///
/// `path_limit` bounds the number of paths visited by the path formulation and is ignored otherwise.
pub fn modcp(dag: &DAG, capacities: &ResourceCapacity, mode: ModCpMode, path_limit: Option<usize>) -> Result<f64> {
    match mode {
        ModCpMode::Staged => {
            let stages = Stages::new(dag)?;
            Ok(modcp_staged(dag, &stages, capacities))
        }
        ModCpMode::Path => modcp_path(dag, capacities, path_limit),
    }
}

/// Staged ModCP: `max_s (max(TWork(s), CPLen(s)) + sum over s' != s of min duration in s')`.
///
/// A stage is an antichain, so its critical path is its longest task.
pub fn modcp_staged(dag: &DAG, stages: &Stages, capacities: &ResourceCapacity) -> f64 {
    let min_durations: Vec<f64> = stages
        .levels()
        .iter()
        .map(|level| {
            level
                .iter()
                .map(|&t| dag.get_task(t).duration)
                .min_by(|a, b| a.total_cmp(b))
                .unwrap_or_default()
        })
        .collect();
    let min_durations_sum: f64 = min_durations.iter().sum();

    stages
        .levels()
        .iter()
        .zip(min_durations.iter())
        .map(|(level, &own_min)| {
            let twork = total_work(level.iter().map(|&t| dag.get_task(t)), capacities);
            let cplen = level
                .iter()
                .map(|&t| dag.get_task(t).duration)
                .max_by(|a, b| a.total_cmp(b))
                .unwrap_or_default();
            twork.max(cplen) + (min_durations_sum - own_min)
        })
        .max_by(|a, b| a.total_cmp(b))
        .unwrap_or_default()
}

/// Path ModCP: for every simple path (including single tasks) and every task `v` on it,
/// `max(TWork({v}), duration(v)) + sum of durations of the other tasks on the path`.
pub fn modcp_path(dag: &DAG, capacities: &ResourceCapacity, path_limit: Option<usize>) -> Result<f64> {
    let stage_values: Vec<f64> = dag
        .get_tasks()
        .iter()
        .map(|t| total_work([t], capacities).max(t.duration))
        .collect();

    let mut result = 0f64;
    for_each_path(dag, path_limit, |path| {
        let path_duration: f64 = path.iter().map(|&t| dag.get_task(t).duration).sum();
        for &task in path.iter() {
            let value = stage_values[task] + (path_duration - dag.get_task(task).duration);
            result = result.max(value);
        }
    })?;
    Ok(result)
}
