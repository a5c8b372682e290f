use std::collections::HashSet;

use serde::Serialize;

use crate::critical_path::critical_path_dp;
use crate::dag::DAG;
use crate::error::Result;
use crate::stages::Stages;

#[derive(Debug, Clone, Serialize)]
pub struct DagStats {
    /// Total number of tasks.
    pub task_count: usize,
    /// Total number of task instances (sum of `task_count` of all tasks).
    pub instance_count: u64,
    /// Total number of dependencies.
    pub edge_count: usize,
    /// Number of tasks without duration or resource records.
    pub missing_task_count: usize,
    /// Sum of durations of all tasks.
    pub total_duration: f64,
    /// Longest path in the DAG measured in sum of durations of tasks on this path.
    pub critical_path_length: f64,
    /// Parallelism degree computed as `total_duration / critical_path_length`.
    pub parallelism_degree: f64,
    /// Number of stages.
    pub depth: usize,
    /// Size of the largest stage (number of tasks).
    pub width: usize,
    /// Maximum number of tasks that can be executed in parallel
    /// (obtained by running each task as soon as all its predecessors are completed).
    pub max_parallelism: usize,
    /// Stats for each stage.
    pub level_profiles: Vec<LevelProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceStats {
    pub min: f64,
    pub max: f64,
    pub sum: f64,
    pub avg: f64,
    /// Standard deviation.
    pub std: f64,
}

impl FromIterator<f64> for SequenceStats {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = f64>,
    {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        let mut sum = 0.;
        let mut sq_sum = 0.;
        let mut cnt = 0usize;
        for val in iter {
            min = min.min(val);
            max = max.max(val);
            sum += val;
            sq_sum += val * val;
            cnt += 1;
        }

        if cnt == 0 {
            return Self {
                min: 0.,
                max: 0.,
                sum: 0.,
                avg: 0.,
                std: 0.,
            };
        }
        let avg = sum / cnt as f64;
        let std = (sq_sum / cnt as f64 - avg * avg).max(0.).sqrt();
        Self {
            min,
            max,
            sum,
            avg,
            std,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelProfile {
    /// Stage index (1-based).
    pub level: usize,
    /// Total number of tasks.
    pub task_count: usize,
    /// Stats about task durations.
    pub task_duration: SequenceStats,
    /// Total number of distinct predecessors.
    pub predecessor_count: usize,
    /// Total number of distinct successors.
    pub successor_count: usize,
    /// Average number of task predecessors.
    pub avg_predecessors: f64,
    /// Average number of task successors.
    pub avg_successors: f64,
}

impl DagStats {
    pub fn new(dag: &DAG) -> Result<Self> {
        let stages = Stages::new(dag)?;
        let total_duration = dag.get_tasks().iter().map(|t| t.duration).sum();
        let critical_path_length = critical_path_dp(dag, &stages).length;
        Ok(DagStats {
            task_count: dag.task_count(),
            instance_count: dag.get_tasks().iter().map(|t| t.task_count as u64).sum(),
            edge_count: dag.edge_count(),
            missing_task_count: dag.missing_task_count(),
            total_duration,
            critical_path_length,
            parallelism_degree: if critical_path_length > 0. {
                total_duration / critical_path_length
            } else {
                0.
            },
            depth: stages.len(),
            width: stages.levels().iter().map(|l| l.len()).max().unwrap_or_default(),
            max_parallelism: Self::get_max_parallelism(dag, &stages),
            level_profiles: stages
                .iter()
                .map(|(i, l)| Self::get_level_profile(dag, i, l))
                .collect(),
        })
    }

    fn get_max_parallelism(dag: &DAG, stages: &Stages) -> usize {
        let mut finish_times = vec![0f64; dag.task_count()];

        let mut events: Vec<(f64, isize)> = Vec::new();

        for task in stages.topological_order() {
            let start_time = dag
                .predecessors(task)
                .iter()
                .map(|&pred| finish_times[pred])
                .max_by(|a, b| a.total_cmp(b))
                .unwrap_or_default();
            let finish_time = start_time + dag.get_task(task).duration;
            events.push((start_time, 1));
            events.push((finish_time, -1));
            finish_times[task] = finish_time;
        }

        // finish events go first so that zero-length and back-to-back tasks don't overlap
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let mut cur = 0;
        let mut max_parallelism = 0;
        for (_, delta) in events.into_iter() {
            cur += delta;
            max_parallelism = max_parallelism.max(cur);
        }
        max_parallelism as usize
    }

    fn get_level_profile(dag: &DAG, level_index: usize, level: &[usize]) -> LevelProfile {
        let predecessor_count = level
            .iter()
            .flat_map(|&t| dag.predecessors(t).iter().copied())
            .collect::<HashSet<usize>>()
            .len();
        let successor_count = level
            .iter()
            .flat_map(|&t| dag.successors(t).iter().copied())
            .collect::<HashSet<usize>>()
            .len();
        LevelProfile {
            level: level_index,
            task_count: level.len(),
            task_duration: level.iter().map(|&t| dag.get_task(t).duration).collect(),
            predecessor_count,
            successor_count,
            avg_predecessors: level.iter().map(|&t| dag.predecessors(t).len() as f64).sum::<f64>() / level.len() as f64,
            avg_successors: level.iter().map(|&t| dag.successors(t).len() as f64).sum::<f64>() / level.len() as f64,
        }
    }
}

impl DAG {
    /// Computes statistics of the DAG.
    pub fn stats(&self) -> Result<DagStats> {
        DagStats::new(self)
    }
}
