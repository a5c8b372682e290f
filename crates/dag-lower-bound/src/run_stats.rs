use itertools::Itertools;
use serde::Serialize;

use crate::dag_stats::SequenceStats;
use crate::experiment::SubjectResult;

/// Aggregate statistics over the results of an experiment.
///
/// Failed subjects are counted but excluded from all other statistics.
#[derive(Serialize, Debug, Clone)]
pub struct ResultSummary {
    /// Total number of subjects.
    pub subjects: usize,
    /// Number of subjects whose estimation failed.
    pub failed: usize,
    /// Number of successful subjects with at least one task with incomplete trace data.
    pub incomplete: usize,
    /// Total number of tasks with incomplete trace data over successful subjects.
    pub missing_tasks: usize,
    pub missing_durations: usize,
    pub missing_resources: usize,
    /// Number of subjects where NewLB is strictly greater than `max(CPLen, TWork, ModCP)`.
    pub improved_by_partition: usize,
    pub cplen: SequenceStats,
    pub twork: SequenceStats,
    pub modcp: SequenceStats,
    pub lower_bound: SequenceStats,
    /// Number of stages of successful subjects.
    pub depth: SequenceStats,
    /// 95th percentile of lower bounds.
    pub lower_bound_p95: f64,
}

impl ResultSummary {
    pub fn new(results: &[SubjectResult]) -> Self {
        let reports: Vec<_> = results.iter().filter_map(|r| r.report()).collect();
        let successful = || results.iter().filter(|r| !r.is_failed());
        let lower_bounds: Vec<f64> = reports
            .iter()
            .map(|r| r.lower_bound)
            .sorted_by(|a, b| a.total_cmp(b))
            .collect();
        Self {
            subjects: results.len(),
            failed: results.len() - reports.len(),
            incomplete: successful().filter(|r| r.missing_tasks > 0).count(),
            missing_tasks: successful().map(|r| r.missing_tasks).sum(),
            missing_durations: successful().map(|r| r.missing_durations).sum(),
            missing_resources: successful().map(|r| r.missing_resources).sum(),
            improved_by_partition: reports
                .iter()
                .filter(|r| r.new_lb.map_or(false, |new_lb| new_lb > r.bound.value()))
                .count(),
            cplen: reports.iter().map(|r| r.bound.cplen).collect(),
            twork: reports.iter().map(|r| r.bound.twork).collect(),
            modcp: reports.iter().map(|r| r.bound.modcp).collect(),
            lower_bound: lower_bounds.iter().copied().collect(),
            depth: successful().filter_map(|r| r.depth).map(|d| d as f64).collect(),
            lower_bound_p95: percentile(&lower_bounds, 95.),
        }
    }
}

/// Returns the `p`-th percentile of sorted values using linear interpolation between closest ranks.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.;
    }
    let rank = (p / 100.).clamp(0., 1.) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}
