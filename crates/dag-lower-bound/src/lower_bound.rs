//! Makespan lower bound.

use log::debug;
use serde::Serialize;

use crate::config::{EstimatorConfig, PieceSelection};
use crate::critical_path::{critical_path, critical_path_dp, CriticalPathMode};
use crate::dag::DAG;
use crate::error::Result;
use crate::modcp::{modcp, modcp_staged, ModCpMode};
use crate::partition::cut_dags;
use crate::resource::ResourceCapacity;
use crate::stages::Stages;
use crate::total_work::total_work;

/// The three basic bounds of a DAG.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Bound {
    #[serde(rename = "CPLen")]
    pub cplen: f64,
    #[serde(rename = "TWork")]
    pub twork: f64,
    #[serde(rename = "ModCP")]
    pub modcp: f64,
}

impl Bound {
    pub fn new(
        dag: &DAG,
        capacities: &ResourceCapacity,
        critical_path_mode: CriticalPathMode,
        modcp_mode: ModCpMode,
        path_limit: Option<usize>,
    ) -> Result<Self> {
        // stages are shared by the polynomial algorithms and double as the cycle check
        let stages = Stages::new(dag)?;
        let cplen = match critical_path_mode {
            CriticalPathMode::Dp => critical_path_dp(dag, &stages).length,
            mode => critical_path(dag, mode, path_limit)?.length,
        };
        let modcp = match modcp_mode {
            ModCpMode::Staged => modcp_staged(dag, &stages, capacities),
            mode => modcp(dag, capacities, mode, path_limit)?,
        };
        Ok(Self {
            cplen,
            twork: total_work(dag.get_tasks(), capacities),
            modcp,
        })
    }

    /// Returns `max(CPLen, TWork, ModCP)`.
    pub fn value(&self) -> f64 {
        self.cplen.max(self.twork).max(self.modcp)
    }
}

/// Result of the lower bound estimation for one DAG.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LowerBoundReport {
    #[serde(flatten)]
    pub bound: Bound,
    /// Sum of bounds of the partition pieces, if partitioning was requested.
    #[serde(rename = "NewLB", skip_serializing_if = "Option::is_none")]
    pub new_lb: Option<f64>,
    /// Number of pieces produced by the partitioner (1 if the DAG has no cut point or partitioning is disabled).
    pub pieces: usize,
    #[serde(rename = "LowerBound")]
    pub lower_bound: f64,
}

/// Computes the makespan lower bound of the DAG.
///
/// The result is `max(CPLen, TWork, ModCP)` of the whole DAG, further improved by NewLB if partitioning is enabled.
pub fn makespan_lower_bound(
    dag: &DAG,
    capacities: &ResourceCapacity,
    config: &EstimatorConfig,
) -> Result<LowerBoundReport> {
    let bound = Bound::new(
        dag,
        capacities,
        config.critical_path_mode,
        config.modcp_mode,
        config.max_enumerated_paths,
    )?;
    let mut report = LowerBoundReport {
        bound,
        new_lb: None,
        pieces: 1,
        lower_bound: bound.value(),
    };
    if config.partition {
        let (new_lb, pieces) = new_lower_bound(dag, capacities, config, &bound)?;
        report.new_lb = Some(new_lb);
        report.pieces = pieces;
        report.lower_bound = report.lower_bound.max(new_lb);
    }
    debug!(
        "Lower bound of DAG with {} tasks: CPLen={:.3} TWork={:.3} ModCP={:.3} NewLB={:?} -> {:.3}",
        dag.task_count(),
        bound.cplen,
        bound.twork,
        bound.modcp,
        report.new_lb,
        report.lower_bound
    );
    Ok(report)
}

/// Computes NewLB: the sum of bounds of the ordered pieces produced by [`cut_dags`].
///
/// Returns the bound together with the number of pieces. A DAG without cut points is its own single piece, and its
/// already computed `whole` bound is reused. With all pieces selected the result is never below `whole.value()`.
pub fn new_lower_bound(
    dag: &DAG,
    capacities: &ResourceCapacity,
    config: &EstimatorConfig,
    whole: &Bound,
) -> Result<(f64, usize)> {
    let pieces = cut_dags(dag)?;
    if pieces.len() <= 1 {
        return Ok((whole.value(), pieces.len().max(1)));
    }
    let selected = match config.piece_selection {
        PieceSelection::All => pieces.len(),
        PieceSelection::FirstTwo => 2,
    };
    let mut new_lb = 0.;
    for piece in pieces.iter().take(selected) {
        new_lb += piece_bound(piece, capacities, config)?.value();
    }
    Ok((new_lb, pieces.len()))
}

/// Bound of a partition piece.
///
/// Besides the piece formulation, ModCP of the piece is also computed with the formulation used for the whole DAG.
/// Stages of the whole DAG never cross a cut point, so the sum over pieces then covers every term of the whole bound.
fn piece_bound(piece: &DAG, capacities: &ResourceCapacity, config: &EstimatorConfig) -> Result<Bound> {
    let mut bound = Bound::new(
        piece,
        capacities,
        config.piece_critical_path_mode,
        config.piece_modcp_mode,
        config.max_enumerated_paths,
    )?;
    if config.modcp_mode != config.piece_modcp_mode {
        let whole_mode = modcp(piece, capacities, config.modcp_mode, config.max_enumerated_paths)?;
        bound.modcp = bound.modcp.max(whole_mode);
    }
    Ok(bound)
}
