//! Splitting a DAG into totally ordered pieces.

use std::collections::BTreeSet;

use log::debug;

use crate::dag::DAG;
use crate::error::Result;
use crate::stages::Stages;

/// Finds a cut point of the DAG: a task whose ancestors and descendants together cover all other tasks.
///
/// Only cut points which leave both the ancestor part and the `{task} + descendants` part non-empty are returned,
/// i.e. tasks without ancestors are skipped. Tasks are scanned in id order.
pub fn find_cut_point(dag: &DAG) -> Result<Option<(BTreeSet<usize>, BTreeSet<usize>)>> {
    let total_tasks = dag.task_count();
    for task in 0..total_tasks {
        let ancestors = dag.ancestors(task)?;
        if ancestors.is_empty() {
            continue;
        }
        let mut descendants = dag.descendants(task)?;
        // unordered neighbors U(s) = V - A(s) - D(s) - {s} are empty iff the sizes add up
        if ancestors.len() + descendants.len() + 1 != total_tasks {
            continue;
        }
        descendants.insert(task);
        return Ok(Some((ancestors, descendants)));
    }
    Ok(None)
}

/// Recursively cuts the DAG at cut points until no piece has one.
///
/// Pieces are returned in dependency order: all tasks of a piece must be completed before any task of a later piece
/// can start, so the pieces run one after another in any schedule. A DAG without cut points is returned as is.
pub fn cut_dags(dag: &DAG) -> Result<Vec<DAG>> {
    Stages::new(dag)?;

    let mut pieces: Vec<DAG> = vec![dag.clone()];
    // indices into `pieces` in dependency order, a cut piece is replaced in place by its two halves
    let mut order: Vec<usize> = vec![0];
    let mut worklist: Vec<usize> = vec![0];

    while let Some(piece_id) = worklist.pop() {
        let piece = &pieces[piece_id];
        let Some((head, tail)) = find_cut_point(piece)? else {
            continue;
        };
        let head = piece.induced_subgraph(&head);
        let tail = piece.induced_subgraph(&tail);
        debug!(
            "Cut piece with {} tasks into {} + {} tasks",
            piece.task_count(),
            head.task_count(),
            tail.task_count()
        );

        let head_id = pieces.len();
        pieces.push(head);
        let tail_id = pieces.len();
        pieces.push(tail);
        if let Some(pos) = order.iter().position(|&p| p == piece_id) {
            order.splice(pos..pos + 1, [head_id, tail_id]);
        }
        worklist.push(head_id);
        worklist.push(tail_id);
    }

    let mut pieces: Vec<Option<DAG>> = pieces.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|p| pieces[p].take()).collect())
}
