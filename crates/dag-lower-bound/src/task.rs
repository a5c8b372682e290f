//! DAG task.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of a resource kind (e.g. `core`, `memory`, `ssd`, `nic`).
pub type ResourceKind = String;

/// Represents a DAG task.
///
/// Described by its duration and the amount of each resource kind it occupies while running. A single task may stand
/// for several identical instances, which is captured by `task_count` and multiplies the task's work.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    /// Task duration in time units.
    pub duration: f64,
    /// Resource demand per resource kind. Missing kinds are treated as zero demand.
    pub resources: BTreeMap<ResourceKind, f64>,
    /// Number of identical instances represented by this task.
    pub task_count: u32,
    /// Set when the trace had no duration for the task.
    #[serde(default)]
    pub missing_duration: bool,
    /// Set when the trace had no resource record for the task, so its demand is zero.
    #[serde(default)]
    pub missing_resources: bool,
}

impl Task {
    /// Creates new task.
    pub fn new(name: &str, duration: f64, resources: BTreeMap<ResourceKind, f64>, task_count: u32) -> Self {
        Self {
            name: name.to_string(),
            duration: duration.max(0.),
            resources,
            task_count: task_count.max(1),
            missing_duration: false,
            missing_resources: false,
        }
    }

    /// Creates a placeholder task with zero duration and demand, flagged as missing both.
    pub fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            duration: 0.,
            resources: BTreeMap::new(),
            task_count: 1,
            missing_duration: true,
            missing_resources: true,
        }
    }

    /// Returns task demand for the given resource kind.
    pub fn demand(&self, kind: &str) -> f64 {
        self.resources.get(kind).copied().unwrap_or(0.)
    }

    /// Returns `duration * demand * task_count` for the given resource kind.
    pub fn work(&self, kind: &str) -> f64 {
        self.duration * self.demand(kind) * self.task_count as f64
    }

    /// Returns true if any part of the task data is missing.
    pub fn is_incomplete(&self) -> bool {
        self.missing_duration || self.missing_resources
    }
}
