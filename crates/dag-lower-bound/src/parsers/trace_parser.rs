use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use log::warn;
use serde::Deserialize;

use crate::dag::DAG;
use crate::error::Result;
use crate::resource::{read_capacities, ResourceCapacity};

use super::{read_file, read_json};

/// Task identifier as it appears in trace files: either a string or an integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
enum Key {
    Name(String),
    Number(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Name(name) => write!(f, "{}", name),
            Key::Number(number) => write!(f, "{}", number),
        }
    }
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct Details {
    duration: Option<f64>,
    #[serde(default)]
    resources: BTreeMap<String, f64>,
    #[serde(default = "one")]
    task_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResourceRecord {
    Nested {
        task: Key,
        details: Details,
    },
    Flat {
        task: Key,
        #[serde(flatten)]
        details: Details,
    },
}

/// Duration and resource demand of a single task.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    pub task: String,
    pub duration: Option<f64>,
    pub resources: BTreeMap<String, f64>,
    pub task_count: u32,
}

impl From<RawResourceRecord> for ResourceRecord {
    fn from(raw: RawResourceRecord) -> Self {
        let (task, details) = match raw {
            RawResourceRecord::Nested { task, details } => (task, details),
            RawResourceRecord::Flat { task, details } => (task, details),
        };
        Self {
            task: task.to_string(),
            duration: details.duration,
            resources: details.resources,
            task_count: details.task_count,
        }
    }
}

/// Trace data of one independent DAG (e.g. one tenant).
#[derive(Debug, Clone, Default)]
pub struct TraceSubject {
    pub id: String,
    /// Task -> tasks that depend on it.
    pub adjacency: IndexMap<String, Vec<String>>,
    pub durations: HashMap<String, f64>,
    pub resources: Vec<ResourceRecord>,
}

impl TraceSubject {
    /// Builds the DAG of this subject.
    ///
    /// The duration table takes precedence over durations from resource records. A task without a duration gets zero
    /// duration and a task without a resource record gets zero demand, each gap is flagged on the task and counted
    /// in the logged warning. Tasks that appear only in resource records are added without dependencies.
    pub fn to_dag(&self) -> DAG {
        let records: HashMap<&str, &ResourceRecord> = self.resources.iter().map(|r| (r.task.as_str(), r)).collect();
        let mut dag = DAG::new();

        let names = self
            .adjacency
            .iter()
            .flat_map(|(task, dependents)| std::iter::once(task).chain(dependents.iter()))
            .map(|name| name.as_str())
            .chain(self.resources.iter().map(|r| r.task.as_str()));
        for name in names {
            if dag.task_id(name).is_some() {
                continue;
            }
            let record = records.get(name);
            let duration = self.durations.get(name).copied().or(record.and_then(|r| r.duration));
            if duration.is_none() && record.is_none() {
                dag.add_missing_task(name);
                continue;
            }
            let task_id = dag.add_task(
                name,
                duration.unwrap_or_default(),
                record.map(|r| r.resources.clone()).unwrap_or_default(),
                record.map_or(1, |r| r.task_count),
            );
            let task = dag.get_task_mut(task_id);
            task.missing_duration = duration.is_none();
            task.missing_resources = record.is_none();
        }

        for (task, dependents) in self.adjacency.iter() {
            if let Some(pred) = dag.task_id(task) {
                for dependent in dependents.iter() {
                    if let Some(succ) = dag.task_id(dependent) {
                        dag.add_dependency(pred, succ);
                    }
                }
            }
        }

        let missing = dag.missing_task_count();
        if missing > 0 {
            warn!(
                "Subject {}: {} of {} tasks have incomplete trace data ({} without duration, {} without resources)",
                self.id,
                missing,
                dag.task_count(),
                dag.missing_duration_count(),
                dag.missing_resources_count()
            );
        }
        dag
    }
}

/// Per-subject trace tables together with the capacities of the system.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    pub subjects: Vec<TraceSubject>,
    /// Requested subjects which are absent from the adjacency table.
    pub unknown_subjects: Vec<String>,
    pub capacities: ResourceCapacity,
}

impl Trace {
    /// Loads trace tables from JSON files.
    ///
    /// - `adjacency`: `{subject: {task: [dependent tasks]}}`
    /// - `durations`: `{subject: {task: duration}}`
    /// - `resources`: `{subject: [{task, details: {duration, resources}}]}` or
    ///   `{subject: [{task, duration, resources, task_count}]}`
    /// - `capacities`: `{resource kind: capacity}` (JSON or YAML)
    ///
    /// If `subjects` is given, only these subjects are loaded (in the given order), otherwise all subjects from the
    /// adjacency table are loaded in file order.
    pub fn load(
        adjacency: &Path,
        durations: &Path,
        resources: &Path,
        capacities: &Path,
        subjects: Option<&[String]>,
    ) -> Result<Self> {
        let mut adjacency: IndexMap<String, IndexMap<Key, Vec<Key>>> = read_json(adjacency)?;
        let mut durations: HashMap<String, HashMap<Key, f64>> = read_json(durations)?;
        let mut resources: HashMap<String, Vec<RawResourceRecord>> = read_json(resources)?;
        let capacities = read_capacities(capacities)?;

        let ids: Vec<String> = match subjects {
            Some(subjects) => subjects.to_vec(),
            None => adjacency.keys().cloned().collect(),
        };
        let mut trace = Trace {
            subjects: Vec::with_capacity(ids.len()),
            unknown_subjects: Vec::new(),
            capacities,
        };
        for id in ids {
            let Some(graph) = adjacency.swap_remove(&id) else {
                trace.unknown_subjects.push(id);
                continue;
            };
            trace.subjects.push(TraceSubject {
                adjacency: graph
                    .into_iter()
                    .map(|(task, dependents)| (task.to_string(), dependents.iter().map(|d| d.to_string()).collect()))
                    .collect(),
                durations: durations
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(task, duration)| (task.to_string(), duration))
                    .collect(),
                resources: resources
                    .remove(&id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(ResourceRecord::from)
                    .collect(),
                id,
            });
        }
        Ok(trace)
    }
}

/// Reads subject ids from a text file, one per line. Empty lines are skipped.
pub fn read_subject_ids(path: &Path) -> Result<Vec<String>> {
    Ok(read_file(path)?
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect())
}
