//! Task dependency graph.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{LowerBoundError, Result};
use crate::task::*;

/// Directed acyclic graph of tasks.
///
/// Tasks are stored in an arena and addressed by their index; dependencies are kept as adjacency lists in both
/// directions. The graph is expected to be acyclic, which is checked lazily by the algorithms that need a
/// topological order (see [`Stages`](crate::stages::Stages)).
#[derive(Clone, Debug, Default)]
pub struct DAG {
    tasks: Vec<Task>,
    task_ids: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edge_count: usize,
}

impl DAG {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task and returns its id.
    ///
    /// If a task with the same name already exists, its data is replaced while its dependencies are kept.
    pub fn add_task(
        &mut self,
        name: &str,
        duration: f64,
        resources: BTreeMap<ResourceKind, f64>,
        task_count: u32,
    ) -> usize {
        let task = Task::new(name, duration, resources, task_count);
        if let Some(&task_id) = self.task_ids.get(name) {
            self.tasks[task_id] = task;
            return task_id;
        }
        self.push_task(task)
    }

    /// Adds a placeholder for a task which has no duration or resource record.
    ///
    /// Returns the id of the existing task if it is already present.
    pub fn add_missing_task(&mut self, name: &str) -> usize {
        match self.task_ids.get(name) {
            Some(&task_id) => task_id,
            None => self.push_task(Task::missing(name)),
        }
    }

    fn push_task(&mut self, task: Task) -> usize {
        let task_id = self.tasks.len();
        self.task_ids.insert(task.name.clone(), task_id);
        self.tasks.push(task);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        task_id
    }

    /// Adds dependency `pred -> succ`, i.e. `succ` can start only after `pred` is completed.
    ///
    /// Repeated dependencies are ignored.
    pub fn add_dependency(&mut self, pred: usize, succ: usize) {
        if self.successors[pred].contains(&succ) {
            return;
        }
        self.successors[pred].push(succ);
        self.predecessors[succ].push(pred);
        self.edge_count += 1;
    }

    /// Adds dependency between tasks given by their names.
    pub fn add_dependency_by_name(&mut self, pred: &str, succ: &str) -> Result<()> {
        let pred = self.resolve(pred)?;
        let succ = self.resolve(succ)?;
        self.add_dependency(pred, succ);
        Ok(())
    }

    pub fn task_id(&self, name: &str) -> Option<usize> {
        self.task_ids.get(name).copied()
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        self.task_id(name)
            .ok_or_else(|| LowerBoundError::UnknownTask(name.to_string()))
    }

    pub fn get_task(&self, task_id: usize) -> &Task {
        &self.tasks[task_id]
    }

    pub fn get_task_mut(&mut self, task_id: usize) -> &mut Task {
        &mut self.tasks[task_id]
    }

    pub fn get_tasks(&self) -> &Vec<Task> {
        &self.tasks
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn successors(&self, task_id: usize) -> &[usize] {
        &self.successors[task_id]
    }

    pub fn predecessors(&self, task_id: usize) -> &[usize] {
        &self.predecessors[task_id]
    }

    /// Returns the number of tasks with a missing duration or resource record.
    pub fn missing_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_incomplete()).count()
    }

    pub fn missing_duration_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.missing_duration).count()
    }

    pub fn missing_resources_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.missing_resources).count()
    }

    /// Returns all tasks from which `task_id` is reachable (not including `task_id` itself).
    pub fn ancestors(&self, task_id: usize) -> Result<BTreeSet<usize>> {
        self.check_task(task_id)?;
        Ok(self.reachable(task_id, &self.predecessors))
    }

    /// Returns all tasks reachable from `task_id` (not including `task_id` itself).
    pub fn descendants(&self, task_id: usize) -> Result<BTreeSet<usize>> {
        self.check_task(task_id)?;
        Ok(self.reachable(task_id, &self.successors))
    }

    pub fn ancestors_by_name(&self, name: &str) -> Result<BTreeSet<usize>> {
        self.ancestors(self.resolve(name)?)
    }

    pub fn descendants_by_name(&self, name: &str) -> Result<BTreeSet<usize>> {
        self.descendants(self.resolve(name)?)
    }

    fn check_task(&self, task_id: usize) -> Result<()> {
        if task_id < self.tasks.len() {
            Ok(())
        } else {
            Err(LowerBoundError::UnknownTask(format!("#{}", task_id)))
        }
    }

    fn reachable(&self, start: usize, adjacency: &[Vec<usize>]) -> BTreeSet<usize> {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            for &next in adjacency[v].iter() {
                if next != start && visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        visited
    }

    /// Returns a new DAG which contains only the given tasks and the dependencies between them.
    ///
    /// Tasks keep their relative order, so ids in the subgraph grow with ids in `self`.
    pub fn induced_subgraph(&self, tasks: &BTreeSet<usize>) -> DAG {
        let mut subgraph = DAG::new();
        let mut ids = HashMap::with_capacity(tasks.len());
        for &task_id in tasks.iter() {
            ids.insert(task_id, subgraph.push_task(self.tasks[task_id].clone()));
        }
        for &task_id in tasks.iter() {
            for succ in self.successors[task_id].iter() {
                if let Some(&new_succ) = ids.get(succ) {
                    subgraph.add_dependency(ids[&task_id], new_succ);
                }
            }
        }
        subgraph
    }

    /// Returns names of all tasks, in id order.
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name.as_str()).collect()
    }
}
