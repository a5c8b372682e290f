//! Tool for estimating lower bounds of many independent DAGs.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::config::EstimatorConfig;
use crate::error::{LowerBoundError, Result};
use crate::lower_bound::{makespan_lower_bound, LowerBoundReport};
use crate::parsers::{read_subject_ids, read_yaml, Trace, TraceSubject};
use crate::resource::ResourceCapacity;

/// Outcome of the estimation for one subject.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Outcome {
    Ok(LowerBoundReport),
    Failed { error: String },
}

/// Contains result of one subject.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubjectResult {
    pub id: String,
    pub tasks: usize,
    pub edges: usize,
    /// Number of tasks with a missing duration or resource record.
    pub missing_tasks: usize,
    /// Number of tasks without a duration.
    pub missing_durations: usize,
    /// Number of tasks without a resource record.
    pub missing_resources: usize,
    /// Number of stages, absent if the DAG is cyclic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,
    /// Size of the largest stage, absent if the DAG is cyclic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<usize>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl SubjectResult {
    pub fn report(&self) -> Option<&LowerBoundReport> {
        match &self.outcome {
            Outcome::Ok(report) => Some(report),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.report().is_none()
    }

    fn failed(id: String, error: &LowerBoundError) -> Self {
        Self {
            id,
            tasks: 0,
            edges: 0,
            missing_tasks: 0,
            missing_durations: 0,
            missing_resources: 0,
            depth: None,
            width: None,
            outcome: Outcome::Failed {
                error: error.to_string(),
            },
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SubjectList {
    File(PathBuf),
    Ids(Vec<String>),
}

#[derive(Deserialize, Debug)]
struct ExperimentConfig {
    adjacency: PathBuf,
    durations: PathBuf,
    resources: PathBuf,
    capacities: PathBuf,
    subjects: Option<SubjectList>,
    #[serde(default)]
    estimator: EstimatorConfig,
}

/// Estimates the lower bound of a single subject.
///
/// Failures are recorded in the result instead of being returned, so that one malformed subject doesn't affect
/// the others.
pub fn estimate_subject(subject: &TraceSubject, capacities: &ResourceCapacity, config: &EstimatorConfig) -> SubjectResult {
    let dag = subject.to_dag();
    let outcome = match makespan_lower_bound(&dag, capacities, config) {
        Ok(report) => Outcome::Ok(report),
        Err(e) => {
            warn!("Subject {} failed: {}", subject.id, e);
            Outcome::Failed { error: e.to_string() }
        }
    };
    let stats = dag.stats().ok();
    SubjectResult {
        id: subject.id.clone(),
        tasks: dag.task_count(),
        edges: dag.edge_count(),
        missing_tasks: dag.missing_task_count(),
        missing_durations: dag.missing_duration_count(),
        missing_resources: dag.missing_resources_count(),
        depth: stats.as_ref().map(|s| s.depth),
        width: stats.as_ref().map(|s| s.width),
        outcome,
    }
}

pub struct Experiment {
    subjects: Vec<TraceSubject>,
    unknown_subjects: Vec<String>,
    capacities: ResourceCapacity,
    config: EstimatorConfig,
}

impl Experiment {
    pub fn new(trace: Trace, config: EstimatorConfig) -> Self {
        Self {
            subjects: trace.subjects,
            unknown_subjects: trace.unknown_subjects,
            capacities: trace.capacities,
            config,
        }
    }

    /// Load config from a file.
    ///
    /// Relative paths in the config are resolved against the directory of the config file.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config: ExperimentConfig = read_yaml(config_path)?;
        let base = config_path.parent().unwrap_or_else(|| Path::new(""));
        let resolve = |path: &Path| base.join(path);

        let subjects = match &config.subjects {
            Some(SubjectList::File(path)) => Some(read_subject_ids(&resolve(path))?),
            Some(SubjectList::Ids(ids)) => Some(ids.clone()),
            None => None,
        };
        let trace = Trace::load(
            &resolve(&config.adjacency),
            &resolve(&config.durations),
            &resolve(&config.resources),
            &resolve(&config.capacities),
            subjects.as_deref(),
        )?;
        Ok(Self::new(trace, config.estimator))
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Returns the number of subjects to be processed, including unknown ones.
    pub fn len(&self) -> usize {
        self.subjects.len() + self.unknown_subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run estimation for all subjects.
    ///
    /// Results are returned in the order of subjects, unknown subjects are reported as failed at the end.
    pub fn run(self, num_threads: usize) -> Vec<SubjectResult> {
        let total_runs = self.subjects.len();
        info!("Estimating lower bounds of {} subjects using {} threads", total_runs, num_threads);

        let finished_runs = Arc::new(AtomicUsize::new(0));
        let result = Arc::new(Mutex::new(Vec::with_capacity(total_runs)));
        let capacities = Arc::new(self.capacities);
        let config = Arc::new(self.config);

        let pool = ThreadPool::new(num_threads.max(1));
        let start_time = Instant::now();
        for (index, subject) in self.subjects.into_iter().enumerate() {
            let finished_runs = finished_runs.clone();
            let result = result.clone();
            let capacities = capacities.clone();
            let config = config.clone();
            pool.execute(move || {
                let subject_result = estimate_subject(&subject, &capacities, &config);
                result
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((index, subject_result));

                let finished = finished_runs.fetch_add(1, Ordering::SeqCst) + 1;
                let elapsed = start_time.elapsed();
                let remaining =
                    Duration::from_secs_f64(elapsed.as_secs_f64() / finished as f64 * (total_runs - finished) as f64);
                print!("\r{}", " ".repeat(70));
                print!(
                    "\rFinished {}/{} [{}%] subjects in {:.2?}, remaining time: {:.2?}",
                    finished,
                    total_runs,
                    (finished as f64 * 100. / total_runs as f64).round() as i32,
                    elapsed,
                    remaining
                );
                if let Err(e) = std::io::stdout().flush() {
                    debug!("Can't flush progress line: {}", e);
                }
            });
        }

        pool.join();

        print!("\r{}", " ".repeat(70));
        println!("\rFinished {} subjects in {:.2?}", total_runs, start_time.elapsed());

        let mut result = std::mem::take(&mut *result.lock().unwrap_or_else(PoisonError::into_inner));
        result.sort_by_key(|(index, _)| *index);
        let mut result: Vec<SubjectResult> = result.into_iter().map(|(_, r)| r).collect();
        for id in self.unknown_subjects.into_iter() {
            let error = LowerBoundError::UnknownSubject(id.clone());
            warn!("Subject {} failed: {}", id, error);
            result.push(SubjectResult::failed(id, &error));
        }
        let failed = result.iter().filter(|r| r.is_failed()).count();
        info!("Estimated {} subjects, {} failed", result.len() - failed, failed);
        result
    }
}
