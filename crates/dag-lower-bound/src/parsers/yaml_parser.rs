use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dag::DAG;
use crate::error::Result;

use super::{read_json, read_yaml};

fn one() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
struct Task {
    name: String,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    resources: BTreeMap<String, f64>,
    #[serde(default = "one")]
    task_count: u32,
    /// Names of tasks which must be completed before this one starts.
    #[serde(default = "Vec::new")]
    dependencies: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Yaml {
    tasks: Vec<Task>,
}

impl DAG {
    /// Reads DAG from a YAML file.
    ///
    /// ```yaml
    /// tasks:
    ///   - name: extract
    ///     duration: 2
    ///     resources: {core: 0.1, memory: 0.05}
    ///     task_count: 50
    ///   - name: load
    ///     duration: 10
    ///     dependencies: [extract]
    /// ```
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        let yaml: Yaml = read_yaml(file.as_ref())?;
        Self::from_tasks(yaml)
    }

    /// Reads DAG from a JSON file with the same structure as accepted by [`DAG::from_yaml`].
    pub fn from_json<P: AsRef<Path>>(file: P) -> Result<Self> {
        let json: Yaml = read_json(file.as_ref())?;
        Self::from_tasks(json)
    }

    fn from_tasks(yaml: Yaml) -> Result<Self> {
        let mut dag = DAG::new();
        for task in yaml.tasks.iter() {
            dag.add_task(&task.name, task.duration, task.resources.clone(), task.task_count);
        }
        for task in yaml.tasks.iter() {
            for dependency in task.dependencies.iter() {
                dag.add_dependency_by_name(dependency, &task.name)?;
            }
        }
        Ok(dag)
    }
}
