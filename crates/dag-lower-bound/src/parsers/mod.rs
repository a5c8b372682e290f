//! Tools for loading DAGs and traces from files.

mod trace_parser;
mod yaml_parser;

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::dag::DAG;
use crate::error::{LowerBoundError, Result};

pub use trace_parser::{read_subject_ids, ResourceRecord, Trace, TraceSubject};

pub(crate) fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| LowerBoundError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_json::from_str(&read_file(path)?).map_err(|source| LowerBoundError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    serde_yaml::from_str(&read_file(path)?).map_err(|source| LowerBoundError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

impl DAG {
    /// Reads DAG from a file, the format is chosen by the file extension (`.yaml`, `.yml` or `.json`).
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let path = file.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => DAG::from_yaml(path),
            Some("json") => DAG::from_json(path),
            _ => Err(LowerBoundError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}
