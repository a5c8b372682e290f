//! Error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a DAG or estimating its lower bound.
#[derive(Error, Debug)]
pub enum LowerBoundError {
    /// The dependency graph contains a cycle: Kahn's layering stopped with tasks left over.
    #[error("Cycle detected: {unresolved} tasks never reached zero in-degree")]
    CycleDetected { unresolved: usize },
    #[error("Unknown task: {0}")]
    UnknownTask(String),
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),
    /// Path enumeration visited more simple paths than allowed by the configuration.
    #[error("Path enumeration exceeded the limit of {limit} paths")]
    EnumerationLimitExceeded { limit: usize },
    #[error("Can't read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Can't parse JSON from file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Can't parse YAML from file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),
}

pub type Result<T> = std::result::Result<T, LowerBoundError>;
