//! Resource capacities of the system.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{LowerBoundError, Result};
use crate::parsers::{read_json, read_yaml};
use crate::task::ResourceKind;

/// Total capacity available to the whole system for each resource kind.
pub type ResourceCapacity = BTreeMap<ResourceKind, f64>;

/// Loads resource capacities from a JSON or YAML file containing a map from resource kind to capacity.
///
/// Capacities file example:
///
/// ```yaml
/// core: 2048
/// memory: 1024
/// ssd: 512
/// nic: 64
/// ```
pub fn read_capacities<P: AsRef<Path>>(file: P) -> Result<ResourceCapacity> {
    let path = file.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => read_json(path),
        Some("yaml") | Some("yml") => read_yaml(path),
        _ => Err(LowerBoundError::UnsupportedFormat(path.to_path_buf())),
    }
}
