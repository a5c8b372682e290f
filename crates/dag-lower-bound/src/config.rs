//! Lower bound estimation settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::critical_path::CriticalPathMode;
use crate::error::Result;
use crate::modcp::ModCpMode;
use crate::parsers::read_yaml;

/// Which partition pieces contribute to NewLB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceSelection {
    /// Sum bounds over all pieces.
    #[default]
    All,
    /// Sum bounds over the first two pieces only.
    FirstTwo,
}

fn default_piece_critical_path_mode() -> CriticalPathMode {
    CriticalPathMode::Enumeration
}

fn default_piece_modcp_mode() -> ModCpMode {
    ModCpMode::Path
}

/// Settings of [`makespan_lower_bound`](crate::lower_bound::makespan_lower_bound).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Algorithm for CPLen of the whole DAG (default: dp).
    #[serde(default)]
    pub critical_path_mode: CriticalPathMode,
    /// Formulation of ModCP for the whole DAG (default: staged).
    #[serde(default)]
    pub modcp_mode: ModCpMode,
    /// Whether to compute NewLB by cutting the DAG into ordered pieces (default: false).
    #[serde(default)]
    pub partition: bool,
    /// Algorithm for CPLen of partition pieces (default: enumeration).
    #[serde(default = "default_piece_critical_path_mode")]
    pub piece_critical_path_mode: CriticalPathMode,
    /// Formulation of ModCP for partition pieces (default: path).
    #[serde(default = "default_piece_modcp_mode")]
    pub piece_modcp_mode: ModCpMode,
    /// Pieces summed into NewLB (default: all).
    #[serde(default)]
    pub piece_selection: PieceSelection,
    /// Maximum number of paths visited by a single enumeration (default: unlimited).
    #[serde(default)]
    pub max_enumerated_paths: Option<usize>,
}

impl EstimatorConfig {
    /// Loads settings from a YAML file, omitted fields take their default values.
    pub fn load<P: AsRef<Path>>(file: P) -> Result<Self> {
        read_yaml(file.as_ref())
    }

    pub fn with_partition() -> Self {
        Self {
            partition: true,
            ..Self::default()
        }
    }
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            critical_path_mode: CriticalPathMode::Dp,
            modcp_mode: ModCpMode::Staged,
            partition: false,
            piece_critical_path_mode: default_piece_critical_path_mode(),
            piece_modcp_mode: default_piece_modcp_mode(),
            piece_selection: PieceSelection::All,
            max_enumerated_paths: None,
        }
    }
}
