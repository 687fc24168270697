use crate::error::{CliError, Result};
use rexmc::engine::config::MoverOrder;
use rexmc::engine::exchange::ladder::LadderSpacing;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileMoverOrder {
    Sequential,
    Shuffled,
}

impl From<FileMoverOrder> for MoverOrder {
    fn from(o: FileMoverOrder) -> Self {
        match o {
            FileMoverOrder::Sequential => MoverOrder::Sequential,
            FileMoverOrder::Shuffled => MoverOrder::Shuffled,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FileSpacing {
    Geometric,
    Linear,
}

impl From<FileSpacing> for LadderSpacing {
    fn from(s: FileSpacing) -> Self {
        match s {
            FileSpacing::Geometric => LadderSpacing::Geometric,
            FileSpacing::Linear => LadderSpacing::Linear,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSimulatedAnnealingConfig {
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    /// Frames spent at the low temperature in each period.
    pub min_time: Option<u64>,
    /// Frames spent at the high temperature in each period.
    pub max_time: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMonteCarloConfig {
    pub temperature: Option<f64>,
    pub self_adaptive: Option<bool>,
    pub mover_order: Option<FileMoverOrder>,
    pub simulated_annealing: Option<FileSimulatedAnnealingConfig>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileReplicaExchangeConfig {
    pub replicas: Option<usize>,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub spacing: Option<FileSpacing>,
    pub allow_odd_replicas: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileRunConfig {
    pub frames: Option<u64>,
    pub steps_per_frame: Option<usize>,
    pub seed: Option<u64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub run: Option<FileRunConfig>,
    pub monte_carlo: Option<FileMonteCarloConfig>,
    pub replica_exchange: Option<FileReplicaExchangeConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading sampling configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
