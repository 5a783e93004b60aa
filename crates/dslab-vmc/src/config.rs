//! Configuration of consolidation algorithms.

use serde::{Deserialize, Serialize};

use crate::algorithms::clock::NO_TIMEOUT;
use crate::binpacking::PackingOrder;
use crate::error::{Result, VmcError};
use crate::mcs::McsAlgorithm;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinPackingConfig {
    pub ordering: PackingOrder,
    /// Pack VMs in a random order derived from the run seed instead of decreasing size.
    pub shuffle: bool,
}

impl Default for BinPackingConfig {
    fn default() -> Self {
        Self {
            ordering: PackingOrder::BestFit,
            shuffle: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct McsConfig {
    pub algorithm: McsAlgorithm,
    /// Split soft literals into partitions by weight and search the heaviest partition first, for both CLD and LBX.
    pub stratify: bool,
    pub max_partitions: usize,
    /// Conflict budget of each partition except the last one.
    pub partition_conflicts: u64,
    pub diversify: bool,
    /// Number of heaviest soft literals used to build diversification paths.
    pub diversification_literals: usize,
}

impl Default for McsConfig {
    fn default() -> Self {
        Self {
            algorithm: McsAlgorithm::Cld,
            stratify: false,
            max_partitions: 4,
            partition_conflicts: 10000,
            diversify: false,
            diversification_literals: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub enabled: bool,
    pub initial_parities: usize,
    pub max_parities: usize,
    /// Tolerance of the approximate count, defines the number of solutions after which a cell is split further.
    pub epsilon: f64,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            initial_parities: 1,
            max_parities: 32,
            epsilon: 0.8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmcConfig {
    /// Time limit of a single run in seconds.
    pub timeout: f64,
    pub seed: u64,
    pub break_symmetries: bool,
    /// Number of decimal digits kept when objective coefficients are converted to integers for the solver.
    pub objective_precision: u32,
    pub wastage: bool,
    /// Start exact algorithms from a bin-packing solution.
    pub heuristic_seeding: bool,
    /// Index of the objective minimized by linear search.
    pub linear_search_objective: usize,
    pub bin_packing: BinPackingConfig,
    pub mcs: McsConfig,
    pub hashing: HashingConfig,
}

impl Default for VmcConfig {
    fn default() -> Self {
        Self {
            timeout: NO_TIMEOUT,
            seed: 0,
            break_symmetries: false,
            objective_precision: 3,
            wastage: true,
            heuristic_seeding: false,
            linear_search_objective: 0,
            bin_packing: BinPackingConfig::default(),
            mcs: McsConfig::default(),
            hashing: HashingConfig::default(),
        }
    }
}

impl VmcConfig {
    pub fn from_yaml(data: &str) -> Result<Self> {
        let config: VmcConfig = serde_yaml::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(file_name: &str) -> Result<Self> {
        let data = std::fs::read_to_string(file_name)?;
        Self::from_yaml(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_nan() || self.timeout < 0. {
            return Err(VmcError::Config(format!("timeout must be non-negative, got {}", self.timeout)));
        }
        if self.objective_precision > 9 {
            return Err(VmcError::Config(format!(
                "objective precision {} is too large",
                self.objective_precision
            )));
        }
        if self.mcs.max_partitions == 0 {
            return Err(VmcError::Config("at least one partition is required".to_string()));
        }
        if self.hashing.epsilon <= 0. {
            return Err(VmcError::Config(format!(
                "hashing epsilon must be positive, got {}",
                self.hashing.epsilon
            )));
        }
        if self.hashing.initial_parities > self.hashing.max_parities {
            return Err(VmcError::Config(format!(
                "initial parities {} exceed maximum {}",
                self.hashing.initial_parities, self.hashing.max_parities
            )));
        }
        Ok(())
    }
}
