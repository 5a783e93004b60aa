//! Consolidation algorithms and the framework running them.

pub mod allocator;
pub mod archive;
pub mod clock;
pub mod guided_improvement;
pub mod heuristic;
pub mod linear_search;
pub mod pareto_mcs;
pub mod progress;
pub mod state;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::VmcError;

/// Search strategy run by [`allocator::Allocator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchStrategy {
    /// Greedy bin-packing, one solution per seed.
    BinPacking,
    /// Minimization of a single objective by tightening its upper bound.
    LinearSearch,
    /// Guided improvement: every found point is improved until Pareto-optimal, then its dominated region is blocked.
    GuidedImprovement,
    /// Enumeration of Pareto-minimal correction subsets.
    ParetoMcs,
}

impl FromStr for SearchStrategy {
    type Err = VmcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BinPacking" => Ok(SearchStrategy::BinPacking),
            "LinearSearch" => Ok(SearchStrategy::LinearSearch),
            "GuidedImprovement" => Ok(SearchStrategy::GuidedImprovement),
            "ParetoMcs" => Ok(SearchStrategy::ParetoMcs),
            _ => Err(VmcError::Config(format!("unknown search strategy: {}", s))),
        }
    }
}
