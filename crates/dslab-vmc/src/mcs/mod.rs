//! Pareto-MCS enumeration.
//!
//! Every objective literal whose satisfaction decreases some objective is a soft literal. A minimal correction subset
//! (MCS) is a minimal set of soft literals which must be falsified for the hard constraints to be satisfiable, and
//! every MCS corresponds to a Pareto-optimal trade-off between the objectives. MCSs are enumerated one by one, each
//! one is blocked by a hard clause before the next search.

pub mod cld;
pub mod diversification;
pub mod enumerator;
pub mod lbx;
pub mod stratification;

pub use enumerator::ParetoMcsEnumerator;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::algorithms::clock::Clock;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::objective::ObjectiveFunction;
use crate::solver::{Lit, Model};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum McsAlgorithm {
    /// Clause D: asks for any undecided literal at once.
    Cld,
    /// Literal-based extension: tests undecided literals one by one.
    Lbx,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftLiteral {
    pub lit: Lit,
    pub weight: f64,
}

/// Collects soft literals of all objectives. A literal shared by several objectives appears once with the sum of its
/// normalized weights.
pub fn soft_literals(objectives: &[ObjectiveFunction]) -> Vec<SoftLiteral> {
    let mut positions: FxHashMap<Lit, usize> = FxHashMap::default();
    let mut softs: Vec<SoftLiteral> = Vec::new();
    for objective in objectives {
        for (lit, weight) in objective.soft_literals() {
            match positions.get(&lit) {
                Some(&pos) => softs[pos].weight += weight,
                None => {
                    positions.insert(lit, softs.len());
                    softs.push(SoftLiteral { lit, weight });
                }
            }
        }
    }
    softs
}

/// Progress of a single MCS computation.
pub struct McsState {
    /// Soft literals which are satisfied and assumed from now on.
    pub satisfied: Vec<Lit>,
    pub undecided: Vec<Lit>,
    /// Latest model, satisfies all literals of `satisfied`.
    pub model: Model,
}

impl McsState {
    pub fn new(model: Model) -> Self {
        Self {
            satisfied: Vec::new(),
            undecided: Vec::new(),
            model,
        }
    }

    /// Moves undecided literals satisfied by the current model to `satisfied`.
    pub fn absorb_satisfied(&mut self) {
        let model = &self.model;
        let (now_satisfied, still_undecided): (Vec<Lit>, Vec<Lit>) =
            self.undecided.iter().partition(|&&lit| model.lit_value(lit));
        self.satisfied.extend(now_satisfied);
        self.undecided = still_undecided;
    }
}

pub enum McsOutcome {
    Found { mcs: Vec<Lit>, model: Model },
    /// Hard constraints are unsatisfiable under the fixed assumptions.
    Unsatisfiable { core: Vec<Lit> },
    /// Time limit was reached, the model (if any) is feasible but not necessarily Pareto-optimal.
    Interrupted { model: Option<Model> },
}

/// Shrinks `state.undecided` to an MCS. Returns false if the solver gave up (conflict or time limit).
pub fn extend(
    algorithm: McsAlgorithm,
    ctx: &mut SolverContext,
    fixed: &[Lit],
    state: &mut McsState,
    clock: &Clock,
) -> Result<bool> {
    match algorithm {
        McsAlgorithm::Cld => cld::extend(ctx, fixed, state, clock),
        McsAlgorithm::Lbx => lbx::extend(ctx, fixed, state, clock),
    }
}
