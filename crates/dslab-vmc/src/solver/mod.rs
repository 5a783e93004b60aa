//! Narrow interface of an incremental pseudo-Boolean solver.
//!
//! The consolidation algorithms need only a handful of operations from the solver: fresh variables, hard and
//! removable constraints, solving under assumptions with unsat cores, and per-call conflict and time limits.
//! Any engine providing them can be plugged in by implementing [`PbSolver`]; [`SatSolver`] runs CaDiCaL and is
//! the default one.

pub mod constraint;
pub mod lit;
pub mod sat;

pub use constraint::{Comparison, PbConstraint};
pub use lit::{Lit, Var};
pub use sat::SatSolver;

use crate::error::Contradiction;

/// Opaque identifier of a removable constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub(crate) usize);

/// Complete assignment of the solver variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    pub fn value(&self, var: Var) -> bool {
        self.values[var.index()]
    }

    pub fn lit_value(&self, lit: Lit) -> bool {
        lit.eval(self.values[lit.var().index()])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SolveResult {
    /// Conflict or time limit was reached.
    Unknown,
    Sat(Model),
    /// Subset of the assumptions which is enough for unsatisfiability, empty if the formula is unsatisfiable on its
    /// own.
    Unsat(Vec<Lit>),
}

pub trait PbSolver {
    fn new_var(&mut self) -> Var;

    fn num_vars(&self) -> usize;

    /// Adds a permanent constraint. Fails if the formula becomes trivially unsatisfiable.
    fn add_constraint(&mut self, constraint: PbConstraint) -> Result<(), Contradiction>;

    /// Adds a constraint which can be removed later with [`PbSolver::remove_constraints`].
    /// Fails only if the permanent part of the formula is already unsatisfiable.
    fn add_removable(&mut self, constraint: PbConstraint) -> Result<ConstraintId, Contradiction>;

    fn remove_constraints(&mut self, ids: &[ConstraintId]);

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult;

    /// Limits the number of conflicts of each subsequent `solve` call, `None` removes the limit.
    fn set_max_conflicts(&mut self, max_conflicts: Option<u64>);

    /// Limits the duration of each subsequent `solve` call in seconds, `None` removes the limit.
    fn set_timeout(&mut self, timeout: Option<f64>);

    /// Total number of conflicts over all `solve` calls.
    fn conflict_count(&self) -> u64;

    /// Number of active (not removed) constraints.
    fn num_constraints(&self) -> usize;

    fn new_lit(&mut self) -> Lit {
        self.new_var().pos_lit()
    }
}
