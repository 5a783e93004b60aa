//! [`PbSolver`] backed by CaDiCaL through `rustsat`.
//!
//! Normalized constraints become a single clause when every coefficient reaches the degree, a totalizer when all
//! coefficients are equal and a generalized totalizer otherwise. A removable constraint gets a fresh selector
//! literal: each of its clauses is weakened by the negated selector, active selectors are assumed on every call and
//! removal fixes the selector to false, which leaves the clauses satisfied for good.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::{error, trace};
use rustc_hash::FxHashSet;
use rustsat::encodings::card::{self, DbTotalizer};
use rustsat::encodings::pb::{self, DbGte};
use rustsat::instances::{BasicVarManager, Cnf, ManageVars};
use rustsat::solvers::{
    ControlSignal, GetInternalStats, LimitConflicts, Propagate, Solve, SolveIncremental, SolverResult, Terminate,
};
use rustsat::types::{Clause, Lit as SatLit, TernaryVal, Var as SatVar};
use rustsat_cadical::CaDiCaL;

use crate::error::Contradiction;
use crate::solver::constraint::{NormalizedConstraint, PbConstraint};
use crate::solver::lit::{Lit, Var};
use crate::solver::{ConstraintId, Model, PbSolver, SolveResult};

fn to_sat(lit: Lit) -> SatLit {
    let var = SatVar::new(lit.var().index() as u32);
    if lit.is_negated() {
        var.neg_lit()
    } else {
        var.pos_lit()
    }
}

fn from_sat(lit: SatLit) -> Lit {
    Lit::new(Var::new(lit.var().idx32() as usize), lit.is_neg())
}

struct Removable {
    selector: SatLit,
    size: usize,
}

pub struct SatSolver {
    oracle: CaDiCaL<'static, 'static>,
    var_manager: BasicVarManager,
    removables: Vec<Option<Removable>>,
    selector_vars: FxHashSet<Var>,
    deadline: Rc<Cell<Option<Instant>>>,
    max_conflicts: Option<u64>,
    timeout: Option<f64>,
    inconsistent: bool,
    active_constraints: usize,
}

impl SatSolver {
    pub fn new() -> Self {
        let deadline: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
        let mut oracle = CaDiCaL::default();
        let watched = Rc::clone(&deadline);
        oracle.attach_terminator(move || match watched.get() {
            Some(deadline) if Instant::now() >= deadline => ControlSignal::Terminate,
            _ => ControlSignal::Continue,
        });
        Self {
            oracle,
            var_manager: BasicVarManager::default(),
            removables: Vec::new(),
            selector_vars: FxHashSet::default(),
            deadline,
            max_conflicts: None,
            timeout: None,
            inconsistent: false,
            active_constraints: 0,
        }
    }

    /// Clauses of `sum(a_i * l_i) >= d`, stated as an upper bound on the weight of falsified literals.
    fn clauses(&mut self, constraint: &NormalizedConstraint) -> Result<Vec<Clause>, String> {
        let degree = constraint.degree;
        let total: i64 = constraint.terms.iter().map(|&(_, coeff)| coeff).sum();
        if total < degree {
            return Ok(vec![Clause::new()]);
        }
        if constraint.terms.iter().all(|&(_, coeff)| coeff >= degree) {
            let mut clause = Clause::new();
            for &(lit, _) in &constraint.terms {
                clause.add(to_sat(lit));
            }
            return Ok(vec![clause]);
        }

        let slack = (total - degree) as usize;
        let mut cnf = Cnf::new();
        let first_coeff = constraint.terms[0].1;
        let units = if constraint.terms.iter().all(|&(_, coeff)| coeff == first_coeff) {
            let bound = slack / first_coeff as usize;
            let mut encoding: DbTotalizer = constraint.terms.iter().map(|&(lit, _)| !to_sat(lit)).collect();
            card::BoundUpper::encode_ub(&mut encoding, bound..bound + 1, &mut cnf, &mut self.var_manager)
                .map_err(|err| err.to_string())?;
            card::BoundUpper::enforce_ub(&encoding, bound).map_err(|err| err.to_string())?
        } else {
            let mut encoding: DbGte = constraint
                .terms
                .iter()
                .map(|&(lit, coeff)| (!to_sat(lit), coeff as usize))
                .collect();
            pb::BoundUpper::encode_ub(&mut encoding, slack..slack + 1, &mut cnf, &mut self.var_manager)
                .map_err(|err| err.to_string())?;
            pb::BoundUpper::enforce_ub(&encoding, slack).map_err(|err| err.to_string())?
        };

        let mut clauses: Vec<Clause> = cnf.into_iter().collect();
        for unit in units {
            let mut clause = Clause::new();
            clause.add(unit);
            clauses.push(clause);
        }
        Ok(clauses)
    }

    /// Adds clauses of the normalized parts, weakened by the negated selector if there is one.
    fn add_parts(&mut self, parts: &[NormalizedConstraint], selector: Option<SatLit>) -> Result<(), String> {
        for part in parts {
            for mut clause in self.clauses(part)? {
                if let Some(selector) = selector {
                    clause.add(!selector);
                }
                self.oracle.add_clause(clause).map_err(|err| err.to_string())?;
            }
        }
        Ok(())
    }

    /// Propagates the hard part of the formula, returns false on a conflict.
    fn root_consistent(&mut self) -> Result<bool, String> {
        let result = self.oracle.propagate(&[], false).map_err(|err| err.to_string())?;
        Ok(!result.conflict)
    }

    fn fail(&mut self, err: String) -> Contradiction {
        error!("SAT backend failed: {}", err);
        self.inconsistent = true;
        Contradiction
    }

    fn model(&self) -> Result<Model, String> {
        let max_var = match self.var_manager.max_var() {
            Some(var) => var,
            None => return Ok(Model::new(Vec::new())),
        };
        let solution = self.oracle.solution(max_var).map_err(|err| err.to_string())?;
        let values = (0..=max_var.idx32())
            .map(|idx| solution.lit_value(SatVar::new(idx).pos_lit()) == TernaryVal::True)
            .collect();
        Ok(Model::new(values))
    }

    fn run(&mut self, assumptions: &[Lit]) -> Result<SolveResult, String> {
        if let Some(max_var) = self.var_manager.max_var() {
            self.oracle.reserve(max_var).map_err(|err| err.to_string())?;
        }
        let limit = self.max_conflicts.map(|max| max.min(u32::MAX as u64) as u32);
        self.oracle.limit_conflicts(limit).map_err(|err| err.to_string())?;
        self.deadline.set(
            self.timeout
                .and_then(|timeout| Duration::try_from_secs_f64(timeout).ok())
                .and_then(|timeout| Instant::now().checked_add(timeout)),
        );

        let mut sat_assumptions: Vec<SatLit> = assumptions.iter().map(|&lit| to_sat(lit)).collect();
        sat_assumptions.extend(self.removables.iter().flatten().map(|removable| removable.selector));
        let result = self
            .oracle
            .solve_assumps(&sat_assumptions)
            .map_err(|err| err.to_string())?;
        self.deadline.set(None);

        Ok(match result {
            SolverResult::Sat => SolveResult::Sat(self.model()?),
            SolverResult::Unsat => {
                // literals of the core are negations of failed assumptions
                let core = self.oracle.core().map_err(|err| err.to_string())?;
                let mut failed: Vec<Lit> = core
                    .into_iter()
                    .map(|lit| from_sat(!lit))
                    .filter(|lit| !self.selector_vars.contains(&lit.var()))
                    .collect();
                failed.sort();
                failed.dedup();
                SolveResult::Unsat(failed)
            }
            SolverResult::Interrupted => SolveResult::Unknown,
        })
    }
}

impl Default for SatSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PbSolver for SatSolver {
    fn new_var(&mut self) -> Var {
        Var::new(self.var_manager.new_var().idx32() as usize)
    }

    fn num_vars(&self) -> usize {
        self.var_manager.max_var().map_or(0, |var| var.idx32() as usize + 1)
    }

    fn add_constraint(&mut self, constraint: PbConstraint) -> Result<(), Contradiction> {
        if self.inconsistent {
            return Err(Contradiction);
        }
        let parts = constraint.normalize();
        if parts.iter().any(|part| part.terms.iter().map(|&(_, coeff)| coeff).sum::<i64>() < part.degree) {
            self.inconsistent = true;
            return Err(Contradiction);
        }
        self.add_parts(&parts, None).map_err(|err| self.fail(err))?;
        self.active_constraints += parts.len();
        match self.root_consistent() {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.inconsistent = true;
                Err(Contradiction)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn add_removable(&mut self, constraint: PbConstraint) -> Result<ConstraintId, Contradiction> {
        if self.inconsistent {
            return Err(Contradiction);
        }
        let selector = self.var_manager.new_var().pos_lit();
        self.selector_vars.insert(from_sat(selector).var());
        let parts = constraint.normalize();
        self.add_parts(&parts, Some(selector)).map_err(|err| self.fail(err))?;
        self.active_constraints += parts.len();
        self.removables.push(Some(Removable {
            selector,
            size: parts.len(),
        }));
        Ok(ConstraintId(self.removables.len() - 1))
    }

    fn remove_constraints(&mut self, ids: &[ConstraintId]) {
        for id in ids {
            if let Some(removable) = self.removables[id.0].take() {
                self.active_constraints -= removable.size;
                if let Err(err) = self.oracle.add_unit(!removable.selector) {
                    self.fail(err.to_string());
                }
            }
        }
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        if self.inconsistent {
            return SolveResult::Unsat(Vec::new());
        }
        if self.timeout.map_or(false, |timeout| timeout <= 0.) {
            return SolveResult::Unknown;
        }
        let conflicts_before = self.conflict_count();
        let result = match self.run(assumptions) {
            Ok(result) => result,
            Err(err) => {
                error!("SAT backend failed: {}", err);
                self.deadline.set(None);
                SolveResult::Unknown
            }
        };
        trace!(
            "solve with {} assumptions: {} after {} conflicts",
            assumptions.len(),
            match &result {
                SolveResult::Unknown => "unknown",
                SolveResult::Sat(_) => "sat",
                SolveResult::Unsat(_) => "unsat",
            },
            self.conflict_count() - conflicts_before
        );
        result
    }

    fn set_max_conflicts(&mut self, max_conflicts: Option<u64>) {
        self.max_conflicts = max_conflicts;
    }

    fn set_timeout(&mut self, timeout: Option<f64>) {
        self.timeout = timeout;
    }

    fn conflict_count(&self) -> u64 {
        self.oracle.conflicts() as u64
    }

    fn num_constraints(&self) -> usize {
        self.active_constraints
    }
}
