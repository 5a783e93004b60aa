//! Random parity (XOR) constraints partitioning the solution space into cells.
//!
//! A hash function with `k` parities splits the space into about `2^k` cells. All its constraints are removable and
//! gated by a single activator literal which has to be passed to the solver as an assumption, so dropping the hash
//! function leaves the rest of the formula intact. The number of parities grows when a cell holds too many solutions
//! and shrinks when a cell turns out to be empty.
//!
//! Variables of a removed hash function (its activator and XOR chain) are reused by the next one, so the number of
//! solver variables is bounded by the largest hash function generated so far.

use log::{debug, info};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::config::HashingConfig;
use crate::error::Contradiction;
use crate::solver::{ConstraintId, Lit, PbConstraint, PbSolver};

const MAX_GENERATION_ATTEMPTS: usize = 16;

/// Number of solutions after which a cell is considered too large for the given tolerance.
pub fn cell_threshold(epsilon: f64) -> usize {
    (1. + 9.84 * (1. + epsilon / (1. + epsilon)) * (1. + 1. / epsilon).powi(2)).ceil() as usize
}

/// Clauses of `target <-> a XOR b`.
fn xor_definition(target: Lit, a: Lit, b: Lit) -> [PbConstraint; 4] {
    [
        PbConstraint::clause(vec![!target, a, b]),
        PbConstraint::clause(vec![!target, !a, !b]),
        PbConstraint::clause(vec![target, !a, b]),
        PbConstraint::clause(vec![target, a, !b]),
    ]
}

pub struct HashPartitioner {
    lits: Vec<Lit>,
    rng: Pcg64,
    parities: usize,
    max_parities: usize,
    threshold: usize,
    activator: Option<Lit>,
    constraint_ids: Vec<ConstraintId>,
    spare: Vec<Lit>,
    chain: Vec<Lit>,
    cell_solutions: usize,
    estimates: Vec<f64>,
}

impl HashPartitioner {
    /// Creates partitioner over the given literals. No constraints are added until [`HashPartitioner::regenerate`].
    pub fn new(lits: Vec<Lit>, config: &HashingConfig, seed: u64) -> Self {
        Self {
            lits,
            rng: Pcg64::seed_from_u64(seed),
            parities: config.initial_parities,
            max_parities: config.max_parities,
            threshold: cell_threshold(config.epsilon),
            activator: None,
            constraint_ids: Vec::new(),
            spare: Vec::new(),
            chain: Vec::new(),
            cell_solutions: 0,
            estimates: Vec::new(),
        }
    }

    pub fn parities(&self) -> usize {
        self.parities
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn cell_solutions(&self) -> usize {
        self.cell_solutions
    }

    /// Approximate solution counts reported for exhausted cells.
    pub fn estimates(&self) -> &[f64] {
        &self.estimates
    }

    pub fn constraint_ids(&self) -> &[ConstraintId] {
        &self.constraint_ids
    }

    /// Assumptions selecting the current cell, empty if there is no active hash function.
    pub fn assumptions(&self) -> Vec<Lit> {
        self.activator.into_iter().collect()
    }

    pub fn is_active(&self) -> bool {
        self.activator.is_some()
    }

    /// Removes exactly the constraints added by the current hash function.
    pub fn remove(&mut self, solver: &mut dyn PbSolver) {
        solver.remove_constraints(&self.constraint_ids);
        self.constraint_ids.clear();
        // chain literals are pushed last so the activator is taken first next time
        self.spare.extend(self.chain.drain(..).rev());
        self.spare.extend(self.activator.take());
    }

    /// Literal for the next hash function, a spare one if any is left.
    fn fresh_lit(&mut self, solver: &mut dyn PbSolver) -> Lit {
        let lit = self.spare.pop().unwrap_or_else(|| solver.new_lit());
        if self.activator.is_some() {
            self.chain.push(lit);
        }
        lit
    }

    /// Replaces the current hash function with a fresh random one with the current number of parities.
    pub fn regenerate(&mut self, solver: &mut dyn PbSolver) -> Result<(), Contradiction> {
        self.remove(solver);
        self.cell_solutions = 0;
        if self.parities == 0 || self.lits.is_empty() {
            return Ok(());
        }
        let mut attempts = 0;
        loop {
            match self.generate(solver) {
                Ok(()) => return Ok(()),
                Err(Contradiction) => {
                    self.remove(solver);
                    attempts += 1;
                    if attempts >= MAX_GENERATION_ATTEMPTS {
                        return Err(Contradiction);
                    }
                    debug!("Hash function is contradictory, generating another one");
                }
            }
        }
    }

    /// Registers a solution found in the current cell. Returns true if the cell reached the threshold and the hash
    /// function was regenerated with one more parity.
    pub fn record_solution(&mut self, solver: &mut dyn PbSolver) -> Result<bool, Contradiction> {
        self.cell_solutions += 1;
        if self.cell_solutions < self.threshold {
            return Ok(false);
        }
        if self.parities < self.max_parities {
            self.parities += 1;
        }
        info!(
            "Cell reached {} solutions, switching to {} parities",
            self.cell_solutions, self.parities
        );
        self.regenerate(solver)?;
        Ok(true)
    }

    /// Handles a cell without further solutions. Returns false if the exhausted cell was the whole space.
    pub fn cell_exhausted(&mut self, solver: &mut dyn PbSolver) -> Result<bool, Contradiction> {
        if !self.is_active() {
            return Ok(false);
        }
        let estimate = self.cell_solutions as f64 * 2f64.powi(self.parities as i32);
        self.estimates.push(estimate);
        info!(
            "Cell with {} parities exhausted after {} solutions, approximate count: {}",
            self.parities, self.cell_solutions, estimate
        );
        if self.cell_solutions == 0 {
            self.parities -= 1;
        }
        self.regenerate(solver)?;
        Ok(true)
    }

    fn generate(&mut self, solver: &mut dyn PbSolver) -> Result<(), Contradiction> {
        let activator = self.fresh_lit(solver);
        self.activator = Some(activator);
        for _ in 0..self.parities {
            let (subset, parity) = self.random_parity();
            self.add_parity(solver, &subset, parity, activator)?;
        }
        debug!(
            "Generated hash function with {} parities over {} literals",
            self.parities,
            self.lits.len()
        );
        Ok(())
    }

    /// Each literal is included with probability 1/2, the parity is uniform. Empty subsets are rejected.
    fn random_parity(&mut self) -> (Vec<Lit>, bool) {
        loop {
            let subset: Vec<Lit> = self.lits.iter().copied().filter(|_| self.rng.gen_bool(0.5)).collect();
            if !subset.is_empty() {
                return (subset, self.rng.gen_bool(0.5));
            }
        }
    }

    fn add_parity(
        &mut self,
        solver: &mut dyn PbSolver,
        subset: &[Lit],
        parity: bool,
        activator: Lit,
    ) -> Result<(), Contradiction> {
        let mut acc = subset[0];
        for &lit in &subset[1..] {
            let next = self.fresh_lit(solver);
            for clause in xor_definition(next, acc, lit) {
                self.constraint_ids.push(solver.add_removable(clause)?);
            }
            acc = next;
        }
        let target = if parity { acc } else { !acc };
        let id = solver.add_removable(PbConstraint::unit(target).implied_by(activator))?;
        self.constraint_ids.push(id);
        Ok(())
    }
}
