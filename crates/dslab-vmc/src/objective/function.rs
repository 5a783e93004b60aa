use std::fmt::{Display, Formatter};

use crate::solver::{Lit, Model, PbConstraint};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectiveKind {
    Energy,
    Wastage,
    Migration,
}

impl Display for ObjectiveKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectiveKind::Energy => write!(f, "energy"),
            ObjectiveKind::Wastage => write!(f, "wastage"),
            ObjectiveKind::Migration => write!(f, "migration"),
        }
    }
}

/// Linear objective `sum(coeffs[i] * lits[i])` to be minimized.
///
/// Real-valued coefficients are used for reporting, bounds passed to the solver use the coefficients scaled by
/// `10^precision` and rounded.
#[derive(Clone, Debug)]
pub struct ObjectiveFunction {
    kind: ObjectiveKind,
    lits: Vec<Lit>,
    coeffs: Vec<f64>,
    scaled: Vec<i64>,
    min: f64,
    max: f64,
}

impl ObjectiveFunction {
    pub fn new(kind: ObjectiveKind, lits: Vec<Lit>, coeffs: Vec<f64>, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        let scaled = coeffs.iter().map(|c| (c * scale).round() as i64).collect();
        let min = coeffs.iter().filter(|&&c| c < 0.).sum();
        let max = coeffs.iter().filter(|&&c| c > 0.).sum();
        Self {
            kind,
            lits,
            coeffs,
            scaled,
            min,
            max,
        }
    }

    pub fn kind(&self) -> ObjectiveKind {
        self.kind
    }

    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn scaled_coeffs(&self) -> &[i64] {
        &self.scaled
    }

    /// Lower bound of the objective: sum of negative coefficients.
    pub fn min_bound(&self) -> f64 {
        self.min
    }

    /// Upper bound of the objective: sum of positive coefficients.
    pub fn max_bound(&self) -> f64 {
        self.max
    }

    pub fn value(&self, model: &Model) -> f64 {
        self.lits
            .iter()
            .zip(&self.coeffs)
            .filter(|(&lit, _)| model.lit_value(lit))
            .map(|(_, c)| c)
            .sum()
    }

    pub fn scaled_value(&self, model: &Model) -> i64 {
        self.lits
            .iter()
            .zip(&self.scaled)
            .filter(|(&lit, _)| model.lit_value(lit))
            .map(|(_, c)| c)
            .sum()
    }

    /// Constraint `objective <= bound` in scaled units.
    pub fn at_most(&self, bound: i64) -> PbConstraint {
        PbConstraint::at_most(self.lits.clone(), self.scaled.clone(), bound)
    }

    /// Literals whose satisfaction decreases the objective, with weights normalized by the objective range.
    /// A literal with positive coefficient is soft when negated, one with negative coefficient as is.
    pub fn soft_literals(&self) -> Vec<(Lit, f64)> {
        let range = self.max - self.min;
        let range = if range > 0. { range } else { 1. };
        self.lits
            .iter()
            .zip(&self.coeffs)
            .filter(|(_, &c)| c != 0.)
            .map(|(&lit, &c)| if c > 0. { (!lit, c / range) } else { (lit, -c / range) })
            .collect()
    }
}
