//! Pseudo-Boolean constraints.

use std::collections::BTreeMap;

use crate::solver::lit::{Lit, Var};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    AtLeast,
    AtMost,
    Equal,
}

/// Linear constraint `sum(coeffs[i] * lits[i]) <cmp> rhs` over literals, optionally guarded by literals which must
/// all be true for the constraint to be enforced.
#[derive(Clone, Debug, PartialEq)]
pub struct PbConstraint {
    pub lits: Vec<Lit>,
    pub coeffs: Vec<i64>,
    pub cmp: Comparison,
    pub rhs: i64,
    pub guards: Vec<Lit>,
}

impl PbConstraint {
    pub fn new(lits: Vec<Lit>, coeffs: Vec<i64>, cmp: Comparison, rhs: i64) -> Self {
        assert_eq!(lits.len(), coeffs.len(), "literal and coefficient counts differ");
        Self {
            lits,
            coeffs,
            cmp,
            rhs,
            guards: Vec::new(),
        }
    }

    pub fn at_least(lits: Vec<Lit>, coeffs: Vec<i64>, rhs: i64) -> Self {
        Self::new(lits, coeffs, Comparison::AtLeast, rhs)
    }

    pub fn at_most(lits: Vec<Lit>, coeffs: Vec<i64>, rhs: i64) -> Self {
        Self::new(lits, coeffs, Comparison::AtMost, rhs)
    }

    /// At least one of the literals is true.
    pub fn clause(lits: Vec<Lit>) -> Self {
        let coeffs = vec![1; lits.len()];
        Self::at_least(lits, coeffs, 1)
    }

    pub fn unit(lit: Lit) -> Self {
        Self::clause(vec![lit])
    }

    pub fn at_most_one(lits: Vec<Lit>) -> Self {
        let coeffs = vec![1; lits.len()];
        Self::at_most(lits, coeffs, 1)
    }

    pub fn exactly_one(lits: Vec<Lit>) -> Self {
        let coeffs = vec![1; lits.len()];
        Self::new(lits, coeffs, Comparison::Equal, 1)
    }

    /// Makes the constraint enforced only when `guard` is true.
    pub fn implied_by(mut self, guard: Lit) -> Self {
        self.guards.push(guard);
        self
    }

    /// Evaluates the constraint given literal values.
    pub fn is_satisfied<F: Fn(Lit) -> bool>(&self, value: F) -> bool {
        if self.guards.iter().any(|&g| !value(g)) {
            return true;
        }
        let sum: i64 = self
            .lits
            .iter()
            .zip(&self.coeffs)
            .filter(|(&l, _)| value(l))
            .map(|(_, &c)| c)
            .sum();
        match self.cmp {
            Comparison::AtLeast => sum >= self.rhs,
            Comparison::AtMost => sum <= self.rhs,
            Comparison::Equal => sum == self.rhs,
        }
    }

    /// Converts the constraint into one or two constraints of form `sum(a_i * l_i) >= degree` with positive `a_i`,
    /// at most one literal per variable and coefficients saturated at the degree. Trivially satisfied parts are
    /// dropped.
    pub(crate) fn normalize(&self) -> Vec<NormalizedConstraint> {
        let mut result = Vec::with_capacity(2);
        if self.cmp != Comparison::AtMost {
            if let Some(c) = normalize_at_least(&self.lits, &self.coeffs, 1, self.rhs, &self.guards) {
                result.push(c);
            }
        }
        if self.cmp != Comparison::AtLeast {
            if let Some(c) = normalize_at_least(&self.lits, &self.coeffs, -1, -self.rhs, &self.guards) {
                result.push(c);
            }
        }
        result
    }
}

/// Constraint `sum(a_i * l_i) >= degree`, terms sorted by decreasing coefficient.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NormalizedConstraint {
    pub terms: Vec<(Lit, i64)>,
    pub degree: i64,
}

fn normalize_at_least(
    lits: &[Lit],
    coeffs: &[i64],
    sign: i64,
    rhs: i64,
    guards: &[Lit],
) -> Option<NormalizedConstraint> {
    // sum over positive literals of variables plus a constant
    let mut by_var: BTreeMap<Var, i64> = BTreeMap::new();
    let mut degree = rhs;
    for (&lit, &coeff) in lits.iter().zip(coeffs) {
        let coeff = sign * coeff;
        if lit.is_negated() {
            // c * !x = c - c * x
            degree -= coeff;
            *by_var.entry(lit.var()).or_insert(0) -= coeff;
        } else {
            *by_var.entry(lit.var()).or_insert(0) += coeff;
        }
    }
    let mut terms = Vec::with_capacity(by_var.len() + guards.len());
    for (var, coeff) in by_var {
        if coeff > 0 {
            terms.push((var.pos_lit(), coeff));
        } else if coeff < 0 {
            degree -= coeff;
            terms.push((var.neg_lit(), -coeff));
        }
    }
    if degree <= 0 {
        return None;
    }
    for &guard in guards {
        terms.push((!guard, degree));
    }
    for term in terms.iter_mut() {
        term.1 = term.1.min(degree);
    }
    terms.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    Some(NormalizedConstraint { terms, degree })
}
