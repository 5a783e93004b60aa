//! Boolean variables and literals.

use std::fmt::{Display, Formatter};
use std::ops::Not;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Var(u32);

impl Var {
    pub fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn pos_lit(self) -> Lit {
        Lit::new(self, false)
    }

    pub fn neg_lit(self) -> Lit {
        Lit::new(self, true)
    }
}

/// Variable or its negation, packed as `2 * var + negated`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(u32);

impl Lit {
    pub fn new(var: Var, negated: bool) -> Self {
        Self(var.0 << 1 | negated as u32)
    }

    pub fn var(self) -> Var {
        Var(self.0 >> 1)
    }

    pub fn is_negated(self) -> bool {
        self.0 & 1 == 1
    }

    /// Dense code usable as an index of per-literal tables.
    pub fn code(self) -> usize {
        self.0 as usize
    }

    /// Value of the literal under the given value of its variable.
    pub fn eval(self, var_value: bool) -> bool {
        var_value != self.is_negated()
    }
}

impl Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "-x{}", self.var().0)
        } else {
            write!(f, "x{}", self.var().0)
        }
    }
}
