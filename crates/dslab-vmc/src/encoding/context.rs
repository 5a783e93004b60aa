//! Solver state shared by the exact algorithms.

use std::rc::Rc;

use crate::config::VmcConfig;
use crate::encoding::encoder::Encoder;
use crate::encoding::variables::VariableMap;
use crate::error::{Contradiction, Result};
use crate::model::{Allocation, Instance};
use crate::objective::{build_objectives, ObjectiveFunction};
use crate::solver::{Lit, Model, PbSolver, SolveResult};

/// Encoded instance together with the solver holding its constraints.
///
/// Created once per solver build and passed by reference to every encoder, objective and enumerator call.
pub struct SolverContext {
    pub instance: Rc<Instance>,
    pub solver: Box<dyn PbSolver>,
    pub vars: VariableMap,
    pub objectives: Vec<ObjectiveFunction>,
}

impl SolverContext {
    /// Encodes the instance into the solver. Fails if the instance is trivially unsatisfiable.
    pub fn build(
        instance: Rc<Instance>,
        mut solver: Box<dyn PbSolver>,
        config: &VmcConfig,
    ) -> std::result::Result<Self, Contradiction> {
        let vars = Encoder::new(config.break_symmetries).encode(&instance, solver.as_mut())?;
        let objectives = build_objectives(
            &instance,
            &vars,
            solver.as_mut(),
            config.wastage,
            config.objective_precision,
        )?;
        Ok(Self {
            instance,
            solver,
            vars,
            objectives,
        })
    }

    pub fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        self.solver.solve(assumptions)
    }

    pub fn allocation(&self, model: &Model) -> Result<Allocation> {
        self.vars.decode(&self.instance, model)
    }

    pub fn costs(&self, model: &Model) -> Vec<f64> {
        self.objectives.iter().map(|f| f.value(model)).collect()
    }

    pub fn scaled_costs(&self, model: &Model) -> Vec<i64> {
        self.objectives.iter().map(|f| f.scaled_value(model)).collect()
    }
}
