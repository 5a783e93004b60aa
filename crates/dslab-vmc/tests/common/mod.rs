#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use dslab_vmc::model::{Allocation, Instance, Job, Mapping, PhysicalMachine, VirtualMachine};
use dslab_vmc::solver::{ConstraintId, Lit, PbConstraint, PbSolver, SatSolver, SolveResult, Var};
use dslab_vmc::Contradiction;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {}", x, y);
}

pub fn pm(id: u32, cpu: u32, memory: u64) -> PhysicalMachine {
    PhysicalMachine::new(id, cpu, memory, 100., 200.)
}

/// Single job with independent VMs of given (cpu, memory), VM IDs start from 0.
pub fn single_job(vms: &[(u32, u64)]) -> Vec<Job> {
    let vms = vms
        .iter()
        .enumerate()
        .map(|(i, &(cpu, memory))| VirtualMachine::new(i as u32, 0, i as u32, cpu, memory, false))
        .collect();
    vec![Job::new(0, vms)]
}

/// Instance with `pm_count` identical machines, PM IDs start from 100.
pub fn uniform_instance(pm_count: u32, cpu: u32, memory: u64, vms: &[(u32, u64)]) -> Rc<Instance> {
    let pms = (0..pm_count).map(|i| pm(100 + i, cpu, memory)).collect();
    Rc::new(Instance::new(pms, single_job(vms), Allocation::new(), 0.).unwrap())
}

/// Four machines of different shape, two jobs with anti-colocation and one platform restriction.
pub fn mixed_instance(pre_mappings: Allocation, max_migration_percentile: f64) -> Rc<Instance> {
    let pms = vec![
        PhysicalMachine::new(1, 8, 16, 120., 250.),
        PhysicalMachine::new(2, 8, 16, 120., 250.),
        PhysicalMachine::new(3, 16, 8, 150., 300.),
        PhysicalMachine::new(4, 4, 32, 80., 160.),
    ];
    let jobs = vec![
        Job::new(
            0,
            vec![
                VirtualMachine::new(10, 0, 0, 4, 4, true),
                VirtualMachine::new(11, 0, 1, 4, 4, true),
                VirtualMachine::new(12, 0, 2, 2, 8, false),
            ],
        ),
        Job::new(
            1,
            vec![
                VirtualMachine::new(20, 1, 0, 6, 2, false).with_unallowed_pms([4]),
                VirtualMachine::new(21, 1, 1, 1, 12, false),
            ],
        ),
    ];
    Rc::new(Instance::new(pms, jobs, pre_mappings, max_migration_percentile).unwrap())
}

pub fn mixed_pre_mappings() -> Allocation {
    Allocation::from_mappings(vec![
        Mapping::new(10, 1),
        Mapping::new(11, 2),
        Mapping::new(12, 4),
        Mapping::new(20, 3),
        Mapping::new(21, 4),
    ])
    .unwrap()
}

pub fn assert_feasible(instance: &Instance, allocation: &Allocation) {
    let violations = instance.validate_allocation(allocation);
    assert!(violations.is_empty(), "{} violates {:?}", allocation, violations);
}

/// Two VMs pre-mapped to the machine with low idle but high peak power. Energy and migration conflict: the Pareto
/// front is {(200, 4), (300, 0)}.
pub fn trade_off_instance() -> Rc<Instance> {
    let pms = vec![
        PhysicalMachine::new(100, 4, 4, 100., 200.),
        PhysicalMachine::new(101, 4, 4, 50., 300.),
    ];
    let pre_mappings = Allocation::from_mappings(vec![Mapping::new(0, 101), Mapping::new(1, 101)]).unwrap();
    Rc::new(Instance::new(pms, single_job(&[(2, 2), (2, 2)]), pre_mappings, 1.).unwrap())
}

pub fn trade_off_front() -> Vec<Vec<f64>> {
    vec![vec![200., 4.], vec![300., 0.]]
}

pub fn assert_front_eq(mut costs: Vec<Vec<f64>>, expected: Vec<Vec<f64>>) {
    costs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(costs.len(), expected.len(), "{:?} != {:?}", costs, expected);
    for (point, expected) in costs.iter().zip(&expected) {
        assert_eq!(point.len(), expected.len());
        for (x, y) in point.iter().zip(expected) {
            assert_float_eq(*x, *y, 1e-6);
        }
    }
}

/// Time limits passed to solvers, tagged with the index of the solver which received them.
pub type TimeoutLog = Rc<RefCell<Vec<(usize, Option<f64>)>>>;

/// Wraps [`SatSolver`]: writes every time limit to the log and answers `Unknown` to all `solve` calls after the
/// first `interrupt_after` ones.
pub struct ScriptedSolver {
    inner: SatSolver,
    id: usize,
    log: TimeoutLog,
    solves: usize,
    interrupt_after: Option<usize>,
}

impl ScriptedSolver {
    pub fn new(id: usize, log: TimeoutLog, interrupt_after: Option<usize>) -> Self {
        Self {
            inner: SatSolver::new(),
            id,
            log,
            solves: 0,
            interrupt_after,
        }
    }
}

impl PbSolver for ScriptedSolver {
    fn new_var(&mut self) -> Var {
        self.inner.new_var()
    }

    fn num_vars(&self) -> usize {
        self.inner.num_vars()
    }

    fn add_constraint(&mut self, constraint: PbConstraint) -> Result<(), Contradiction> {
        self.inner.add_constraint(constraint)
    }

    fn add_removable(&mut self, constraint: PbConstraint) -> Result<ConstraintId, Contradiction> {
        self.inner.add_removable(constraint)
    }

    fn remove_constraints(&mut self, ids: &[ConstraintId]) {
        self.inner.remove_constraints(ids)
    }

    fn solve(&mut self, assumptions: &[Lit]) -> SolveResult {
        self.solves += 1;
        match self.interrupt_after {
            Some(limit) if self.solves > limit => SolveResult::Unknown,
            _ => self.inner.solve(assumptions),
        }
    }

    fn set_max_conflicts(&mut self, max_conflicts: Option<u64>) {
        self.inner.set_max_conflicts(max_conflicts)
    }

    fn set_timeout(&mut self, timeout: Option<f64>) {
        self.log.borrow_mut().push((self.id, timeout));
        self.inner.set_timeout(timeout)
    }

    fn conflict_count(&self) -> u64 {
        self.inner.conflict_count()
    }

    fn num_constraints(&self) -> usize {
        self.inner.num_constraints()
    }
}
