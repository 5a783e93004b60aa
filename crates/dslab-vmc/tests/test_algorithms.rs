mod common;

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;
use std::str::FromStr;

use rstest::rstest;

use dslab_vmc::algorithms::progress::SEPARATOR;
use dslab_vmc::binpacking::PackingOrder;
use dslab_vmc::mcs::McsAlgorithm;
use dslab_vmc::model::{Allocation, Mapping};
use dslab_vmc::solver::{PbSolver, SatSolver};
use dslab_vmc::{Allocator, SearchStrategy, VmcConfig, VmcError};

use common::{
    assert_feasible, assert_float_eq, assert_front_eq, init_logger, mixed_instance, mixed_pre_mappings,
    trade_off_front, trade_off_instance, uniform_instance, ScriptedSolver, TimeoutLog,
};

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.borrow().clone())
            .unwrap()
            .lines()
            .map(|line| line.to_string())
            .collect()
    }
}

/// Accepts points but fails to flush, which happens after each run.
struct UnflushableSink;

impl Write for UnflushableSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed"))
    }
}

/// Each created solver gets the next index and writes its time limits to the log.
fn scripted_factory(log: &TimeoutLog, interrupt_after: Option<usize>) -> Box<dyn Fn() -> Box<dyn PbSolver>> {
    let log = log.clone();
    let created = Rc::new(Cell::new(0));
    Box::new(move || -> Box<dyn PbSolver> {
        let id = created.get();
        created.set(id + 1);
        Box::new(ScriptedSolver::new(id, log.clone(), interrupt_after))
    })
}

fn trade_off_config() -> VmcConfig {
    VmcConfig {
        wastage: false,
        ..VmcConfig::default()
    }
}

#[rstest]
#[case(SearchStrategy::GuidedImprovement)]
#[case(SearchStrategy::ParetoMcs)]
fn exact_strategies_find_pareto_front(#[case] strategy: SearchStrategy) {
    init_logger();
    let mut allocator = Allocator::new(trade_off_instance(), trade_off_config(), strategy);
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    assert_front_eq(allocator.populations(), trade_off_front());
    for allocation in allocator.allocations() {
        assert_feasible(&trade_off_instance(), &allocation);
    }
    assert_float_eq(allocator.best_costs()[0], 200., 1e-6);
    assert_float_eq(allocator.best_costs()[1], 0., 1e-6);
}

#[rstest]
#[case(0, 200.)]
#[case(1, 0.)]
fn linear_search_minimizes_one_objective(#[case] objective: usize, #[case] optimum: f64) {
    init_logger();
    let config = VmcConfig {
        linear_search_objective: objective,
        ..trade_off_config()
    };
    let mut allocator = Allocator::new(trade_off_instance(), config, SearchStrategy::LinearSearch);
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    assert_float_eq(allocator.best_costs()[objective], optimum, 1e-6);
}

#[test]
fn linear_search_rejects_unknown_objective() {
    let config = VmcConfig {
        linear_search_objective: 5,
        ..trade_off_config()
    };
    let mut allocator = Allocator::new(trade_off_instance(), config, SearchStrategy::LinearSearch);
    assert!(matches!(allocator.allocate(), Err(VmcError::Config(_))));
}

#[test]
fn bin_packing_keeps_pre_existing_placement() {
    init_logger();
    let mut allocator = Allocator::new(trade_off_instance(), trade_off_config(), SearchStrategy::BinPacking);
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    assert_front_eq(allocator.populations(), vec![vec![300., 0.]]);
}

#[rstest]
#[case(SearchStrategy::BinPacking)]
#[case(SearchStrategy::LinearSearch)]
#[case(SearchStrategy::GuidedImprovement)]
#[case(SearchStrategy::ParetoMcs)]
fn strategies_produce_feasible_allocations(#[case] strategy: SearchStrategy) {
    init_logger();
    let instance = mixed_instance(mixed_pre_mappings(), 0.5);
    let config = VmcConfig {
        timeout: 2.,
        ..VmcConfig::default()
    };
    let mut allocator = Allocator::new(instance.clone(), config, strategy);
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    for allocation in allocator.allocations() {
        assert_feasible(&instance, &allocation);
    }
    for costs in allocator.populations() {
        assert_eq!(costs.len(), 3);
    }
}

#[rstest]
#[case(SearchStrategy::BinPacking)]
#[case(SearchStrategy::LinearSearch)]
#[case(SearchStrategy::GuidedImprovement)]
#[case(SearchStrategy::ParetoMcs)]
fn unsatisfiable_instance_reports_no_solution(#[case] strategy: SearchStrategy) {
    init_logger();
    let instance = uniform_instance(2, 4, 4, &[(3, 3), (3, 3), (3, 3)]);
    let mut allocator = Allocator::new(instance, VmcConfig::default(), strategy);
    allocator.allocate().unwrap();
    assert!(!allocator.found_solution());
    assert!(allocator.populations().is_empty());
}

#[test]
fn zero_timeout_stops_exact_search() {
    let config = VmcConfig {
        timeout: 0.,
        ..trade_off_config()
    };
    let mut allocator = Allocator::new(trade_off_instance(), config.clone(), SearchStrategy::GuidedImprovement);
    allocator.allocate().unwrap();
    assert!(!allocator.found_solution());

    let seeded = VmcConfig {
        heuristic_seeding: true,
        ..config
    };
    let mut allocator = Allocator::new(trade_off_instance(), seeded, SearchStrategy::ParetoMcs);
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    assert_eq!(allocator.populations().len(), 1);
}

#[test]
fn heuristic_seeding_does_not_change_front() {
    init_logger();
    let config = VmcConfig {
        heuristic_seeding: true,
        ..trade_off_config()
    };
    for strategy in [SearchStrategy::GuidedImprovement, SearchStrategy::ParetoMcs] {
        let mut allocator = Allocator::new(trade_off_instance(), config.clone(), strategy);
        allocator.allocate().unwrap();
        assert_front_eq(allocator.populations(), trade_off_front());
    }
}

#[test]
fn multiple_seeds_write_progress() {
    init_logger();
    let mut config = VmcConfig::default();
    config.bin_packing.shuffle = true;
    let instance = uniform_instance(4, 8, 8, &[(2, 2), (3, 1), (1, 3), (2, 2), (4, 4)]);
    let buffer = SharedBuffer::default();
    let mut allocator = Allocator::new(instance.clone(), config, SearchStrategy::BinPacking);
    allocator.set_progress_sink(Box::new(buffer.clone()));
    allocator.allocate_multiple_seeds(3).unwrap();

    assert!(allocator.found_solution());
    assert!(!allocator.populations().is_empty());
    for allocation in allocator.allocations() {
        assert_feasible(&instance, &allocation);
    }
    let lines = buffer.lines();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines.iter().filter(|line| line.as_str() == SEPARATOR).count(), 3);
    for line in lines.iter().filter(|line| line.as_str() != SEPARATOR) {
        assert_eq!(line.split(' ').count(), 2);
    }
}

#[test]
fn multiple_seeds_merge_archives() {
    init_logger();
    let mut allocator = Allocator::new(trade_off_instance(), trade_off_config(), SearchStrategy::ParetoMcs);
    allocator.allocate_multiple_seeds(2).unwrap();
    assert_front_eq(allocator.populations(), trade_off_front());

    allocator.clear();
    assert!(!allocator.found_solution());
    assert!(allocator.populations().is_empty());
}

#[test]
fn custom_solver_factory() {
    let mut config = trade_off_config();
    config.mcs.algorithm = McsAlgorithm::Lbx;
    let mut allocator = Allocator::new(trade_off_instance(), config, SearchStrategy::ParetoMcs);
    allocator.set_solver_factory(Box::new(|| -> Box<dyn PbSolver> {
        let mut solver = SatSolver::new();
        solver.set_max_conflicts(Some(1_000_000));
        Box::new(solver)
    }));
    allocator.allocate().unwrap();
    assert_front_eq(allocator.populations(), trade_off_front());
}

#[test]
fn later_seeds_inherit_unused_time() {
    init_logger();
    let config = VmcConfig {
        timeout: 30.,
        ..trade_off_config()
    };
    let log = TimeoutLog::default();
    let mut allocator = Allocator::new(trade_off_instance(), config, SearchStrategy::GuidedImprovement);
    allocator.set_solver_factory(scripted_factory(&log, None));
    allocator.allocate_multiple_seeds(2).unwrap();
    assert_front_eq(allocator.populations(), trade_off_front());

    let log = log.borrow();
    let first_run: Vec<f64> = log.iter().filter(|(id, _)| *id == 0).filter_map(|(_, t)| *t).collect();
    let second_run: Vec<f64> = log.iter().filter(|(id, _)| *id == 1).filter_map(|(_, t)| *t).collect();
    assert!(!first_run.is_empty() && !second_run.is_empty());
    assert!(first_run.iter().all(|&timeout| timeout <= 30.));
    assert!(second_run[0] > 30. && second_run[0] <= 60.);
}

#[test]
fn interrupted_search_reports_last_model() {
    init_logger();
    let log = TimeoutLog::default();
    let mut allocator = Allocator::new(trade_off_instance(), trade_off_config(), SearchStrategy::ParetoMcs);
    allocator.set_solver_factory(scripted_factory(&log, Some(1)));
    allocator.allocate().unwrap();
    assert!(allocator.found_solution());
    assert_eq!(allocator.populations().len(), 1);
    for allocation in allocator.allocations() {
        assert_feasible(&trade_off_instance(), &allocation);
    }
}

#[test]
fn failing_progress_sink_keeps_solutions() {
    init_logger();
    let mut allocator = Allocator::new(trade_off_instance(), trade_off_config(), SearchStrategy::GuidedImprovement);
    allocator.set_progress_sink(Box::new(UnflushableSink));
    assert!(matches!(allocator.allocate(), Err(VmcError::Io(_))));
    assert!(allocator.found_solution());
    assert_front_eq(allocator.populations(), trade_off_front());
    assert_float_eq(allocator.best_costs()[0], 200., 1e-6);
}

#[test]
fn bin_packing_within_zero_budget_reports_no_solution() {
    init_logger();
    let pre_mappings = Allocation::from_mappings(vec![
        Mapping::new(10, 1),
        Mapping::new(11, 1),
        Mapping::new(12, 4),
        Mapping::new(20, 3),
        Mapping::new(21, 4),
    ])
    .unwrap();
    let instance = mixed_instance(pre_mappings, 0.);
    let mut allocator = Allocator::new(instance.clone(), VmcConfig::default(), SearchStrategy::BinPacking);
    allocator.allocate().unwrap();
    assert!(!allocator.found_solution());
    assert!(allocator.populations().is_empty());

    let mut allocator = Allocator::new(instance, VmcConfig::default(), SearchStrategy::GuidedImprovement);
    allocator.allocate().unwrap();
    assert!(!allocator.found_solution());
}

#[test]
fn config_from_file() {
    let config = VmcConfig::from_file(&name_wrapper("pareto-mcs.yaml")).unwrap();
    assert_eq!(config.timeout, 30.);
    assert_eq!(config.seed, 7);
    assert!(config.break_symmetries);
    assert_eq!(config.objective_precision, 2);
    assert_eq!(config.mcs.algorithm, McsAlgorithm::Lbx);
    assert!(config.mcs.stratify);
    assert_eq!(config.mcs.max_partitions, 3);
    assert!(!config.mcs.diversify);
    assert!(config.hashing.enabled);
    assert_eq!(config.hashing.epsilon, 0.5);
    assert_eq!(config.hashing.max_parities, 32);

    let config = VmcConfig::from_file(&name_wrapper("bin-packing.yaml")).unwrap();
    assert_eq!(config.bin_packing.ordering, PackingOrder::FirstFit);
    assert!(config.bin_packing.shuffle);
    assert!(!config.wastage);
    assert!(config.timeout.is_infinite());
}

#[test]
fn invalid_config_is_rejected() {
    assert!(matches!(
        VmcConfig::from_file(&name_wrapper("invalid.yaml")),
        Err(VmcError::Config(_))
    ));
    assert!(matches!(
        VmcConfig::from_file(&name_wrapper("missing.yaml")),
        Err(VmcError::Io(_))
    ));
    assert!(VmcConfig::from_yaml("mcs:\n  max_partitions: 0\n").is_err());
    assert!(VmcConfig::from_yaml("timeout: fast\n").is_err());
}

#[test]
fn strategy_names() {
    assert_eq!(SearchStrategy::from_str("ParetoMcs").unwrap(), SearchStrategy::ParetoMcs);
    assert_eq!(
        SearchStrategy::from_str("GuidedImprovement").unwrap(),
        SearchStrategy::GuidedImprovement
    );
    assert!(SearchStrategy::from_str("Genetic").is_err());
}
