mod common;

use std::rc::Rc;

use rstest::rstest;

use dslab_vmc::algorithms::clock::{Clock, NO_TIMEOUT};
use dslab_vmc::algorithms::state::AlgorithmState;
use dslab_vmc::encoding::SolverContext;
use dslab_vmc::mcs::{soft_literals, McsAlgorithm, McsOutcome, ParetoMcsEnumerator};
use dslab_vmc::model::{Allocation, Instance, Mapping};
use dslab_vmc::solver::{SatSolver, SolveResult};
use dslab_vmc::VmcConfig;

use common::{
    assert_feasible, assert_front_eq, init_logger, mixed_instance, mixed_pre_mappings, trade_off_front,
    trade_off_instance, uniform_instance, ScriptedSolver, TimeoutLog,
};

fn context(instance: Rc<Instance>, config: &VmcConfig) -> SolverContext {
    SolverContext::build(instance, Box::new(SatSolver::new()), config).unwrap()
}

fn trade_off_config(algorithm: McsAlgorithm) -> VmcConfig {
    let mut config = VmcConfig {
        wastage: false,
        ..VmcConfig::default()
    };
    config.mcs.algorithm = algorithm;
    config
}

fn enumerate(config: &VmcConfig) -> (ParetoMcsEnumerator, AlgorithmState) {
    let mut ctx = context(trade_off_instance(), config);
    let mut state = AlgorithmState::new(Clock::new(NO_TIMEOUT), None);
    let mut enumerator = ParetoMcsEnumerator::new(&ctx, config, config.seed);
    enumerator.enumerate(&mut ctx, &mut state).unwrap();
    (enumerator, state)
}

fn assert_sound(history: &[Vec<dslab_vmc::solver::Lit>]) {
    for (i, earlier) in history.iter().enumerate() {
        for later in &history[i + 1..] {
            assert!(
                !earlier.iter().all(|lit| later.contains(lit)),
                "MCS {:?} is reproduced by {:?}",
                earlier,
                later
            );
        }
    }
}

#[test]
fn shared_soft_literals_are_merged() {
    let ctx = context(trade_off_instance(), &trade_off_config(McsAlgorithm::Cld));
    let softs = soft_literals(&ctx.objectives);
    let total: usize = ctx.objectives.iter().map(|f| f.soft_literals().len()).sum();
    assert_eq!(softs.len(), total);
    let weight: f64 = softs.iter().map(|soft| soft.weight).sum();
    assert!((weight - 2.).abs() < 1e-9);

    let mut lits: Vec<_> = softs.iter().map(|soft| soft.lit).collect();
    lits.sort();
    lits.dedup();
    assert_eq!(lits.len(), softs.len());
}

#[rstest]
#[case(McsAlgorithm::Cld)]
#[case(McsAlgorithm::Lbx)]
fn enumeration_finds_pareto_front(#[case] algorithm: McsAlgorithm) {
    init_logger();
    let (enumerator, state) = enumerate(&trade_off_config(algorithm));
    assert!(enumerator.is_complete());
    assert!(enumerator.history().len() >= 2);
    assert_sound(enumerator.history());
    assert_front_eq(state.archive().costs(), trade_off_front());
}

#[rstest]
#[case(McsAlgorithm::Cld, true, false, false)]
#[case(McsAlgorithm::Cld, false, true, false)]
#[case(McsAlgorithm::Lbx, false, true, false)]
#[case(McsAlgorithm::Lbx, true, false, false)]
#[case(McsAlgorithm::Cld, false, false, true)]
#[case(McsAlgorithm::Cld, true, true, true)]
fn search_variants_find_pareto_front(
    #[case] algorithm: McsAlgorithm,
    #[case] stratify: bool,
    #[case] diversify: bool,
    #[case] hashing: bool,
) {
    init_logger();
    let mut config = trade_off_config(algorithm);
    config.mcs.stratify = stratify;
    config.mcs.max_partitions = 2;
    config.mcs.diversify = diversify;
    config.mcs.diversification_literals = 2;
    config.hashing.enabled = hashing;
    let (enumerator, state) = enumerate(&config);
    assert!(enumerator.is_complete());
    assert_sound(enumerator.history());
    assert_front_eq(state.archive().costs(), trade_off_front());
    for point in state.archive().points() {
        assert_feasible(&trade_off_instance(), &point.allocation);
    }
    if stratify {
        assert_eq!(enumerator.partitions().len(), 2);
    }
    if hashing {
        assert!(enumerator.hash().is_some());
    }
}

#[test]
fn all_points_are_feasible_with_wastage() {
    init_logger();
    let instance = mixed_instance(mixed_pre_mappings(), 0.5);
    let mut config = VmcConfig {
        break_symmetries: true,
        ..VmcConfig::default()
    };
    config.mcs.stratify = true;
    let mut ctx = context(instance.clone(), &config);
    let mut state = AlgorithmState::new(Clock::new(2.), None);
    let mut enumerator = ParetoMcsEnumerator::new(&ctx, &config, 0);
    enumerator.enumerate(&mut ctx, &mut state).unwrap();
    assert!(state.found_solution());
    assert_sound(enumerator.history());
    for point in state.archive().points() {
        assert_feasible(&instance, &point.allocation);
        assert_eq!(point.costs.len(), 3);
    }
}

#[rstest]
#[case(McsAlgorithm::Cld)]
#[case(McsAlgorithm::Lbx)]
fn interrupted_extension_keeps_feasible_model(#[case] algorithm: McsAlgorithm) {
    init_logger();
    let config = trade_off_config(algorithm);
    let solver = ScriptedSolver::new(0, TimeoutLog::default(), Some(1));
    let mut ctx = SolverContext::build(trade_off_instance(), Box::new(solver), &config).unwrap();
    let mut state = AlgorithmState::new(Clock::new(NO_TIMEOUT), None);
    let mut enumerator = ParetoMcsEnumerator::new(&ctx, &config, config.seed);
    enumerator.enumerate(&mut ctx, &mut state).unwrap();

    assert!(!enumerator.is_complete());
    assert!(enumerator.history().is_empty());
    assert!(state.found_solution());
    assert_eq!(state.archive().len(), 1);
    assert_feasible(&trade_off_instance(), &state.archive().points()[0].allocation);
}

#[test]
fn unsatisfiable_assumptions_give_core() {
    let mut ctx = context(trade_off_instance(), &trade_off_config(McsAlgorithm::Cld));
    let enumerator = ParetoMcsEnumerator::new(&ctx, &trade_off_config(McsAlgorithm::Cld), 0);
    let fixed = vec![!ctx.vars.placement(0, 0), !ctx.vars.placement(0, 1)];
    match enumerator.find_mcs(&mut ctx, &fixed, &Clock::new(NO_TIMEOUT)).unwrap() {
        McsOutcome::Unsatisfiable { core } => {
            assert!(!core.is_empty());
            assert!(core.iter().all(|lit| fixed.contains(lit)));
        }
        _ => panic!("assumptions must be unsatisfiable"),
    }
}

#[test]
fn repair_keeps_consistent_mappings() {
    init_logger();
    let config = trade_off_config(McsAlgorithm::Cld);
    let mut ctx = context(trade_off_instance(), &config);
    let enumerator = ParetoMcsEnumerator::new(&ctx, &config, 0);
    let partial = Allocation::from_mappings(vec![Mapping::new(0, 100)]).unwrap();
    let allocation = enumerator
        .repair(&mut ctx, &partial, &Clock::new(NO_TIMEOUT))
        .unwrap()
        .unwrap();
    assert_feasible(&trade_off_instance(), &allocation);
    assert_eq!(allocation.pm_of(0), Some(100));
    assert!(enumerator.history().is_empty());
    assert!(matches!(ctx.solve(&[]), SolveResult::Sat(_)));
}

#[test]
fn repair_drops_conflicting_mappings() {
    init_logger();
    let instance = uniform_instance(2, 4, 4, &[(3, 3), (3, 3)]);
    let config = VmcConfig::default();
    let mut ctx = context(instance.clone(), &config);
    let enumerator = ParetoMcsEnumerator::new(&ctx, &config, 0);
    let partial = Allocation::from_mappings(vec![Mapping::new(0, 100), Mapping::new(1, 100)]).unwrap();
    let allocation = enumerator
        .repair(&mut ctx, &partial, &Clock::new(NO_TIMEOUT))
        .unwrap()
        .unwrap();
    assert_feasible(&instance, &allocation);
    assert_eq!(allocation.used_pms().len(), 2);
}

#[test]
fn repair_stops_at_deadline() {
    let config = trade_off_config(McsAlgorithm::Cld);
    let mut ctx = context(trade_off_instance(), &config);
    let enumerator = ParetoMcsEnumerator::new(&ctx, &config, 0);
    let result = enumerator.repair(&mut ctx, &Allocation::new(), &Clock::new(0.)).unwrap();
    assert!(result.is_none());
}
