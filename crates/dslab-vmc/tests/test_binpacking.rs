mod common;

use std::rc::Rc;

use rstest::rstest;

use dslab_vmc::binpacking::{BinPacker, PackingOrder, PackingResult, VmOrder};
use dslab_vmc::model::{Allocation, Instance, Mapping};

use common::{assert_feasible, init_logger, mixed_instance, mixed_pre_mappings, pm, single_job, uniform_instance};

fn spread_instance(max_migration_percentile: f64) -> Rc<Instance> {
    let pms = (0..3).map(|i| pm(100 + i, 8, 8)).collect();
    let pre_mappings = Allocation::from_mappings((0..3).map(|i| Mapping::new(i, 100 + i))).unwrap();
    Rc::new(Instance::new(pms, single_job(&[(2, 2), (2, 2), (2, 2)]), pre_mappings, max_migration_percentile).unwrap())
}

#[rstest]
#[case(PackingOrder::BestFit)]
#[case(PackingOrder::FirstFit)]
fn three_vms_on_two_machines(#[case] order: PackingOrder) {
    init_logger();
    let instance = uniform_instance(2, 4, 4, &[(2, 2), (2, 2), (2, 2)]);
    let packer = BinPacker::new(instance.clone(), order);
    let allocation = packer.pack(&VmOrder::Decreasing).into_complete().unwrap();
    assert_feasible(&instance, &allocation);

    let used = allocation.used_pms();
    assert_eq!(used.len(), 2);
    let mut split: Vec<usize> = used.iter().map(|&pm| allocation.vms_on(pm).len()).collect();
    split.sort_unstable();
    assert_eq!(split, vec![1, 2]);
}

#[rstest]
#[case(PackingOrder::BestFit)]
#[case(PackingOrder::FirstFit)]
fn fixed_order_is_deterministic(#[case] order: PackingOrder) {
    let instance = mixed_instance(Allocation::new(), 0.);
    let first = BinPacker::new(instance.clone(), order).pack(&VmOrder::Decreasing);
    let second = BinPacker::new(instance.clone(), order).pack(&VmOrder::Decreasing);
    assert_eq!(first, second);
}

#[test]
fn shuffled_order_depends_only_on_seed() {
    let instance = mixed_instance(Allocation::new(), 0.);
    let packer = BinPacker::new(instance, PackingOrder::BestFit);
    assert_eq!(packer.pack(&VmOrder::Shuffled(42)), packer.pack(&VmOrder::Shuffled(42)));
}

#[test]
fn unplaced_vms_are_reported() {
    init_logger();
    let instance = uniform_instance(1, 4, 4, &[(3, 3), (3, 3)]);
    let packer = BinPacker::new(instance, PackingOrder::BestFit);
    match packer.pack(&VmOrder::Decreasing) {
        PackingResult::Partial { allocation, leftover } => {
            assert_eq!(allocation.len(), 1);
            assert_eq!(leftover.len(), 1);
            assert!(!allocation.contains_vm(leftover[0]));
        }
        PackingResult::Complete(allocation) => panic!("unexpected complete allocation {}", allocation),
    }
}

#[rstest]
#[case(PackingOrder::BestFit)]
#[case(PackingOrder::FirstFit)]
fn anti_colocation_and_platform_are_respected(#[case] order: PackingOrder) {
    init_logger();
    let instance = mixed_instance(Allocation::new(), 0.);
    let allocation = BinPacker::new(instance.clone(), order)
        .pack(&VmOrder::Decreasing)
        .into_complete()
        .unwrap();
    assert_feasible(&instance, &allocation);
    assert_ne!(allocation.pm_of(10), allocation.pm_of(11));
    assert_ne!(allocation.pm_of(20), Some(4));
}

#[test]
fn zero_budget_keeps_pre_existing_mapping() {
    init_logger();
    let instance = mixed_instance(mixed_pre_mappings(), 0.);
    let allocation = BinPacker::new(instance.clone(), PackingOrder::BestFit)
        .pack(&VmOrder::Decreasing)
        .into_complete()
        .unwrap();
    assert_eq!(&allocation, instance.pre_mappings());
}

#[test]
fn infeasible_pre_existing_mappings_are_dropped() {
    init_logger();
    let pre_mappings = Allocation::from_mappings(vec![
        Mapping::new(10, 1),
        Mapping::new(11, 1),
        Mapping::new(12, 4),
        Mapping::new(20, 3),
        Mapping::new(21, 4),
    ])
    .unwrap();
    let instance = mixed_instance(pre_mappings, 0.5);
    let allocation = BinPacker::new(instance.clone(), PackingOrder::BestFit)
        .pack(&VmOrder::Decreasing)
        .into_complete()
        .unwrap();
    assert_feasible(&instance, &allocation);
    assert_eq!(allocation.pm_of(11), Some(1));
    assert_ne!(allocation.pm_of(10), Some(1));
    assert_eq!(allocation.pm_of(12), Some(4));
    assert_eq!(allocation.pm_of(20), Some(3));
    assert_eq!(allocation.pm_of(21), Some(4));
}

#[test]
fn displaced_vm_beyond_budget_is_left_over() {
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
    match BinPacker::new(instance.clone(), PackingOrder::BestFit).pack(&VmOrder::Decreasing) {
        PackingResult::Partial { allocation, leftover } => {
            assert_eq!(leftover, vec![10]);
            assert_eq!(allocation.len(), 4);
            assert_eq!(allocation.pm_of(11), Some(1));
            assert_eq!(instance.migrated_memory(&allocation), 4);
            assert!(!allocation.contains_vm(10));
        }
        PackingResult::Complete(allocation) => panic!("unexpected complete allocation {}", allocation),
    }
}

#[test]
fn migration_phase_respects_zero_timeout() {
    init_logger();
    let instance = spread_instance(1.0);
    let mut packer = BinPacker::new(instance.clone(), PackingOrder::BestFit);
    packer.set_timeout(0.);
    let allocation = packer.pack(&VmOrder::Decreasing).into_complete().unwrap();
    assert_eq!(&allocation, instance.pre_mappings());
    assert_eq!(allocation.used_pms().len(), 3);
}

#[rstest]
#[case(1.0, 1)]
#[case(0.1, 2)]
#[case(0.0, 3)]
fn migration_phase_closes_machines_within_budget(#[case] percentile: f64, #[case] machines: usize) {
    init_logger();
    let instance = spread_instance(percentile);
    let allocation = BinPacker::new(instance.clone(), PackingOrder::BestFit)
        .pack(&VmOrder::Decreasing)
        .into_complete()
        .unwrap();
    assert_feasible(&instance, &allocation);
    assert_eq!(allocation.used_pms().len(), machines);
}

#[test]
fn reconfigured_pre_mappings_are_used() {
    let instance = uniform_instance(3, 8, 8, &[(2, 2), (2, 2), (2, 2)]);
    let pre_mappings = Allocation::from_mappings((0..3).map(|i| Mapping::new(i, 100 + i))).unwrap();
    let mut packer = BinPacker::new(instance.clone(), PackingOrder::BestFit);
    assert_eq!(packer.pack(&VmOrder::Decreasing).allocation().used_pms().len(), 1);

    packer.reconfigure(&pre_mappings, 0.).unwrap();
    assert_eq!(packer.pack(&VmOrder::Decreasing).into_complete().unwrap(), pre_mappings);

    assert!(packer.reconfigure(&pre_mappings, 1.5).is_err());
    let unknown = Allocation::from_mappings(vec![Mapping::new(0, 7)]).unwrap();
    assert!(packer.reconfigure(&unknown, 0.5).is_err());
}

#[test]
fn repair_keeps_partial_mappings() {
    init_logger();
    let instance = uniform_instance(2, 4, 4, &[(2, 2), (2, 2), (2, 2)]);
    let packer = BinPacker::new(instance.clone(), PackingOrder::BestFit);
    let partial = Allocation::from_mappings(vec![Mapping::new(0, 101)]).unwrap();
    let allocation = packer
        .repair(&partial, &VmOrder::Decreasing)
        .unwrap()
        .into_complete()
        .unwrap();
    assert_feasible(&instance, &allocation);
    assert_eq!(allocation.pm_of(0), Some(101));
    assert_eq!(allocation.vms_on(101).len(), 2);

    let unknown = Allocation::from_mappings(vec![Mapping::new(5, 101)]).unwrap();
    assert!(packer.repair(&unknown, &VmOrder::Decreasing).is_err());
}
