use std::collections::BTreeSet;

use procsim::*;

mod common;

#[test]
fn test_highest_priority_first() {
    common::setup_test();
    let workload = Workload::builder()
        .add_job(1, 1)
        .add_job(1, 5)
        .add_job(1, 3)
        .build();

    let result = common::run_workload(Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);

    assert_eq!(result.algorithm(), "Priority Scheduling");
    assert_eq!(result.dispatch_order(), vec![Pid(2), Pid(3), Pid(1)]);
}

/// Equal priorities and equal waits fall back to arrival order.
#[test]
fn test_ties_broken_by_arrival() {
    common::setup_test();
    let workload = Workload::builder()
        .add_job(2, 4)
        .add_job(2, 4)
        .add_job(2, 4)
        .build();

    let result = common::run_workload(Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);
    assert_eq!(result.dispatch_order(), vec![Pid(1), Pid(2), Pid(3)]);
}

#[test]
fn test_starvation_and_aging() {
    common::setup_test();
    let workload = Workload::builder()
        .add_job(4, 10)
        .add_job(4, 9)
        .add_job(2, 1)
        .build();

    let result = common::run_workload(Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);
    assert_eq!(result.dispatch_order(), vec![Pid(1), Pid(2), Pid(3)]);

    // Admission degrees are 1, 2 and 3. At t=4 both waiting jobs have
    // waited longer than their degree; the first job never waited.
    let a = result.process(Pid(1)).unwrap();
    let b = result.process(Pid(2)).unwrap();
    let c = result.process(Pid(3)).unwrap();
    assert_eq!(
        (a.admission_degree(), b.admission_degree(), c.admission_degree()),
        (1, 2, 3)
    );
    assert!(!a.is_starved());
    assert!(b.is_starved());
    assert!(c.is_starved());

    let starved: BTreeSet<Pid> = result
        .starvation_events_by_process()
        .keys()
        .copied()
        .collect();
    assert_eq!(starved, BTreeSet::from([Pid(2), Pid(3)]));
    assert_eq!(result.starvation_notices().len(), 2);
    assert!(result
        .starvation_notices()
        .iter()
        .any(|n| n.contains("pid 3 waited 4 units")));

    // At t=8 the last job has waited 8 units: one boost.
    assert_eq!(c.dynamic_priority(), 2);
    assert_eq!(c.boost_count(), 1);
    assert_eq!(c.base_priority(), 1);
    let boosts: Vec<&TraceEvent> = result
        .events()
        .iter()
        .filter(|e| matches!(e.kind, TraceKind::PriorityBoosted { .. }))
        .collect();
    assert_eq!(boosts.len(), 1);
    assert_eq!(
        boosts[0],
        &TraceEvent {
            time: 8,
            kind: TraceKind::PriorityBoosted {
                pid: Pid(3),
                priority: 2,
            },
        }
    );
}

/// A job admitted as the third resident is flagged only after waiting 4
/// units, and 4 units are not yet worth a boost.
#[test]
fn test_starvation_threshold_is_exclusive() {
    common::setup_test();
    let workload = Workload::builder()
        .add_job(3, 10)
        .add_job(1, 9)
        .add_job(1, 1)
        .build();

    let result = common::run_workload(Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);
    assert_eq!(result.dispatch_order(), vec![Pid(1), Pid(2), Pid(3)]);

    // At t=3 it has waited exactly its degree.
    let c = result.process(Pid(3)).unwrap();
    assert_eq!(c.admission_degree(), 3);
    assert!(c.is_starved());
    assert_eq!(c.boost_count(), 0);
    assert_eq!(c.dynamic_priority(), 1);

    let notes = result.starvation_events_by_process();
    assert_eq!(notes[&Pid(3)].len(), 1);
    assert!(notes[&Pid(3)][0].contains("pid 3 waited 4 units"));
    assert!(result
        .events()
        .iter()
        .all(|e| !matches!(e.kind, TraceKind::PriorityBoosted { .. })));
}

/// The first boost lands once the wait reaches one full aging interval.
#[test]
fn test_first_boost_at_aging_interval() {
    common::setup_test();
    let workload = Workload::builder().add_job(5, 10).add_job(1, 1).build();

    let result = common::run_workload(Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);

    let b = result.process(Pid(2)).unwrap();
    assert_eq!(b.boost_count(), 1);
    assert_eq!(b.dynamic_priority(), 2);
    assert_eq!(b.waiting_time(), 5);

    let boosts: Vec<&TraceEvent> = result
        .events()
        .iter()
        .filter(|e| matches!(e.kind, TraceKind::PriorityBoosted { .. }))
        .collect();
    assert_eq!(
        boosts,
        vec![&TraceEvent {
            time: 5,
            kind: TraceKind::PriorityBoosted {
                pid: Pid(2),
                priority: 2,
            },
        }]
    );
}

/// Every aging interval waited is worth one priority step.
#[test]
fn test_aging_per_interval() {
    common::setup_test();
    let mut config = common::test_config();
    config.priority.aging_interval = 1;

    let workload = Workload::builder()
        .add_job(10, 5)
        .add_job(1, 3)
        .add_job(1, 4)
        .build();

    // After 10 units both waiting jobs earned 10 boosts: 13 against 14,
    // and one more for the job still waiting at t=11.
    let result = common::run_workload_with(config, Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);
    assert_eq!(result.dispatch_order(), vec![Pid(1), Pid(3), Pid(2)]);
    assert_eq!(result.process(Pid(2)).unwrap().dynamic_priority(), 14);
}

#[test]
fn test_priority_ceiling() {
    common::setup_test();
    let mut config = common::test_config();
    config.priority.aging_interval = 1;

    let workload = Workload::builder()
        .add_job(40, 120)
        .add_job(1, 100)
        .build();

    let result = common::run_workload_with(config, Policy::Priority, &workload);
    common::assert_consistent(&result, &workload);
    assert_eq!(result.dispatch_order(), vec![Pid(1), Pid(2)]);

    // Waited 40 units: 100 + 40 would exceed the ceiling.
    let p2 = result.process(Pid(2)).unwrap();
    assert_eq!(p2.dynamic_priority(), task::MAX_PRIORITY);
    assert_eq!(p2.boost_count(), 40);
}
