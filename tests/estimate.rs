//! End-to-end tests for the dartboard estimator and its result store.

use ferrocomm::estimate::{Estimator, Strategy};
use ferrocomm::record::{ResultStore, HEADER};
use ferrocomm::{EstimateConfig, Error, Universe};
use std::f64::consts::PI;

fn estimator(total_rounds: u64, total_darts: u64) -> Estimator {
    Estimator::new(EstimateConfig::new(total_rounds, total_darts).unwrap())
}

#[test]
fn both_strategies_converge() {
    let estimator = estimator(100, 10_000);
    let out = Universe::new(4)
        .unwrap()
        .run(|world| estimator.run(&world, None))
        .unwrap();

    let results = &out[0];
    assert_eq!(results.len(), 2);
    for result in results {
        assert!(
            (result.pi_est - PI).abs() < 0.05,
            "{}: {}",
            result.run_type,
            result.pi_est
        );
        assert_eq!(result.ranks, 4);
        assert_eq!(result.total_rounds, 100);
        assert_eq!(result.total_darts, 10_000);
        assert_eq!(result.darts_per_task, 2500);
        assert!(result.time_taken >= 0.0);
    }
    assert_eq!(results[0].run_type, Strategy::SameRounds.label());
    assert_eq!(results[0].rounds_per_task, None);
    assert_eq!(results[1].run_type, Strategy::DividedRounds.label());
    assert_eq!(results[1].rounds_per_task, Some(25));

    // Only the leader produces results.
    assert!(out[1..].iter().all(Vec::is_empty));
}

#[test]
fn remainder_rounds_are_dropped() {
    let estimator = estimator(101, 1000);
    let out = Universe::new(4)
        .unwrap()
        .run(|world| estimator.run_strategy(&world, Strategy::DividedRounds))
        .unwrap();
    let result = out[0].clone().expect("leader result");
    assert_eq!(result.rounds_per_task, Some(25));
    assert!(out[1..].iter().all(Option::is_none));
}

#[test]
fn strategies_are_reproducible() {
    let estimator = estimator(40, 4000);
    let universe = Universe::new(4).unwrap();
    let first = universe.run(|world| estimator.run(&world, None)).unwrap();
    let second = universe.run(|world| estimator.run(&world, None)).unwrap();
    for (a, b) in first[0].iter().zip(&second[0]) {
        assert_eq!(a.pi_est, b.pi_est);
    }
}

#[test]
fn divided_rounds_are_a_prefix_of_same_rounds() {
    // Each worker reseeds per strategy, so with one round per worker the
    // divided run equals a same-rounds run of one round.
    let divided = estimator(4, 4000);
    let same = estimator(1, 4000);
    let universe = Universe::new(4).unwrap();
    let a = universe
        .run(|world| divided.run_strategy(&world, Strategy::DividedRounds))
        .unwrap();
    let b = universe
        .run(|world| same.run_strategy(&world, Strategy::SameRounds))
        .unwrap();
    assert_eq!(a[0].as_ref().unwrap().pi_est, b[0].as_ref().unwrap().pi_est);
}

#[test]
fn leader_records_each_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().join("results.csv"));
    let estimator = estimator(8, 800);

    let universe = Universe::new(2).unwrap();
    universe
        .run(|world| estimator.run(&world, Some(&store)))
        .unwrap();
    universe
        .run(|world| estimator.run(&world, Some(&store)))
        .unwrap();

    let text = std::fs::read_to_string(store.path()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[0], HEADER);
    assert_eq!(lines.iter().filter(|l| **l == HEADER).count(), 1);

    let rows = store.load().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].run_type, "SAME ROUND FOR EACH PROCESS");
    assert_eq!(rows[1].run_type, "DIVIDE ROUND AMONG PROCESSES");
    assert_eq!(rows[1].rounds_per_task, Some(4));
    assert!(rows.iter().all(|r| r.ranks == 2));
}

#[test]
fn record_failure_is_leader_only() {
    let dir = tempfile::tempdir().unwrap();
    // A directory cannot be appended to.
    let store = ResultStore::new(dir.path());
    let estimator = estimator(4, 400);

    let finished = std::sync::atomic::AtomicUsize::new(0);
    let out = Universe::new(3).unwrap().run(|world| {
        let result = estimator.run(&world, Some(&store));
        if !world.is_leader() {
            assert!(result.is_ok(), "rank {} saw {result:?}", world.rank());
            finished.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
        result
    });
    assert!(matches!(out, Err(Error::Io(_))));
    assert_eq!(finished.load(std::sync::atomic::Ordering::SeqCst), 2);
}
