//! Distance flow: distributor, workers and collector over the typed channel.

use ferrocomm::plane::{self, PlaneProblem, Role};
use ferrocomm::{MessageKind, Received, Universe};

#[test]
fn collector_reports_expected_distance() {
    let problems = plane::default_problems();
    let out = Universe::new(5)
        .unwrap()
        .run(|world| plane::run(&world, &problems))
        .unwrap();

    let distances = out[4].clone().expect("collector reports");
    let expected = (1.0 * 1.13 + 2.0 * 2.13 + 3.0 * 3.13 - 10.0) / (1.0f64 + 4.0 + 9.0).sqrt();
    assert_eq!(distances[0].source, 1);
    assert!((distances[0].value - expected).abs() < 1e-12);
    assert_eq!(distances.len(), 3);
}

#[test]
fn collector_averages_a_batched_sender() {
    // Worker 2 misbehaves and sends five values instead of one distance; the
    // collector must fold them into their mean and carry on.
    let problems = vec![
        PlaneProblem {
            coefficients: [0.0, 0.0, 1.0],
            point: [0.0, 0.0, 5.0],
            offset: 2.0,
        };
        3
    ];
    let batch = [1.0f64, 2.0, 3.0, 4.0, 5.0];
    let collector = plane::collector_rank(problems.len());

    let out = Universe::new(5)
        .unwrap()
        .run(|world| match Role::for_rank(world.rank(), problems.len()) {
            Role::Distributor => plane::distribute(&world, &problems).map(|()| None),
            Role::Worker(1) => {
                // Drain the problem so nothing is left behind, then deviate.
                for kind in [
                    MessageKind::Variables,
                    MessageKind::Coefficients,
                    MessageKind::Constant,
                ] {
                    world.receive_kind(kind, 0)?;
                }
                world.send(&batch, collector, MessageKind::Constant.tag())?;
                Ok(None)
            }
            Role::Worker(_) => plane::solve(&world, collector).map(|_| None),
            Role::Collector => plane::collect(&world, problems.len()).map(Some),
            Role::Idle => Ok(None),
        })
        .unwrap();

    let distances = out[collector as usize].clone().unwrap();
    assert_eq!(distances[0].value, 3.0);
    assert_eq!(distances[1].source, 2);
    assert_eq!(distances[1].value, 3.0);
    assert_eq!(distances[2].value, 3.0);
}

#[test]
fn batched_constant_yields_single_mean() {
    let values = [2.0f64, 4.0, 6.0, 8.0, 10.0];
    let out = Universe::new(2)
        .unwrap()
        .run(|world| {
            if world.is_leader() {
                world.send(&values, 1, MessageKind::Constant.tag())?;
                Ok(None)
            } else {
                world.receive_kind(MessageKind::Constant, 0).map(Some)
            }
        })
        .unwrap();
    let received = out[1].clone().unwrap();
    assert_eq!(received, Received::Averaged { value: 6.0, count: 5 });
    assert_eq!(received.into_values(), vec![6.0]);
}
