mod common;

use common::init_logging;
use common::synthetic_volume::{curved_bundle, region, straight_bundle, Phantom};
use fiber_tracker::prelude::*;
use fiber_tracker::{Streamline, TrackingError, TrackingResult};
use nalgebra::Point3;
use std::thread;
use std::time::Duration;

fn tracker(phantom: &Phantom, mode: TrackingMode, params: TrackerParams) -> StreamlineTracker {
    let proposer = PeakProposer::new(phantom.peaks.clone(), mode);
    let mut tracker = StreamlineTracker::new(Box::new(proposer), params);
    tracker.set_masks(MaskInputs {
        tracking: Some(phantom.tracking.clone()),
        seed: Some(phantom.seed.clone()),
        ..Default::default()
    });
    tracker
}

fn serial_params() -> TrackerParams {
    TrackerParams {
        random: false,
        num_threads: Some(1),
        ..Default::default()
    }
}

fn fibers(result: &TrackingResult) -> &[Streamline] {
    result.output.fibers().expect("fiber output")
}

fn tube() -> Phantom {
    straight_bundle([40, 11, 11], (5, 34), 3.0)
}

#[test]
fn deterministic_run_is_repeatable() {
    init_logging();
    let phantom = tube();
    let mut t = tracker(&phantom, TrackingMode::Deterministic, serial_params());
    let first = t.run().unwrap();
    let second = t.run().unwrap();

    let a = fibers(&first);
    let b = fibers(&second);
    assert!(!a.is_empty());
    assert_eq!(a.len(), b.len());
    for (fa, fb) in a.iter().zip(b) {
        assert_eq!(fa.points, fb.points);
    }
    for f in a {
        assert_eq!(f.points.len(), f.directions.len() + 1);
        assert!(f.arc_length() >= 20.0 - 1.0, "fiber length {}", f.arc_length());
    }
    assert_eq!(first.report.accepted, a.len());
    assert_eq!(first.report.seeding.total, first.report.seeds_tried);
}

#[test]
fn tract_limit_is_exact_under_contention() {
    init_logging();
    let phantom = tube();
    let params = TrackerParams {
        max_num_tracts: Some(5),
        num_threads: Some(4),
        seeds_per_voxel: 8,
        ..Default::default()
    };
    let result = tracker(&phantom, TrackingMode::Deterministic, params).run().unwrap();
    assert_eq!(fibers(&result).len(), 5);
    assert_eq!(result.report.accepted, 5);
    assert!(result.report.status.ends_with(", 5/5 fibers"), "{}", result.report.status);
}

#[test]
fn full_target_keeps_every_fiber() {
    init_logging();
    let phantom = tube();
    let baseline = tracker(&phantom, TrackingMode::Deterministic, serial_params())
        .run()
        .unwrap();

    let mut t = tracker(
        &phantom,
        TrackingMode::Deterministic,
        TrackerParams {
            endpoint_constraint: EndpointConstraint::EpsInTarget,
            ..serial_params()
        },
    );
    t.set_masks(MaskInputs {
        tracking: Some(phantom.tracking.clone()),
        seed: Some(phantom.seed.clone()),
        target: Some(region(phantom.geometry(), |_, _, _| true)),
        ..Default::default()
    });
    let constrained = t.run().unwrap();
    assert_eq!(fibers(&constrained).len(), fibers(&baseline).len());

    // Empty target: nothing ends inside it.
    let mut t = tracker(
        &phantom,
        TrackingMode::Deterministic,
        TrackerParams {
            endpoint_constraint: EndpointConstraint::NoEpInTarget,
            ..serial_params()
        },
    );
    t.set_masks(MaskInputs {
        tracking: Some(phantom.tracking.clone()),
        seed: Some(phantom.seed.clone()),
        target: Some(region(phantom.geometry(), |_, _, _| false)),
        ..Default::default()
    });
    assert_eq!(fibers(&t.run().unwrap()).len(), fibers(&baseline).len());
}

#[test]
fn endpoint_constraints_follow_end_regions() {
    init_logging();
    let phantom = tube();
    let near_end_only = region(phantom.geometry(), |x, _, _| x <= 8);
    let run = |constraint| {
        let mut t = tracker(
            &phantom,
            TrackingMode::Deterministic,
            TrackerParams {
                endpoint_constraint: constraint,
                ..serial_params()
            },
        );
        t.set_masks(MaskInputs {
            tracking: Some(phantom.tracking.clone()),
            seed: Some(phantom.seed.clone()),
            target: Some(near_end_only.clone()),
            ..Default::default()
        });
        fibers(&t.run().unwrap()).len()
    };
    let all = run(EndpointConstraint::MinOneEpInTarget);
    assert!(all > 0);
    assert_eq!(run(EndpointConstraint::OneEpInTarget), all);
    assert_eq!(run(EndpointConstraint::EpsInTarget), 0);
    assert_eq!(run(EndpointConstraint::NoEpInTarget), 0);
}

#[test]
fn unset_target_with_target_constraint_fails_before_tracking() {
    let phantom = tube();
    let mut t = tracker(
        &phantom,
        TrackingMode::Deterministic,
        TrackerParams {
            endpoint_constraint: EndpointConstraint::EpsInTarget,
            ..serial_params()
        },
    );
    match t.run() {
        Err(TrackingError::MissingMask { mask, .. }) => assert_eq!(mask, "target"),
        other => panic!("expected missing mask error, got {other:?}"),
    }
}

#[test]
fn excluded_fibers_never_reach_the_output() {
    init_logging();
    let phantom = tube();
    let exclusion = region(phantom.geometry(), |x, y, _| (28..=31).contains(&x) && y >= 6);
    let mut t = tracker(&phantom, TrackingMode::Deterministic, serial_params());
    t.set_masks(MaskInputs {
        tracking: Some(phantom.tracking.clone()),
        seed: Some(phantom.seed.clone()),
        exclusion: Some(exclusion.clone()),
        ..Default::default()
    });
    let result = t.run().unwrap();
    let kept = fibers(&result);
    assert!(!kept.is_empty());
    for f in kept {
        assert!(f.points.iter().all(|p| !exclusion.is_inside(p, true)));
    }
    assert!(result.report.counts.rejections.excluded > 0);
}

#[test]
fn density_output_is_normalised() {
    init_logging();
    let phantom = tube();
    let params = TrackerParams {
        output_density_map: true,
        ..serial_params()
    };
    let result = tracker(&phantom, TrackingMode::Deterministic, params).run().unwrap();
    let map = result.output.density().expect("density output");
    let (lo, hi) = map.min_max();
    assert!(lo >= 0.0);
    assert!((hi - 1.0).abs() < 1e-6);
    assert!(map.get(20, 5, 5) > 0.0);
    assert_eq!(map.get(20, 0, 0), 0.0);
}

#[test]
fn abort_before_run_yields_empty_result_once() {
    let phantom = tube();
    let mut t = tracker(&phantom, TrackingMode::Deterministic, serial_params());
    t.control().abort();
    let aborted = t.run().unwrap();
    assert!(aborted.report.aborted);
    assert!(fibers(&aborted).is_empty());

    let rerun = t.run().unwrap();
    assert!(!rerun.report.aborted);
    assert!(!fibers(&rerun).is_empty());
}

#[test]
fn paused_run_resumes() {
    let phantom = tube();
    let mut t = tracker(&phantom, TrackingMode::Deterministic, serial_params());
    let control = t.control();
    control.pause();
    let worker = thread::spawn(move || t.run());
    thread::sleep(Duration::from_millis(50));
    assert!(!worker.is_finished());
    assert_eq!(control.accepted(), 0);
    control.resume();
    let result = worker.join().unwrap().unwrap();
    assert!(!fibers(&result).is_empty());
}

#[test]
fn probabilistic_tracking_is_reproducible_across_threads() {
    init_logging();
    let phantom = curved_bundle([48, 48, 12], 28.0, 4.0);
    let params = |threads| TrackerParams {
        rng_seed: Some(42),
        num_threads: Some(threads),
        loop_check_deg: Some(30.0),
        ..Default::default()
    };
    let key = |result: &TrackingResult| {
        let mut keys: Vec<_> = fibers(result)
            .iter()
            .map(|f| {
                let p = f.front().unwrap();
                (f.len(), (p.x * 1e3) as i64, (p.y * 1e3) as i64, (p.z * 1e3) as i64)
            })
            .collect();
        keys.sort_unstable();
        keys
    };

    let serial = tracker(&phantom, TrackingMode::Probabilistic, params(1)).run().unwrap();
    let parallel = tracker(&phantom, TrackingMode::Probabilistic, params(3)).run().unwrap();
    assert!(!fibers(&serial).is_empty());
    assert_eq!(key(&serial), key(&parallel));

    let step = serial.report.step.step_size;
    for f in fibers(&serial) {
        let pts: Vec<_> = f.points.iter().collect();
        let irregular = pts
            .windows(2)
            .filter(|w| ((w[1] - w[0]).norm() - step).abs() > 1e-3)
            .count();
        assert!(irregular <= 2, "{irregular} irregular steps");
    }
    assert_eq!(serial.report.provenance.algorithm.meaning, "Probabilistic");
}

#[test]
fn only_probabilistic_seeds_are_retried() {
    init_logging();
    let phantom = tube();
    let params = TrackerParams {
        trials_per_seed: 4,
        ..serial_params()
    };
    let outside_tube = vec![Point3::new(1.0, 1.0, 1.0), Point3::new(38.0, 0.0, 10.0)];
    let run = |mode, seeds: Vec<Point3<f32>>| {
        let mut t = tracker(&phantom, mode, params.clone());
        t.set_seed_points(seeds);
        t.run().unwrap().report
    };

    let det = run(TrackingMode::Deterministic, outside_tube.clone());
    assert_eq!(det.counts.seeds, 2);
    assert_eq!(det.counts.trials, 2);
    assert_eq!(det.counts.rejections.no_direction, 2);

    let prob = run(TrackingMode::Probabilistic, outside_tube);
    assert_eq!(prob.counts.seeds, 2);
    assert_eq!(prob.counts.trials, 8);
    assert_eq!(prob.counts.rejections.no_direction, 8);
    assert_eq!(prob.accepted, 0);

    // Retries end with the first accepted fibre.
    let inside = run(TrackingMode::Probabilistic, vec![Point3::new(20.0, 5.0, 5.0)]);
    assert_eq!(inside.accepted, 1);
    assert_eq!(inside.counts.trials, inside.counts.rejections.total() + 1);
    assert!(inside.counts.trials <= 4);
}

#[test]
fn explicit_seeds_apply_to_one_run() {
    let phantom = tube();
    let mut t = tracker(&phantom, TrackingMode::Deterministic, serial_params());
    t.set_seed_points(vec![Point3::new(20.0, 5.0, 5.0)]);
    let first = t.run().unwrap();
    assert!(first.report.seeding.explicit);
    assert_eq!(first.report.seeding.total, 1);
    assert_eq!(fibers(&first).len(), 1);

    let second = t.run().unwrap();
    assert!(!second.report.seeding.explicit);
    assert!(second.report.seeding.total > 1);
}
