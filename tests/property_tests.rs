//! Property tests for queue ordering, determinism and progress
//! accounting.

use procsim::device::{ClosureKind, DowntimePolicy};
use procsim::{
    BatchServer, DeviceId, EventHandle, ProcessTarget, Scheduler, SimulationBuilder, Tick,
};
use proptest::prelude::*;

fn tag(i: usize) -> ProcessTarget {
    ProcessTarget::Log(i.to_string())
}

fn tag_index(target: &ProcessTarget) -> usize {
    match target {
        ProcessTarget::Log(s) => s.parse().unwrap(),
        other => panic!("unexpected target {other}"),
    }
}

// ── Event queue ordering ──────────────────────────────────────

proptest! {
    /// FIFO entries fire by (tick, priority), then in insertion order.
    #[test]
    fn fifo_tie_break_holds(
        keys in proptest::collection::vec((0u64..20, 0i32..3), 1..=64),
    ) {
        let mut sched = Scheduler::new();
        for (i, (tick, prio)) in keys.iter().enumerate() {
            sched.schedule(Tick::new(*tick), *prio, true, tag(i), None).unwrap();
        }

        let fired: Vec<usize> = sched
            .drain_ordered()
            .iter()
            .map(|e| tag_index(&e.target))
            .collect();

        let mut expected: Vec<usize> = (0..keys.len()).collect();
        expected.sort_by_key(|&i| (keys[i].0, keys[i].1, i));
        prop_assert_eq!(fired, expected);
    }

    /// Killed entries never fire and a handle is never double-booked.
    #[test]
    fn kill_and_reschedule_keep_one_live_entry(
        ops in proptest::collection::vec((any::<bool>(), 0u64..50), 1..=40),
    ) {
        let mut sched = Scheduler::new();
        let handle = EventHandle::new();
        let mut last_due = None;

        for (kill, due) in &ops {
            if *kill {
                sched.kill(&handle);
                last_due = None;
            } else if handle.is_scheduled() {
                prop_assert!(sched.schedule(Tick::new(*due), 5, true, ProcessTarget::Noop, Some(&handle)).is_err());
            } else {
                sched.schedule(Tick::new(*due), 5, true, ProcessTarget::Noop, Some(&handle)).unwrap();
                last_due = Some(Tick::new(*due));
            }
            prop_assert_eq!(sched.len(), usize::from(last_due.is_some()));
        }

        let fired = sched.drain_ordered();
        prop_assert_eq!(fired.len(), usize::from(last_due.is_some()));
        if let Some(due) = last_due {
            prop_assert_eq!(fired[0].due, due);
        }
        prop_assert!(!handle.is_scheduled());
    }
}

// ── Device accounting ─────────────────────────────────────────

proptest! {
    /// Forced re-evaluations split a step but never change its total work.
    #[test]
    fn progress_is_conserved_across_unscheduled_updates(
        duration_ms in 1u64..100_000,
        pokes in proptest::collection::vec(0.0f64..=1.0, 0..=8),
    ) {
        let duration = duration_ms as f64 / 1000.0;
        let mut builder = SimulationBuilder::new()
            .batch_server(1, "press", 1, duration)
            .start(1, 0.0);
        for frac in &pokes {
            let at = ((frac * duration_ms as f64).round()) / 1000.0;
            builder = builder.event(at, ProcessTarget::PerformUnscheduledUpdate { device: DeviceId::new(1) });
        }
        let (sim, rt, _) = builder.run().unwrap();

        let server = rt.behavior::<BatchServer>(DeviceId::new(1)).unwrap();
        prop_assert_eq!(server.completed, 1);
        prop_assert!((server.work_done - duration).abs() < 1e-6);
        prop_assert_eq!(sim.current_time(), Tick::new(duration_ms * 1000));

        let dev = rt.device(DeviceId::new(1)).unwrap();
        prop_assert!(!dev.is_busy());
        prop_assert!(!dev.is_step_scheduled());
    }

    /// Identical inputs give identical fired-event logs.
    #[test]
    fn runs_are_deterministic(
        units in 1u64..6,
        service_ms in 1u64..5_000,
        close_ms in 0u64..20_000,
        closed_for_ms in 0u64..5_000,
        downtime_ms in 0u64..20_000,
        immediate in any::<bool>(),
    ) {
        let run = || {
            let policy = if immediate { DowntimePolicy::Immediate } else { DowntimePolicy::Forced };
            SimulationBuilder::new()
                .with_event_log()
                .batch_server(1, "press", units, service_ms as f64 / 1000.0)
                .threshold(1, "door", ClosureKind::Immediate)
                .flow_processor(2, "pump", 2, 3.0, 1.5)
                .start(1, 0.0)
                .start(2, 0.0)
                .close(1, "door", close_ms as f64 / 1000.0)
                .open(1, "door", (close_ms + closed_for_ms) as f64 / 1000.0)
                .breakdown(2, 1, policy, 1.0, downtime_ms as f64 / 1000.0)
                .run()
                .unwrap()
        };

        let (a, rt_a, n_a) = run();
        let (b, _, n_b) = run();
        prop_assert_eq!(n_a, n_b);
        prop_assert_eq!(a.current_time(), b.current_time());
        prop_assert_eq!(
            a.event_log().unwrap().log_hash(),
            b.event_log().unwrap().log_hash()
        );

        // Both devices end idle with nothing scheduled.
        for id in rt_a.all_device_ids() {
            let dev = rt_a.device(id).unwrap();
            prop_assert!(!dev.is_busy());
            prop_assert!(!dev.is_step_scheduled());
        }
        let server = rt_a.behavior::<BatchServer>(DeviceId::new(1)).unwrap();
        prop_assert_eq!(server.completed, units);
    }
}
