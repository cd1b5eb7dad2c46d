use sim_core::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn duration_arithmetic_matches_worked_example() {
    let a = SimDuration::from_picos(1) + SimDuration::from_nanos(1) + SimDuration::from_micros(1);
    assert_eq!(a.to_string(), "0:00:00.000001.001001");

    assert_eq!(SimDuration::from_micros(1) * 0.002, SimDuration::from_nanos(2));

    let extern_second = std::time::Duration::from_secs(1);
    assert_eq!(
        SimDuration::from_picos(1) + SimDuration::from(extern_second),
        SimDuration::new(0, 0, 0, 1, 0, 0, 0, 1)
    );
}

#[test]
fn timers_due_at_the_same_time_fire_in_fifo_order() {
    let sim = Simulator::new("fifo");
    let order = Rc::new(RefCell::new(Vec::new()));

    for i in 0..4 {
        let order = order.clone();
        sim.schedule_once(SimDuration::from_millis(5), Zone::ROOT, move || {
            order.borrow_mut().push(i);
        });
    }

    sim.run_to_completion().unwrap();
    assert_eq!(*order.borrow(), vec![0, 1, 2, 3]);
}

#[test]
fn periodic_timer_fires_exactly_ten_times_within_its_window() {
    let sim = Simulator::new("periodic");
    let d = SimDuration::from_secs(10);

    let timer = sim.schedule_periodic(d / 10.0, Zone::ROOT, move || {});

    sim.elapse(d).unwrap();
    assert_eq!(timer.tick(), 10);
}

#[test]
fn periodic_timer_can_cancel_itself_mid_run() {
    let sim = Simulator::new("periodic-cancel");
    let handle: Rc<RefCell<Option<SimTimer>>> = Rc::new(RefCell::new(None));
    let fires = Rc::new(Cell::new(0));

    let fires_cb = fires.clone();
    let handle_cb = handle.clone();
    let timer = sim.schedule_periodic(SimDuration::from_secs(1), Zone::ROOT, move || {
        fires_cb.set(fires_cb.get() + 1);
        if fires_cb.get() == 10 {
            handle_cb.borrow().as_ref().unwrap().cancel();
        }
    });
    *handle.borrow_mut() = Some(timer.clone());

    sim.flush_timers().unwrap();
    assert_eq!(fires.get(), 10);
    assert_eq!(timer.tick(), 10);
}

#[test]
fn microtasks_scheduled_by_a_batch_drain_before_the_next_batch() {
    let sim = Simulator::new("delta-cycle");
    let micro_tasks_seen = Rc::new(Cell::new(0u32));
    let fires_so_far = Rc::new(Cell::new(0u32));

    let seen_cb = micro_tasks_seen.clone();
    let fires_cb = fires_so_far.clone();
    let sim_cb = sim.clone();
    sim.schedule_periodic(SimDuration::from_secs(1), Zone::ROOT, move || {
        fires_cb.set(fires_cb.get() + 1);
        for _ in 0..5 {
            let seen_task = seen_cb.clone();
            sim_cb.schedule_micro_task(move || {
                seen_task.set(seen_task.get() + 1);
            });
        }
    });

    sim.elapse(SimDuration::from_secs(4)).unwrap();
    assert_eq!(micro_tasks_seen.get(), 5 * fires_so_far.get());
}

#[test]
fn elapse_rejects_reentrant_calls() {
    let sim = Simulator::new("reentrancy");
    let nested_result = Rc::new(RefCell::new(None));

    let sim_cb = sim.clone();
    let result_cb = nested_result.clone();
    sim.schedule_once(SimDuration::from_secs(1), Zone::ROOT, move || {
        *result_cb.borrow_mut() = Some(sim_cb.elapse(SimDuration::from_secs(1)));
    });

    sim.elapse(SimDuration::from_secs(1)).unwrap();
    assert_eq!(*nested_result.borrow(), Some(Err(SimError::Reentrancy)));
}

#[test]
fn blocking_elapse_advances_time_synchronously_without_running_the_wheel() {
    let sim = Simulator::new("blocking-elapse");
    let other_timer_fired = Rc::new(Cell::new(false));

    let fired_cb = other_timer_fired.clone();
    sim.schedule_once(SimDuration::from_secs(5), Zone::ROOT, move || {
        fired_cb.set(true);
    });

    let sim_cb = sim.clone();
    sim.schedule_once(SimDuration::from_secs(1), Zone::ROOT, move || {
        sim_cb.elapse_blocking(SimDuration::from_secs(9)).unwrap();
        assert_eq!(sim_cb.elapsed(), SimDuration::from_secs(10));
    });

    sim.elapse(SimDuration::from_secs(1)).unwrap();
    assert_eq!(sim.elapsed(), SimDuration::from_secs(10));
    // target extended to 10s by elapse_blocking, so the timer at 5s still fires.
    assert!(other_timer_fired.get());
}

#[test]
fn run_installs_callbacks_without_advancing_time() {
    let sim = Simulator::new("scheduling-context");
    let fired = Rc::new(Cell::new(false));

    let fired_cb = fired.clone();
    let installed_count = sim.run(|s| {
        s.schedule_once(SimDuration::from_secs(1), Zone::ROOT, move || {
            fired_cb.set(true);
        });
        s.pending_timer_count()
    });

    assert_eq!(installed_count, 1);
    assert_eq!(sim.elapsed(), SimDuration::ZERO);
    assert!(!fired.get());

    sim.run_to_completion().unwrap();
    assert!(fired.get());
}

#[test]
fn introspection_accessors_report_pending_work() {
    let sim = Simulator::new_with(
        "introspection",
        SimulatorOptions::new()
            .clock_period(SimDuration::from_millis(1))
            .include_trace(true),
    );

    let periodic = sim.schedule_periodic(SimDuration::from_millis(1), Zone::ROOT, || {});
    sim.schedule_once(SimDuration::from_millis(1), Zone::ROOT, || {});
    sim.schedule_micro_task(|| {});

    assert_eq!(sim.periodic_timer_count(), 1);
    assert_eq!(sim.non_periodic_timer_count(), 1);
    assert_eq!(sim.micro_task_count(), 1);
    assert_eq!(sim.pending_timers().len(), 2);
    assert!(sim.pending_timers_debug_string().contains("periodic: true"));

    sim.elapse(SimDuration::from_millis(1)).unwrap();
    assert_eq!(sim.elapsed_ticks(), 1);

    periodic.cancel();
}

#[test]
fn queue_map_orders_by_key_then_fifo_within_key() {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Entry(u32, u32);

    impl Indexable<u32> for Entry {
        fn key(&self) -> u32 {
            self.1
        }
    }

    let mut map: QueueMap<u32, Entry> = QueueMap::new();
    map.add(Entry(3, 0));
    map.add(Entry(6, 10));
    map.add(Entry(4, 0));
    map.add(Entry(7, 10));
    map.add(Entry(5, 0));
    map.add(Entry(8, 10));

    let ids: Vec<u32> = map.iter().map(|e| e.0).collect();
    assert_eq!(ids, vec![3, 4, 5, 6, 7, 8]);
    assert_eq!(map.first_key(), Some(0));

    let first_bucket: Vec<u32> = map.remove_first_queue().into_iter().map(|e| e.0).collect();
    assert_eq!(first_bucket, vec![3, 4, 5]);
    assert_eq!(map.first_key(), Some(10));
}
