//! Refill behaviour: completion, timeouts, exclusivity and cleanup.

use std::thread;
use std::time::{Duration, Instant};

use bartender::app::events::AppEvent;
use bartender::{Controller, RefillOutcome};

use super::mock_hw::{RecordingSink, pump, rig, rig_with, test_config, wait_until};

fn drained(c: &Controller, reservoir: u8) {
    // 300 mL leaves exactly the threshold.
    c.pour(reservoir, 300.0).unwrap();
}

#[test]
fn refill_completes_when_float_rises() {
    let (c, probe, sink) = rig(false);
    drained(&c, 1);
    probe.set_float(1, false);
    probe.set_fill_time(Duration::from_millis(50));

    assert_eq!(c.refill(1), Ok(RefillOutcome::Completed));

    let status = c.status();
    assert!((status.reservoir_levels[&1] - 400.0).abs() < f32::EPSILON);
    assert!(!status.refilling[&1]);
    assert!(!probe.is_on(pump(1)));
    assert_eq!(probe.times_energized(pump(1)), 1);
    assert!(sink.any(|e| matches!(e, AppEvent::RefillStarted { needed_ml, .. } if (*needed_ml - 300.0).abs() < 0.01)));
}

#[test]
fn timeout_still_resets_to_capacity() {
    let (c, probe, sink) = rig(false);
    drained(&c, 2);
    probe.set_float(2, false);

    let started = Instant::now();
    assert_eq!(c.refill(2), Ok(RefillOutcome::TimedOut));
    let elapsed = started.elapsed();

    // 300 mL at 1000 mL/s is 0.3 s, × 1.5 = 0.45 s.
    assert!(elapsed >= Duration::from_millis(450));
    assert!(elapsed < Duration::from_millis(900));
    assert!((c.status().reservoir_levels[&2] - 400.0).abs() < f32::EPSILON);
    assert!(!probe.is_on(pump(2)));
    assert!(sink.any(|e| matches!(e, AppEvent::RefillFinished { outcome: RefillOutcome::TimedOut, .. })));
}

#[test]
fn timeout_is_capped_by_ceiling() {
    let mut config = test_config();
    // 300 mL at 100 mL/s ≈ 3 s × 1.5, far past the 250 ms ceiling.
    config.pump_flow_ml_per_min = 6_000.0;
    config.refill_timeout_ms = 250;
    let (c, probe, _) = rig_with(config, false);
    drained(&c, 3);
    probe.set_float(3, false);

    let started = Instant::now();
    assert_eq!(c.refill(3), Ok(RefillOutcome::TimedOut));
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250));
    assert!(elapsed < Duration::from_millis(700));
}

#[test]
fn concurrent_refill_is_rejected() {
    let (c, probe, sink) = rig(false);
    drained(&c, 2);
    probe.set_float(2, false);

    let worker = c.clone();
    let first = thread::spawn(move || worker.refill(2));
    assert!(wait_until(Duration::from_secs(1), || c.status().refilling[&2]));

    let started = Instant::now();
    assert_eq!(c.refill(2), Ok(RefillOutcome::AlreadyInProgress));
    assert!(started.elapsed() < Duration::from_millis(100), "busy refill must not block");
    assert!(sink.any(|e| matches!(e, AppEvent::RefillSkipped { refilling: true, .. })));

    assert_eq!(first.join().unwrap(), Ok(RefillOutcome::TimedOut));
    assert_eq!(probe.times_energized(pump(2)), 1);
    assert!(!c.status().refilling[&2]);
}

#[test]
fn pump_fault_leaves_level_and_clears_flag() {
    let (c, probe, _) = rig(false);
    drained(&c, 3);
    probe.set_float(3, false);
    probe.fail_writes_to(pump(3));

    assert_eq!(c.refill(3), Ok(RefillOutcome::Faulted));
    let status = c.status();
    assert!((status.reservoir_levels[&3] - 100.0).abs() < 0.01);
    assert!(!status.refilling[&3]);
    assert!(!probe.is_on(pump(3)));
    assert_eq!(probe.relay_writes().last(), Some(&(pump(3), false)));
}

#[test]
fn float_read_fault_counts_as_full() {
    let (c, probe, sink) = rig(false);
    drained(&c, 4);
    probe.fail_reads();

    assert_eq!(c.refill(4), Ok(RefillOutcome::Completed));
    assert!(!probe.is_on(pump(4)));
    assert!(sink.any(|e| matches!(e, AppEvent::DeviceFault { .. })));
}

#[test]
fn simulated_refill_times_out_and_assumes_full() {
    let sink = RecordingSink::new();
    let c = Controller::builder(test_config())
        .sink(sink.clone())
        .level_monitor(false)
        .start()
        .unwrap();
    drained(&c, 1);

    // The simulated float follows the estimate, which only moves at the end.
    assert_eq!(c.refill(1), Ok(RefillOutcome::TimedOut));
    assert!((c.status().reservoir_levels[&1] - 400.0).abs() < f32::EPSILON);
}

#[test]
fn shutdown_cancels_running_refill() {
    let mut config = test_config();
    config.pump_flow_ml_per_min = 600.0;
    config.refill_timeout_ms = 10_000;
    let (c, probe, sink) = rig_with(config, false);
    drained(&c, 1);
    probe.set_float(1, false);

    let worker = c.clone();
    let refill = thread::spawn(move || worker.refill(1));
    assert!(wait_until(Duration::from_secs(1), || c.status().refilling[&1]));

    let started = Instant::now();
    c.shutdown();
    assert_eq!(refill.join().unwrap(), Ok(RefillOutcome::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!((c.status().reservoir_levels[&1] - 100.0).abs() < 0.01);
    assert!(sink.any(|e| matches!(e, AppEvent::RefillFinished { outcome: RefillOutcome::Cancelled, .. })));
}
