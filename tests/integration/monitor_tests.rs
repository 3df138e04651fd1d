//! Level monitor: automatic refills and bounded stop.

use std::thread;
use std::time::{Duration, Instant};

use bartender::app::events::AppEvent;
use bartender::app::ports::DeviceMode;
use bartender::reservoir::ReservoirId;
use bartender::{Controller, RefillOutcome};

use super::mock_hw::{RecordingSink, pump, rig, test_config, valve, wait_until};

fn r(n: u8) -> ReservoirId {
    ReservoirId::new(n).unwrap()
}

#[test]
fn low_float_starts_refill() {
    let (c, probe, sink) = rig(true);
    assert!(c.is_monitoring());
    c.pour(2, 300.0).unwrap();
    probe.set_fill_time(Duration::from_millis(60));
    probe.set_float(2, false);

    assert!(wait_until(Duration::from_secs(2), || sink.any(|e| matches!(
        e,
        AppEvent::RefillFinished { reservoir, outcome: RefillOutcome::Completed, .. } if *reservoir == r(2)
    ))));
    assert!(sink.any(|e| *e == AppEvent::LowLevelDetected(r(2))));
    assert!((c.status().reservoir_levels[&2] - 400.0).abs() < f32::EPSILON);
    assert!(wait_until(Duration::from_secs(1), || !probe.is_on(pump(2))));
    c.shutdown();
}

#[test]
fn running_refill_is_not_restarted() {
    let (c, probe, sink) = rig(true);
    c.pour(3, 300.0).unwrap();
    probe.set_float(3, false);

    // The refill times out after 0.45 s; many scans happen meanwhile.
    assert!(wait_until(Duration::from_secs(1), || c.status().refilling[&3]));
    std::thread::sleep(Duration::from_millis(150));
    let started = sink.count(|e| matches!(e, AppEvent::RefillStarted { reservoir, .. } if *reservoir == r(3)));
    assert_eq!(started, 1);
    assert_eq!(probe.times_energized(pump(3)), 1);
    c.shutdown();
}

#[test]
fn full_reservoirs_are_left_alone() {
    let (c, probe, sink) = rig(true);
    std::thread::sleep(Duration::from_millis(100));
    assert!(!sink.any(|e| matches!(e, AppEvent::LowLevelDetected(_))));
    assert!(probe.relay_writes().is_empty());
    c.shutdown();
}

#[test]
fn shutdown_stops_monitor_promptly() {
    let (c, _, sink) = rig(true);
    assert!(wait_until(Duration::from_secs(1), || sink.any(|e| *e == AppEvent::MonitorStarted)));

    let started = Instant::now();
    c.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!c.is_monitoring());
    assert!(sink.any(|e| *e == AppEvent::MonitorStopped));
}

#[test]
fn simulated_bar_refills_after_heavy_pours() {
    let sink = RecordingSink::new();
    let c = Controller::builder(test_config()).sink(sink.clone()).start().unwrap();
    assert_eq!(c.mode(), DeviceMode::Simulated);

    assert!((c.pour(1, 50.0).unwrap() - 350.0).abs() < 0.01);
    // Clamped to the 200 ms ceiling, still debited in full.
    assert!((c.pour(1, 320.0).unwrap() - 30.0).abs() < 0.01);

    // 370 mL at 1000 mL/s times out after 0.555 s and assumes full.
    assert!(wait_until(Duration::from_secs(3), || {
        let s = c.status();
        (s.reservoir_levels[&1] - 400.0).abs() < f32::EPSILON && !s.refilling[&1]
    }));
    assert!(sink.any(|e| *e == AppEvent::LowLevelDetected(r(1))));
    assert!(sink.any(|e| matches!(
        e,
        AppEvent::RefillFinished { reservoir, outcome: RefillOutcome::TimedOut, .. } if *reservoir == r(1)
    )));
    c.shutdown();
}

#[test]
fn low_reservoir_waits_for_pour_before_refill() {
    let (c, probe, sink) = rig(true);
    let worker = c.clone();
    // 200 ms window: about ten scans run while the valve is open.
    let pour = thread::spawn(move || worker.pour(1, 160.0));
    assert!(wait_until(Duration::from_secs(1), || probe.is_on(valve(1))));
    probe.set_float(1, false);

    assert!(pour.join().unwrap().is_ok());
    assert!(wait_until(Duration::from_secs(1), || sink.any(|e| matches!(
        e,
        AppEvent::RefillStarted { reservoir, .. } if *reservoir == r(1)
    ))));
    assert!(!sink.any(|e| matches!(e, AppEvent::RefillSkipped { .. })));
    c.shutdown();
}
