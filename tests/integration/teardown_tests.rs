//! Teardown: every relay off, handles released, new work refused.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bartender::app::events::AppEvent;
use bartender::app::ports::{DeviceMode, EventSink};
use bartender::drivers::registry::BackendChoice;
use bartender::{Controller, DeviceError, DeviceKind, Error};

use super::mock_hw::{
    DeviceCall, RecordingSink, live, mock_backend, pump, rig, test_config, valve, wait_until,
};

/// Holds every `PourStarted` emission until a `DeviceFault` has been seen.
#[derive(Default)]
struct FaultGate {
    events: Mutex<Vec<AppEvent>>,
    fault_seen: Mutex<bool>,
    opened: Condvar,
}

impl FaultGate {
    fn saw(&self, pred: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.lock().unwrap().iter().any(pred)
    }
}

impl EventSink for FaultGate {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
        match event {
            AppEvent::DeviceFault { .. } => {
                *self.fault_seen.lock().unwrap() = true;
                self.opened.notify_all();
            }
            AppEvent::PourStarted { .. } => {
                let seen = self.fault_seen.lock().unwrap();
                let _ = self
                    .opened
                    .wait_timeout_while(seen, Duration::from_secs(2), |seen| !*seen)
                    .unwrap();
            }
            _ => {}
        }
    }
}

#[test]
fn shutdown_forces_every_relay_off() {
    let (c, probe, sink) = rig(false);
    c.set_valve(1, true).unwrap();
    c.set_pump(2, true).unwrap();
    assert!(probe.is_on(valve(1)));
    assert!(probe.is_on(pump(2)));

    c.shutdown();

    for n in 1..=4 {
        assert!(!probe.is_on(pump(n)));
        assert!(!probe.is_on(valve(n)));
        assert!(probe.relay_writes().contains(&(pump(n), false)));
        assert!(probe.relay_writes().contains(&(valve(n), false)));
    }
    assert_eq!(probe.calls().last(), Some(&DeviceCall::Release));
    assert!(probe.released());
    assert!(sink.any(|e| *e == AppEvent::ShutdownComplete));
}

#[test]
fn shutdown_is_idempotent() {
    let (c, probe, sink) = rig(true);
    c.shutdown();
    c.shutdown();
    let releases = probe.calls().iter().filter(|call| **call == DeviceCall::Release).count();
    assert_eq!(releases, 1);
    assert_eq!(sink.count(|e| *e == AppEvent::ShutdownComplete), 1);
}

#[test]
fn work_after_shutdown_is_refused() {
    let (c, probe, _) = rig(false);
    c.shutdown();
    probe.clear();

    assert_eq!(c.pour(1, 50.0), Err(Error::ShuttingDown));
    assert_eq!(c.refill(1), Err(Error::ShuttingDown));
    assert_eq!(c.set_valve(1, true), Err(Error::ShuttingDown));
    assert_eq!(c.test_actuate(DeviceKind::Pump, 1, None), Err(Error::ShuttingDown));
    assert!(probe.relay_writes().is_empty());
}

#[test]
fn shutdown_ends_test_actuation() {
    let (c, probe, sink) = rig(false);
    c.test_actuate(DeviceKind::Pump, 1, Some(Duration::from_secs(10))).unwrap();
    assert!(wait_until(Duration::from_secs(1), || probe.is_on(pump(1))));

    let started = Instant::now();
    c.shutdown();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(!probe.is_on(pump(1)));
    assert!(sink.any(|e| matches!(e, AppEvent::TestActuationEnded { interrupted: true, .. })));
}

#[test]
fn failed_live_open_falls_back_to_simulation() {
    let sink = RecordingSink::new();
    let c = Controller::builder(test_config())
        .backend(BackendChoice::live(|_| Err(DeviceError::LineClaim(17))))
        .sink(sink.clone())
        .level_monitor(false)
        .start()
        .unwrap();

    assert_eq!(c.mode(), DeviceMode::Simulated);
    assert_eq!(c.status().mode, DeviceMode::Simulated);
    assert!(sink.any(|e| *e == AppEvent::FellBackToSimulation(DeviceError::LineClaim(17))));
    assert!((c.pour(1, 50.0).unwrap() - 350.0).abs() < 0.01);
    c.shutdown();
}

#[test]
fn live_mode_reported() {
    let (c, _, sink) = rig(false);
    assert_eq!(c.mode(), DeviceMode::Live);
    assert!(sink.any(|e| *e == AppEvent::Started { mode: DeviceMode::Live }));
}

#[test]
fn valve_opened_during_teardown_is_refused() {
    let (backend, probe) = mock_backend();
    let gate = Arc::new(FaultGate::default());
    let c = Controller::builder(test_config())
        .backend(live(backend))
        .sink(gate.clone())
        .level_monitor(false)
        .start()
        .unwrap();
    // The failing close inside the all-off sweep releases the pour.
    probe.fail_every_write_to(valve(4));

    let worker = c.clone();
    let pour = thread::spawn(move || worker.pour(1, 50.0));
    assert!(wait_until(Duration::from_secs(1), || gate.saw(|e| matches!(e, AppEvent::PourStarted { .. }))));

    c.shutdown();

    assert_eq!(pour.join().unwrap(), Err(Error::ShuttingDown));
    assert_eq!(probe.times_energized(valve(1)), 0);
    assert!(!probe.is_on(valve(1)));
    assert!(probe.released());
    assert_eq!(probe.calls().last(), Some(&DeviceCall::Release));
    assert!((c.status().reservoir_levels[&1] - 400.0).abs() < f32::EPSILON);
}

#[test]
fn shutdown_waits_for_pour_in_window() {
    let (c, probe, _) = rig(false);
    let worker = c.clone();
    // 200 ms window at the test ceiling.
    let pour = thread::spawn(move || worker.pour(2, 160.0));
    assert!(wait_until(Duration::from_secs(1), || probe.is_on(valve(2))));

    c.shutdown();

    assert!(pour.join().unwrap().is_ok());
    // The pour's own close reached the backend before the release.
    let calls = probe.calls();
    let release = calls.iter().position(|call| *call == DeviceCall::Release).unwrap();
    let last_close = calls
        .iter()
        .rposition(|call| *call == DeviceCall::SetRelay { device: valve(2), energized: false })
        .unwrap();
    assert!(last_close < release);
    assert!(!probe.is_on(valve(2)));
}
