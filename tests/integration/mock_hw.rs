//! Mock device backend and event sink for integration tests.
//!
//! The backend is moved into the controller, so every observation goes
//! through a cloned [`MockProbe`] sharing the same state. Every backend
//! call is recorded so tests can assert on the full command history
//! without touching real GPIO lines.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bartender::app::events::AppEvent;
use bartender::app::ports::{DeviceBackend, DeviceMode, EventSink};
use bartender::config::SystemConfig;
use bartender::drivers::registry::BackendChoice;
use bartender::reservoir::DeviceId;
use bartender::{Controller, DeviceError, DeviceKind};

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    SetRelay { device: DeviceId, energized: bool },
    ReadFloat(DeviceId),
    Release,
}

#[derive(Default)]
struct MockState {
    calls: Vec<DeviceCall>,
    /// Float reading forced high per reservoir.
    float_full: [bool; 4],
    /// When set, a float reads high this long after its pump energized.
    fill_time: Option<Duration>,
    pump_since: [Option<Instant>; 4],
    fail_writes: Vec<DeviceId>,
    /// Devices whose off-writes fail as well.
    fail_off_writes: Vec<DeviceId>,
    fail_reads: bool,
    released: bool,
}

// ── MockBackend ───────────────────────────────────────────────

pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl DeviceBackend for MockBackend {
    fn set_relay(&mut self, device: DeviceId, energized: bool) -> Result<(), DeviceError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(DeviceCall::SetRelay { device, energized });
        if s.released {
            return Err(DeviceError::Released);
        }
        if (energized && s.fail_writes.contains(&device)) || s.fail_off_writes.contains(&device) {
            return Err(DeviceError::Write(u32::from(device.number())));
        }
        if device.kind() == DeviceKind::Pump {
            s.pump_since[device.index()] = energized.then(Instant::now);
        }
        Ok(())
    }

    fn read_float(&mut self, device: DeviceId) -> Result<bool, DeviceError> {
        let mut s = self.state.lock().unwrap();
        s.calls.push(DeviceCall::ReadFloat(device));
        if s.released {
            return Err(DeviceError::Released);
        }
        if s.fail_reads {
            return Err(DeviceError::Read(u32::from(device.number())));
        }
        let i = device.index();
        let filled = match (s.fill_time, s.pump_since[i]) {
            (Some(fill), Some(since)) => since.elapsed() >= fill,
            _ => false,
        };
        // Once filled the liquid stays put.
        if filled {
            s.float_full[i] = true;
        }
        Ok(s.float_full[i])
    }

    fn release(&mut self) {
        let mut s = self.state.lock().unwrap();
        s.calls.push(DeviceCall::Release);
        s.released = true;
    }

    fn mode(&self) -> DeviceMode {
        DeviceMode::Live
    }
}

// ── MockProbe ─────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockProbe {
    state: Arc<Mutex<MockState>>,
}

/// A backend reporting every float switch full, plus its probe.
pub fn mock_backend() -> (MockBackend, MockProbe) {
    let state = Arc::new(Mutex::new(MockState { float_full: [true; 4], ..MockState::default() }));
    (MockBackend { state: Arc::clone(&state) }, MockProbe { state })
}

/// Wrap a mock backend as a live backend choice.
pub fn live(backend: MockBackend) -> BackendChoice {
    BackendChoice::live(move |_| Ok(Box::new(backend) as Box<dyn DeviceBackend>))
}

#[allow(dead_code)]
impl MockProbe {
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Relay writes only, in order.
    pub fn relay_writes(&self) -> Vec<(DeviceId, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::SetRelay { device, energized } => Some((device, energized)),
                _ => None,
            })
            .collect()
    }

    /// Last commanded state of a relay, `false` when never written.
    pub fn is_on(&self, device: DeviceId) -> bool {
        self.relay_writes()
            .into_iter()
            .rev()
            .find(|(d, _)| *d == device)
            .is_some_and(|(_, on)| on)
    }

    pub fn times_energized(&self, device: DeviceId) -> usize {
        self.relay_writes().into_iter().filter(|w| *w == (device, true)).count()
    }

    pub fn set_float(&self, reservoir: u8, full: bool) {
        self.state.lock().unwrap().float_full[usize::from(reservoir - 1)] = full;
    }

    pub fn set_fill_time(&self, fill: Duration) {
        self.state.lock().unwrap().fill_time = Some(fill);
    }

    pub fn fail_writes_to(&self, device: DeviceId) {
        self.state.lock().unwrap().fail_writes.push(device);
    }

    /// Fail every write to `device`, including switching it off.
    pub fn fail_every_write_to(&self, device: DeviceId) {
        self.state.lock().unwrap().fail_off_writes.push(device);
    }

    pub fn fail_reads(&self) {
        self.state.lock().unwrap().fail_reads = true;
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    pub fn any(&self, pred: impl Fn(&AppEvent) -> bool) -> bool {
        self.count(pred) > 0
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Default reservoir geometry (400 mL, threshold 100 mL) with flows and
/// timings scaled so every scenario finishes in well under a second.
pub fn test_config() -> SystemConfig {
    let mut c = SystemConfig::default();
    for r in &mut c.reservoirs {
        // 50 mL pours in 62.5 ms
        r.valve_flow_ml_per_sec = 800.0;
    }
    // 1000 mL/s: a 300 mL refill is expected in 0.3 s, times out at 0.45 s
    c.pump_flow_ml_per_min = 60_000.0;
    c.max_pour_time_ms = 200;
    c.max_pump_time_ms = 400;
    c.refill_timeout_ms = 1_000;
    c.float_poll_interval_ms = 10;
    c.monitor_interval_ms = 20;
    c.monitor_fault_backoff_ms = 50;
    c.monitor_join_timeout_ms = 1_000;
    c.ingredient_gap_ms = 5;
    c.test_actuation_ms = 2_000;
    c
}

/// Poll `cond` until it holds or `timeout` passes.
#[allow(dead_code)]
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn pump(n: u8) -> DeviceId {
    DeviceId::new(DeviceKind::Pump, n).unwrap()
}

pub fn valve(n: u8) -> DeviceId {
    DeviceId::new(DeviceKind::Valve, n).unwrap()
}

/// Controller over a fresh mock backend with the scaled test timings.
pub fn rig(level_monitor: bool) -> (Controller, MockProbe, Arc<RecordingSink>) {
    rig_with(test_config(), level_monitor)
}

pub fn rig_with(config: SystemConfig, level_monitor: bool) -> (Controller, MockProbe, Arc<RecordingSink>) {
    let (backend, probe) = mock_backend();
    let sink = RecordingSink::new();
    let controller = Controller::builder(config)
        .backend(live(backend))
        .sink(sink.clone())
        .level_monitor(level_monitor)
        .start()
        .unwrap();
    (controller, probe, sink)
}
