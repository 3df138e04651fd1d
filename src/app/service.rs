//! Application service — the hexagonal core.
//!
//! [`Controller`] owns the reservoir table, the device registry and the
//! level monitor. It exposes pours, refills, drinks, manual overrides and
//! test actuations. All I/O flows through the
//! [`DeviceBackend`](super::ports::DeviceBackend) held by the registry and
//! the injected [`EventSink`], so the whole service runs against mocks.
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!  AppCommand ───▶ │          Controller           │ ──▶ EventSink
//!                  │ pour · refill · drink · test  │
//!  LevelMonitor ─▶ │  ReservoirTable · Registry    │ ──▶ DeviceBackend
//!                  └──────────────────────────────┘
//! ```
//!
//! ## Concurrency
//!
//! Each reservoir has one exclusive lock. A refill takes it without
//! waiting and gives up when it is held; a pour waits for it. Refills,
//! background drinks and test actuations run on their own threads.
//! [`Controller::shutdown`] raises a flag every worker checks, stops the
//! monitor, then forces every relay off and releases the backend.

use core::time::Duration;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::config::SystemConfig;
use crate::drivers::registry::{BackendChoice, DeviceRegistry};
use crate::drivers::relay::{self, RelayGuard};
use crate::drivers::task::{StopSignal, spawn_task};
use crate::error::{DeviceError, DeviceKind, Error, Result};
use crate::monitor::LevelMonitor;
use crate::recipe::Recipe;
use crate::reservoir::{DeviceId, ReservoirId, ReservoirTable};
use crate::safety::{SafetyLimits, clamp_duration};

use super::commands::{AppCommand, CommandReply};
use super::events::AppEvent;
use super::ports::{DeviceMode, EventSink};

const WORKER_STACK_KB: usize = 64;
const POUR_DRAIN_POLL: Duration = Duration::from_millis(5);

// ───────────────────────────────────────────────────────────────
// Results
// ───────────────────────────────────────────────────────────────

/// How a refill ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefillOutcome {
    /// The float switch reported full before the deadline.
    Completed,
    /// The deadline passed first. The level is still reset to capacity.
    TimedOut,
    /// The reservoir was locked by another refill or a pour; nothing ran.
    AlreadyInProgress,
    /// The pump could not be energized; the level is unchanged.
    Faulted,
    /// Shutdown began while the pump was running; the level is unchanged.
    Cancelled,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub mode: DeviceMode,
    /// Estimated level per reservoir number.
    pub reservoir_levels: BTreeMap<u8, f32>,
    /// Refill in progress per reservoir number.
    pub refilling: BTreeMap<u8, bool>,
    pub ingredients: BTreeMap<u8, String>,
    /// A drink or single pour is in progress.
    pub pouring: bool,
    pub current_drink: Option<String>,
    /// Pumps and valves currently commanded on.
    pub energized: Vec<DeviceId>,
    pub test_actuations: Vec<DeviceId>,
    pub monitoring: bool,
    pub shutting_down: bool,
}

/// What a drink dispense poured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispenseReport {
    pub drink: String,
    pub pours: usize,
    /// Level after each pour, per reservoir number.
    pub levels: BTreeMap<u8, f32>,
}

// ───────────────────────────────────────────────────────────────
// Builder
// ───────────────────────────────────────────────────────────────

/// Assembles a [`Controller`]. Only the configuration is mandatory.
pub struct ControllerBuilder {
    config: SystemConfig,
    backend: BackendChoice,
    sink: Option<Arc<dyn EventSink>>,
    level_monitor: bool,
}

impl ControllerBuilder {
    /// Backend to try; defaults to [`BackendChoice::Simulated`].
    #[must_use]
    pub fn backend(mut self, backend: BackendChoice) -> Self {
        self.backend = backend;
        self
    }

    /// Event sink; defaults to [`LogEventSink`](crate::adapters::log_sink::LogEventSink).
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Whether to start the level monitor (on by default).
    #[must_use]
    pub fn level_monitor(mut self, enabled: bool) -> Self {
        self.level_monitor = enabled;
        self
    }

    /// Validate the configuration, select the backend and start the
    /// monitor.
    pub fn start(self) -> Result<Controller> {
        self.config.validate()?;

        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(crate::adapters::log_sink::LogEventSink::new()));
        let reservoirs = Arc::new(ReservoirTable::new(&self.config));
        let registry =
            DeviceRegistry::select(self.backend, &self.config, &reservoirs, Arc::clone(&sink));
        let mode = registry.mode();

        let core = Arc::new(Core {
            limits: SafetyLimits::new(&self.config),
            config: self.config,
            reservoirs,
            registry,
            sink,
            shutting_down: AtomicBool::new(false),
            pours_in_flight: AtomicUsize::new(0),
            drink: Mutex::new(None),
            tests: Mutex::new(HashMap::new()),
        });
        core.sink.emit(&AppEvent::Started { mode });
        info!("Controller started ({:?} mode)", mode);

        let monitor = if self.level_monitor {
            Some(LevelMonitor::start(Arc::clone(&core))?)
        } else {
            None
        };

        Ok(Controller { core, monitor: Arc::new(Mutex::new(monitor)) })
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Handle to the bartender. Clones share the same hardware.
#[derive(Clone)]
pub struct Controller {
    core: Arc<Core>,
    monitor: Arc<Mutex<Option<LevelMonitor>>>,
}

impl Controller {
    pub fn builder(config: SystemConfig) -> ControllerBuilder {
        ControllerBuilder { config, backend: BackendChoice::Simulated, sink: None, level_monitor: true }
    }

    pub fn mode(&self) -> DeviceMode {
        self.core.registry.mode()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.core.config
    }

    // ── Liquid handling ───────────────────────────────────────────

    /// Open a valve long enough to pour `volume_ml`, capped at the pour
    /// ceiling, and return the new level estimate.
    ///
    /// Non-positive volumes do nothing. Waits for an in-flight refill of
    /// the same reservoir to finish first.
    pub fn pour(&self, reservoir: u8, volume_ml: f32) -> Result<f32> {
        self.core.pour(reservoir, volume_ml)
    }

    /// Run the refill pump until the float switch reports full or the
    /// timeout passes. Returns immediately with
    /// [`RefillOutcome::AlreadyInProgress`] when the reservoir is busy.
    pub fn refill(&self, reservoir: u8) -> Result<RefillOutcome> {
        let id = ReservoirId::new(reservoir)?;
        self.core.ensure_running()?;
        Ok(self.core.run_refill(id))
    }

    /// [`refill`](Self::refill) on a worker thread.
    pub fn refill_in_background(&self, reservoir: u8) -> Result<()> {
        let id = ReservoirId::new(reservoir)?;
        self.core.ensure_running()?;
        self.core.spawn_refill(id)
    }

    /// Pour every ingredient of `recipe` in reservoir order. Only one drink
    /// runs at a time.
    pub fn dispense(&self, recipe: &Recipe) -> Result<DispenseReport> {
        self.core.ensure_running()?;
        let _claim = self.core.claim_dispenser(&recipe.name)?;
        self.core.run_dispense(recipe)
    }

    /// [`dispense`](Self::dispense) on a worker thread. A drink already in
    /// progress is reported before the thread starts.
    pub fn dispense_in_background(&self, recipe: Recipe) -> Result<()> {
        self.core.ensure_running()?;
        let claim = self.core.claim_dispenser(&recipe.name)?;
        let core = Arc::clone(&self.core);
        spawn_task("dispense", WORKER_STACK_KB, move || {
            if let Err(e) = core.run_dispense(&recipe) {
                error!("Dispensing {} failed: {}", recipe.name, e);
            }
            drop(claim);
        })?;
        Ok(())
    }

    // ── Manual overrides ──────────────────────────────────────────

    /// Open or close a valve directly. Device faults are logged only.
    pub fn set_valve(&self, valve: u8, open: bool) -> Result<()> {
        self.core.ensure_running()?;
        info!("Manual override: valve {} {}", valve, if open { "open" } else { "closed" });
        self.core.registry.set_valve(valve, open)
    }

    /// Switch a pump directly. Device faults are logged only.
    pub fn set_pump(&self, pump: u8, on: bool) -> Result<()> {
        self.core.ensure_running()?;
        info!("Manual override: pump {} {}", pump, if on { "on" } else { "off" });
        self.core.registry.set_pump(pump, on)
    }

    /// Sample a float switch. `true` = level OK.
    pub fn read_float(&self, id: u8) -> Result<bool> {
        self.core.ensure_running()?;
        self.core.registry.read_float(id)
    }

    /// Energize a pump or valve for a bounded time on a worker thread.
    /// Returns the duration actually applied. A running test on the same
    /// device is stopped first.
    pub fn test_actuate(&self, kind: DeviceKind, id: u8, duration: Option<Duration>) -> Result<Duration> {
        self.core.test_actuate(kind, id, duration)
    }

    /// End a test actuation early. `Ok(false)` when none was running.
    pub fn stop_test(&self, kind: DeviceKind, id: u8) -> Result<bool> {
        let device = DeviceId::new(kind, id)?;
        Ok(self.core.stop_test(device))
    }

    // ── Observation ───────────────────────────────────────────────

    pub fn status(&self) -> StatusSnapshot {
        let core = &self.core;
        let mut snapshot = StatusSnapshot {
            mode: core.registry.mode(),
            reservoir_levels: BTreeMap::new(),
            refilling: BTreeMap::new(),
            ingredients: BTreeMap::new(),
            pouring: false,
            current_drink: lock(&core.drink).clone(),
            energized: core.registry.energized(),
            test_actuations: lock(&core.tests)
                .iter()
                .filter(|(_, run)| !run.handle.is_finished())
                .map(|(device, _)| *device)
                .collect(),
            monitoring: self.is_monitoring(),
            shutting_down: core.is_shutting_down(),
        };
        for reservoir in core.reservoirs.iter() {
            let n = reservoir.id().get();
            snapshot.reservoir_levels.insert(n, reservoir.level_ml());
            snapshot.refilling.insert(n, reservoir.is_refilling());
            snapshot
                .ingredients
                .insert(n, core.config.reservoir(reservoir.id().index()).ingredient.to_string());
        }
        snapshot.pouring =
            snapshot.current_drink.is_some() || core.pours_in_flight.load(Ordering::Acquire) > 0;
        snapshot
    }

    pub fn is_monitoring(&self) -> bool {
        lock(&self.monitor).as_ref().is_some_and(LevelMonitor::is_running)
    }

    // ── Command surface ───────────────────────────────────────────

    /// Execute an [`AppCommand`]. Refills and drinks run in the background.
    pub fn handle_command(&self, cmd: AppCommand) -> Result<CommandReply> {
        debug!("Command: {:?}", cmd);
        match cmd {
            AppCommand::Pour { reservoir, ml } => self.pour(reservoir, ml).map(CommandReply::Level),
            AppCommand::Refill { reservoir } => {
                self.refill_in_background(reservoir).map(|()| CommandReply::Accepted)
            }
            AppCommand::Dispense(recipe) => {
                self.dispense_in_background(recipe).map(|()| CommandReply::Accepted)
            }
            AppCommand::SetValve { valve, open } => {
                self.set_valve(valve, open).map(|()| CommandReply::Done)
            }
            AppCommand::SetPump { pump, on } => self.set_pump(pump, on).map(|()| CommandReply::Done),
            AppCommand::TestActuate { kind, id, duration_ms } => self
                .test_actuate(kind, id, duration_ms.map(Duration::from_millis))
                .map(|d| CommandReply::TestStarted { duration_ms: d.as_millis() as u64 }),
            AppCommand::StopTest { kind, id } => self.stop_test(kind, id).map(|_| CommandReply::Done),
            AppCommand::Status => Ok(CommandReply::Status(self.status())),
        }
    }

    // ── Teardown ──────────────────────────────────────────────────

    /// Stop the monitor and test actuations, force every pump and valve
    /// off and release the device handles. Later calls do nothing.
    ///
    /// In-flight pours and refills end on their own: refills notice the
    /// flag at their next poll, and their relays are already off.
    pub fn shutdown(&self) {
        if self.core.shutting_down.swap(true, Ordering::AcqRel) {
            debug!("Shutdown already performed");
            return;
        }
        info!("Cleaning up hardware...");

        let monitor = lock(&self.monitor).take();
        if let Some(monitor) = monitor {
            monitor.stop(self.core.config.monitor_join_timeout());
        }
        self.core.stop_all_tests();
        self.core.registry.all_off();
        // Valves are already closed; a pour still in its window would
        // otherwise close its valve against released handles.
        self.core.wait_for_pours(self.core.config.monitor_join_timeout());
        self.core.registry.release();

        self.core.sink.emit(&AppEvent::ShutdownComplete);
        info!("Hardware cleanup complete");
    }
}

// ───────────────────────────────────────────────────────────────
// Shared core (used by worker threads and the monitor)
// ───────────────────────────────────────────────────────────────

struct TestRun {
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

impl TestRun {
    fn finish(self, device: DeviceId) {
        self.stop.signal(());
        if self.handle.join().is_err() {
            error!("Test actuation thread for {} panicked", device);
        }
    }
}

pub(crate) struct Core {
    config: SystemConfig,
    limits: SafetyLimits,
    reservoirs: Arc<ReservoirTable>,
    registry: DeviceRegistry,
    sink: Arc<dyn EventSink>,
    shutting_down: AtomicBool,
    pours_in_flight: AtomicUsize,
    /// Name of the drink being dispensed.
    drink: Mutex<Option<String>>,
    tests: Mutex<HashMap<DeviceId, TestRun>>,
}

impl Core {
    pub(crate) fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub(crate) fn reservoirs(&self) -> &ReservoirTable {
        &self.reservoirs
    }

    pub(crate) fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub(crate) fn emit(&self, event: &AppEvent) {
        self.sink.emit(event);
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shutting_down() { Err(Error::ShuttingDown) } else { Ok(()) }
    }

    fn pour(&self, raw: u8, volume_ml: f32) -> Result<f32> {
        let id = ReservoirId::new(raw)?;
        let reservoir = self.reservoirs.get(id);
        if !(volume_ml > 0.0) {
            debug!("Pour of {}ml from reservoir {} ignored", volume_ml, id);
            return Ok(reservoir.level_ml());
        }
        self.ensure_running()?;

        let flow = self.config.reservoir(id.index()).valve_flow_ml_per_sec;
        let requested = self.limits.pour_duration(volume_ml, flow);
        let (applied, clamped) = clamp_duration(requested, self.limits.max_pour());

        let _access = reservoir.begin_pour();
        // Teardown may have started while a refill held the lock.
        self.ensure_running()?;
        let _in_flight = InFlight::enter(&self.pours_in_flight);

        info!("Pouring {:.1}ml from reservoir {} ({:.2}s)", volume_ml, id, applied.as_secs_f32());
        if clamped {
            warn!(
                "Pour time {:.1}s exceeds maximum {:.1}s, clamping",
                requested.as_secs_f32(),
                applied.as_secs_f32()
            );
            self.emit(&AppEvent::PourClamped { reservoir: id, requested, applied });
        }
        self.emit(&AppEvent::PourStarted { reservoir: id, volume_ml, duration: applied });

        match relay::actuate_for(&self.registry, DeviceId::valve(id), requested, self.limits.max_pour()) {
            Ok(_) => {
                let level_ml = reservoir.drain(volume_ml);
                info!("Reservoir {} level: {:.1}ml", id, level_ml);
                self.emit(&AppEvent::PourCompleted { reservoir: id, volume_ml, level_ml });
                Ok(level_ml)
            }
            // Teardown sealed the registry between our checks and the open.
            Err(Error::DeviceIo(DeviceError::Released)) => {
                warn!("Pour from reservoir {} refused: shutting down", id);
                Err(Error::ShuttingDown)
            }
            Err(Error::DeviceIo(e)) => {
                error!("Valve {} failed to open: {}", id, e);
                self.emit(&AppEvent::PourFaulted { reservoir: id, error: e });
                Ok(reservoir.level_ml())
            }
            Err(e) => Err(e),
        }
    }

    pub(crate) fn spawn_refill(self: &Arc<Self>, id: ReservoirId) -> Result<()> {
        let core = Arc::clone(self);
        spawn_task(&format!("refill-{}", id), WORKER_STACK_KB, move || {
            core.run_refill(id);
        })?;
        Ok(())
    }

    fn run_refill(&self, id: ReservoirId) -> RefillOutcome {
        let reservoir = self.reservoirs.get(id);
        let Some(session) = reservoir.try_begin_refill() else {
            let refilling = reservoir.is_refilling();
            if refilling {
                warn!("Reservoir {} already refilling", id);
            } else {
                warn!("Reservoir {} busy, refill skipped", id);
            }
            self.emit(&AppEvent::RefillSkipped { reservoir: id, refilling });
            return RefillOutcome::AlreadyInProgress;
        };

        if self.is_shutting_down() {
            warn!("Refill of reservoir {} cancelled by shutdown", id);
            let level_ml = reservoir.level_ml();
            self.emit(&AppEvent::RefillFinished {
                reservoir: id,
                outcome: RefillOutcome::Cancelled,
                elapsed: Duration::ZERO,
                level_ml,
            });
            return RefillOutcome::Cancelled;
        }

        let needed_ml = session.reservoir().deficit_ml();
        let timeout = self.limits.refill_timeout(needed_ml);
        info!("Refilling reservoir {}: {:.0}ml, timeout {:.0}s", id, needed_ml, timeout.as_secs_f32());
        self.emit(&AppEvent::RefillStarted { reservoir: id, needed_ml, timeout });

        let started = Instant::now();
        let outcome = match RelayGuard::engage(&self.registry, DeviceId::pump(id)) {
            Ok(pump) => {
                let outcome = self.wait_for_float(id, started, timeout);
                drop(pump);
                outcome
            }
            Err(Error::DeviceIo(DeviceError::Released)) => {
                warn!("Refill of reservoir {} cancelled by shutdown", id);
                RefillOutcome::Cancelled
            }
            Err(e) => {
                error!("Pump {} failed to start: {}", id, e);
                RefillOutcome::Faulted
            }
        };
        let elapsed = started.elapsed();

        let level_ml = match outcome {
            RefillOutcome::Completed => {
                info!("Reservoir {} full after {:.1}s", id, elapsed.as_secs_f32());
                reservoir.mark_full()
            }
            RefillOutcome::TimedOut => {
                // No measurement is available, so the estimate assumes the
                // pump delivered what was needed.
                warn!("Refill timeout for reservoir {}; assuming full", id);
                reservoir.mark_full()
            }
            _ => reservoir.level_ml(),
        };
        self.emit(&AppEvent::RefillFinished { reservoir: id, outcome, elapsed, level_ml });
        drop(session);
        outcome
    }

    fn wait_for_float(&self, id: ReservoirId, started: Instant, timeout: Duration) -> RefillOutcome {
        let float = DeviceId::float_switch(id);
        let poll = self.config.float_poll_interval();
        loop {
            if started.elapsed() > timeout {
                return RefillOutcome::TimedOut;
            }
            // Checked before the float: released handles read as full.
            if self.is_shutting_down() {
                warn!("Refill of reservoir {} cancelled by shutdown", id);
                return RefillOutcome::Cancelled;
            }
            if self.registry.float_ok(float) {
                return RefillOutcome::Completed;
            }
            std::thread::sleep(poll);
        }
    }

    /// Wait until no pour holds a valve window, at most `timeout`.
    fn wait_for_pours(&self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        while self.pours_in_flight.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                warn!("Pours still in flight at teardown; releasing anyway");
                return;
            }
            std::thread::sleep(POUR_DRAIN_POLL);
        }
    }

    fn claim_dispenser(self: &Arc<Self>, drink: &str) -> Result<DispenserClaim> {
        let mut current = lock(&self.drink);
        if let Some(busy) = current.as_deref() {
            warn!("Already dispensing {}, {} rejected", busy, drink);
            return Err(Error::AlreadyDispensing);
        }
        *current = Some(drink.to_owned());
        Ok(DispenserClaim { core: Arc::clone(self) })
    }

    fn run_dispense(&self, recipe: &Recipe) -> Result<DispenseReport> {
        info!("Dispensing {} ({:.0}ml)", recipe.name, recipe.total_ml());
        self.emit(&AppEvent::DispenseStarted { drink: recipe.name.clone() });

        let mut report = DispenseReport { drink: recipe.name.clone(), pours: 0, levels: BTreeMap::new() };
        for (i, (id, ml)) in recipe.pours().enumerate() {
            if i > 0 {
                std::thread::sleep(self.config.ingredient_gap());
            }
            let level = self.pour(id.get(), ml)?;
            report.levels.insert(id.get(), level);
            report.pours += 1;
        }

        self.emit(&AppEvent::DispenseFinished { drink: recipe.name.clone(), poured: report.pours });
        info!("{} complete", recipe.name);
        Ok(report)
    }

    fn test_actuate(self: &Arc<Self>, kind: DeviceKind, raw: u8, requested: Option<Duration>) -> Result<Duration> {
        let device = DeviceId::new(kind, raw)?;
        if kind == DeviceKind::FloatSwitch {
            return Err(Error::InvalidDeviceId { kind, id: raw });
        }
        self.ensure_running()?;

        let ceiling = self.limits.actuation_ceiling(kind);
        let (applied, clamped) = clamp_duration(requested.unwrap_or(self.config.test_actuation()), ceiling);
        if clamped {
            warn!("Test of {} clamped to {:.1}s", device, applied.as_secs_f32());
        }

        // Held across stop and restart so two requests cannot interleave.
        let mut tests = lock(&self.tests);
        if let Some(previous) = tests.remove(&device) {
            previous.finish(device);
        }

        let stop = Arc::new(StopSignal::new());
        let remote = Arc::clone(&stop);
        let core = Arc::clone(self);
        let name = format!("test-{:?}-{}", kind, raw).to_lowercase();
        let handle = spawn_task(&name, WORKER_STACK_KB, move || {
            let interrupted =
                match relay::actuate_until_stopped(&core.registry, device, applied, ceiling, &remote) {
                    Ok(a) => a.interrupted,
                    Err(e) => {
                        error!("Test of {} failed: {}", device, e);
                        false
                    }
                };
            core.emit(&AppEvent::TestActuationEnded { device, interrupted });
        })?;
        tests.insert(device, TestRun { stop, handle });
        drop(tests);

        info!("Testing {} for {:.1}s", device, applied.as_secs_f32());
        self.emit(&AppEvent::TestActuationStarted { device, duration: applied });
        Ok(applied)
    }

    fn stop_test(&self, device: DeviceId) -> bool {
        let mut tests = lock(&self.tests);
        match tests.remove(&device) {
            Some(run) => {
                run.finish(device);
                true
            }
            None => false,
        }
    }

    fn stop_all_tests(&self) {
        let runs: Vec<_> = lock(&self.tests).drain().collect();
        for (device, run) in runs {
            run.finish(device);
        }
    }
}

/// Holds the single drink slot; frees it on drop.
struct DispenserClaim {
    core: Arc<Core>,
}

impl Drop for DispenserClaim {
    fn drop(&mut self) {
        *lock(&self.core.drink) = None;
    }
}

/// Counts a pour for [`StatusSnapshot::pouring`] while alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
