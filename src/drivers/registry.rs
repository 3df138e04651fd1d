//! Device registry: the single owner of the device backend.
//!
//! Validates device ids, serialises backend access from the pour, refill,
//! monitor and test threads, and remembers the last commanded state of
//! every relay.
//!
//! ```text
//!   BackendChoice::Live(open) ──open(config)──┬─ Ok  ──▶ live backend
//!                                             └─ Err ──▶ SimulatedBackend
//!   BackendChoice::Simulated ─────────────────────────▶ SimulatedBackend
//! ```
//!
//! The mode is fixed once the registry exists. [`DeviceRegistry::all_off`]
//! seals the registry: from then on only de-energizing writes reach the
//! backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{error, info, warn};

use crate::adapters::simulated::SimulatedBackend;
use crate::app::events::AppEvent;
use crate::app::ports::{DeviceBackend, DeviceMode, EventSink};
use crate::config::{RESERVOIR_COUNT, SystemConfig};
use crate::error::{DeviceError, DeviceKind, Error, Result};
use crate::reservoir::{DeviceId, ReservoirTable};

/// Opens the live backend; called once at startup.
pub type LiveOpener =
    Box<dyn FnOnce(&SystemConfig) -> core::result::Result<Box<dyn DeviceBackend>, DeviceError> + Send>;

/// Which backend the registry should try to use.
pub enum BackendChoice {
    Simulated,
    Live(LiveOpener),
}

impl BackendChoice {
    pub fn live<F>(open: F) -> Self
    where
        F: FnOnce(&SystemConfig) -> core::result::Result<Box<dyn DeviceBackend>, DeviceError>
            + Send
            + 'static,
    {
        Self::Live(Box::new(open))
    }
}

#[derive(Default)]
struct RelayStates {
    pumps: [bool; RESERVOIR_COUNT],
    valves: [bool; RESERVOIR_COUNT],
}

impl RelayStates {
    fn slot(&mut self, device: DeviceId) -> Option<&mut bool> {
        match device.kind() {
            DeviceKind::Pump => Some(&mut self.pumps[device.index()]),
            DeviceKind::Valve => Some(&mut self.valves[device.index()]),
            DeviceKind::FloatSwitch => None,
        }
    }
}

pub struct DeviceRegistry {
    backend: Mutex<Box<dyn DeviceBackend>>,
    mode: DeviceMode,
    relays: Mutex<RelayStates>,
    /// Written only while the backend lock is held.
    sealed: AtomicBool,
    sink: Arc<dyn EventSink>,
}

impl DeviceRegistry {
    /// Wrap an already opened backend.
    pub fn new(backend: Box<dyn DeviceBackend>, sink: Arc<dyn EventSink>) -> Self {
        let mode = backend.mode();
        Self {
            backend: Mutex::new(backend),
            mode,
            relays: Mutex::new(RelayStates::default()),
            sealed: AtomicBool::new(false),
            sink,
        }
    }

    /// Resolve a [`BackendChoice`], falling back to simulation when the
    /// live backend cannot be opened.
    pub fn select(
        choice: BackendChoice,
        config: &SystemConfig,
        reservoirs: &Arc<ReservoirTable>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let backend: Box<dyn DeviceBackend> = match choice {
            BackendChoice::Simulated => Box::new(SimulatedBackend::new(Arc::clone(reservoirs))),
            BackendChoice::Live(open) => match open(config) {
                Ok(backend) => {
                    info!("GPIO initialized on {}", config.gpio_chip);
                    backend
                }
                Err(e) => {
                    warn!("Live GPIO unavailable ({}); running in simulation mode", e);
                    sink.emit(&AppEvent::FellBackToSimulation(e));
                    Box::new(SimulatedBackend::new(Arc::clone(reservoirs)))
                }
            },
        };
        Self::new(backend, sink)
    }

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    // ── Raw-id entry points (manual overrides) ────────────────────

    /// Manual pump override. Device faults are logged, not returned.
    pub fn set_pump(&self, id: u8, on: bool) -> Result<()> {
        self.set(DeviceId::new(DeviceKind::Pump, id)?, on);
        Ok(())
    }

    /// Manual valve override. Device faults are logged, not returned.
    pub fn set_valve(&self, id: u8, open: bool) -> Result<()> {
        self.set(DeviceId::new(DeviceKind::Valve, id)?, open);
        Ok(())
    }

    /// Sample a float switch by raw id. A read fault reports "level OK".
    pub fn read_float(&self, id: u8) -> Result<bool> {
        Ok(self.float_ok(DeviceId::new(DeviceKind::FloatSwitch, id)?))
    }

    // ── Typed entry points ────────────────────────────────────────

    /// Drive a relay and report backend faults to the caller. Energizing a
    /// sealed registry fails with [`DeviceError::Released`].
    pub fn try_set(&self, device: DeviceId, energized: bool) -> Result<()> {
        if device.kind() == DeviceKind::FloatSwitch {
            return Err(Error::InvalidDeviceId { kind: device.kind(), id: device.number() });
        }
        let mut backend = self.backend();
        if energized && self.is_sealed() {
            return Err(Error::DeviceIo(DeviceError::Released));
        }
        backend.set_relay(device, energized)?;
        if let Some(slot) = self.relays().slot(device) {
            *slot = energized;
        }
        Ok(())
    }

    /// Drive a relay; faults are logged and emitted, never returned.
    pub fn set(&self, device: DeviceId, energized: bool) {
        if let Err(e) = self.try_set(device, energized) {
            self.report(device, e);
        }
    }

    /// Sample a float switch. A failed read counts as "level OK" so a
    /// broken sensor cannot start a refill.
    pub fn float_ok(&self, device: DeviceId) -> bool {
        match self.backend().read_float(device) {
            Ok(ok) => ok,
            Err(e) => {
                self.report(device, Error::DeviceIo(e));
                true
            }
        }
    }

    /// Last commanded state of a pump or valve.
    pub fn is_energized(&self, device: DeviceId) -> bool {
        self.relays().slot(device).is_some_and(|slot| *slot)
    }

    /// Every pump and valve currently commanded on.
    pub fn energized(&self) -> Vec<DeviceId> {
        let relays = self.relays();
        let mut on = Vec::new();
        for (n, (&pump, &valve)) in (1u8..).zip(relays.pumps.iter().zip(&relays.valves)) {
            if pump {
                on.extend(DeviceId::new(DeviceKind::Pump, n).ok());
            }
            if valve {
                on.extend(DeviceId::new(DeviceKind::Valve, n).ok());
            }
        }
        on
    }

    /// Seal the registry, then de-energize every pump and valve regardless
    /// of recorded state. An energize racing with this call either lands
    /// before the seal and is switched off here, or is refused.
    pub fn all_off(&self) {
        {
            let _backend = self.backend();
            self.sealed.store(true, Ordering::Release);
        }
        for kind in [DeviceKind::Pump, DeviceKind::Valve] {
            for n in 1..=RESERVOIR_COUNT as u8 {
                if let Ok(device) = DeviceId::new(kind, n) {
                    self.set(device, false);
                }
            }
        }
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Release every backend handle. Later actuations fail and are logged.
    pub fn release(&self) {
        self.backend().release();
        info!("Device handles released");
    }

    fn report(&self, device: DeviceId, e: Error) {
        match e {
            Error::DeviceIo(DeviceError::Released) => warn!("{}: {}", device, e),
            Error::DeviceIo(io) => {
                error!("{} fault: {}", device, io);
                self.sink.emit(&AppEvent::DeviceFault { device, error: io });
            }
            other => error!("{}: {}", device, other),
        }
    }

    fn backend(&self) -> MutexGuard<'_, Box<dyn DeviceBackend>> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn relays(&self) -> MutexGuard<'_, RelayStates> {
        self.relays.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
