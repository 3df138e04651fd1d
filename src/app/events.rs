//! Outbound application events.
//!
//! Emitted by the [`Controller`](super::service::Controller) and the level
//! monitor through [`EventSink`](super::ports::EventSink) so adapters can
//! log, display or forward them without coupling to domain internals.

use core::time::Duration;

use crate::error::{DeviceError, Error};
use crate::reservoir::{DeviceId, ReservoirId};

use super::ports::DeviceMode;
use super::service::RefillOutcome;

/// Events the controller emits.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Controller assembled; devices are in the given mode.
    Started { mode: DeviceMode },
    /// Live I/O could not be opened; the controller runs simulated.
    FellBackToSimulation(DeviceError),

    // ── Pours ─────────────────────────────────────────────────────
    PourStarted { reservoir: ReservoirId, volume_ml: f32, duration: Duration },
    /// The computed valve window exceeded the pour ceiling.
    PourClamped { reservoir: ReservoirId, requested: Duration, applied: Duration },
    PourCompleted { reservoir: ReservoirId, volume_ml: f32, level_ml: f32 },
    /// The valve could not be opened; the level estimate is unchanged.
    PourFaulted { reservoir: ReservoirId, error: DeviceError },

    // ── Refills ───────────────────────────────────────────────────
    RefillStarted { reservoir: ReservoirId, needed_ml: f32, timeout: Duration },
    /// The reservoir lock was held by another refill or a pour.
    RefillSkipped { reservoir: ReservoirId, refilling: bool },
    RefillFinished {
        reservoir: ReservoirId,
        outcome: RefillOutcome,
        elapsed: Duration,
        level_ml: f32,
    },

    // ── Level monitor ─────────────────────────────────────────────
    LowLevelDetected(ReservoirId),
    MonitorStarted,
    MonitorFault(Error),
    MonitorStopped,

    // ── Drinks ────────────────────────────────────────────────────
    DispenseStarted { drink: String },
    DispenseFinished { drink: String, poured: usize },

    // ── Diagnostics ───────────────────────────────────────────────
    DeviceFault { device: DeviceId, error: DeviceError },
    TestActuationStarted { device: DeviceId, duration: Duration },
    TestActuationEnded { device: DeviceId, interrupted: bool },

    /// Every relay de-energized and every line released.
    ShutdownComplete,
}
