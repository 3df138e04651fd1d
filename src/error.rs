//! Unified error types for the bartender control core.
//!
//! A single `Error` enum that every subsystem converts into. All variants
//! are `Copy` so they can be passed across the refill threads and the
//! monitor without allocation.
//!
//! Two outcomes that look like errors are deliberately *not* here: a refill
//! request against a reservoir that is already refilling, and a refill that
//! ran out of time. Both are ordinary [`RefillOutcome`](crate::app::service::RefillOutcome)
//! values.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the control core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A pump, valve or float-switch index outside `1..=4`.
    InvalidDeviceId { kind: DeviceKind, id: u8 },
    /// A reservoir index outside `1..=4`.
    InvalidReservoirId(u8),
    /// The backend failed to drive or sample a line.
    DeviceIo(DeviceError),
    /// Another drink is already being dispensed.
    AlreadyDispensing,
    /// Teardown has started; no new actuation is accepted.
    ShuttingDown,
    /// The OS refused to create a worker thread.
    TaskSpawn,
    /// The configuration handed to the controller failed validation.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDeviceId { kind, id } => write!(f, "invalid {kind} id: {id}"),
            Self::InvalidReservoirId(id) => write!(f, "invalid reservoir id: {id}"),
            Self::DeviceIo(e) => write!(f, "device I/O: {e}"),
            Self::AlreadyDispensing => write!(f, "already dispensing a drink"),
            Self::ShuttingDown => write!(f, "controller is shutting down"),
            Self::TaskSpawn => write!(f, "worker thread could not be spawned"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Device classes
// ---------------------------------------------------------------------------

/// The three device classes wired to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Pump,
    Valve,
    FloatSwitch,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pump => write!(f, "pump"),
            Self::Valve => write!(f, "valve"),
            Self::FloatSwitch => write!(f, "float switch"),
        }
    }
}

// ---------------------------------------------------------------------------
// Device errors
// ---------------------------------------------------------------------------

/// Faults reported by a device backend. The payload is the GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// The line could not be claimed (already in use, missing chip).
    LineClaim(u32),
    /// Writing the output level failed.
    Write(u32),
    /// Sampling the input level failed.
    Read(u32),
    /// The backend's handles were already released at teardown.
    Released,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineClaim(line) => write!(f, "could not claim GPIO {line}"),
            Self::Write(line) => write!(f, "GPIO {line} write failed"),
            Self::Read(line) => write!(f, "GPIO {line} read failed"),
            Self::Released => write!(f, "device handles released"),
        }
    }
}

impl From<DeviceError> for Error {
    fn from(e: DeviceError) -> Self {
        Self::DeviceIo(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
