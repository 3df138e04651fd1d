//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (GPIO banks, the simulator, log sinks, config files)
//! implement these traits. The [`Controller`](super::service::Controller)
//! only ever sees the traits, so every operation runs on the host against
//! mock adapters.
//!
//! ## Threading
//!
//! Unlike a single control loop, pours, refills and the level monitor run
//! on separate threads. Backends are therefore `Send` (the registry
//! serialises access behind a mutex) and sinks are `Send + Sync` with a
//! shared-reference `emit`.

use serde::Serialize;

use crate::config::SystemConfig;
use crate::error::DeviceError;
use crate::reservoir::DeviceId;

// ───────────────────────────────────────────────────────────────
// Device backend (driven adapter: domain ↔ relays and switches)
// ───────────────────────────────────────────────────────────────

/// How the backend reaches the devices. Fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// Real GPIO lines.
    Live,
    /// Writes are logged; float switches follow the level estimate.
    Simulated,
}

/// The only code path that touches physical I/O.
///
/// Device ids arrive already validated by the
/// [`DeviceRegistry`](crate::drivers::registry::DeviceRegistry).
pub trait DeviceBackend: Send {
    /// Energize or de-energize the relay of a pump or valve.
    fn set_relay(&mut self, device: DeviceId, energized: bool) -> Result<(), DeviceError>;

    /// Sample a float switch. `true` = level OK.
    fn read_float(&mut self, device: DeviceId) -> Result<bool, DeviceError>;

    /// Release every line handle. Later calls fail with
    /// [`DeviceError::Released`].
    fn release(&mut self);

    fn mode(&self) -> DeviceMode;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain reports every state transition and fault as an
/// [`AppEvent`](super::events::AppEvent). Emission must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting and after loading.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`], not
/// silently clamped: a zero flow rate or an oversized pour ceiling would
/// defeat the relay time limits.
pub trait ConfigPort {
    /// Load configuration. [`ConfigError::NotFound`] when none is stored.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config stored yet (first start).
    NotFound,
    /// Stored config failed to deserialize.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
