//! Safety limits on relay actuation.
//!
//! Every relay window in the system is bounded by a ceiling from
//! [`SystemConfig`]:
//!
//! | Actuation              | Ceiling                                      |
//! |------------------------|----------------------------------------------|
//! | pour (valve)           | `max_pour_time_ms`                           |
//! | refill (pump)          | `min(expected × factor, refill_timeout_ms)`  |
//! | test actuation (pump)  | `max_pump_time_ms`                           |
//! | test actuation (valve) | `max_pour_time_ms`                           |
//!
//! Clamping is never silent: the caller receives a flag and logs it.

use core::time::Duration;

use crate::config::SystemConfig;
use crate::error::DeviceKind;

/// Ceilings and flow constants derived from the configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyLimits {
    max_pour: Duration,
    max_pump: Duration,
    refill_ceiling: Duration,
    refill_factor: f32,
    pump_flow_ml_per_sec: f32,
}

impl SafetyLimits {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            max_pour: config.max_pour_time(),
            max_pump: config.max_pump_time(),
            refill_ceiling: config.refill_timeout_ceiling(),
            refill_factor: config.refill_timeout_factor,
            pump_flow_ml_per_sec: config.pump_flow_ml_per_min / 60.0,
        }
    }

    pub fn max_pour(&self) -> Duration {
        self.max_pour
    }

    /// Valve window needed for `volume_ml` at `flow_ml_per_sec`, unclamped.
    pub fn pour_duration(&self, volume_ml: f32, flow_ml_per_sec: f32) -> Duration {
        secs(volume_ml / flow_ml_per_sec)
    }

    /// Nominal pump run to deliver `ml_needed`.
    pub fn expected_refill(&self, ml_needed: f32) -> Duration {
        secs(ml_needed / self.pump_flow_ml_per_sec)
    }

    /// Refill deadline: expected time with margin, capped at the ceiling.
    pub fn refill_timeout(&self, ml_needed: f32) -> Duration {
        secs(self.expected_refill(ml_needed).as_secs_f32() * self.refill_factor)
            .min(self.refill_ceiling)
    }

    /// Longest allowed test actuation for a device class. Float switches
    /// cannot be actuated.
    pub fn actuation_ceiling(&self, kind: DeviceKind) -> Duration {
        match kind {
            DeviceKind::Pump => self.max_pump,
            DeviceKind::Valve => self.max_pour,
            DeviceKind::FloatSwitch => Duration::ZERO,
        }
    }
}

/// Clamp `requested` to `ceiling`. The flag is `true` when clamping applied.
pub fn clamp_duration(requested: Duration, ceiling: Duration) -> (Duration, bool) {
    if requested > ceiling { (ceiling, true) } else { (requested, false) }
}

/// Seconds to `Duration`, saturating: negatives and NaN map to zero,
/// overflow to `Duration::MAX`.
fn secs(s: f32) -> Duration {
    if s.is_nan() || s <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(s).unwrap_or(Duration::MAX)
}
