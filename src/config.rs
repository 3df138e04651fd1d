//! System configuration parameters
//!
//! Pin mappings, calibration values and safety ceilings for the bartender.
//! Loaded once at startup through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! and shared read-only afterwards.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::pins;

/// Maximum length of an ingredient label.
pub const LABEL_LEN: usize = 32;

/// Number of reservoirs (and of each device class).
pub const RESERVOIR_COUNT: usize = 4;

/// Ingredient label, stored inline.
pub type Label = heapless::String<LABEL_LEN>;

/// GPIO lines per device class. Index 0 is device 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap {
    pub pumps: [u32; RESERVOIR_COUNT],
    pub valves: [u32; RESERVOIR_COUNT],
    pub floats: [u32; RESERVOIR_COUNT],
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            pumps: pins::PUMP_GPIO,
            valves: pins::VALVE_GPIO,
            floats: pins::FLOAT_GPIO,
        }
    }
}

/// Calibration for one wall reservoir and its pour valve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirConfig {
    /// What the reservoir holds (display only).
    pub ingredient: Label,
    /// Usable volume in mL.
    pub capacity_ml: f32,
    /// Float switch trip point in mL; the simulated switch reports low at or
    /// below this level.
    pub refill_threshold_ml: f32,
    /// Gravity flow through the valve in mL/s (measured, not nominal).
    pub valve_flow_ml_per_sec: f32,
}

impl ReservoirConfig {
    fn with_ingredient(name: &str) -> Self {
        let mut ingredient = Label::new();
        // Defaults are short literals; a failed push only loses the label.
        let _ = ingredient.push_str(name);
        Self {
            ingredient,
            capacity_ml: 400.0,
            refill_threshold_ml: 100.0,
            valve_flow_ml_per_sec: 8.0,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- GPIO ---
    /// Character device of the GPIO bank.
    pub gpio_chip: String,
    /// True when a LOW output energizes the relay.
    pub relay_active_low: bool,
    pub pins: PinMap,

    // --- Reservoirs ---
    pub reservoirs: [ReservoirConfig; RESERVOIR_COUNT],
    /// Refill pump rating in mL/min (shared by all four pumps).
    pub pump_flow_ml_per_min: f32,

    // --- Safety ---
    /// Ceiling on a single valve opening (milliseconds).
    pub max_pour_time_ms: u64,
    /// Ceiling on a manual or test pump run (milliseconds).
    pub max_pump_time_ms: u64,
    /// Ceiling on a refill, whatever the computed estimate (milliseconds).
    pub refill_timeout_ms: u64,
    /// Refill timeout = expected fill time × this factor (then capped).
    pub refill_timeout_factor: f32,

    // --- Timing ---
    /// Float switch poll period while a refill pump runs.
    pub float_poll_interval_ms: u64,
    /// Level monitor scan period.
    pub monitor_interval_ms: u64,
    /// Level monitor pause after a failed scan.
    pub monitor_fault_backoff_ms: u64,
    /// How long teardown waits for the monitor thread to exit.
    pub monitor_join_timeout_ms: u64,
    /// Pause between the ingredients of one drink.
    pub ingredient_gap_ms: u64,
    /// Default length of a diagnostic test actuation.
    pub test_actuation_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // GPIO
            gpio_chip: pins::GPIO_CHIP.into(),
            relay_active_low: true,
            pins: PinMap::default(),

            // Reservoirs
            reservoirs: [
                ReservoirConfig::with_ingredient("Vodka"),
                ReservoirConfig::with_ingredient("Rum"),
                ReservoirConfig::with_ingredient("Orange Juice"),
                ReservoirConfig::with_ingredient("Cranberry Juice"),
            ],
            pump_flow_ml_per_min: 220.0,

            // Safety
            max_pour_time_ms: 30_000,
            max_pump_time_ms: 180_000,
            refill_timeout_ms: 120_000,
            refill_timeout_factor: 1.5,

            // Timing
            float_poll_interval_ms: 500,
            monitor_interval_ms: 2_000,
            monitor_fault_backoff_ms: 5_000,
            monitor_join_timeout_ms: 5_000,
            ingredient_gap_ms: 500,
            test_actuation_ms: 60_000,
        }
    }
}

impl SystemConfig {
    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for r in &self.reservoirs {
            if !(r.capacity_ml.is_finite() && r.capacity_ml > 0.0) {
                return Err(ConfigError::ValidationFailed("capacity_ml must be positive"));
            }
            if !(r.refill_threshold_ml >= 0.0 && r.refill_threshold_ml < r.capacity_ml) {
                return Err(ConfigError::ValidationFailed(
                    "refill_threshold_ml must lie in [0, capacity_ml)",
                ));
            }
            if !(r.valve_flow_ml_per_sec.is_finite() && r.valve_flow_ml_per_sec > 0.0) {
                return Err(ConfigError::ValidationFailed("valve_flow_ml_per_sec must be positive"));
            }
        }
        if !(self.pump_flow_ml_per_min.is_finite() && self.pump_flow_ml_per_min > 0.0) {
            return Err(ConfigError::ValidationFailed("pump_flow_ml_per_min must be positive"));
        }
        if !(self.refill_timeout_factor.is_finite() && self.refill_timeout_factor >= 1.0) {
            return Err(ConfigError::ValidationFailed("refill_timeout_factor must be >= 1.0"));
        }

        let periods = [
            (self.max_pour_time_ms, "max_pour_time_ms must be non-zero"),
            (self.max_pump_time_ms, "max_pump_time_ms must be non-zero"),
            (self.refill_timeout_ms, "refill_timeout_ms must be non-zero"),
            (self.float_poll_interval_ms, "float_poll_interval_ms must be non-zero"),
            (self.monitor_interval_ms, "monitor_interval_ms must be non-zero"),
            (self.monitor_fault_backoff_ms, "monitor_fault_backoff_ms must be non-zero"),
            (self.test_actuation_ms, "test_actuation_ms must be non-zero"),
        ];
        if let Some((_, msg)) = periods.iter().find(|(ms, _)| *ms == 0) {
            return Err(ConfigError::ValidationFailed(*msg));
        }

        let mut lines: heapless::Vec<u32, { 3 * RESERVOIR_COUNT }> = heapless::Vec::new();
        for &line in self
            .pins
            .pumps
            .iter()
            .chain(&self.pins.valves)
            .chain(&self.pins.floats)
        {
            if lines.contains(&line) {
                return Err(ConfigError::ValidationFailed("GPIO line assigned twice"));
            }
            // Capacity matches the number of lines chained above.
            let _ = lines.push(line);
        }
        Ok(())
    }

    pub fn reservoir(&self, index: usize) -> &ReservoirConfig {
        &self.reservoirs[index]
    }

    pub fn max_pour_time(&self) -> Duration {
        Duration::from_millis(self.max_pour_time_ms)
    }

    pub fn max_pump_time(&self) -> Duration {
        Duration::from_millis(self.max_pump_time_ms)
    }

    pub fn refill_timeout_ceiling(&self) -> Duration {
        Duration::from_millis(self.refill_timeout_ms)
    }

    pub fn float_poll_interval(&self) -> Duration {
        Duration::from_millis(self.float_poll_interval_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn monitor_fault_backoff(&self) -> Duration {
        Duration::from_millis(self.monitor_fault_backoff_ms)
    }

    pub fn monitor_join_timeout(&self) -> Duration {
        Duration::from_millis(self.monitor_join_timeout_ms)
    }

    pub fn ingredient_gap(&self) -> Duration {
        Duration::from_millis(self.ingredient_gap_ms)
    }

    pub fn test_actuation(&self) -> Duration {
        Duration::from_millis(self.test_actuation_ms)
    }
}
