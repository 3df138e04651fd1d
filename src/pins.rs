//! GPIO pin assignments for the bartender relay board (BCM numbering).
//!
//! Single source of truth for the defaults in [`SystemConfig`](crate::config::SystemConfig).
//! Index 0 of each table is device 1.
//!
//! Relay inputs are active-LOW: driving the line LOW energizes the relay.

// ---------------------------------------------------------------------------
// Refill pumps (floor bottle → wall reservoir)
// ---------------------------------------------------------------------------

/// Pump relays 1–4 (Kamoer KHPP260 peristaltic pumps).
pub const PUMP_GPIO: [u32; 4] = [17, 27, 22, 23];

// ---------------------------------------------------------------------------
// Pour valves (wall reservoir → glass, gravity fed)
// ---------------------------------------------------------------------------

/// Solenoid valve relays 1–4.
pub const VALVE_GPIO: [u32; 4] = [24, 25, 5, 6];

// ---------------------------------------------------------------------------
// Float switches
// ---------------------------------------------------------------------------

/// Reservoir float switches 1–4, inputs with pull-up. HIGH = level OK.
pub const FLOAT_GPIO: [u32; 4] = [16, 20, 21, 26];

// ---------------------------------------------------------------------------
// GPIO controller
// ---------------------------------------------------------------------------

/// Character device of the header GPIO bank.
pub const GPIO_CHIP: &str = "/dev/gpiochip0";

/// Consumer label attached to every claimed line.
pub const CONSUMER_LABEL: &str = "bartender";
