//! Application core: pours, refills, drinks and diagnostics.
//!
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real relays.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
