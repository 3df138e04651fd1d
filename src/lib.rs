//! Bartender control core.
//!
//! Drives four wall reservoirs, each with a refill pump, a gravity pour
//! valve and a float switch. Exposes the controller for the binary, for
//! integration tests and for front ends built on top of it.
//!
//! Hardware is reached through [`app::ports::DeviceBackend`]; live Linux
//! GPIO is behind the `rpi` feature and everything else runs simulated.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod monitor;
pub mod pins;
pub mod recipe;
pub mod reservoir;
pub mod safety;

pub use app::service::{Controller, ControllerBuilder, RefillOutcome, StatusSnapshot};
pub use error::{DeviceError, DeviceKind, Error, Result};
