//! Timed relay actuation.
//!
//! A [`RelayGuard`] de-energizes its relay when dropped, so a valve or pump
//! is switched off on every exit path: normal completion, an early return
//! and unwinding alike.
//!
//! ## Safety contract
//!
//! [`actuate_for`] takes a hard ceiling and never holds a relay longer,
//! whatever duration was requested.

use core::time::Duration;
use std::time::Instant;

use log::debug;

use crate::error::Result;
use crate::reservoir::DeviceId;
use crate::safety::clamp_duration;

use super::registry::DeviceRegistry;
use super::task::{StopSignal, sleep_or_stop};

/// An energized relay. Dropping it de-energizes the relay.
pub struct RelayGuard<'a> {
    registry: &'a DeviceRegistry,
    device: DeviceId,
}

impl<'a> RelayGuard<'a> {
    /// Energize `device`. On failure the off command is still issued
    /// before the error is returned.
    pub fn engage(registry: &'a DeviceRegistry, device: DeviceId) -> Result<Self> {
        if let Err(e) = registry.try_set(device, true) {
            registry.set(device, false);
            return Err(e);
        }
        Ok(Self { registry, device })
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }
}

impl Drop for RelayGuard<'_> {
    fn drop(&mut self) {
        self.registry.set(self.device, false);
    }
}

/// How a timed actuation went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actuation {
    pub requested: Duration,
    /// Window actually held, after clamping.
    pub applied: Duration,
    pub clamped: bool,
    /// Ended by a stop request before `applied` elapsed.
    pub interrupted: bool,
    pub elapsed: Duration,
}

/// Energize `device` for `requested`, clamped to `ceiling`, then release.
pub fn actuate_for(
    registry: &DeviceRegistry,
    device: DeviceId,
    requested: Duration,
    ceiling: Duration,
) -> Result<Actuation> {
    let (applied, clamped) = clamp_duration(requested, ceiling);
    let guard = RelayGuard::engage(registry, device)?;
    let started = Instant::now();
    std::thread::sleep(applied);
    drop(guard);
    let elapsed = started.elapsed();
    debug!("{} held for {:?}", device, elapsed);
    Ok(Actuation { requested, applied, clamped, interrupted: false, elapsed })
}

/// Like [`actuate_for`], but ends early when `stop` is signalled.
pub fn actuate_until_stopped(
    registry: &DeviceRegistry,
    device: DeviceId,
    requested: Duration,
    ceiling: Duration,
    stop: &StopSignal,
) -> Result<Actuation> {
    let (applied, clamped) = clamp_duration(requested, ceiling);
    let guard = RelayGuard::engage(registry, device)?;
    let started = Instant::now();
    let interrupted = sleep_or_stop(stop, applied);
    drop(guard);
    let elapsed = started.elapsed();
    debug!("{} held for {:?} (interrupted={})", device, elapsed, interrupted);
    Ok(Actuation { requested, applied, clamped, interrupted, elapsed })
}
