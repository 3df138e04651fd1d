//! Simulated device backend.
//!
//! Relay writes are logged and otherwise ignored. Float switches report
//! the level estimate against the threshold, so the level monitor and
//! refills behave as they would with real switches tracking the estimate.
//!
//! The estimate only moves when a refill ends, so a simulated refill runs
//! until its timeout unless the reservoir was already above threshold.

use std::sync::Arc;

use log::info;

use crate::app::ports::{DeviceBackend, DeviceMode};
use crate::error::DeviceError;
use crate::reservoir::{DeviceId, ReservoirTable};

/// Backend used when live GPIO is unavailable or not requested.
pub struct SimulatedBackend {
    reservoirs: Arc<ReservoirTable>,
    released: bool,
}

impl SimulatedBackend {
    pub fn new(reservoirs: Arc<ReservoirTable>) -> Self {
        Self { reservoirs, released: false }
    }
}

impl DeviceBackend for SimulatedBackend {
    fn set_relay(&mut self, device: DeviceId, energized: bool) -> Result<(), DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        info!("[SIM] {} {}", device, if energized { "on" } else { "off" });
        Ok(())
    }

    fn read_float(&mut self, device: DeviceId) -> Result<bool, DeviceError> {
        if self.released {
            return Err(DeviceError::Released);
        }
        Ok(self.reservoirs.get(device.reservoir()).estimate_above_threshold())
    }

    fn release(&mut self) {
        self.released = true;
    }

    fn mode(&self) -> DeviceMode {
        DeviceMode::Simulated
    }
}
