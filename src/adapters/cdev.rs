//! Raspberry Pi GPIO through the Linux character-device API.
//!
//! Claims every configured line on the configured chip and hands them to a
//! [`GpioBank`]. Any claim failure aborts the open, and the registry falls
//! back to simulation. Lines are requested as outputs at the relay-off
//! level so no relay clicks on during startup.

use gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::CdevPin;
use log::{info, warn};

use crate::app::ports::DeviceBackend;
use crate::config::{RESERVOIR_COUNT, SystemConfig};
use crate::error::DeviceError;
use crate::pins::CONSUMER_LABEL;

use super::gpio::{GpioBank, GpioLines};

/// Open the live backend described by `config`.
pub fn open(config: &SystemConfig) -> Result<Box<dyn DeviceBackend>, DeviceError> {
    let mut chip = Chip::new(&config.gpio_chip).map_err(|e| {
        warn!("Cannot open {}: {}", config.gpio_chip, e);
        DeviceError::LineClaim(0)
    })?;

    let off_level = u8::from(config.relay_active_low);
    let lines = GpioLines {
        pumps: claim_all(&mut chip, config.pins.pumps, LineRequestFlags::OUTPUT, off_level)?,
        valves: claim_all(&mut chip, config.pins.valves, LineRequestFlags::OUTPUT, off_level)?,
        floats: claim_all(&mut chip, config.pins.floats, LineRequestFlags::INPUT, 0)?,
    };
    info!("Claimed {} GPIO lines on {}", 3 * RESERVOIR_COUNT, config.gpio_chip);

    let bank = GpioBank::new(lines, config.pins.clone(), config.relay_active_low)?;
    Ok(Box::new(bank))
}

fn claim_all(
    chip: &mut Chip,
    offsets: [u32; RESERVOIR_COUNT],
    flags: LineRequestFlags,
    default: u8,
) -> Result<[CdevPin; RESERVOIR_COUNT], DeviceError> {
    let [a, b, c, d] = offsets;
    Ok([
        claim(chip, a, flags, default)?,
        claim(chip, b, flags, default)?,
        claim(chip, c, flags, default)?,
        claim(chip, d, flags, default)?,
    ])
}

fn claim(chip: &mut Chip, offset: u32, flags: LineRequestFlags, default: u8) -> Result<CdevPin, DeviceError> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(flags, default, CONSUMER_LABEL))
        .map_err(|e| {
            warn!("GPIO {} claim failed: {}", offset, e);
            DeviceError::LineClaim(offset)
        })?;
    CdevPin::new(handle).map_err(|e| {
        warn!("GPIO {} setup failed: {}", offset, e);
        DeviceError::LineClaim(offset)
    })
}
