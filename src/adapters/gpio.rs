//! Live device backend over `embedded-hal` digital pins.
//!
//! Generic over the pin types so the same bank drives Linux character
//! device lines on the Pi (see [`cdev`](super::cdev)) and mock pins in
//! tests.
//!
//! ## Relay polarity
//!
//! With `relay_active_low` (the default board) a LOW output energizes the
//! relay. Float inputs are pulled up: HIGH = level OK.

use embedded_hal::digital::{Error as _, InputPin, OutputPin};
use log::{info, warn};

use crate::app::ports::{DeviceBackend, DeviceMode};
use crate::config::{PinMap, RESERVOIR_COUNT};
use crate::error::{DeviceError, DeviceKind};
use crate::reservoir::DeviceId;

/// Claimed pins, one per device. Index 0 is device 1.
pub struct GpioLines<O, I> {
    pub pumps: [O; RESERVOIR_COUNT],
    pub valves: [O; RESERVOIR_COUNT],
    pub floats: [I; RESERVOIR_COUNT],
}

/// Backend that owns every relay output and float input.
pub struct GpioBank<O, I> {
    lines: Option<GpioLines<O, I>>,
    map: PinMap,
    active_low: bool,
}

impl<O, I> GpioBank<O, I>
where
    O: OutputPin,
    I: InputPin,
{
    /// Take ownership of claimed lines and drive every relay off.
    pub fn new(lines: GpioLines<O, I>, map: PinMap, active_low: bool) -> Result<Self, DeviceError> {
        let mut bank = Self { lines: Some(lines), map, active_low };
        for kind in [DeviceKind::Pump, DeviceKind::Valve] {
            for n in 1..=RESERVOIR_COUNT as u8 {
                if let Ok(device) = DeviceId::new(kind, n) {
                    bank.write(device, false)?;
                }
            }
        }
        Ok(bank)
    }

    fn write(&mut self, device: DeviceId, energized: bool) -> Result<(), DeviceError> {
        let i = device.index();
        let (line, pin) = {
            let lines = self.lines.as_mut().ok_or(DeviceError::Released)?;
            match device.kind() {
                DeviceKind::Pump => (self.map.pumps[i], &mut lines.pumps[i]),
                DeviceKind::Valve => (self.map.valves[i], &mut lines.valves[i]),
                DeviceKind::FloatSwitch => return Err(DeviceError::Write(self.map.floats[i])),
            }
        };
        let drive_low = energized == self.active_low;
        let result = if drive_low { pin.set_low() } else { pin.set_high() };
        result.map_err(|e| {
            warn!("GPIO {} write: {:?}", line, e.kind());
            DeviceError::Write(line)
        })?;
        info!(
            "{} {} (GPIO {} {})",
            device,
            if energized { "on" } else { "off" },
            line,
            if drive_low { "LOW" } else { "HIGH" }
        );
        Ok(())
    }
}

impl<O, I> DeviceBackend for GpioBank<O, I>
where
    O: OutputPin + Send,
    I: InputPin + Send,
{
    fn set_relay(&mut self, device: DeviceId, energized: bool) -> Result<(), DeviceError> {
        self.write(device, energized)
    }

    fn read_float(&mut self, device: DeviceId) -> Result<bool, DeviceError> {
        let i = device.index();
        let line = self.map.floats[i];
        let lines = self.lines.as_mut().ok_or(DeviceError::Released)?;
        if device.kind() != DeviceKind::FloatSwitch {
            return Err(DeviceError::Read(line));
        }
        lines.floats[i].is_high().map_err(|e| {
            warn!("GPIO {} read: {:?}", line, e.kind());
            DeviceError::Read(line)
        })
    }

    fn release(&mut self) {
        // Dropping the pins returns the lines to the kernel.
        if self.lines.take().is_some() {
            info!("GPIO lines released");
        }
    }

    fn mode(&self) -> DeviceMode {
        DeviceMode::Live
    }
}
