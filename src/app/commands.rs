//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the operator
//! console, a future web front end) that the
//! [`Controller`](super::service::Controller) interprets and acts upon.
//!
//! Console lines parse into commands with [`str::parse`]:
//!
//! ```text
//!   pour 1 50          refill 2          status
//!   valve 3 open       pump 4 off
//!   test pump 1 5000   stop valve 2
//!   dispense Screwdriver 1=50 3=150
//! ```

use core::fmt;
use core::str::FromStr;

use crate::error::DeviceKind;
use crate::recipe::Recipe;
use crate::reservoir::ReservoirId;

use super::service::StatusSnapshot;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Pour `ml` from a reservoir, blocking until the valve closes.
    Pour { reservoir: u8, ml: f32 },

    /// Start a refill on a worker thread and return immediately.
    Refill { reservoir: u8 },

    /// Pour every ingredient of a drink on a worker thread.
    Dispense(Recipe),

    /// Manual valve override.
    SetValve { valve: u8, open: bool },

    /// Manual pump override.
    SetPump { pump: u8, on: bool },

    /// Run a pump or valve for a bounded time (default from config).
    TestActuate { kind: DeviceKind, id: u8, duration_ms: Option<u64> },

    /// End a running test actuation early.
    StopTest { kind: DeviceKind, id: u8 },

    /// Snapshot of levels, refills and relays.
    Status,
}

/// Successful results of [`AppCommand`]s.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandReply {
    /// Level estimate after a pour.
    Level(f32),
    /// Background work was started.
    Accepted,
    /// A manual override or stop request was applied.
    Done,
    /// Test actuation started for this long (after clamping).
    TestStarted { duration_ms: u64 },
    Status(StatusSnapshot),
}

/// A console line that is not a valid command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandParseError(pub &'static str);

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CommandParseError {}

impl FromStr for AppCommand {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(CommandParseError("empty command"))?;
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "pour" => AppCommand::Pour {
                reservoir: number(words.next(), "usage: pour <reservoir> <ml>")?,
                ml: number(words.next(), "usage: pour <reservoir> <ml>")?,
            },
            "refill" => AppCommand::Refill {
                reservoir: number(words.next(), "usage: refill <reservoir>")?,
            },
            "valve" => AppCommand::SetValve {
                valve: number(words.next(), "usage: valve <id> open|close")?,
                open: switch(words.next(), "open", "close", "usage: valve <id> open|close")?,
            },
            "pump" => AppCommand::SetPump {
                pump: number(words.next(), "usage: pump <id> on|off")?,
                on: switch(words.next(), "on", "off", "usage: pump <id> on|off")?,
            },
            "test" => {
                const USAGE: &str = "usage: test pump|valve <id> [ms]";
                let kind = actuator(words.next(), USAGE)?;
                let id = number(words.next(), USAGE)?;
                let duration_ms = match words.next() {
                    Some(w) => Some(w.parse().map_err(|_| CommandParseError(USAGE))?),
                    None => None,
                };
                AppCommand::TestActuate { kind, id, duration_ms }
            }
            "stop" => {
                const USAGE: &str = "usage: stop pump|valve <id>";
                AppCommand::StopTest {
                    kind: actuator(words.next(), USAGE)?,
                    id: number(words.next(), USAGE)?,
                }
            }
            "dispense" => {
                const USAGE: &str = "usage: dispense <name> <reservoir>=<ml>...";
                let mut recipe = Recipe::new(words.next().ok_or(CommandParseError(USAGE))?);
                for pair in words.by_ref() {
                    let (id, ml) = pair.split_once('=').ok_or(CommandParseError(USAGE))?;
                    let id: u8 = number(Some(id), USAGE)?;
                    let id = ReservoirId::new(id)
                        .map_err(|_| CommandParseError("reservoir must be 1-4"))?;
                    recipe = recipe.with(id, number(Some(ml), USAGE)?);
                }
                if recipe.ingredients.is_empty() {
                    return Err(CommandParseError(USAGE));
                }
                AppCommand::Dispense(recipe)
            }
            "status" => AppCommand::Status,
            _ => return Err(CommandParseError("unknown command")),
        };
        if words.next().is_some() {
            return Err(CommandParseError("unexpected trailing arguments"));
        }
        Ok(cmd)
    }
}

fn number<T: FromStr>(word: Option<&str>, usage: &'static str) -> Result<T, CommandParseError> {
    word.and_then(|w| w.parse().ok()).ok_or(CommandParseError(usage))
}

fn switch(
    word: Option<&str>,
    on: &str,
    off: &str,
    usage: &'static str,
) -> Result<bool, CommandParseError> {
    match word {
        Some(w) if w.eq_ignore_ascii_case(on) => Ok(true),
        Some(w) if w.eq_ignore_ascii_case(off) => Ok(false),
        _ => Err(CommandParseError(usage)),
    }
}

fn actuator(word: Option<&str>, usage: &'static str) -> Result<DeviceKind, CommandParseError> {
    match word {
        Some(w) if w.eq_ignore_ascii_case("pump") => Ok(DeviceKind::Pump),
        Some(w) if w.eq_ignore_ascii_case("valve") => Ok(DeviceKind::Valve),
        _ => Err(CommandParseError(usage)),
    }
}
