//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (`env_logger` on stderr in the binary). A future web
//! or MQTT adapter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::app::service::RefillOutcome;

/// Adapter that logs every [`AppEvent`] as one line.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::Started { mode } => info!("START | mode={:?}", mode),
            AppEvent::FellBackToSimulation(e) => warn!("START | live I/O failed ({}), simulating", e),
            AppEvent::PourStarted { reservoir, volume_ml, duration } => {
                info!("POUR | r{} | {:.1}mL over {:.2}s", reservoir, volume_ml, duration.as_secs_f32());
            }
            AppEvent::PourClamped { reservoir, requested, applied } => {
                warn!(
                    "POUR | r{} | clamped {:.1}s -> {:.1}s",
                    reservoir,
                    requested.as_secs_f32(),
                    applied.as_secs_f32()
                );
            }
            AppEvent::PourCompleted { reservoir, volume_ml, level_ml } => {
                info!("POUR | r{} | done {:.1}mL, level={:.1}mL", reservoir, volume_ml, level_ml);
            }
            AppEvent::PourFaulted { reservoir, error } => {
                error!("POUR | r{} | valve fault: {}", reservoir, error);
            }
            AppEvent::RefillStarted { reservoir, needed_ml, timeout } => {
                info!(
                    "REFILL | r{} | need {:.0}mL, timeout {:.0}s",
                    reservoir,
                    needed_ml,
                    timeout.as_secs_f32()
                );
            }
            AppEvent::RefillSkipped { reservoir, refilling } => {
                info!(
                    "REFILL | r{} | skipped ({})",
                    reservoir,
                    if *refilling { "already refilling" } else { "busy" }
                );
            }
            AppEvent::RefillFinished { reservoir, outcome, elapsed, level_ml } => {
                let line = format!(
                    "REFILL | r{} | {:?} after {:.1}s, level={:.0}mL",
                    reservoir,
                    outcome,
                    elapsed.as_secs_f32(),
                    level_ml
                );
                match outcome {
                    RefillOutcome::Completed => info!("{}", line),
                    RefillOutcome::Faulted => error!("{}", line),
                    _ => warn!("{}", line),
                }
            }
            AppEvent::LowLevelDetected(reservoir) => info!("LEVEL | r{} | low", reservoir),
            AppEvent::MonitorStarted => info!("MONITOR | started"),
            AppEvent::MonitorFault(e) => error!("MONITOR | scan failed: {}", e),
            AppEvent::MonitorStopped => info!("MONITOR | stopped"),
            AppEvent::DispenseStarted { drink } => info!("DRINK | {} | started", drink),
            AppEvent::DispenseFinished { drink, poured } => {
                info!("DRINK | {} | done, {} pours", drink, poured);
            }
            AppEvent::DeviceFault { device, error } => error!("FAULT | {} | {}", device, error),
            AppEvent::TestActuationStarted { device, duration } => {
                info!("TEST | {} | on for {:.1}s", device, duration.as_secs_f32());
            }
            AppEvent::TestActuationEnded { device, interrupted } => {
                info!("TEST | {} | off (interrupted={})", device, interrupted);
            }
            AppEvent::ShutdownComplete => info!("STOP | all relays off, lines released"),
        }
    }
}
