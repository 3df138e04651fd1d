//! Level monitor: background scan of the float switches.
//!
//! ```text
//!   loop {
//!       for each reservoir:
//!           float low && !refilling ──▶ spawn refill thread
//!       wait(interval | backoff after a failed scan) or stop
//!   }
//! ```
//!
//! Refills are fire-and-forget: the monitor never waits for one. A refill
//! that finds the reservoir locked returns without doing anything, so a
//! repeated detection is harmless.
//!
//! Stopping signals the loop and waits up to a bound for it to exit; a
//! monitor stuck past the bound is detached.

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;

use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::service::Core;
use crate::drivers::task::{StopSignal, sleep_or_stop, spawn_task, wait_or_stop};
use crate::error::Result;
use crate::reservoir::DeviceId;

const MONITOR_STACK_KB: usize = 32;

/// Handle to the running monitor thread.
pub struct LevelMonitor {
    stop: Arc<StopSignal>,
    stopped: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

impl LevelMonitor {
    pub(crate) fn start(core: Arc<Core>) -> Result<Self> {
        let stop = Arc::new(StopSignal::new());
        let stopped = Arc::new(StopSignal::new());

        let loop_stop = Arc::clone(&stop);
        let loop_stopped = Arc::clone(&stopped);
        let handle = spawn_task("level-monitor", MONITOR_STACK_KB, move || {
            future::block_on(run(&core, &loop_stop));
            loop_stopped.signal(());
        })?;

        Ok(Self { stop, stopped, handle })
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signal the loop and wait up to `timeout` for it to exit.
    /// Returns `true` when the thread was joined.
    pub fn stop(self, timeout: Duration) -> bool {
        self.stop.signal(());
        if sleep_or_stop(&self.stopped, timeout) {
            if self.handle.join().is_err() {
                error!("Level monitor thread panicked");
            }
            true
        } else {
            warn!("Level monitor did not stop within {:.1}s, detaching", timeout.as_secs_f32());
            false
        }
    }
}

async fn run(core: &Arc<Core>, stop: &StopSignal) {
    info!("Level monitoring started");
    core.emit(&AppEvent::MonitorStarted);

    let interval = core.config().monitor_interval();
    let backoff = core.config().monitor_fault_backoff();
    loop {
        let pause = match scan(core) {
            Ok(()) => interval,
            Err(e) => {
                error!("Level monitor error: {}", e);
                core.emit(&AppEvent::MonitorFault(e));
                backoff
            }
        };
        if wait_or_stop(stop, pause).await {
            break;
        }
    }

    info!("Level monitoring stopped");
    core.emit(&AppEvent::MonitorStopped);
}

/// One pass over every reservoir.
fn scan(core: &Arc<Core>) -> Result<()> {
    for reservoir in core.reservoirs().iter() {
        if core.is_shutting_down() {
            return Ok(());
        }
        let id = reservoir.id();
        if !core.registry().float_ok(DeviceId::float_switch(id)) && !reservoir.is_refilling() {
            if reservoir.is_busy() {
                debug!("Reservoir {} low but pouring; rechecking next scan", id);
                continue;
            }
            info!("Low level detected in reservoir {}, starting refill", id);
            core.emit(&AppEvent::LowLevelDetected(id));
            core.spawn_refill(id)?;
        }
    }
    Ok(())
}
