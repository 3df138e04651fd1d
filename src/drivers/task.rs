//! Named worker threads and interruptible waits.
//!
//! Refills, test actuations and the level monitor each run on their own
//! OS thread. Waits that must end early on request race an
//! `async-io-mini` reactor timer against an `embassy-sync` [`Signal`],
//! driven to completion with `futures_lite::future::block_on`:
//!
//! ```text
//!   wait_or_stop ──┬── Timer::after(period) ──▶ false (period elapsed)
//!                  └── stop.wait()          ──▶ true  (stop requested)
//! ```
//!
//! A [`StopSignal`] has a single consumer: `wait()` consumes the signal.
//! Broadcast shutdown uses an atomic flag instead.

use core::time::Duration;
use std::thread::JoinHandle;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use futures_lite::future;
use log::{debug, error};

use crate::error::{Error, Result};

/// One-shot stop request for a single waiting task.
pub type StopSignal = Signal<CriticalSectionRawMutex, ()>;

/// Spawn a named thread.
///
/// Returns [`Error::TaskSpawn`] instead of panicking when the OS refuses;
/// callers decide whether that is fatal.
pub fn spawn_task(
    name: &str,
    stack_kb: usize,
    f: impl FnOnce() + Send + 'static,
) -> Result<JoinHandle<()>> {
    debug!("Spawning '{}' (stack={}KB)", name, stack_kb);

    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
        .map_err(|e| {
            error!("spawn_task: '{}' could not be created: {}", name, e);
            Error::TaskSpawn
        })
}

/// Wait for `period`, or less if `stop` is signalled.
/// Returns `true` when the wait ended because of the stop request.
pub async fn wait_or_stop(stop: &StopSignal, period: Duration) -> bool {
    future::or(
        async {
            stop.wait().await;
            true
        },
        async {
            async_io_mini::Timer::after(period).await;
            false
        },
    )
    .await
}

/// Blocking form of [`wait_or_stop`] for plain threads.
pub fn sleep_or_stop(stop: &StopSignal, period: Duration) -> bool {
    future::block_on(wait_or_stop(stop, period))
}
