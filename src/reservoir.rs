//! Reservoir records and device identifiers.
//!
//! Each wall reservoir is the unit of concurrency control. Its record holds
//! the estimated fill level, the `refilling` flag and an exclusive lock.
//! Both operations that touch the liquid take the lock through a scoped
//! guard:
//!
//! ```text
//!   refill ──try_lock──▶ RefillSession  (busy ⇒ no-op, never queued)
//!   pour   ──lock──────▶ PourAccess     (waits for an in-flight refill)
//! ```
//!
//! Guards release on every exit path, including unwinding.

use core::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use serde::{Deserialize, Serialize};

use crate::config::{RESERVOIR_COUNT, SystemConfig};
use crate::error::{DeviceKind, Error, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// A validated reservoir index in `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ReservoirId(u8);

impl ReservoirId {
    /// All reservoirs in scan order.
    pub const ALL: [ReservoirId; RESERVOIR_COUNT] =
        [ReservoirId(1), ReservoirId(2), ReservoirId(3), ReservoirId(4)];

    pub fn new(raw: u8) -> Result<Self> {
        if (1..=RESERVOIR_COUNT as u8).contains(&raw) {
            Ok(Self(raw))
        } else {
            Err(Error::InvalidReservoirId(raw))
        }
    }

    /// The 1-based number used on the wire and in logs.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based table index.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl TryFrom<u8> for ReservoirId {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<ReservoirId> for u8 {
    fn from(id: ReservoirId) -> u8 {
        id.0
    }
}

impl fmt::Display for ReservoirId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated device address: class plus 1-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDeviceId")]
pub struct DeviceId {
    kind: DeviceKind,
    number: u8,
}

/// Unchecked wire form of [`DeviceId`].
#[derive(Deserialize)]
struct RawDeviceId {
    kind: DeviceKind,
    number: u8,
}

impl TryFrom<RawDeviceId> for DeviceId {
    type Error = Error;

    fn try_from(raw: RawDeviceId) -> Result<Self> {
        Self::new(raw.kind, raw.number)
    }
}

impl DeviceId {
    pub fn new(kind: DeviceKind, raw: u8) -> Result<Self> {
        if (1..=RESERVOIR_COUNT as u8).contains(&raw) {
            Ok(Self { kind, number: raw })
        } else {
            Err(Error::InvalidDeviceId { kind, id: raw })
        }
    }

    /// The refill pump feeding `reservoir`.
    pub fn pump(reservoir: ReservoirId) -> Self {
        Self { kind: DeviceKind::Pump, number: reservoir.get() }
    }

    /// The pour valve draining `reservoir`.
    pub fn valve(reservoir: ReservoirId) -> Self {
        Self { kind: DeviceKind::Valve, number: reservoir.get() }
    }

    /// The float switch inside `reservoir`.
    pub fn float_switch(reservoir: ReservoirId) -> Self {
        Self { kind: DeviceKind::FloatSwitch, number: reservoir.get() }
    }

    pub fn kind(self) -> DeviceKind {
        self.kind
    }

    pub fn number(self) -> u8 {
        self.number
    }

    /// Zero-based index into the per-class pin tables.
    pub fn index(self) -> usize {
        usize::from(self.number - 1)
    }

    /// The reservoir this device belongs to (same index in every class).
    pub fn reservoir(self) -> ReservoirId {
        ReservoirId(self.number)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.number)
    }
}

// ---------------------------------------------------------------------------
// Reservoir record
// ---------------------------------------------------------------------------

/// Mutable state of one wall reservoir.
pub struct Reservoir {
    id: ReservoirId,
    capacity_ml: f32,
    threshold_ml: f32,
    /// Estimated fill level, always within `[0, capacity_ml]`.
    level_ml: Mutex<f32>,
    /// True exactly while a [`RefillSession`] is alive.
    refilling: AtomicBool,
    exclusive: Mutex<()>,
}

impl Reservoir {
    /// A full reservoir.
    pub fn new(id: ReservoirId, capacity_ml: f32, threshold_ml: f32) -> Self {
        Self {
            id,
            capacity_ml,
            threshold_ml,
            level_ml: Mutex::new(capacity_ml),
            refilling: AtomicBool::new(false),
            exclusive: Mutex::new(()),
        }
    }

    pub fn id(&self) -> ReservoirId {
        self.id
    }

    pub fn capacity_ml(&self) -> f32 {
        self.capacity_ml
    }

    pub fn threshold_ml(&self) -> f32 {
        self.threshold_ml
    }

    /// Current estimated level in mL.
    pub fn level_ml(&self) -> f32 {
        *self.level()
    }

    /// Volume missing to reach capacity.
    pub fn deficit_ml(&self) -> f32 {
        self.capacity_ml - self.level_ml()
    }

    /// What a float switch at the threshold would report for the estimate.
    pub fn estimate_above_threshold(&self) -> bool {
        self.level_ml() > self.threshold_ml
    }

    pub fn is_refilling(&self) -> bool {
        self.refilling.load(Ordering::Acquire)
    }

    /// Subtract a dispensed volume, clamped at empty. Returns the new level.
    pub fn drain(&self, ml: f32) -> f32 {
        let mut level = self.level();
        *level = (*level - ml).clamp(0.0, self.capacity_ml);
        *level
    }

    /// Reset the estimate to full capacity. Returns the new level.
    pub fn mark_full(&self) -> f32 {
        let mut level = self.level();
        *level = self.capacity_ml;
        *level
    }

    /// Whether a pour or refill currently holds the exclusive lock.
    pub fn is_busy(&self) -> bool {
        matches!(self.exclusive.try_lock(), Err(TryLockError::WouldBlock))
    }

    /// Non-blocking acquisition for a refill. `None` when the reservoir is
    /// already locked by a refill or a pour.
    pub fn try_begin_refill(&self) -> Option<RefillSession<'_>> {
        let guard = match self.exclusive.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return None,
        };
        self.refilling.store(true, Ordering::Release);
        Some(RefillSession { reservoir: self, _guard: guard })
    }

    /// Blocking acquisition for a pour; waits out an in-flight refill.
    pub fn begin_pour(&self) -> PourAccess<'_> {
        let guard = self.exclusive.lock().unwrap_or_else(PoisonError::into_inner);
        PourAccess { _guard: guard }
    }

    /// Non-blocking variant of [`begin_pour`](Self::begin_pour).
    pub fn try_begin_pour(&self) -> Option<PourAccess<'_>> {
        match self.exclusive.try_lock() {
            Ok(guard) => Some(PourAccess { _guard: guard }),
            Err(TryLockError::Poisoned(p)) => Some(PourAccess { _guard: p.into_inner() }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn level(&self) -> MutexGuard<'_, f32> {
        // A panic while holding the level lock cannot leave a torn f32.
        self.level_ml.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive refill access. Clears `refilling` before the lock is released.
pub struct RefillSession<'a> {
    reservoir: &'a Reservoir,
    _guard: MutexGuard<'a, ()>,
}

impl RefillSession<'_> {
    pub fn reservoir(&self) -> &Reservoir {
        self.reservoir
    }
}

impl Drop for RefillSession<'_> {
    fn drop(&mut self) {
        // Runs before `_guard` is dropped.
        self.reservoir.refilling.store(false, Ordering::Release);
    }
}

/// Exclusive pour access for the length of one valve window.
pub struct PourAccess<'a> {
    _guard: MutexGuard<'a, ()>,
}

// ---------------------------------------------------------------------------
// Reservoir table
// ---------------------------------------------------------------------------

/// One [`Reservoir`] per configured index, created at startup.
pub struct ReservoirTable {
    reservoirs: [Reservoir; RESERVOIR_COUNT],
}

impl ReservoirTable {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            reservoirs: ReservoirId::ALL.map(|id| {
                let rc = config.reservoir(id.index());
                Reservoir::new(id, rc.capacity_ml, rc.refill_threshold_ml)
            }),
        }
    }

    pub fn get(&self, id: ReservoirId) -> &Reservoir {
        &self.reservoirs[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reservoir> {
        self.reservoirs.iter()
    }
}
