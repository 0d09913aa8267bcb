//! C7: thread-visible engine flags (spec §4.7, §9).
//!
//! "Shared mutable flags → small atomics": `isTicking` is only ever written
//! by the engine and the pipeline already serializes block application, so a
//! lock-free `AtomicBool`/`AtomicU64` pair is enough — no lock is needed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// `0` means snapshot mode is off (spec §4.7).
const SNAPSHOT_OFF: u64 = 0;

#[derive(Debug, Default)]
struct Flags {
    is_loaded: AtomicBool,
    is_ticking: AtomicBool,
    snapshot: AtomicU64,
}

/// Cheaply cloneable handle onto the engine's shared flags. Only
/// `RoundEngine` writes `is_ticking`; only the pipeline bootstrap writes
/// `is_loaded`; only the snapshot command writes `snapshot`.
#[derive(Debug, Clone, Default)]
pub struct RoundAppState {
    flags: Arc<Flags>,
}

impl RoundAppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.flags.is_loaded.load(Ordering::Acquire)
    }

    pub fn set_loaded(&self, loaded: bool) {
        self.flags.is_loaded.store(loaded, Ordering::Release);
    }

    pub fn is_ticking(&self) -> bool {
        self.flags.is_ticking.load(Ordering::Acquire)
    }

    /// Returns `false` (and leaves the flag untouched) if a tick is already
    /// in flight — enforces "no two Ticking states may overlap" (spec §4.6)
    /// even under a concurrent-tick attempt, rather than trusting the caller
    /// alone to serialize.
    pub(crate) fn begin_tick(&self) -> bool {
        self.flags
            .is_ticking
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn end_tick(&self) {
        self.flags.is_ticking.store(false, Ordering::Release);
    }

    pub fn snapshot_round(&self) -> Option<u64> {
        match self.flags.snapshot.load(Ordering::Acquire) {
            SNAPSHOT_OFF => None,
            round => Some(round),
        }
    }

    pub fn set_snapshot_round(&self, round: Option<u64>) {
        self.flags
            .snapshot
            .store(round.unwrap_or(SNAPSHOT_OFF), Ordering::Release);
    }
}
