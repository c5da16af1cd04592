//! # Per-outcome counters.
//!
//! Updated by `submit`, the dispatcher and every lane; read through
//! [`Engine::stats`](crate::Engine::stats). Each accepted job ends in exactly one
//! of `completed`, `failed`, `timed_out` or `panicked`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::JobError;

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Jobs accepted by `submit` / `try_submit`.
    pub submitted: u64,
    /// Handler returned `Ok(())`.
    pub completed: u64,
    /// Handler returned an error other than a deadline.
    pub failed: u64,
    /// Timeout guard substituted `JobError::Timeout`.
    pub timed_out: u64,
    /// Handler panicked; job dropped.
    pub panicked: u64,
    /// Jobs parked in the overflow list at shutdown.
    pub overflowed: u64,
    /// Jobs handled by drain workers (any outcome).
    pub drained: u64,
}

impl StatsSnapshot {
    /// Jobs whose handler invocation has finished, whatever the outcome.
    pub fn finished(&self) -> u64 {
        self.completed + self.failed + self.timed_out + self.panicked
    }
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
    overflowed: AtomicU64,
    drained: AtomicU64,
}

impl Counters {
    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overflowed(&self) {
        self.overflowed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drained(&self) {
        self.drained.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_outcome(&self, res: &Result<(), JobError>) {
        let slot = match res {
            Ok(()) => &self.completed,
            Err(JobError::Timeout { .. }) => &self.timed_out,
            Err(_) => &self.failed,
        };
        slot.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            overflowed: self.overflowed.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
        }
    }
}
